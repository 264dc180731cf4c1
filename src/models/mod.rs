pub mod detection;
pub mod frame;
pub mod job;
pub mod prompt;
pub mod session;

pub use detection::{DetectionResult, MaskInstance, TaskType};
pub use frame::Frame;
pub use job::{JobHandle, LatestFrame, RemoteStatus};
pub use prompt::{Prompt, PromptMode};
pub use session::{CaptureMode, CaptureSession, SessionStatus, SourceType};
