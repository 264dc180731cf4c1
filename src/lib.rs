//! Capture session engine: drives image, batch, video, webcam and network
//! stream inference sessions against a remote inference service, renders
//! results over their frames, and keeps a navigable gallery.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod gallery;
pub mod inference;
pub mod media;
pub mod models;
pub mod poller;
pub mod render;
pub mod session;
pub mod settings;
pub mod utils;
pub mod viewport;
pub mod watchdog;

pub use config::{EngineConfig, WatchdogConfig};
pub use db::Database;
pub use engine::CaptureEngine;
pub use error::{CaptureError, CaptureResult};
pub use gallery::{GalleryEntry, GallerySnapshot, GalleryStore};
pub use inference::{InferenceParams, InferenceService};
pub use models::{
    CaptureMode, CaptureSession, DetectionResult, Frame, JobHandle, Prompt, PromptMode,
    RemoteStatus, SessionStatus, SourceType, TaskType,
};
pub use session::{
    CaptureController, ChannelEventSink, ControllerDeps, DetectionStats, EndReason, EngineEvent,
    EventSink, LogEventSink, SourceInput, StartRequest,
};
pub use settings::SettingsStore;
pub use utils::init_logging;
pub use viewport::ViewportState;
