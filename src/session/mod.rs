//! Capture session lifecycle: one controller per `(source, mode)` pair.

mod context;
mod controller;
mod events;
mod loops;
mod sinks;
mod source;
mod stats;
mod strategy;

pub use controller::{CaptureController, ControllerDeps};
pub use events::{ChannelEventSink, EndReason, EngineEvent, EventSink, LogEventSink};
pub use source::{SourceInput, StartRequest};
pub use stats::DetectionStats;
pub use strategy::{GalleryOrder, Strategy};
