use serde::Serialize;
use tokio::sync::mpsc;

use crate::gallery::GallerySnapshot;
use crate::models::{CaptureSession, JobHandle};

use super::DetectionStats;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    Stopped,
    Completed,
    Failed,
    Inactivity,
}

/// Outbound presentation hooks. Purely observational: nothing in the engine
/// waits on how a host renders them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum EngineEvent {
    #[serde(rename_all = "camelCase")]
    SessionStart { session: CaptureSession },
    #[serde(rename_all = "camelCase")]
    SessionEnded { session_id: String, reason: EndReason },
    DetectingChange { detecting: bool },
    JobUpdate { job: JobHandle },
    GalleryUpdate { gallery: GallerySnapshot },
    StatsUpdate { stats: DetectionStats },
    #[serde(rename_all = "camelCase")]
    PreviewUpdate { session_id: String, detections: usize },
    #[serde(rename_all = "camelCase")]
    InactivityWarning {
        session_id: String,
        idle_ms: u64,
        grace_ms: u64,
    },
    Error { kind: String, message: String },
    Flash,
    ShutterSound,
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::SessionStart { .. } => "session-start",
            EngineEvent::SessionEnded { .. } => "session-ended",
            EngineEvent::DetectingChange { .. } => "detecting-change",
            EngineEvent::JobUpdate { .. } => "job-update",
            EngineEvent::GalleryUpdate { .. } => "gallery-update",
            EngineEvent::StatsUpdate { .. } => "stats-update",
            EngineEvent::PreviewUpdate { .. } => "preview-update",
            EngineEvent::InactivityWarning { .. } => "inactivity-warning",
            EngineEvent::Error { .. } => "error",
            EngineEvent::Flash => "flash",
            EngineEvent::ShutterSound => "shutter-sound",
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Forwards events to an unbounded channel; a dropped receiver is ignored.
#[derive(Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Writes every event to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: EngineEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => log::debug!("{}: {}", event.name(), payload),
            Err(err) => log::warn!("failed to serialize {} event: {err}", event.name()),
        }
    }
}
