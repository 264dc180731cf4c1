use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Prompt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    Image,
    Batch,
    Video,
    Webcam,
    Rtsp,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Image => "image",
            SourceType::Batch => "batch",
            SourceType::Video => "video",
            SourceType::Webcam => "webcam",
            SourceType::Rtsp => "rtsp",
        }
    }

    /// Indefinite sources show the newest capture first.
    pub fn is_live(&self) -> bool {
        matches!(self, SourceType::Webcam | SourceType::Rtsp)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum CaptureMode {
    Manual,
    Continuous,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Manual => "manual",
            CaptureMode::Continuous => "continuous",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Active,
    Stopping,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Active => "active",
            SessionStatus::Stopping => "stopping",
            SessionStatus::Ended => "ended",
        }
    }
}

/// Local record of one live or queued inference run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSession {
    pub id: String,
    pub source_type: SourceType,
    pub capture_mode: CaptureMode,
    pub status: SessionStatus,
    pub model_id: String,
    pub confidence_threshold: f32,
    pub class_filter: BTreeSet<String>,
    pub prompts: Vec<Prompt>,
    pub results_count: u64,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl CaptureSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}
