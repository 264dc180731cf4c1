use serde::{Deserialize, Serialize};

use super::{DetectionResult, Frame};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RemoteStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RemoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RemoteStatus::Completed | RemoteStatus::Failed | RemoteStatus::Cancelled
        )
    }
}

/// Remote-assigned identifier and status snapshot for a capture run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub id: String,
    pub status: RemoteStatus,
    pub results_count: u64,
}

/// Most recent frame the backend extracted from a network stream.
#[derive(Debug, Clone)]
pub struct LatestFrame {
    pub frame: Frame,
    pub predictions: Option<DetectionResult>,
}
