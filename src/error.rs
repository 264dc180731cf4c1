//! Error taxonomy for capture sessions.
//!
//! Foreground calls (`start`, `capture_frame`) surface these to the caller.
//! Background loops log them and keep running; see the poller and watchdog.

use thiserror::Error;

/// Convenience alias for results returned by the capture engine.
pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// Missing model, file, URL or permission. Raised before any remote call.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A single remote round trip failed.
    #[error("inference service request failed: {0}")]
    TransientNetwork(#[source] anyhow::Error),

    /// Camera denied, media already bound, or decode failure. No session is created.
    #[error("failed to acquire media resource: {0}")]
    ResourceAcquisition(String),

    /// Remote stop failed. Only ever logged; local teardown proceeds regardless.
    #[error("failed to terminate remote session {session_id}: {source}")]
    SessionTermination {
        session_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The operation is not valid for the controller's current status or mode.
    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("settings persistence failed: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl CaptureError {
    pub fn precondition(message: impl Into<String>) -> Self {
        CaptureError::Precondition(message.into())
    }

    pub fn resource(message: impl Into<String>) -> Self {
        CaptureError::ResourceAcquisition(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        CaptureError::InvalidState(message.into())
    }

    /// Short machine-readable kind, used in `EngineEvent::Error` payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::Precondition(_) => "precondition",
            CaptureError::TransientNetwork(_) => "transient-network",
            CaptureError::ResourceAcquisition(_) => "resource-acquisition",
            CaptureError::SessionTermination { .. } => "session-termination",
            CaptureError::InvalidState(_) => "invalid-state",
            CaptureError::Persistence(_) => "persistence",
        }
    }
}
