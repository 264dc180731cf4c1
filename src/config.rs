use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::SourceType;

/// Cadences and limits for every background loop the engine runs.
///
/// All fields are in milliseconds so the JSON file stays readable; use the
/// accessor methods to get `Duration`s.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub batch_poll_interval_ms: u64,
    pub video_poll_interval_ms: u64,
    pub rtsp_poll_interval_ms: u64,
    pub webcam_capture_interval_ms: u64,
    pub preview_interval_ms: u64,
    pub rtsp_latest_frame_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub inactivity_check_interval_ms: u64,
    pub inactivity_threshold_ms: u64,
    pub inactivity_grace_ms: u64,
    pub settings_debounce_ms: u64,
    pub request_timeout_ms: u64,
    /// Upper bound on a single delta page.
    pub result_page_limit: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_poll_interval_ms: 1_000,
            video_poll_interval_ms: 1_000,
            rtsp_poll_interval_ms: 2_000,
            webcam_capture_interval_ms: 1_000,
            preview_interval_ms: 500,
            rtsp_latest_frame_interval_ms: 1_000,
            heartbeat_interval_ms: 25_000,
            inactivity_check_interval_ms: 10_000,
            inactivity_threshold_ms: 90_000,
            inactivity_grace_ms: 30_000,
            settings_debounce_ms: 300,
            request_timeout_ms: 30_000,
            result_page_limit: 100,
        }
    }
}

impl EngineConfig {
    /// Read configuration from a JSON file. A missing file yields defaults;
    /// a malformed one is logged and also yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config from {}", path.display()))?;

        match serde_json::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(err) => {
                warn!(
                    "Ignoring malformed engine config {}: {err}",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn poll_interval(&self, source: SourceType) -> Duration {
        let ms = match source {
            SourceType::Rtsp => self.rtsp_poll_interval_ms,
            SourceType::Video => self.video_poll_interval_ms,
            SourceType::Webcam => self.webcam_capture_interval_ms,
            SourceType::Image | SourceType::Batch => self.batch_poll_interval_ms,
        };
        Duration::from_millis(ms.max(1))
    }

    pub fn preview_interval(&self) -> Duration {
        Duration::from_millis(self.preview_interval_ms.max(1))
    }

    pub fn rtsp_latest_frame_interval(&self) -> Duration {
        Duration::from_millis(self.rtsp_latest_frame_interval_ms.max(1))
    }

    pub fn settings_debounce(&self) -> Duration {
        Duration::from_millis(self.settings_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn watchdog(&self) -> WatchdogConfig {
        WatchdogConfig {
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms.max(1)),
            check_interval: Duration::from_millis(self.inactivity_check_interval_ms.max(1)),
            inactivity_threshold: Duration::from_millis(self.inactivity_threshold_ms),
            grace_period: Duration::from_millis(self.inactivity_grace_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    pub heartbeat_interval: Duration,
    pub check_interval: Duration,
    pub inactivity_threshold: Duration,
    pub grace_period: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        EngineConfig::default().watchdog()
    }
}
