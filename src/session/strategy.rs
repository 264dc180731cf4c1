use crate::error::{CaptureError, CaptureResult};
use crate::models::{CaptureMode, SourceType};

/// Where new gallery entries land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryOrder {
    Append,
    Prepend,
}

/// How a controller drives one `(source, mode)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One round trip; the session ends as soon as it starts.
    SingleShot,
    BatchJob,
    VideoJob,
    VideoManual,
    WebcamJob,
    WebcamManual,
    StreamJob,
    StreamManual,
}

impl Strategy {
    /// Still images ignore the mode. A batch only runs as a job.
    pub fn select(source: SourceType, mode: CaptureMode) -> CaptureResult<Self> {
        let strategy = match (source, mode) {
            (SourceType::Image, _) => Strategy::SingleShot,
            (SourceType::Batch, CaptureMode::Continuous) => Strategy::BatchJob,
            (SourceType::Batch, CaptureMode::Manual) => {
                return Err(CaptureError::precondition(
                    "batch sources only support continuous capture",
                ))
            }
            (SourceType::Video, CaptureMode::Continuous) => Strategy::VideoJob,
            (SourceType::Video, CaptureMode::Manual) => Strategy::VideoManual,
            (SourceType::Webcam, CaptureMode::Continuous) => Strategy::WebcamJob,
            (SourceType::Webcam, CaptureMode::Manual) => Strategy::WebcamManual,
            (SourceType::Rtsp, CaptureMode::Continuous) => Strategy::StreamJob,
            (SourceType::Rtsp, CaptureMode::Manual) => Strategy::StreamManual,
        };
        Ok(strategy)
    }

    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            Strategy::VideoManual | Strategy::WebcamManual | Strategy::StreamManual
        )
    }

    /// Server-tracked sessions that need heartbeats and idle detection.
    pub fn uses_watchdog(&self) -> bool {
        matches!(self, Strategy::VideoManual | Strategy::WebcamManual)
    }

    /// Strategies that hold the local camera/video element.
    pub fn binds_media(&self) -> bool {
        matches!(
            self,
            Strategy::VideoJob | Strategy::VideoManual | Strategy::WebcamJob | Strategy::WebcamManual
        )
    }

    /// Result-fetching via the frame poller.
    pub fn polls_results(&self) -> bool {
        matches!(self, Strategy::BatchJob | Strategy::VideoJob | Strategy::StreamJob)
    }

    pub fn gallery_order(&self) -> GalleryOrder {
        match self {
            Strategy::SingleShot | Strategy::BatchJob | Strategy::VideoJob => GalleryOrder::Append,
            _ => GalleryOrder::Prepend,
        }
    }
}
