use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbaImage;

/// A decoded frame. Cloning shares the pixel buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Arc<RgbaImage>,
    pub file_name: Option<String>,
    /// Position within a video, when the frame came from one.
    pub timestamp_ms: Option<u64>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self::from_shared(Arc::new(image))
    }

    pub fn from_shared(image: Arc<RgbaImage>) -> Self {
        Self {
            image,
            file_name: None,
            timestamp_ms: None,
            captured_at: Utc::now(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
