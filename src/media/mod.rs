//! Media acquisition: camera streams, decoded video, still images.
//!
//! The engine never decodes network streams; those are handed to the
//! inference service as a URL.

mod lease;
mod sequence;
mod still;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Frame;

pub use lease::{MediaLease, MediaSlot};
pub use sequence::ImageSequenceVideo;
pub use still::{load_image_file, load_image_files};

/// A source that yields frames on demand.
#[async_trait]
pub trait FrameSource: Send {
    async fn grab(&mut self) -> Result<Frame>;

    /// Release the underlying device or decoder. Called once on teardown.
    async fn release(&mut self) {}
}

/// Opens a camera stream. Permission denial is an error.
#[async_trait]
pub trait CameraProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn FrameSource>>;
}

/// A locally decoded video file.
#[async_trait]
pub trait VideoDecoder: FrameSource {
    fn path(&self) -> &Path;

    /// Seek to `timestamp_ms` and decode the frame shown at that time.
    async fn seek(&mut self, timestamp_ms: u64) -> Result<Frame>;
}
