use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::Frame;

use super::{FrameSource, VideoDecoder};

/// A video already decoded into memory as a fixed-rate frame sequence.
///
/// `grab` plays the sequence forward and loops at the end, like a preview
/// element set to loop; `seek` maps a timestamp to the frame shown then.
pub struct ImageSequenceVideo {
    path: PathBuf,
    frames: Vec<Frame>,
    fps: f64,
    cursor: usize,
    released: bool,
}

impl ImageSequenceVideo {
    pub fn new(path: impl Into<PathBuf>, frames: Vec<Frame>, fps: f64) -> Result<Self> {
        if frames.is_empty() {
            bail!("video contains no frames");
        }
        if !(fps.is_finite() && fps > 0.0) {
            bail!("invalid frame rate {fps}");
        }
        Ok(Self {
            path: path.into(),
            frames,
            fps,
            cursor: 0,
            released: false,
        })
    }

    pub fn duration_ms(&self) -> u64 {
        (self.frames.len() as f64 * 1000.0 / self.fps) as u64
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn timestamp_of(&self, index: usize) -> u64 {
        (index as f64 * 1000.0 / self.fps) as u64
    }

    fn frame_at(&self, index: usize) -> Frame {
        let frame = self.frames[index].clone();
        let timestamp = self.timestamp_of(index);
        frame.with_timestamp(timestamp)
    }
}

#[async_trait]
impl FrameSource for ImageSequenceVideo {
    async fn grab(&mut self) -> Result<Frame> {
        if self.released {
            bail!("video source already released");
        }
        let frame = self.frame_at(self.cursor);
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(frame)
    }

    async fn release(&mut self) {
        self.released = true;
    }
}

#[async_trait]
impl VideoDecoder for ImageSequenceVideo {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn seek(&mut self, timestamp_ms: u64) -> Result<Frame> {
        if self.released {
            bail!("video source already released");
        }
        let index = ((timestamp_ms as f64 / 1000.0) * self.fps).floor() as usize;
        let index = index.min(self.frames.len() - 1);
        self.cursor = index;
        Ok(self.frame_at(index))
    }
}
