//! Poller sinks: map each fetched result back to the frame it describes.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::media::VideoDecoder;
use crate::models::{DetectionResult, Frame, JobHandle};
use crate::poller::ResultSink;

use super::context::SessionContext;

/// Results index into the submitted file list by frame number; results
/// without one are matched in arrival order.
pub(crate) struct BatchSink {
    ctx: Arc<SessionContext>,
    frames: Vec<Frame>,
    arrivals: AtomicUsize,
}

impl BatchSink {
    pub fn new(ctx: Arc<SessionContext>, frames: Vec<Frame>) -> Self {
        Self {
            ctx,
            frames,
            arrivals: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ResultSink for BatchSink {
    async fn on_result(&self, result: DetectionResult) -> Result<()> {
        let arrival = self.arrivals.fetch_add(1, Ordering::AcqRel);
        let index = result
            .frame_number
            .map(|n| n as usize)
            .unwrap_or(arrival);
        let frame = self
            .frames
            .get(index)
            .ok_or_else(|| anyhow!("result {} refers to unknown file #{index}", result.result_id))?;
        self.ctx.publish(frame, result);
        Ok(())
    }

    fn on_job_update(&self, job: &JobHandle) {
        self.ctx.record_job(job);
    }
}

/// Seeks the local decoder to each result's timestamp and captures the frame
/// shown there.
pub(crate) struct VideoSink {
    ctx: Arc<SessionContext>,
    decoder: Arc<Mutex<Box<dyn VideoDecoder>>>,
}

impl VideoSink {
    pub fn new(ctx: Arc<SessionContext>, decoder: Arc<Mutex<Box<dyn VideoDecoder>>>) -> Self {
        Self { ctx, decoder }
    }
}

#[async_trait]
impl ResultSink for VideoSink {
    async fn on_result(&self, mut result: DetectionResult) -> Result<()> {
        let frame = match (result.timestamp_ms, result.source_frame.take()) {
            (Some(timestamp_ms), _) => self.decoder.lock().await.seek(timestamp_ms).await?,
            (None, Some(frame)) => frame,
            (None, None) => {
                return Err(anyhow!(
                    "result {} has neither a timestamp nor a frame",
                    result.result_id
                ))
            }
        };
        self.ctx.publish(&frame, result);
        Ok(())
    }

    fn on_job_update(&self, job: &JobHandle) {
        self.ctx.record_job(job);
    }
}

/// Network streams are decoded server-side, so every result must carry its
/// own frame.
pub(crate) struct StreamSink {
    ctx: Arc<SessionContext>,
}

impl StreamSink {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ResultSink for StreamSink {
    async fn on_result(&self, mut result: DetectionResult) -> Result<()> {
        let frame = result
            .source_frame
            .take()
            .ok_or_else(|| anyhow!("stream result {} carries no frame", result.result_id))?;
        self.ctx.publish(&frame, result);
        Ok(())
    }

    fn on_job_update(&self, job: &JobHandle) {
        self.ctx.record_job(job);
    }
}
