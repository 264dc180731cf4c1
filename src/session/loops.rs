//! Background loops owned by a running session. Each exits as soon as the
//! session's `live` token is cancelled, including mid-request.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};

use crate::media::{FrameSource, VideoDecoder};
use crate::models::Frame;

use super::context::SessionContext;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// The local device a session reads frames from.
#[derive(Clone)]
pub(crate) enum MediaHandle {
    Camera(Arc<Mutex<Box<dyn FrameSource>>>),
    Video(Arc<Mutex<Box<dyn VideoDecoder>>>),
}

impl MediaHandle {
    pub async fn grab(&self) -> Result<Frame> {
        match self {
            MediaHandle::Camera(source) => source.lock().await.grab().await,
            MediaHandle::Video(decoder) => decoder.lock().await.grab().await,
        }
    }

    pub async fn release(&self) {
        match self {
            MediaHandle::Camera(source) => source.lock().await.release().await,
            MediaHandle::Video(decoder) => decoder.lock().await.release().await,
        }
    }
}

/// Run `request` unless the session ends first. `None` means cancelled.
async fn until_ended<T>(
    ctx: &SessionContext,
    request: impl std::future::Future<Output = Result<T>>,
) -> Option<Result<T>> {
    tokio::select! {
        _ = ctx.live.cancelled() => None,
        outcome = time::timeout(ctx.request_timeout, request) => Some(match outcome {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("request timed out after {:?}", ctx.request_timeout)),
        }),
    }
}

fn ticker(interval: Duration) -> time::Interval {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Live detections over the local view in manual mode. Nothing is persisted.
pub(crate) async fn preview_loop(ctx: Arc<SessionContext>, media: MediaHandle, interval: Duration) {
    let mut ticker = ticker(interval);
    log_info!("Preview loop started for session {}", ctx.session_id);

    loop {
        tokio::select! {
            _ = ctx.live.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let frame = match media.grab().await {
            Ok(frame) => frame,
            Err(err) => {
                log_warn!("Preview grab failed in session {}: {err:?}", ctx.session_id);
                continue;
            }
        };

        match until_ended(&ctx, ctx.service.preview_frame(&frame, &ctx.params)).await {
            None => break,
            Some(Ok(result)) => ctx.show_preview(&frame, Some(&result)),
            Some(Err(err)) => log_debug!("Preview failed in session {}: {err:?}", ctx.session_id),
        }
    }

    log_info!("Preview loop stopped for session {}", ctx.session_id);
}

/// Pull the newest server-decoded frame of a network stream so manual
/// captures have something to submit.
pub(crate) async fn stream_frame_loop(
    ctx: Arc<SessionContext>,
    remote_id: String,
    interval: Duration,
) {
    let mut ticker = ticker(interval);

    loop {
        tokio::select! {
            _ = ctx.live.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match until_ended(&ctx, ctx.service.get_latest_frame(&remote_id)).await {
            None => break,
            Some(Ok(Some(latest))) => {
                ctx.set_latest_frame(latest.frame.clone());
                ctx.show_preview(&latest.frame, latest.predictions.as_ref());
            }
            Some(Ok(None)) => log_debug!("Stream {} has no frame yet", remote_id),
            Some(Err(err)) => log_warn!("Latest frame fetch failed for {}: {err:?}", remote_id),
        }
    }
}

/// Continuous camera capture: grab on every tick, submit one frame in
/// `frame_skip + 1`, and publish each result as it returns.
pub(crate) async fn camera_capture_loop(
    ctx: Arc<SessionContext>,
    media: MediaHandle,
    job_id: String,
    interval: Duration,
) {
    let mut ticker = ticker(interval);
    let stride = u64::from(ctx.params.frame_skip) + 1;
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            _ = ctx.live.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tick += 1;
        if (tick - 1) % stride != 0 {
            continue;
        }

        let frame = match media.grab().await {
            Ok(frame) => frame,
            Err(err) => {
                log_warn!("Camera grab failed for job {}: {err:?}", job_id);
                continue;
            }
        };

        match until_ended(&ctx, ctx.service.capture_frame(&job_id, &frame, &ctx.params)).await {
            None => break,
            Some(Ok(result)) => {
                ctx.publish(&frame, result);
            }
            Some(Err(err)) => log_warn!("Capture failed for job {}: {err:?}", job_id),
        }
    }

    log_info!("Camera capture loop stopped for job {}", job_id);
}
