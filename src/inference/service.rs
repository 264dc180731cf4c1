use std::{collections::BTreeSet, path::Path};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{DetectionResult, Frame, JobHandle, LatestFrame, Prompt};

/// Per-request inference parameters, derived from the session's settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceParams {
    pub model_id: String,
    pub confidence_threshold: f32,
    pub class_filter: BTreeSet<String>,
    pub frame_skip: u32,
    pub prompts: Vec<Prompt>,
}

/// Remote inference/job service. Its scheduling is opaque to the engine.
///
/// `start_*_job` methods create finite or continuous jobs whose results are
/// fetched incrementally with `get_results`; `start_*_session` methods
/// create server-tracked manual sessions kept alive with `send_heartbeat`.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Single image, one round trip, nothing tracked server-side.
    async fn start_single(&self, frame: &Frame, params: &InferenceParams)
        -> Result<DetectionResult>;

    async fn start_batch(&self, frames: &[Frame], params: &InferenceParams) -> Result<JobHandle>;

    async fn start_video_job(&self, video: &Path, params: &InferenceParams) -> Result<JobHandle>;

    async fn start_video_session(&self, params: &InferenceParams) -> Result<JobHandle>;

    async fn start_webcam_job(&self, params: &InferenceParams) -> Result<JobHandle>;

    async fn start_webcam_session(&self, params: &InferenceParams) -> Result<JobHandle>;

    async fn start_rtsp_job(&self, url: &str, params: &InferenceParams) -> Result<JobHandle>;

    async fn start_rtsp_session(&self, url: &str, params: &InferenceParams) -> Result<JobHandle>;

    async fn get_status(&self, id: &str) -> Result<JobHandle>;

    /// Ordered page `[skip, skip + limit)` of a job's results.
    async fn get_results(&self, id: &str, skip: u64, limit: u64) -> Result<Vec<DetectionResult>>;

    async fn stop(&self, id: &str) -> Result<()>;

    async fn send_heartbeat(&self, id: &str) -> Result<()>;

    /// Detect on one frame and persist the result under `id`.
    async fn capture_frame(
        &self,
        id: &str,
        frame: &Frame,
        params: &InferenceParams,
    ) -> Result<DetectionResult>;

    /// Detect on one frame without persisting anything server-side.
    async fn preview_frame(&self, frame: &Frame, params: &InferenceParams)
        -> Result<DetectionResult>;

    /// Network streams only.
    async fn get_latest_frame(&self, id: &str) -> Result<Option<LatestFrame>>;
}
