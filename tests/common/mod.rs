#![allow(dead_code)]

use std::{
    collections::VecDeque,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tokio::sync::mpsc::UnboundedReceiver;

use capture_engine::inference::{InferenceParams, InferenceService};
use capture_engine::media::{CameraProvider, FrameSource};
use capture_engine::models::{
    DetectionResult, Frame, JobHandle, LatestFrame, RemoteStatus, TaskType,
};
use capture_engine::session::{ChannelEventSink, ControllerDeps, EngineEvent};
use capture_engine::GalleryStore;

pub const JOB_ID: &str = "job-1";

pub fn solid_frame(color: [u8; 4]) -> Frame {
    Frame::new(RgbaImage::from_pixel(16, 12, Rgba(color)))
}

pub fn named_frame(name: &str) -> Frame {
    solid_frame([40, 40, 40, 255]).with_file_name(name)
}

pub fn detection(id: &str, frame_number: Option<u64>) -> DetectionResult {
    let mut result = DetectionResult::new(id, TaskType::Detect);
    result.frame_number = frame_number;
    result.boxes = vec![[1.0, 1.0, 8.0, 8.0]];
    result.scores = vec![0.9];
    result.class_names = vec!["car".into()];
    result
}

#[derive(Default)]
struct MockState {
    calls: Vec<String>,
    script: VecDeque<(RemoteStatus, u64)>,
    results: Vec<DetectionResult>,
    page_cap: Option<u64>,
    status_failures: usize,
    result_requests: Vec<(u64, u64)>,
    stops: Vec<String>,
    captures: usize,
    latest: Option<LatestFrame>,
    last_params: Option<InferenceParams>,
}

/// Scriptable in-memory inference service.
///
/// `get_status` walks the script, repeating its last entry; `get_results`
/// slices the configured result list.
#[derive(Default)]
pub struct MockService {
    state: Mutex<MockState>,
    heartbeats: AtomicUsize,
    pub heartbeat_hangs: AtomicBool,
    pub stop_fails: AtomicBool,
    pub start_fails: AtomicBool,
    /// Every `start_*` call waits this long before answering.
    pub start_delay_ms: AtomicU64,
}

impl MockService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: &str) {
        self.state().calls.push(call.to_string());
    }

    pub fn script(&self, steps: &[(RemoteStatus, u64)]) {
        self.state().script = steps.iter().copied().collect();
    }

    pub fn set_results(&self, results: Vec<DetectionResult>) {
        self.state().results = results;
    }

    pub fn set_page_cap(&self, cap: u64) {
        self.state().page_cap = Some(cap);
    }

    pub fn fail_status(&self, times: usize) {
        self.state().status_failures = times;
    }

    pub fn set_latest(&self, latest: Option<LatestFrame>) {
        self.state().latest = latest;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|c| c.as_str() == call).count()
    }

    pub fn result_requests(&self) -> Vec<(u64, u64)> {
        self.state().result_requests.clone()
    }

    pub fn stops(&self) -> Vec<String> {
        self.state().stops.clone()
    }

    pub fn heartbeats(&self) -> usize {
        self.heartbeats.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<InferenceParams> {
        self.state().last_params.clone()
    }

    async fn job(&self, call: &str, params: &InferenceParams) -> Result<JobHandle> {
        self.record(call);
        self.state().last_params = Some(params.clone());
        let delay = self.start_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.start_fails.load(Ordering::SeqCst) {
            bail!("service unavailable");
        }
        Ok(JobHandle {
            id: JOB_ID.into(),
            status: RemoteStatus::Running,
            results_count: 0,
        })
    }
}

#[async_trait]
impl InferenceService for MockService {
    async fn start_single(&self, _frame: &Frame, params: &InferenceParams) -> Result<DetectionResult> {
        self.job("start_single", params).await?;
        Ok(detection("single", None))
    }

    async fn start_batch(&self, _frames: &[Frame], params: &InferenceParams) -> Result<JobHandle> {
        self.job("start_batch", params).await
    }

    async fn start_video_job(&self, _video: &Path, params: &InferenceParams) -> Result<JobHandle> {
        self.job("start_video_job", params).await
    }

    async fn start_video_session(&self, params: &InferenceParams) -> Result<JobHandle> {
        self.job("start_video_session", params).await
    }

    async fn start_webcam_job(&self, params: &InferenceParams) -> Result<JobHandle> {
        self.job("start_webcam_job", params).await
    }

    async fn start_webcam_session(&self, params: &InferenceParams) -> Result<JobHandle> {
        self.job("start_webcam_session", params).await
    }

    async fn start_rtsp_job(&self, _url: &str, params: &InferenceParams) -> Result<JobHandle> {
        self.job("start_rtsp_job", params).await
    }

    async fn start_rtsp_session(&self, _url: &str, params: &InferenceParams) -> Result<JobHandle> {
        self.job("start_rtsp_session", params).await
    }

    async fn get_status(&self, id: &str) -> Result<JobHandle> {
        let mut state = self.state();
        state.calls.push("get_status".into());
        if state.status_failures > 0 {
            state.status_failures -= 1;
            bail!("status request failed");
        }
        let step = if state.script.len() > 1 {
            state.script.pop_front()
        } else {
            state.script.front().copied()
        };
        let (status, results_count) = step.unwrap_or((RemoteStatus::Running, 0));
        Ok(JobHandle {
            id: id.to_string(),
            status,
            results_count,
        })
    }

    async fn get_results(&self, _id: &str, skip: u64, limit: u64) -> Result<Vec<DetectionResult>> {
        let mut state = self.state();
        state.calls.push("get_results".into());
        state.result_requests.push((skip, limit));
        let limit = state.page_cap.map_or(limit, |cap| limit.min(cap));
        let start = (skip as usize).min(state.results.len());
        let end = ((skip + limit) as usize).min(state.results.len());
        Ok(state.results[start..end].to_vec())
    }

    async fn stop(&self, id: &str) -> Result<()> {
        {
            let mut state = self.state();
            state.calls.push("stop".into());
            state.stops.push(id.to_string());
        }
        if self.stop_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("stop rejected"));
        }
        Ok(())
    }

    async fn send_heartbeat(&self, _id: &str) -> Result<()> {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        if self.heartbeat_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn capture_frame(
        &self,
        _id: &str,
        _frame: &Frame,
        params: &InferenceParams,
    ) -> Result<DetectionResult> {
        let mut state = self.state();
        state.calls.push("capture_frame".into());
        state.last_params = Some(params.clone());
        state.captures += 1;
        Ok(detection(&format!("cap-{}", state.captures), None))
    }

    async fn preview_frame(&self, _frame: &Frame, _params: &InferenceParams) -> Result<DetectionResult> {
        self.record("preview_frame");
        Ok(detection("preview", None))
    }

    async fn get_latest_frame(&self, _id: &str) -> Result<Option<LatestFrame>> {
        Ok(self.state().latest.clone())
    }
}

/// Camera that yields solid frames and counts opens and releases.
#[derive(Default)]
pub struct FakeCamera {
    pub deny: AtomicBool,
    /// `open` never resolves, like an unanswered permission prompt.
    pub hang: AtomicBool,
    pub opened: AtomicUsize,
    pub released: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl FrameSource for FakeStream {
    async fn grab(&mut self) -> Result<Frame> {
        Ok(solid_frame([0, 128, 255, 255]))
    }

    async fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CameraProvider for FakeCamera {
    async fn open(&self) -> Result<Box<dyn FrameSource>> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.deny.load(Ordering::SeqCst) {
            bail!("permission denied");
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            released: Arc::clone(&self.released),
        }))
    }
}

pub fn controller_deps(service: &Arc<MockService>) -> (ControllerDeps, UnboundedReceiver<EngineEvent>) {
    let (events, rx) = ChannelEventSink::new();
    let service: Arc<dyn InferenceService> = service.clone();
    let deps = ControllerDeps::new(service, Arc::new(GalleryStore::new())).with_events(Arc::new(events));
    (deps, rx)
}

pub fn drain(rx: &mut UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
