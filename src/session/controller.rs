use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use image::RgbaImage;
use tokio::{sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::gallery::{GalleryEntry, GalleryStore};
use crate::inference::{InferenceParams, InferenceService};
use crate::media::{FrameSource, MediaLease, MediaSlot, VideoDecoder};
use crate::models::{
    CaptureMode, CaptureSession, DetectionResult, Frame, JobHandle, Prompt, RemoteStatus,
    SessionStatus, SourceType,
};
use crate::poller::{FramePoller, ResultSink};
use crate::render::DrawOptions;
use crate::settings::InferenceSettings;
use crate::watchdog::{ActivityClock, Watchdog, WatchdogTarget};

use super::context::{ContextParts, SessionContext};
use super::loops::{camera_capture_loop, preview_loop, stream_frame_loop, MediaHandle};
use super::sinks::{BatchSink, StreamSink, VideoSink};
use super::{
    DetectionStats, EndReason, EngineEvent, EventSink, LogEventSink, SourceInput, StartRequest,
    Strategy,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Collaborators shared by every controller an engine creates.
#[derive(Clone)]
pub struct ControllerDeps {
    pub service: Arc<dyn InferenceService>,
    pub gallery: Arc<GalleryStore>,
    pub events: Arc<dyn EventSink>,
    pub config: EngineConfig,
    pub media_slot: MediaSlot,
    pub draw: DrawOptions,
}

impl ControllerDeps {
    pub fn new(service: Arc<dyn InferenceService>, gallery: Arc<GalleryStore>) -> Self {
        Self {
            service,
            gallery,
            events: Arc::new(LogEventSink),
            config: EngineConfig::default(),
            media_slot: MediaSlot::new(),
            draw: DrawOptions::default(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_media_slot(mut self, media_slot: MediaSlot) -> Self {
        self.media_slot = media_slot;
        self
    }
}

/// Media opened for a session, before the remote side knows about it.
enum Prepared {
    Image(Frame),
    Batch(Vec<Frame>),
    Video(Arc<Mutex<Box<dyn VideoDecoder>>>),
    Camera(Arc<Mutex<Box<dyn FrameSource>>>),
    Stream(String),
}

impl Prepared {
    fn media(&self) -> Option<MediaHandle> {
        match self {
            Prepared::Video(decoder) => Some(MediaHandle::Video(Arc::clone(decoder))),
            Prepared::Camera(source) => Some(MediaHandle::Camera(Arc::clone(source))),
            _ => None,
        }
    }
}

enum Remote {
    Single(DetectionResult),
    Job(JobHandle),
}

struct SessionRuntime {
    ctx: Arc<SessionContext>,
    remote_id: Option<String>,
    media: Option<MediaHandle>,
    activity: Option<Arc<ActivityClock>>,
    watchdog: Option<Watchdog>,
    tasks: Vec<JoinHandle<()>>,
    lease: Option<MediaLease>,
}

#[derive(Default)]
struct ControllerState {
    /// Set while `start` acquires media and waits on the remote side.
    /// Cancelling it abandons the start.
    starting: Option<CancellationToken>,
    /// Present from `start` until teardown finishes (`Active` or `Stopping`).
    session: Option<CaptureSession>,
    last_status: SessionStatus,
    runtime: Option<SessionRuntime>,
}

struct ControllerInner {
    source_type: SourceType,
    capture_mode: CaptureMode,
    strategy: Strategy,
    deps: ControllerDeps,
    state: Mutex<ControllerState>,
}

/// Owns the lifecycle of one capture session for a fixed source and mode.
///
/// A controller runs at most one session at a time and can be restarted
/// after it ends. Cloning shares the same session.
#[derive(Clone)]
pub struct CaptureController {
    inner: Arc<ControllerInner>,
}

impl CaptureController {
    pub fn new(
        source_type: SourceType,
        capture_mode: CaptureMode,
        deps: ControllerDeps,
    ) -> CaptureResult<Self> {
        let strategy = Strategy::select(source_type, capture_mode)?;
        Ok(Self {
            inner: Arc::new(ControllerInner {
                source_type,
                capture_mode,
                strategy,
                deps,
                state: Mutex::new(ControllerState::default()),
            }),
        })
    }

    pub fn source_type(&self) -> SourceType {
        self.inner.source_type
    }

    /// Whether both handles drive the same controller.
    pub fn same_as(&self, other: &CaptureController) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.inner.capture_mode
    }

    pub fn strategy(&self) -> Strategy {
        self.inner.strategy
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.inner.state.lock().await;
        state
            .session
            .as_ref()
            .map(|session| session.status)
            .unwrap_or(state.last_status)
    }

    pub async fn is_active(&self) -> bool {
        self.status().await == SessionStatus::Active
    }

    /// Snapshot of the running session, with live counters filled in.
    pub async fn session(&self) -> Option<CaptureSession> {
        let state = self.inner.state.lock().await;
        let mut session = state.session.clone()?;
        if let Some(runtime) = &state.runtime {
            session.results_count = runtime.ctx.results_count();
            session.last_activity_at = runtime.ctx.last_activity_at();
        }
        Some(session)
    }

    pub async fn stats(&self) -> Option<DetectionStats> {
        let state = self.inner.state.lock().await;
        state.runtime.as_ref().map(|runtime| runtime.ctx.stats())
    }

    /// Most recent live-view overlay (manual sessions only).
    pub async fn latest_preview(&self) -> Option<Arc<RgbaImage>> {
        let state = self.inner.state.lock().await;
        state.runtime.as_ref().and_then(|runtime| runtime.ctx.preview())
    }

    /// Validate, acquire media, create the remote session, and start the
    /// strategy's background work. Returns once the session is running; a
    /// single image returns an already-ended session.
    pub async fn start(&self, request: StartRequest) -> CaptureResult<CaptureSession> {
        let outcome = self.try_start(request).await;
        if let Err(err) = &outcome {
            self.report(err);
        }
        outcome
    }

    /// Submit the current frame of a manual session. The result is prepended
    /// to the gallery and counts as user activity.
    pub async fn capture_frame(&self) -> CaptureResult<GalleryEntry> {
        let outcome = self.try_capture().await;
        if let Err(err) = &outcome {
            self.report(err);
        }
        outcome
    }

    /// Tear the session down. Safe at any time and idempotent; a failed
    /// remote stop is logged and local teardown completes regardless.
    pub async fn stop(&self) {
        self.end_session(None, EndReason::Stopped, true).await;
    }

    async fn try_start(&self, request: StartRequest) -> CaptureResult<CaptureSession> {
        let inner = &self.inner;
        let model_id = request
            .model_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CaptureError::precondition("no model selected"))?;
        let source = request
            .source
            .ok_or_else(|| CaptureError::precondition("no source selected"))?;
        if source.source_type() != inner.source_type {
            return Err(CaptureError::precondition(format!(
                "expected a {} source, got {}",
                inner.source_type.as_str(),
                source.source_type().as_str()
            )));
        }
        source.check_ready()?;

        let cancel = {
            let mut state = inner.state.lock().await;
            if state.session.is_some() || state.starting.is_some() {
                return Err(CaptureError::invalid_state("a session is already running"));
            }
            let cancel = CancellationToken::new();
            state.starting = Some(cancel.clone());
            cancel
        };

        let outcome = self
            .bring_up(source, model_id, request.inference, request.prompts, &cancel)
            .await;
        if outcome.is_err() {
            inner.state.lock().await.starting = None;
        }
        outcome
    }

    /// Everything `start` awaits on runs here, outside the state lock, so
    /// `stop` can cancel it.
    async fn bring_up(
        &self,
        source: SourceInput,
        model_id: String,
        inference: InferenceSettings,
        prompts: Vec<Prompt>,
        cancel: &CancellationToken,
    ) -> CaptureResult<CaptureSession> {
        let inner = &self.inner;
        let lease = if inner.strategy.binds_media() {
            Some(inner.deps.media_slot.try_acquire().ok_or_else(|| {
                CaptureError::resource("the media element is bound to another session")
            })?)
        } else {
            None
        };

        let prepared = tokio::select! {
            _ = cancel.cancelled() => return Err(start_cancelled()),
            prepared = self.prepare(source) => prepared?,
        };
        let params = InferenceParams {
            model_id: model_id.clone(),
            confidence_threshold: inference.confidence_threshold,
            class_filter: inference.class_filter.clone(),
            frame_skip: inference.frame_skip,
            prompts: prompts.clone(),
        };

        // Not raced against `cancel`: a handle the service hands back after
        // a stop still has to be stopped.
        let remote = match self.start_remote(&prepared, &params).await {
            Ok(remote) => remote,
            Err(err) => {
                if let Some(media) = prepared.media() {
                    media.release().await;
                }
                drop(lease);
                return Err(CaptureError::TransientNetwork(err));
            }
        };

        let mut state = inner.state.lock().await;
        if cancel.is_cancelled() {
            drop(state);
            if let Some(media) = prepared.media() {
                media.release().await;
            }
            drop(lease);
            if let Remote::Job(job) = remote {
                self.stop_remote(job.id).await;
            }
            log_info!(
                "Start of {} {} session cancelled",
                inner.source_type.as_str(),
                inner.capture_mode.as_str()
            );
            return Err(start_cancelled());
        }
        state.starting = None;

        let session_id = match &remote {
            Remote::Single(_) => Uuid::new_v4().to_string(),
            Remote::Job(job) => job.id.clone(),
        };
        let ctx = Arc::new(SessionContext::new(ContextParts {
            session_id: session_id.clone(),
            source_type: inner.source_type,
            service: Arc::clone(&inner.deps.service),
            params,
            request_timeout: inner.deps.config.request_timeout(),
            order: inner.strategy.gallery_order(),
            gallery: Arc::clone(&inner.deps.gallery),
            events: Arc::clone(&inner.deps.events),
            draw: inner.deps.draw.clone(),
        }));

        let now = Utc::now();
        let mut session = CaptureSession {
            id: session_id,
            source_type: inner.source_type,
            capture_mode: inner.capture_mode,
            status: SessionStatus::Active,
            model_id,
            confidence_threshold: inference.confidence_threshold,
            class_filter: inference.class_filter,
            prompts,
            results_count: 0,
            started_at: now,
            last_activity_at: now,
        };
        log_info!(
            "Started {} {} session {}",
            inner.source_type.as_str(),
            inner.capture_mode.as_str(),
            session.id
        );
        ctx.emit(EngineEvent::SessionStart {
            session: session.clone(),
        });
        ctx.emit(EngineEvent::DetectingChange { detecting: true });

        let job = match remote {
            Remote::Single(result) => {
                if let Prepared::Image(frame) = &prepared {
                    ctx.publish(frame, result);
                }
                session.status = SessionStatus::Ended;
                session.results_count = ctx.results_count();
                state.last_status = SessionStatus::Ended;
                ctx.live.cancel();
                ctx.emit(EngineEvent::DetectingChange { detecting: false });
                ctx.emit(EngineEvent::SessionEnded {
                    session_id: session.id.clone(),
                    reason: EndReason::Completed,
                });
                return Ok(session);
            }
            Remote::Job(job) => job,
        };

        ctx.record_job(&job);
        let runtime = self.launch(prepared, ctx, job.id, lease);
        state.session = Some(session.clone());
        state.last_status = SessionStatus::Active;
        state.runtime = Some(runtime);
        Ok(session)
    }

    async fn prepare(&self, source: SourceInput) -> CaptureResult<Prepared> {
        Ok(match source {
            SourceInput::Image(frame) => Prepared::Image(frame),
            SourceInput::Batch(frames) => Prepared::Batch(frames),
            SourceInput::Video(decoder) => Prepared::Video(Arc::new(Mutex::new(decoder))),
            SourceInput::Webcam(camera) => {
                let stream = camera
                    .open()
                    .await
                    .map_err(|err| CaptureError::resource(format!("camera unavailable: {err:#}")))?;
                Prepared::Camera(Arc::new(Mutex::new(stream)))
            }
            SourceInput::Rtsp(url) => Prepared::Stream(url.trim().to_string()),
        })
    }

    async fn start_remote(
        &self,
        prepared: &Prepared,
        params: &InferenceParams,
    ) -> anyhow::Result<Remote> {
        let service = &self.inner.deps.service;
        let request_timeout = self.inner.deps.config.request_timeout();
        let request = async {
            Ok::<_, anyhow::Error>(match (self.inner.strategy, prepared) {
                (Strategy::SingleShot, Prepared::Image(frame)) => {
                    Remote::Single(service.start_single(frame, params).await?)
                }
                (Strategy::BatchJob, Prepared::Batch(frames)) => {
                    Remote::Job(service.start_batch(frames, params).await?)
                }
                (Strategy::VideoJob, Prepared::Video(decoder)) => {
                    let path = decoder.lock().await.path().to_path_buf();
                    Remote::Job(service.start_video_job(&path, params).await?)
                }
                (Strategy::VideoManual, Prepared::Video(_)) => {
                    Remote::Job(service.start_video_session(params).await?)
                }
                (Strategy::WebcamJob, Prepared::Camera(_)) => {
                    Remote::Job(service.start_webcam_job(params).await?)
                }
                (Strategy::WebcamManual, Prepared::Camera(_)) => {
                    Remote::Job(service.start_webcam_session(params).await?)
                }
                (Strategy::StreamJob, Prepared::Stream(url)) => {
                    Remote::Job(service.start_rtsp_job(url, params).await?)
                }
                (Strategy::StreamManual, Prepared::Stream(url)) => {
                    Remote::Job(service.start_rtsp_session(url, params).await?)
                }
                (strategy, _) => return Err(anyhow!("source does not fit {strategy:?}")),
            })
        };

        time::timeout(request_timeout, request)
            .await
            .map_err(|_| anyhow!("start request timed out after {request_timeout:?}"))?
    }

    fn launch(
        &self,
        prepared: Prepared,
        ctx: Arc<SessionContext>,
        remote_id: String,
        lease: Option<MediaLease>,
    ) -> SessionRuntime {
        let config = &self.inner.deps.config;
        let media = prepared.media();
        let mut runtime = SessionRuntime {
            ctx: Arc::clone(&ctx),
            remote_id: Some(remote_id.clone()),
            media: media.clone(),
            activity: None,
            watchdog: None,
            tasks: Vec::new(),
            lease,
        };

        match (self.inner.strategy, prepared) {
            (Strategy::BatchJob, Prepared::Batch(frames)) => {
                let sink = Arc::new(BatchSink::new(Arc::clone(&ctx), frames));
                runtime.tasks.push(self.spawn_poller(&ctx, &remote_id, sink));
            }
            (Strategy::VideoJob, Prepared::Video(decoder)) => {
                let sink = Arc::new(VideoSink::new(Arc::clone(&ctx), decoder));
                runtime.tasks.push(self.spawn_poller(&ctx, &remote_id, sink));
            }
            (Strategy::StreamJob, _) => {
                let sink = Arc::new(StreamSink::new(Arc::clone(&ctx)));
                runtime.tasks.push(self.spawn_poller(&ctx, &remote_id, sink));
            }
            (Strategy::WebcamJob, _) => {
                if let Some(media) = media {
                    runtime.tasks.push(tokio::spawn(camera_capture_loop(
                        Arc::clone(&ctx),
                        media,
                        remote_id.clone(),
                        config.poll_interval(SourceType::Webcam),
                    )));
                }
            }
            (Strategy::StreamManual, _) => {
                runtime.tasks.push(tokio::spawn(stream_frame_loop(
                    Arc::clone(&ctx),
                    remote_id.clone(),
                    config.rtsp_latest_frame_interval(),
                )));
            }
            (Strategy::VideoManual | Strategy::WebcamManual, _) => {
                if let Some(media) = media {
                    runtime.tasks.push(tokio::spawn(preview_loop(
                        Arc::clone(&ctx),
                        media,
                        config.preview_interval(),
                    )));
                }
            }
            (strategy, _) => log_warn!("Nothing to launch for {strategy:?}"),
        }

        if self.inner.strategy.uses_watchdog() {
            let activity = Arc::new(ActivityClock::new());
            let target: Arc<dyn WatchdogTarget> = Arc::new(SessionWatchdog {
                controller: Arc::downgrade(&self.inner),
                ctx,
                remote_id,
            });
            runtime.watchdog = Some(Watchdog::spawn(
                config.watchdog(),
                Arc::clone(&activity),
                target,
            ));
            runtime.activity = Some(activity);
        }

        runtime
    }

    /// Poll until the job is terminal, then end the session from a separate
    /// task so teardown never aborts the task running it.
    fn spawn_poller(
        &self,
        ctx: &Arc<SessionContext>,
        job_id: &str,
        sink: Arc<dyn ResultSink>,
    ) -> JoinHandle<()> {
        let config = &self.inner.deps.config;
        let poller = FramePoller::new(job_id, Arc::clone(&self.inner.deps.service))
            .with_interval(config.poll_interval(self.inner.source_type))
            .with_request_timeout(config.request_timeout())
            .with_page_limit(config.result_page_limit);
        let ctx = Arc::clone(ctx);
        let controller = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            let cursor = poller.run(sink, ctx.live.clone()).await;
            log_info!(
                "Poller for session {} finished after {} result(s)",
                ctx.session_id,
                cursor.processed_count()
            );
            if !ctx.is_live() {
                return;
            }

            let reason = match ctx.remote_status() {
                Some(RemoteStatus::Completed) => EndReason::Completed,
                Some(RemoteStatus::Cancelled) => EndReason::Stopped,
                _ => EndReason::Failed,
            };
            if let Some(inner) = controller.upgrade() {
                let controller = CaptureController { inner };
                let session_id = ctx.session_id.clone();
                tokio::spawn(async move {
                    controller.end_session(Some(&session_id), reason, false).await;
                });
            }
        })
    }

    async fn try_capture(&self) -> CaptureResult<GalleryEntry> {
        if !self.inner.strategy.is_manual() {
            return Err(CaptureError::invalid_state(
                "frame capture requires a manual session",
            ));
        }

        let (ctx, remote_id, media, activity) = {
            let state = self.inner.state.lock().await;
            match (&state.session, &state.runtime) {
                (Some(session), Some(runtime)) if session.status == SessionStatus::Active => (
                    Arc::clone(&runtime.ctx),
                    runtime.remote_id.clone(),
                    runtime.media.clone(),
                    runtime.activity.clone(),
                ),
                _ => return Err(CaptureError::invalid_state("no active session")),
            }
        };

        if let Some(activity) = activity {
            activity.touch();
        }
        ctx.touch();

        let frame = match media {
            Some(media) => media
                .grab()
                .await
                .map_err(|err| CaptureError::resource(format!("failed to grab frame: {err:#}")))?,
            None => ctx.latest_frame().ok_or_else(|| {
                CaptureError::precondition("no frame has been received from the stream yet")
            })?,
        };
        let remote_id =
            remote_id.ok_or_else(|| CaptureError::invalid_state("session has no remote id"))?;

        let request = ctx.service.capture_frame(&remote_id, &frame, &ctx.params);
        let outcome = tokio::select! {
            _ = ctx.live.cancelled() => {
                return Err(CaptureError::invalid_state("session ended during capture"));
            }
            outcome = time::timeout(ctx.request_timeout, request) => outcome,
        };
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => return Err(CaptureError::TransientNetwork(err)),
            Err(_) => {
                return Err(CaptureError::TransientNetwork(anyhow!(
                    "capture timed out after {:?}",
                    ctx.request_timeout
                )))
            }
        };

        let entry = ctx
            .publish(&frame, result)
            .ok_or_else(|| CaptureError::invalid_state("session ended before the capture was stored"))?;
        ctx.emit(EngineEvent::Flash);
        ctx.emit(EngineEvent::ShutterSound);
        Ok(entry)
    }

    /// Move `Active -> Stopping -> Ended`. `expected_id` guards background
    /// triggers against ending a newer session than the one they watched.
    async fn end_session(&self, expected_id: Option<&str>, reason: EndReason, stop_remote: bool) {
        let runtime = {
            let mut state = self.inner.state.lock().await;
            if expected_id.is_none() {
                if let Some(starting) = &state.starting {
                    log_info!("Cancelling a pending start");
                    starting.cancel();
                }
            }
            let Some(session) = state.session.as_mut() else {
                return;
            };
            if session.status != SessionStatus::Active {
                return;
            }
            if expected_id.is_some_and(|id| id != session.id) {
                return;
            }
            session.status = SessionStatus::Stopping;
            state.last_status = SessionStatus::Stopping;
            state.runtime.take()
        };

        if let Some(runtime) = runtime {
            self.teardown(runtime, stop_remote).await;
        }

        let session_id = {
            let mut state = self.inner.state.lock().await;
            state.last_status = SessionStatus::Ended;
            state.session.take().map(|session| session.id)
        };

        if let Some(session_id) = session_id {
            log_info!("Session {} ended ({:?})", session_id, reason);
            let events = &self.inner.deps.events;
            events.emit(EngineEvent::DetectingChange { detecting: false });
            events.emit(EngineEvent::SessionEnded { session_id, reason });
        }
    }

    async fn teardown(&self, runtime: SessionRuntime, stop_remote: bool) {
        let SessionRuntime {
            ctx,
            remote_id,
            media,
            watchdog,
            tasks,
            lease,
            ..
        } = runtime;

        ctx.live.cancel();
        if let Some(mut watchdog) = watchdog {
            watchdog.stop();
        }
        for task in &tasks {
            task.abort();
        }
        if let Some(media) = media {
            media.release().await;
        }
        drop(lease);

        if let Some(remote_id) = remote_id.filter(|_| stop_remote) {
            self.stop_remote(remote_id).await;
        }
    }

    /// Best-effort remote stop. Failures are logged, never returned.
    async fn stop_remote(&self, remote_id: String) {
        let request_timeout = self.inner.deps.config.request_timeout();
        let outcome = match time::timeout(request_timeout, self.inner.deps.service.stop(&remote_id)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow!("stop timed out after {request_timeout:?}")),
        };
        if let Err(source) = outcome {
            let err = CaptureError::SessionTermination {
                session_id: remote_id,
                source,
            };
            log_warn!("{err:#}");
        }
    }

    fn report(&self, err: &CaptureError) {
        log_error!(
            "{} {} session: {err}",
            self.inner.source_type.as_str(),
            self.inner.capture_mode.as_str()
        );
        self.inner.deps.events.emit(EngineEvent::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
    }
}

fn start_cancelled() -> CaptureError {
    CaptureError::invalid_state("start cancelled by stop")
}

/// Keeps a manual session alive and ends it when the user walks away.
struct SessionWatchdog {
    controller: Weak<ControllerInner>,
    ctx: Arc<SessionContext>,
    remote_id: String,
}

#[async_trait]
impl WatchdogTarget for SessionWatchdog {
    fn session_id(&self) -> String {
        self.ctx.session_id.clone()
    }

    async fn heartbeat(&self) -> anyhow::Result<()> {
        time::timeout(
            self.ctx.request_timeout,
            self.ctx.service.send_heartbeat(&self.remote_id),
        )
        .await
        .map_err(|_| anyhow!("heartbeat timed out after {:?}", self.ctx.request_timeout))?
    }

    fn inactivity_warning(&self, idle: Duration, grace: Duration) {
        self.ctx.emit(EngineEvent::InactivityWarning {
            session_id: self.ctx.session_id.clone(),
            idle_ms: idle.as_millis() as u64,
            grace_ms: grace.as_millis() as u64,
        });
    }

    fn expire(&self) {
        let Some(inner) = self.controller.upgrade() else {
            return;
        };
        let controller = CaptureController { inner };
        let session_id = self.ctx.session_id.clone();
        tokio::spawn(async move {
            controller
                .end_session(Some(&session_id), EndReason::Inactivity, true)
                .await;
        });
    }
}
