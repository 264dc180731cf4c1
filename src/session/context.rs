use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use image::RgbaImage;
use tokio_util::sync::CancellationToken;

use crate::gallery::{GalleryEntry, GalleryStore};
use crate::inference::{InferenceParams, InferenceService};
use crate::models::{DetectionResult, Frame, JobHandle, RemoteStatus, SourceType};
use crate::render::{annotate_frame, DrawOptions};

use super::{DetectionStats, EngineEvent, EventSink, GalleryOrder};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by one session's background tasks.
///
/// `live` is cancelled the moment teardown begins. Every gallery or preview
/// mutation checks it first so late results from a stopped session are
/// dropped instead of rendered.
pub(crate) struct SessionContext {
    pub session_id: String,
    pub source_type: SourceType,
    pub live: CancellationToken,
    pub service: Arc<dyn InferenceService>,
    pub params: InferenceParams,
    pub request_timeout: Duration,
    pub order: GalleryOrder,
    gallery: Arc<GalleryStore>,
    events: Arc<dyn EventSink>,
    draw: DrawOptions,
    published: Mutex<HashSet<String>>,
    stats: Mutex<DetectionStats>,
    results_count: AtomicU64,
    remote_status: Mutex<Option<RemoteStatus>>,
    last_activity_at: Mutex<DateTime<Utc>>,
    preview: Mutex<Option<Arc<RgbaImage>>>,
    latest_frame: Mutex<Option<Frame>>,
}

pub(crate) struct ContextParts {
    pub session_id: String,
    pub source_type: SourceType,
    pub service: Arc<dyn InferenceService>,
    pub params: InferenceParams,
    pub request_timeout: Duration,
    pub order: GalleryOrder,
    pub gallery: Arc<GalleryStore>,
    pub events: Arc<dyn EventSink>,
    pub draw: DrawOptions,
}

impl SessionContext {
    pub fn new(parts: ContextParts) -> Self {
        Self {
            session_id: parts.session_id,
            source_type: parts.source_type,
            live: CancellationToken::new(),
            service: parts.service,
            params: parts.params,
            request_timeout: parts.request_timeout,
            order: parts.order,
            gallery: parts.gallery,
            events: parts.events,
            draw: parts.draw,
            published: Mutex::new(HashSet::new()),
            stats: Mutex::new(DetectionStats::default()),
            results_count: AtomicU64::new(0),
            remote_status: Mutex::new(None),
            last_activity_at: Mutex::new(Utc::now()),
            preview: Mutex::new(None),
            latest_frame: Mutex::new(None),
        }
    }

    pub fn is_live(&self) -> bool {
        !self.live.is_cancelled()
    }

    pub fn emit(&self, event: EngineEvent) {
        self.events.emit(event);
    }

    /// Render `result` over `frame` and add it to the gallery in this
    /// session's order. Returns `None` when the session has ended or the
    /// result was already published.
    pub fn publish(&self, frame: &Frame, result: DetectionResult) -> Option<GalleryEntry> {
        self.publish_with(frame, result, self.order)
    }

    pub fn publish_with(
        &self,
        frame: &Frame,
        result: DetectionResult,
        order: GalleryOrder,
    ) -> Option<GalleryEntry> {
        if !self.is_live() {
            log_debug!("Dropping result {} from ended session", result.result_id);
            return None;
        }
        if !lock(&self.published).insert(result.result_id.clone()) {
            log_debug!("Result {} already in gallery", result.result_id);
            return None;
        }

        let visible = result.filtered(self.params.confidence_threshold, &self.params.class_filter);
        let annotated = annotate_frame(frame, &visible, &self.draw);

        // Rendering is synchronous; re-check in case teardown raced it.
        if !self.is_live() {
            return None;
        }

        let entry = GalleryEntry {
            original_image: Arc::clone(&frame.image),
            annotated_image: Arc::new(annotated),
            file_name: frame
                .file_name
                .clone()
                .unwrap_or_else(|| self.default_file_name(&result)),
            timestamp: self.source_type.is_live().then_some(frame.captured_at),
            detection_result: result,
        };

        let gallery = match order {
            GalleryOrder::Append => self.gallery.add(entry.clone()),
            GalleryOrder::Prepend => self.gallery.prepend(entry.clone()),
        };
        let stats = {
            let mut stats = lock(&self.stats);
            stats.record(&visible);
            stats.clone()
        };
        self.results_count.fetch_add(1, Ordering::AcqRel);

        self.emit(EngineEvent::GalleryUpdate { gallery });
        self.emit(EngineEvent::StatsUpdate { stats });
        Some(entry)
    }

    /// Overlay for the live view; never touches the gallery.
    pub fn show_preview(&self, frame: &Frame, result: Option<&DetectionResult>) {
        if !self.is_live() {
            return;
        }
        let (image, detections) = match result {
            Some(result) => {
                let visible =
                    result.filtered(self.params.confidence_threshold, &self.params.class_filter);
                let count = visible.detection_count();
                (Arc::new(annotate_frame(frame, &visible, &self.draw)), count)
            }
            None => (Arc::clone(&frame.image), 0),
        };
        *lock(&self.preview) = Some(image);
        self.emit(EngineEvent::PreviewUpdate {
            session_id: self.session_id.clone(),
            detections,
        });
    }

    pub fn preview(&self) -> Option<Arc<RgbaImage>> {
        lock(&self.preview).clone()
    }

    pub fn set_latest_frame(&self, frame: Frame) {
        if self.is_live() {
            *lock(&self.latest_frame) = Some(frame);
        }
    }

    pub fn latest_frame(&self) -> Option<Frame> {
        lock(&self.latest_frame).clone()
    }

    pub fn record_job(&self, job: &JobHandle) {
        *lock(&self.remote_status) = Some(job.status);
        if self.is_live() {
            self.emit(EngineEvent::JobUpdate { job: job.clone() });
        }
    }

    pub fn remote_status(&self) -> Option<RemoteStatus> {
        *lock(&self.remote_status)
    }

    pub fn touch(&self) {
        *lock(&self.last_activity_at) = Utc::now();
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        *lock(&self.last_activity_at)
    }

    pub fn results_count(&self) -> u64 {
        self.results_count.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> DetectionStats {
        lock(&self.stats).clone()
    }

    fn default_file_name(&self, result: &DetectionResult) -> String {
        match result.frame_number {
            Some(number) => format!("{}_frame_{:06}.png", self.source_type.as_str(), number),
            None => format!("{}_{}.png", self.source_type.as_str(), result.result_id),
        }
    }
}
