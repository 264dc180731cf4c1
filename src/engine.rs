use std::{fs, path::Path, sync::Arc};

use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{CaptureError, CaptureResult};
use crate::gallery::{GalleryEntry, GalleryStore};
use crate::inference::InferenceService;
use crate::media::MediaSlot;
use crate::models::{CaptureMode, SourceType};
use crate::session::{
    CaptureController, ControllerDeps, EventSink, SourceInput, StartRequest,
};
use crate::settings::{SettingsBackend, SettingsStore};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const CONFIG_FILE_NAME: &str = "capture-engine.json";
pub const SETTINGS_DB_NAME: &str = "capture-settings.sqlite3";

/// Host-facing entry point: one gallery, one settings store, and at most
/// one running controller.
pub struct CaptureEngine {
    deps: ControllerDeps,
    settings: Arc<SettingsStore>,
    active: Mutex<Option<CaptureController>>,
}

impl CaptureEngine {
    /// Load `capture-engine.json` and open the settings database under
    /// `data_dir`, creating the directory if needed.
    pub async fn open(
        data_dir: &Path,
        service: Arc<dyn InferenceService>,
        events: Arc<dyn EventSink>,
    ) -> CaptureResult<Self> {
        fs::create_dir_all(data_dir).map_err(|err| CaptureError::Persistence(err.into()))?;
        let config =
            EngineConfig::load(&data_dir.join(CONFIG_FILE_NAME)).map_err(CaptureError::Persistence)?;
        let database =
            Database::new(data_dir.join(SETTINGS_DB_NAME)).map_err(CaptureError::Persistence)?;
        log_info!("Settings database at {}", database.path().display());

        Self::with_backend(config, service, events, Arc::new(database)).await
    }

    pub async fn with_backend(
        config: EngineConfig,
        service: Arc<dyn InferenceService>,
        events: Arc<dyn EventSink>,
        backend: Arc<dyn SettingsBackend>,
    ) -> CaptureResult<Self> {
        let settings = SettingsStore::open(backend, config.settings_debounce()).await?;
        let deps = ControllerDeps::new(service, Arc::new(GalleryStore::new()))
            .with_events(events)
            .with_config(config);

        Ok(Self {
            deps,
            settings: Arc::new(settings),
            active: Mutex::new(None),
        })
    }

    pub fn gallery(&self) -> &Arc<GalleryStore> {
        &self.deps.gallery
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn config(&self) -> &EngineConfig {
        &self.deps.config
    }

    pub fn media_slot(&self) -> &MediaSlot {
        &self.deps.media_slot
    }

    /// A detached controller sharing this engine's gallery, events and media
    /// slot. It is not tracked as the active controller.
    pub fn controller(
        &self,
        source_type: SourceType,
        capture_mode: CaptureMode,
    ) -> CaptureResult<CaptureController> {
        CaptureController::new(source_type, capture_mode, self.deps.clone())
    }

    pub async fn active(&self) -> Option<CaptureController> {
        self.active.lock().await.clone()
    }

    /// Stop whatever is running, then start `source` with the active model's
    /// settings. The new controller is tracked before it starts, so `stop`
    /// can cancel a start that is still waiting on media or the service.
    pub async fn start(
        &self,
        capture_mode: CaptureMode,
        source: SourceInput,
    ) -> CaptureResult<CaptureController> {
        let controller = self.controller(source.source_type(), capture_mode)?;

        let previous = self.active.lock().await.replace(controller.clone());
        if let Some(previous) = previous {
            previous.stop().await;
        }

        let request = self.request_for(source).await;
        let outcome = controller.start(request).await;

        let mut active = self.active.lock().await;
        let still_tracked = active
            .as_ref()
            .is_some_and(|current| current.same_as(&controller));
        match outcome {
            Ok(_) if still_tracked => Ok(controller),
            Ok(_) => {
                drop(active);
                log_info!("Capture start was superseded; stopping it");
                controller.stop().await;
                Err(CaptureError::invalid_state("start superseded by stop"))
            }
            Err(err) => {
                if still_tracked {
                    *active = None;
                }
                Err(err)
            }
        }
    }

    pub async fn capture_frame(&self) -> CaptureResult<GalleryEntry> {
        let controller = self
            .active()
            .await
            .ok_or_else(|| CaptureError::invalid_state("no capture session"))?;
        controller.capture_frame().await
    }

    pub async fn stop(&self) {
        let controller = self.active.lock().await.take();
        if let Some(controller) = controller {
            controller.stop().await;
        }
    }

    /// Stop the active session and write any pending settings.
    pub async fn shutdown(&self) {
        self.stop().await;
        if let Err(err) = self.settings.flush().await {
            log_warn!("Failed to flush settings on shutdown: {err}");
        }
    }

    async fn request_for(&self, source: SourceInput) -> StartRequest {
        let mut request = StartRequest::new(source)
            .with_inference(self.settings.inference().await)
            .with_prompts(self.settings.prompts().await.prompts);
        request.model_id = self.settings.active_model().await;
        request
    }
}
