use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::Mutex;

use crate::{
    error::{CaptureError, CaptureResult},
    models::{Prompt, PromptMode},
};

use super::{InferenceSettings, ModelSettings, PromptSettings, SettingsBackend, SettingsPatch};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Default)]
struct StoreState {
    model_id: Option<String>,
    settings: ModelSettings,
}

/// Settings for the active model.
///
/// Inference values (threshold, class filter, frame skip) are written after
/// a quiet period so a slider drag produces one write. Prompt edits are
/// written immediately. With no model selected, edits stay in memory and
/// reads fall back to defaults.
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    debounce: Duration,
    state: Arc<Mutex<StoreState>>,
    /// Bumped on every inference edit and on flush; a scheduled write only
    /// lands if nothing newer has superseded it.
    generation: Arc<AtomicU64>,
    pending_model: Arc<Mutex<Option<String>>>,
}

impl SettingsStore {
    /// Restore the last selected model and its values.
    pub async fn open(backend: Arc<dyn SettingsBackend>, debounce: Duration) -> CaptureResult<Self> {
        let store = Self {
            backend,
            debounce,
            state: Arc::new(Mutex::new(StoreState::default())),
            generation: Arc::new(AtomicU64::new(0)),
            pending_model: Arc::new(Mutex::new(None)),
        };

        let last_model = store
            .backend
            .last_selected_model()
            .await
            .map_err(CaptureError::Persistence)?;
        if let Some(model_id) = last_model {
            let settings = store.load_or_default(&model_id).await?;
            let mut state = store.state.lock().await;
            state.model_id = Some(model_id);
            state.settings = settings;
        }

        Ok(store)
    }

    pub async fn active_model(&self) -> Option<String> {
        self.state.lock().await.model_id.clone()
    }

    pub async fn current(&self) -> ModelSettings {
        self.state.lock().await.settings.clone()
    }

    pub async fn inference(&self) -> InferenceSettings {
        self.state.lock().await.settings.inference.clone()
    }

    pub async fn prompts(&self) -> PromptSettings {
        self.state.lock().await.settings.prompts.clone()
    }

    /// Hot-swap to another model. A pending write for the previous model is
    /// flushed first.
    pub async fn select_model(&self, model_id: Option<String>) -> CaptureResult<ModelSettings> {
        self.flush().await?;

        let settings = match &model_id {
            Some(id) => self.load_or_default(id).await?,
            None => ModelSettings::default(),
        };

        self.backend
            .set_last_selected_model(model_id.as_deref())
            .await
            .map_err(CaptureError::Persistence)?;

        let mut state = self.state.lock().await;
        log_info!("Switched settings to model {:?}", model_id);
        state.model_id = model_id;
        state.settings = settings.clone();
        Ok(settings)
    }

    pub async fn set_confidence_threshold(&self, threshold: f32) {
        let threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            return;
        };
        self.update_inference(|inference| inference.confidence_threshold = threshold)
            .await;
    }

    pub async fn set_class_filter(&self, classes: BTreeSet<String>) {
        self.update_inference(|inference| inference.class_filter = classes)
            .await;
    }

    /// Add `class_name` to the filter, or remove it when already present.
    pub async fn toggle_class(&self, class_name: &str) {
        self.update_inference(|inference| {
            if !inference.class_filter.remove(class_name) {
                inference.class_filter.insert(class_name.to_string());
            }
        })
        .await;
    }

    pub async fn set_frame_skip(&self, frame_skip: u32) {
        self.update_inference(|inference| inference.frame_skip = frame_skip)
            .await;
    }

    pub async fn set_prompt_mode(&self, mode: PromptMode) -> CaptureResult<()> {
        self.update_prompts(|prompts| prompts.prompt_mode = mode).await
    }

    pub async fn set_prompts(&self, prompts: Vec<Prompt>) -> CaptureResult<()> {
        self.update_prompts(|settings| settings.prompts = prompts)
            .await
    }

    pub async fn add_prompt(&self, prompt: Prompt) -> CaptureResult<()> {
        self.update_prompts(|settings| settings.prompts.push(prompt))
            .await
    }

    pub async fn clear_prompts(&self) -> CaptureResult<()> {
        self.update_prompts(|settings| settings.prompts.clear()).await
    }

    /// Write any pending inference edit now.
    pub async fn flush(&self) -> CaptureResult<()> {
        let Some(model_id) = self.pending_model.lock().await.take() else {
            return Ok(());
        };
        self.generation.fetch_add(1, Ordering::SeqCst);

        let inference = {
            let state = self.state.lock().await;
            if state.model_id.as_deref() != Some(model_id.as_str()) {
                return Ok(());
            }
            state.settings.inference.clone()
        };

        self.backend
            .save(&model_id, SettingsPatch::Inference(inference))
            .await
            .map_err(CaptureError::Persistence)
    }

    async fn update_inference<F>(&self, edit: F)
    where
        F: FnOnce(&mut InferenceSettings),
    {
        let model_id = {
            let mut state = self.state.lock().await;
            edit(&mut state.settings.inference);
            state.model_id.clone()
        };

        let Some(model_id) = model_id else {
            return;
        };
        self.schedule_write(model_id).await;
    }

    async fn schedule_write(&self, model_id: String) {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.pending_model.lock().await = Some(model_id.clone());

        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let generation = Arc::clone(&self.generation);
        let pending_model = Arc::clone(&self.pending_model);
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            if generation.load(Ordering::SeqCst) != my_generation {
                log_debug!("Settings write for {} superseded", model_id);
                return;
            }

            let inference = {
                let state = state.lock().await;
                if state.model_id.as_deref() != Some(model_id.as_str()) {
                    return;
                }
                state.settings.inference.clone()
            };
            {
                let mut pending = pending_model.lock().await;
                if generation.load(Ordering::SeqCst) != my_generation {
                    return;
                }
                *pending = None;
            }

            if let Err(err) = backend
                .save(&model_id, SettingsPatch::Inference(inference))
                .await
            {
                log_warn!("Failed to persist settings for {}: {err:?}", model_id);
            }
        });
    }

    async fn update_prompts<F>(&self, edit: F) -> CaptureResult<()>
    where
        F: FnOnce(&mut PromptSettings),
    {
        let (model_id, prompts) = {
            let mut state = self.state.lock().await;
            edit(&mut state.settings.prompts);
            (state.model_id.clone(), state.settings.prompts.clone())
        };

        let Some(model_id) = model_id else {
            return Ok(());
        };

        self.backend
            .save(&model_id, SettingsPatch::Prompts(prompts))
            .await
            .map_err(CaptureError::Persistence)
    }

    async fn load_or_default(&self, model_id: &str) -> CaptureResult<ModelSettings> {
        let loaded = self
            .backend
            .load(model_id)
            .await
            .map_err(CaptureError::Persistence)?;
        Ok(loaded.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsBackend;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    async fn store_with_model() -> (Arc<MemorySettingsBackend>, SettingsStore) {
        let backend = Arc::new(MemorySettingsBackend::new());
        let store = SettingsStore::open(backend.clone(), DEBOUNCE).await.unwrap();
        store.select_model(Some("yolo-n".into())).await.unwrap();
        (backend, store)
    }

    #[tokio::test(start_paused = true)]
    async fn slider_drag_coalesces_into_one_write() {
        let (backend, store) = store_with_model().await;

        for value in [0.3, 0.4, 0.5, 0.6, 0.7] {
            store.set_confidence_threshold(value).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(backend.write_count().await, 0);

        tokio::time::sleep(Duration::from_millis(400)).await;

        let writes = backend.writes().await;
        assert_eq!(writes.len(), 1);
        match &writes[0] {
            (model, SettingsPatch::Inference(inference)) => {
                assert_eq!(model, "yolo-n");
                assert_eq!(inference.confidence_threshold, 0.7);
            }
            other => panic!("unexpected write {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_edits_persist_immediately() {
        let (backend, store) = store_with_model().await;

        store.set_prompt_mode(PromptMode::Text).await.unwrap();
        store
            .add_prompt(Prompt::Text { text: "red car".into() })
            .await
            .unwrap();

        assert_eq!(backend.write_count().await, 2);
        let saved = backend.load("yolo-n").await.unwrap().unwrap();
        assert_eq!(saved.prompts.prompt_mode, PromptMode::Text);
        assert_eq!(saved.prompts.prompts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_models_flushes_and_hot_swaps() {
        let (backend, store) = store_with_model().await;
        store.set_confidence_threshold(0.9).await;

        let loaded = store.select_model(Some("sam".into())).await.unwrap();
        assert_eq!(loaded, ModelSettings::default());
        assert_eq!(
            backend.load("yolo-n").await.unwrap().unwrap().inference.confidence_threshold,
            0.9
        );

        // The superseded timer must not write again.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.write_count().await, 1);

        let back = store.select_model(Some("yolo-n".into())).await.unwrap();
        assert_eq!(back.inference.confidence_threshold, 0.9);
        assert_eq!(
            backend.last_selected_model().await.unwrap().as_deref(),
            Some("yolo-n")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_model_uses_defaults_and_never_writes() {
        let backend = Arc::new(MemorySettingsBackend::new());
        let store = SettingsStore::open(backend.clone(), DEBOUNCE).await.unwrap();

        store.toggle_class("person").await;
        store.clear_prompts().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(backend.write_count().await, 0);
        assert_eq!(store.active_model().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_class_adds_then_removes() {
        let (_backend, store) = store_with_model().await;
        store.toggle_class("dog").await;
        assert!(store.inference().await.class_filter.contains("dog"));
        store.toggle_class("dog").await;
        assert!(store.inference().await.class_filter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn open_restores_last_model() {
        let backend = Arc::new(MemorySettingsBackend::new());
        backend
            .save(
                "rtdetr",
                SettingsPatch::Inference(InferenceSettings {
                    confidence_threshold: 0.55,
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        backend.set_last_selected_model(Some("rtdetr")).await.unwrap();

        let store = SettingsStore::open(backend, DEBOUNCE).await.unwrap();
        assert_eq!(store.active_model().await.as_deref(), Some("rtdetr"));
        assert_eq!(store.inference().await.confidence_threshold, 0.55);
    }
}
