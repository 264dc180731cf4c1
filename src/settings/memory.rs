use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ModelSettings, SettingsBackend, SettingsPatch};

#[derive(Default)]
struct MemoryState {
    models: HashMap<String, ModelSettings>,
    last_model: Option<String>,
    writes: Vec<(String, SettingsPatch)>,
}

/// Process-local backend; keeps a log of every write it received.
#[derive(Default)]
pub struct MemorySettingsBackend {
    state: Mutex<MemoryState>,
}

impl MemorySettingsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `save` call so far, oldest first.
    pub async fn writes(&self) -> Vec<(String, SettingsPatch)> {
        self.state.lock().await.writes.clone()
    }

    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes.len()
    }
}

#[async_trait]
impl SettingsBackend for MemorySettingsBackend {
    async fn load(&self, model_id: &str) -> Result<Option<ModelSettings>> {
        Ok(self.state.lock().await.models.get(model_id).cloned())
    }

    async fn save(&self, model_id: &str, patch: SettingsPatch) -> Result<()> {
        let mut state = self.state.lock().await;
        let entry = state.models.entry(model_id.to_string()).or_default();
        match &patch {
            SettingsPatch::Inference(inference) => entry.inference = inference.clone(),
            SettingsPatch::Prompts(prompts) => entry.prompts = prompts.clone(),
        }
        state.writes.push((model_id.to_string(), patch));
        Ok(())
    }

    async fn last_selected_model(&self) -> Result<Option<String>> {
        Ok(self.state.lock().await.last_model.clone())
    }

    async fn set_last_selected_model(&self, model_id: Option<&str>) -> Result<()> {
        self.state.lock().await.last_model = model_id.map(String::from);
        Ok(())
    }
}
