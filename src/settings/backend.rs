use anyhow::Result;
use async_trait::async_trait;

use super::{InferenceSettings, ModelSettings, PromptSettings};

/// One group of settings to persist for a model.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsPatch {
    Inference(InferenceSettings),
    Prompts(PromptSettings),
}

/// Durable key-value store keyed by model identifier.
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    async fn load(&self, model_id: &str) -> Result<Option<ModelSettings>>;

    async fn save(&self, model_id: &str, patch: SettingsPatch) -> Result<()>;

    async fn last_selected_model(&self) -> Result<Option<String>>;

    async fn set_last_selected_model(&self, model_id: Option<&str>) -> Result<()>;
}
