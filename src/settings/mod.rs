//! Per-model inference settings with debounced persistence.

mod backend;
mod memory;
mod store;
mod types;

pub use backend::{SettingsBackend, SettingsPatch};
pub use memory::MemorySettingsBackend;
pub use store::SettingsStore;
pub use types::{InferenceSettings, ModelSettings, PromptSettings};
