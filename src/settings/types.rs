use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{Prompt, PromptMode};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Slider-driven values, persisted after a debounce.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct InferenceSettings {
    pub confidence_threshold: f32,
    pub class_filter: BTreeSet<String>,
    /// Frames skipped between submissions in continuous webcam capture.
    pub frame_skip: u32,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            class_filter: BTreeSet::new(),
            frame_skip: 0,
        }
    }
}

/// Discrete prompt edits, persisted immediately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptSettings {
    pub prompt_mode: PromptMode,
    pub prompts: Vec<Prompt>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelSettings {
    pub inference: InferenceSettings,
    pub prompts: PromptSettings,
}
