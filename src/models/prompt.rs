use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PromptMode {
    #[default]
    None,
    Text,
    Point,
    Box,
}

/// User-supplied hint for prompt-conditioned models. Coordinates are in
/// source-image pixels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Prompt {
    Text { text: String },
    /// `positive = false` marks a background point.
    Point { x: f32, y: f32, positive: bool },
    Box { x1: f32, y1: f32, x2: f32, y2: f32 },
}

impl Prompt {
    pub fn mode(&self) -> PromptMode {
        match self {
            Prompt::Text { .. } => PromptMode::Text,
            Prompt::Point { .. } => PromptMode::Point,
            Prompt::Box { .. } => PromptMode::Box,
        }
    }
}
