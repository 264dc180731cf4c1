use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Frame;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TaskType {
    #[default]
    Detect,
    Classify,
    Segment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaskInstance {
    pub polygon: Vec<[f32; 2]>,
    pub class_id: u32,
    pub class_name: String,
    pub score: f32,
}

impl MaskInstance {
    /// Axis-aligned bounds of the polygon as `[x1, y1, x2, y2]`.
    pub fn bounding_box(&self) -> Option<[f32; 4]> {
        let first = self.polygon.first()?;
        let mut bounds = [first[0], first[1], first[0], first[1]];
        for [x, y] in self.polygon.iter().skip(1) {
            bounds[0] = bounds[0].min(*x);
            bounds[1] = bounds[1].min(*y);
            bounds[2] = bounds[2].max(*x);
            bounds[3] = bounds[3].max(*y);
        }
        Some(bounds)
    }
}

/// One inference result. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// Unique within a session.
    pub result_id: String,
    #[serde(default)]
    pub frame_number: Option<u64>,
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
    /// `[x1, y1, x2, y2]` in source pixels.
    #[serde(default)]
    pub boxes: Vec<[f32; 4]>,
    #[serde(default)]
    pub scores: Vec<f32>,
    #[serde(default)]
    pub class_names: Vec<String>,
    #[serde(default)]
    pub masks: Vec<MaskInstance>,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub top_class: Option<String>,
    #[serde(default)]
    pub top_confidence: Option<f32>,
    /// Resolution the coordinates were computed against, when it differs
    /// from the frame the result is drawn on.
    #[serde(default)]
    pub source_size: Option<(u32, u32)>,
    /// Frame supplied by the backend (network streams, where the client
    /// never decodes the source itself).
    #[serde(skip)]
    pub source_frame: Option<Frame>,
}

impl DetectionResult {
    pub fn new(result_id: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            result_id: result_id.into(),
            frame_number: None,
            timestamp_ms: None,
            boxes: Vec::new(),
            scores: Vec::new(),
            class_names: Vec::new(),
            masks: Vec::new(),
            task_type,
            top_class: None,
            top_confidence: None,
            source_size: None,
            source_frame: None,
        }
    }

    /// Number of labelled instances (boxes, masks, or the single top class).
    pub fn detection_count(&self) -> usize {
        match self.task_type {
            TaskType::Detect => self.boxes.len(),
            TaskType::Segment => self.masks.len(),
            TaskType::Classify => usize::from(self.top_class.is_some()),
        }
    }

    /// Class names of every labelled instance, in draw order.
    pub fn instance_classes(&self) -> Vec<&str> {
        match self.task_type {
            TaskType::Detect => self.class_names.iter().map(String::as_str).collect(),
            TaskType::Segment => self.masks.iter().map(|m| m.class_name.as_str()).collect(),
            TaskType::Classify => self.top_class.iter().map(String::as_str).collect(),
        }
    }

    /// Drop instances below `min_confidence` or outside `class_filter`.
    /// An empty filter admits every class.
    pub fn filtered(&self, min_confidence: f32, class_filter: &BTreeSet<String>) -> Self {
        let admits = |class_name: &str, score: f32| {
            score >= min_confidence
                && (class_filter.is_empty() || class_filter.contains(class_name))
        };

        let mut out = self.clone();
        out.boxes.clear();
        out.scores.clear();
        out.class_names.clear();

        let rows = self
            .boxes
            .len()
            .min(self.scores.len())
            .min(self.class_names.len());
        for i in 0..rows {
            if admits(&self.class_names[i], self.scores[i]) {
                out.boxes.push(self.boxes[i]);
                out.scores.push(self.scores[i]);
                out.class_names.push(self.class_names[i].clone());
            }
        }

        out.masks = self
            .masks
            .iter()
            .filter(|mask| admits(&mask.class_name, mask.score))
            .cloned()
            .collect();

        if let (Some(class), Some(confidence)) = (&self.top_class, self.top_confidence) {
            if !admits(class, confidence) {
                out.top_class = None;
                out.top_confidence = None;
            }
        }

        out
    }
}
