use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::DetectionResult;

/// Running totals for one session's gallery-bound results.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStats {
    pub frames_processed: u64,
    pub total_detections: u64,
    pub class_counts: BTreeMap<String, u64>,
    pub last_inference_at: Option<DateTime<Utc>>,
}

impl DetectionStats {
    pub fn record(&mut self, result: &DetectionResult) {
        self.frames_processed += 1;
        for class in result.instance_classes() {
            self.total_detections += 1;
            *self.class_counts.entry(class.to_string()).or_default() += 1;
        }
        self.last_inference_at = Some(Utc::now());
    }
}
