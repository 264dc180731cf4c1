use std::collections::HashSet;

/// Progress through one job's growing result set. Scoped to one polling
/// loop and discarded when it stops.
#[derive(Debug, Default, Clone)]
pub struct PollCursor {
    last_fetched_count: u64,
    processed_result_ids: HashSet<String>,
}

impl PollCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_fetched_count(&self) -> u64 {
        self.last_fetched_count
    }

    /// Never moves backwards.
    pub fn advance_to(&mut self, count: u64) {
        self.last_fetched_count = self.last_fetched_count.max(count);
    }

    /// `true` the first time `result_id` is seen.
    pub fn mark_processed(&mut self, result_id: &str) -> bool {
        if self.processed_result_ids.contains(result_id) {
            return false;
        }
        self.processed_result_ids.insert(result_id.to_string());
        true
    }

    pub fn is_processed(&self, result_id: &str) -> bool {
        self.processed_result_ids.contains(result_id)
    }

    pub fn processed_count(&self) -> usize {
        self.processed_result_ids.len()
    }
}
