use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Monotonic record of the last user activity in a session.
///
/// Shared between the controller (which touches it on capture) and the
/// inactivity loop; concurrent touches can only move it forward.
#[derive(Debug)]
pub struct ActivityClock {
    origin: Instant,
    last_activity_ms: AtomicU64,
    touched: Notify,
}

impl ActivityClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            touched: Notify::new(),
        }
    }

    pub fn touch(&self) {
        let now = self.origin.elapsed().as_millis() as u64;
        self.last_activity_ms.fetch_max(now, Ordering::AcqRel);
        self.touched.notify_waiters();
    }

    pub fn last_activity(&self) -> Instant {
        self.origin + Duration::from_millis(self.last_activity_ms.load(Ordering::Acquire))
    }

    pub fn idle_for(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_activity())
    }

    /// Resolves on the next `touch`.
    pub async fn touched(&self) {
        self.touched.notified().await;
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}
