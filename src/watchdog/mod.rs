//! Keepalive and idle detection for server-tracked manual sessions.

mod activity;
mod heartbeat;

pub use activity::ActivityClock;
pub use heartbeat::{Watchdog, WatchdogTarget};
