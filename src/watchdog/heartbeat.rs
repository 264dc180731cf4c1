use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::WatchdogConfig;

use super::ActivityClock;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

/// The session a [`Watchdog`] guards.
#[async_trait]
pub trait WatchdogTarget: Send + Sync {
    fn session_id(&self) -> String;

    async fn heartbeat(&self) -> Result<()>;

    /// The session has been idle past the threshold; `grace` remains.
    fn inactivity_warning(&self, idle: Duration, grace: Duration);

    fn activity_resumed(&self) {}

    /// Grace elapsed without activity. Called at most once per watchdog and
    /// must not block on the watchdog itself.
    fn expire(&self);
}

/// Heartbeat and inactivity loops for one session.
pub struct Watchdog {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Watchdog {
    pub fn spawn(
        config: WatchdogConfig,
        clock: Arc<ActivityClock>,
        target: Arc<dyn WatchdogTarget>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let heartbeat = tokio::spawn(heartbeat_loop(
            config.heartbeat_interval,
            Arc::clone(&target),
            cancel.clone(),
        ));
        let inactivity = tokio::spawn(inactivity_loop(config, clock, target, cancel.clone()));

        Self {
            cancel,
            handles: vec![heartbeat, inactivity],
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && self.handles.iter().any(|h| !h.is_finished())
    }

    /// Cancel both loops. Heartbeats already in flight are left to resolve
    /// on their own and only log their outcome.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fires immediately, then every `interval`.
async fn heartbeat_loop(
    interval: Duration,
    target: Arc<dyn WatchdogTarget>,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let target = Arc::clone(&target);
                tokio::spawn(async move {
                    match target.heartbeat().await {
                        Ok(()) => log_debug!("Heartbeat sent for session {}", target.session_id()),
                        Err(err) => log_warn!(
                            "Heartbeat failed for session {}: {err:?}",
                            target.session_id()
                        ),
                    }
                });
            }
        }
    }
}

async fn inactivity_loop(
    config: WatchdogConfig,
    clock: Arc<ActivityClock>,
    target: Arc<dyn WatchdogTarget>,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(
        Instant::now() + config.check_interval,
        config.check_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Set while the grace timer is armed: (deadline, activity seen when armed).
    let mut armed: Option<(Instant, Instant)> = None;

    loop {
        let deadline = armed
            .map(|(deadline, _)| deadline)
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE);

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = clock.touched(), if armed.is_some() => {
                armed = None;
                log_info!("Activity resumed in session {}", target.session_id());
                target.activity_resumed();
            }
            _ = time::sleep_until(deadline), if armed.is_some() => {
                if let Some((_, seen)) = armed {
                    if clock.last_activity() > seen {
                        armed = None;
                        target.activity_resumed();
                        continue;
                    }
                }
                log_warn!(
                    "Session {} idle past grace period; stopping",
                    target.session_id()
                );
                target.expire();
                break;
            }
            _ = ticker.tick() => {
                match armed {
                    Some((_, seen)) => {
                        if clock.last_activity() > seen {
                            armed = None;
                            target.activity_resumed();
                        }
                    }
                    None => {
                        let idle = clock.idle_for();
                        if idle >= config.inactivity_threshold {
                            log_warn!(
                                "Session {} idle for {:?}; auto-stop in {:?}",
                                target.session_id(),
                                idle,
                                config.grace_period
                            );
                            target.inactivity_warning(idle, config.grace_period);
                            armed = Some((Instant::now() + config.grace_period, clock.last_activity()));
                        }
                    }
                }
            }
        }
    }
}
