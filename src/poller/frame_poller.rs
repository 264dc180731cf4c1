use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::inference::InferenceService;
use crate::models::{DetectionResult, JobHandle};

use super::PollCursor;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Receives the poller's output. Calls arrive sequentially, in result order.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Called exactly once per distinct `result_id`.
    async fn on_result(&self, result: DetectionResult) -> Result<()>;

    fn on_job_update(&self, _job: &JobHandle) {}

    /// The remote job reached a terminal status and the final drain is done.
    async fn on_finished(&self, _job: &JobHandle) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Draining,
    Stopped,
}

/// Incremental, deduplicating fetch loop over a remote job's results.
pub struct FramePoller {
    job_id: String,
    service: Arc<dyn InferenceService>,
    interval: Duration,
    request_timeout: Duration,
    page_limit: u64,
    cursor: PollCursor,
    state: PollerState,
}

impl FramePoller {
    pub fn new(job_id: impl Into<String>, service: Arc<dyn InferenceService>) -> Self {
        Self {
            job_id: job_id.into(),
            service,
            interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            page_limit: 100,
            cursor: PollCursor::new(),
            state: PollerState::Idle,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_page_limit(mut self, page_limit: u64) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn cursor(&self) -> &PollCursor {
        &self.cursor
    }

    /// Poll on the interval until the job is terminal or `cancel` fires.
    /// A failed poll is logged and retried on the next tick.
    pub async fn run(mut self, sink: Arc<dyn ResultSink>, cancel: CancellationToken) -> PollCursor {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.state = PollerState::Polling;
        log_info!("Poller started for job {}", self.job_id);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log_info!("Poller for job {} cancelled", self.job_id);
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = tokio::select! {
                        _ = cancel.cancelled() => break,
                        outcome = self.poll_once(sink.as_ref(), &cancel) => outcome,
                    };

                    match outcome {
                        Ok(job) if job.status.is_terminal() => break,
                        Ok(_) => {}
                        Err(err) => log_warn!("Poll failed for job {}: {err:?}", self.job_id),
                    }
                }
            }
        }

        self.state = PollerState::Stopped;
        self.cursor
    }

    /// One status check plus delta fetch. On a terminal status this is the
    /// final drain and the poller moves to `Stopped`.
    pub async fn poll_once(
        &mut self,
        sink: &dyn ResultSink,
        cancel: &CancellationToken,
    ) -> Result<JobHandle> {
        if self.state == PollerState::Stopped {
            return Err(anyhow!("poller for job {} already stopped", self.job_id));
        }

        let job = self
            .remote("status request", self.service.get_status(&self.job_id))
            .await?;
        sink.on_job_update(&job);

        if job.status.is_terminal() {
            self.state = PollerState::Draining;
            log_info!(
                "Job {} reached {:?}; draining {} remaining result(s)",
                self.job_id,
                job.status,
                job.results_count.saturating_sub(self.cursor.last_fetched_count())
            );
            let drained = self.fetch_delta(job.results_count, sink, cancel).await;
            self.state = PollerState::Stopped;
            if let Err(err) = drained {
                log_warn!("Final drain failed for job {}: {err:?}", self.job_id);
            }
            sink.on_finished(&job).await;
            return Ok(job);
        }

        if self.state == PollerState::Idle {
            self.state = PollerState::Polling;
        }
        self.fetch_delta(job.results_count, sink, cancel).await?;
        Ok(job)
    }

    /// Fetch `[last_fetched_count, results_count)` and hand unseen results to
    /// the sink.
    async fn fetch_delta(
        &mut self,
        results_count: u64,
        sink: &dyn ResultSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        while self.cursor.last_fetched_count() < results_count {
            let skip = self.cursor.last_fetched_count();
            let limit = (results_count - skip).min(self.page_limit);
            let page = self
                .remote(
                    "results request",
                    self.service.get_results(&self.job_id, skip, limit),
                )
                .await?;
            if page.is_empty() {
                log_debug!("Job {} returned an empty page at {}", self.job_id, skip);
                break;
            }

            for (offset, result) in page.into_iter().take(limit as usize).enumerate() {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                // Marked only once the sink is done with it, so a delivery
                // interrupted by cancellation is fetched again.
                if self.cursor.is_processed(&result.result_id) {
                    log_debug!("Skipping duplicate result {}", result.result_id);
                } else {
                    let result_id = result.result_id.clone();
                    if let Err(err) = sink.on_result(result).await {
                        log_warn!(
                            "Failed to handle result {} of job {}: {err:?}",
                            result_id,
                            self.job_id
                        );
                    }
                    self.cursor.mark_processed(&result_id);
                }
                self.cursor.advance_to(skip + offset as u64 + 1);
            }
        }
        Ok(())
    }

    /// Bound one remote round trip by the request timeout. Sink delivery is
    /// never under this bound.
    async fn remote<T>(&self, what: &str, request: impl Future<Output = Result<T>>) -> Result<T> {
        match time::timeout(self.request_timeout, request).await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow!(
                "{what} for job {} timed out after {:?}",
                self.job_id,
                self.request_timeout
            )),
        }
    }
}
