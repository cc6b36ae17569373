//! Parking submitted jobs with a host scheduler between status checks.
//!
//! ```text
//! NotSubmitted --start--> Parked --resume--> Parked | Resolved(outcome)
//! ```
//!
//! The bridge holds no per-job state: everything needed to continue lives in the
//! [`ResumptionToken`] handed to the [`Host`].
mod host;
pub use host::{EventNotifier, Host, LocalHost, Parked, ParkedQueue};

mod store;
pub use store::{FileTokenStore, TokenStore};

use std::sync::Arc;
use std::time::Duration;

use armada_model::{
    JobDescriptor, JobHandle, Outcome, ResumptionToken, Trigger, TriggerConfig, WakeReason,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::config::OrchestratorConfig;
use crate::error::JobError;
use crate::metrics::{MetricsHandle, noop_metrics};
use crate::submit::{SubmissionClient, cancel_best_effort};
use crate::watch::StatusWatcher;

/// Where a job stands after a bridge call.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeState {
    /// Handed to the host; resume with `token` when `trigger` fires.
    Parked {
        trigger: Trigger,
        token: ResumptionToken,
    },
    Resolved(Outcome),
}

impl BridgeState {
    pub fn is_parked(&self) -> bool {
        matches!(self, BridgeState::Parked { .. })
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            BridgeState::Resolved(outcome) => Some(outcome),
            BridgeState::Parked { .. } => None,
        }
    }
}

/// Bridge settings, usually derived from [`OrchestratorConfig`].
#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    pub trigger: TriggerConfig,
    pub cancel_on_timeout: bool,
    pub cancel_timeout: Duration,
    pub wake_check_timeout: Duration,
    pub max_failed_wakes: u32,
}

impl From<&OrchestratorConfig> for BridgeConfig {
    fn from(cfg: &OrchestratorConfig) -> Self {
        Self {
            trigger: cfg.trigger(),
            cancel_on_timeout: cfg.cancel_on_timeout,
            cancel_timeout: cfg.cancel_timeout(),
            wake_check_timeout: cfg.wake_check_timeout(),
            max_failed_wakes: cfg.max_failed_wakes,
        }
    }
}

/// Exposes the submission client and watcher to a cooperative [`Host`].
///
/// `start` and `resume` return as soon as the job is parked or resolved; no task or thread
/// stays behind while the job waits. Remote cancels issued on resolution run in the background
/// until [`DeferralBridge::flush_cancels`] collects them.
#[derive(Clone)]
pub struct DeferralBridge {
    client: SubmissionClient,
    watcher: StatusWatcher,
    host: Arc<dyn Host>,
    config: BridgeConfig,
    clock: Clock,
    metrics: MetricsHandle,
    cancel: CancellationToken,
    cancels: TaskTracker,
}

impl DeferralBridge {
    pub fn new(
        client: SubmissionClient,
        watcher: StatusWatcher,
        host: Arc<dyn Host>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            client,
            watcher,
            host,
            config,
            clock: Clock::system(),
            metrics: noop_metrics(),
            cancel: CancellationToken::new(),
            cancels: TaskTracker::new(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Caller cancellation observed by wake checks; a check cut short by it resolves the job
    /// as cancelled.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Wait until every remote cancel issued so far has finished.
    ///
    /// Each request is bounded by `cancel_timeout`.
    pub async fn flush_cancels(&self) {
        self.cancels.close();
        self.cancels.wait().await;
        self.cancels.reopen();
    }

    /// Submit `descriptor` and park the job.
    ///
    /// A rejected submission resolves to [`Outcome::Failed`] without a job id.
    #[instrument(level = "debug", skip(self, descriptor), fields(queue = %descriptor.queue()))]
    pub async fn start(&self, descriptor: JobDescriptor) -> Result<BridgeState, JobError> {
        let handle = match self.client.submit(descriptor).await {
            Ok(handle) => handle,
            Err(JobError::Rejected { kind, message }) => {
                warn!(%kind, %message, "submission rejected");
                return Ok(BridgeState::Resolved(Outcome::Failed {
                    job_id: None,
                    reason: format!("submission rejected ({kind}): {message}"),
                }));
            }
            Err(err) => return Err(err),
        };
        let token = ResumptionToken::new(handle, self.config.trigger, self.clock.now_ms());
        self.park(token).await
    }

    /// Park a job submitted earlier, e.g. one whose token was restored after a restart.
    pub async fn adopt(&self, token: ResumptionToken) -> Result<BridgeState, JobError> {
        token.validate()?;
        if let Some(outcome) = settled(&token) {
            return self.resolve(outcome).await;
        }
        self.park(token).await
    }

    /// Continue a parked job after the host woke it.
    #[instrument(
        level = "debug",
        skip(self, token),
        fields(job_id = %token.handle().job_id(), ?reason, wakes = token.wakes())
    )]
    pub async fn resume(
        &self,
        token: ResumptionToken,
        reason: WakeReason,
    ) -> Result<BridgeState, JobError> {
        token.validate()?;
        let job_id = token.handle().job_id().clone();

        if let Some(outcome) = settled(&token) {
            return self.resolve(outcome).await;
        }
        if reason == WakeReason::Cancelled {
            return self.cancel_job(token.handle().clone(), "cancelled by host").await;
        }

        let now = self.clock.now_ms();
        let final_check = reason == WakeReason::Timeout || token.is_expired(now);
        let budget = if final_check {
            self.config.wake_check_timeout
        } else {
            self.config.wake_check_timeout.min(token.remaining(now))
        };

        let checked = {
            let mut session = self
                .watcher
                .watch(
                    token.handle(),
                    self.config.trigger.poll_interval(),
                    Instant::now() + budget,
                    self.cancel.child_token(),
                )
                .polling_only()
                .resume_from(token.last_status().cloned());
            session.poll_once().await
        };

        match checked {
            Ok(observed) => {
                let token = match observed {
                    Some(status) => token.observe(status),
                    None => token.record_wake(),
                };
                if let Some(outcome) = settled(&token) {
                    return self.resolve(outcome).await;
                }
                if final_check {
                    return self.time_out(token).await;
                }
                self.park(token).await
            }
            Err(err @ (JobError::Transport { .. } | JobError::Timeout { .. })) => {
                if final_check {
                    return self.time_out(token).await;
                }
                let token = token.record_failed_wake();
                let failed = token.failed_wakes();
                if failed >= self.config.max_failed_wakes {
                    return Err(JobError::transport(
                        "status",
                        format!("{failed} consecutive wake checks failed, last: {err}"),
                    ));
                }
                warn!(%job_id, failed, error = %err, "wake check failed; parking again");
                self.park(token).await
            }
            Err(JobError::Cancelled { .. }) => {
                self.cancel_job(token.handle().clone(), "cancelled by caller").await
            }
            Err(err) => Err(err),
        }
    }

    async fn park(&self, token: ResumptionToken) -> Result<BridgeState, JobError> {
        let trigger = token.next_trigger(self.clock.now_ms());
        self.host.defer(trigger, token.clone()).await?;
        debug!(
            job_id = %token.handle().job_id(),
            wake_at_ms = trigger.wake_at_ms,
            last_status = token.last_status().map(|s| s.as_str()).unwrap_or("none"),
            "job handed to host"
        );
        Ok(BridgeState::Parked { trigger, token })
    }

    async fn time_out(&self, token: ResumptionToken) -> Result<BridgeState, JobError> {
        let handle = token.handle().clone();
        info!(job_id = %handle.job_id(), "job did not finish before its deadline");
        let job_id = handle.job_id().clone();
        if self.config.cancel_on_timeout {
            self.spawn_remote_cancel(handle, "deadline exceeded");
        }
        self.resolve(Outcome::TimedOut { job_id }).await
    }

    async fn cancel_job(&self, handle: JobHandle, reason: &str) -> Result<BridgeState, JobError> {
        let job_id = handle.job_id().clone();
        self.spawn_remote_cancel(handle, reason);
        self.resolve(Outcome::Cancelled { job_id }).await
    }

    async fn resolve(&self, outcome: Outcome) -> Result<BridgeState, JobError> {
        if let Some(job_id) = outcome.job_id() {
            if let Err(e) = self.host.release(job_id).await {
                warn!(%job_id, error = %e, "failed to release parked job state");
            }
        }
        info!(%outcome, "job resolved");
        Ok(BridgeState::Resolved(outcome))
    }

    fn spawn_remote_cancel(&self, handle: JobHandle, reason: &str) {
        self.cancels.spawn(cancel_best_effort(
            Arc::clone(self.client.service()),
            handle,
            reason.to_string(),
            self.config.cancel_timeout,
            Arc::clone(&self.metrics),
        ));
    }
}

fn settled(token: &ResumptionToken) -> Option<Outcome> {
    token
        .last_status()
        .and_then(|status| Outcome::from_terminal(token.handle().job_id(), status))
}
