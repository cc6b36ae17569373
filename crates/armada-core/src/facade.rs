use std::sync::Arc;

use armada_model::{JobDescriptor, JobHandle, JobId, JobStatus, Outcome, ResumptionToken};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::bridge::{
    BridgeConfig, BridgeState, DeferralBridge, EventNotifier, LocalHost, ParkedQueue, TokenStore,
};
use crate::clock::Clock;
use crate::config::OrchestratorConfig;
use crate::error::{HostError, JobError, ServiceErrorKind};
use crate::metrics::{MetricsHandle, noop_metrics};
use crate::service::JobService;
use crate::submit::{SubmissionClient, cancel_best_effort};
use crate::watch::StatusWatcher;

/// Single entry point: submit a job, wait for it, report the [`Outcome`].
///
/// # Example
///
/// ```ignore
/// let orchestrator = JobOrchestrator::new(service, OrchestratorConfig::default())?;
/// let outcome = orchestrator.run_job(descriptor, true).await?;
/// ```
pub struct JobOrchestrator {
    config: OrchestratorConfig,
    client: SubmissionClient,
    watcher: StatusWatcher,
    metrics: MetricsHandle,
    clock: Clock,
    store: Option<Arc<dyn TokenStore>>,
    events: EventNotifier,
}

impl JobOrchestrator {
    pub fn new(service: Arc<dyn JobService>, config: OrchestratorConfig) -> Result<Self, JobError> {
        config.validate()?;
        let clock = Clock::system();
        let client = SubmissionClient::new(Arc::clone(&service))
            .with_clock(clock)
            .with_lookout_url_template(config.lookout_url_template.clone());
        let watcher = StatusWatcher::new(service, config.retry.clone());
        Ok(Self {
            config,
            client,
            watcher,
            metrics: noop_metrics(),
            clock,
            store: None,
            events: EventNotifier::default(),
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.client = self.client.with_metrics(Arc::clone(&metrics));
        self.watcher = self.watcher.with_metrics(Arc::clone(&metrics));
        self.metrics = metrics;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.client = self.client.with_clock(clock);
        self.clock = clock;
        self
    }

    /// Persist parked tokens of deferrable runs in `store`.
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Wakes every parked deferrable run for an immediate status check.
    pub fn event_notifier(&self) -> EventNotifier {
        self.events.clone()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run with the configured `deferrable` mode and no external cancellation.
    pub async fn run(&self, descriptor: JobDescriptor) -> Result<Outcome, JobError> {
        self.run_job(descriptor, self.config.deferrable).await
    }

    pub async fn run_job(
        &self,
        descriptor: JobDescriptor,
        deferrable: bool,
    ) -> Result<Outcome, JobError> {
        self.run_job_with_cancel(descriptor, deferrable, CancellationToken::new())
            .await
    }

    /// Submit `descriptor` and wait for the job to finish.
    ///
    /// With `deferrable` the job is parked with an in-process host between checks; otherwise
    /// a watch session follows it directly. Both paths stop at the configured timeout or when
    /// `cancel` fires, and ask the remote service to cancel the job in those cases.
    #[instrument(skip(self, descriptor, cancel), fields(queue = %descriptor.queue()))]
    pub async fn run_job_with_cancel(
        &self,
        descriptor: JobDescriptor,
        deferrable: bool,
        cancel: CancellationToken,
    ) -> Result<Outcome, JobError> {
        let queue = descriptor.queue().to_string();
        let started = Instant::now();
        let outcome = if deferrable {
            let (bridge, mut parked) = self.local_bridge(&cancel);
            let state = bridge.start(descriptor).await?;
            drive(&bridge, &mut parked, state, &cancel).await?
        } else {
            self.run_blocking(descriptor, &cancel).await?
        };
        self.finish(&queue, started, outcome)
    }

    /// Continue a job from a token written before a restart, without resubmitting it.
    #[instrument(skip(self, token, cancel), fields(job_id = %token.handle().job_id()))]
    pub async fn resume_job(
        &self,
        token: ResumptionToken,
        cancel: CancellationToken,
    ) -> Result<Outcome, JobError> {
        let queue = token.handle().queue().to_string();
        let started = Instant::now();
        let (bridge, mut parked) = self.local_bridge(&cancel);
        let state = bridge.adopt(token).await?;
        let outcome = drive(&bridge, &mut parked, state, &cancel).await?;
        self.finish(&queue, started, outcome)
    }

    /// Tokens left in the token store by an earlier process.
    pub fn persisted_tokens(&self) -> Result<Vec<ResumptionToken>, JobError> {
        match &self.store {
            Some(store) => Ok(store.load_all()?),
            None => Ok(Vec::new()),
        }
    }

    fn finish(&self, queue: &str, started: Instant, outcome: Outcome) -> Result<Outcome, JobError> {
        let elapsed = started.elapsed();
        self.metrics
            .record_job_resolved(queue, &outcome, elapsed.as_millis() as u64);
        info!(%outcome, ?elapsed, "job finished");
        Ok(outcome)
    }

    fn local_bridge(&self, cancel: &CancellationToken) -> (DeferralBridge, ParkedQueue) {
        let (host, parked) = LocalHost::channel(self.clock);
        let parked = parked.with_notifier(self.events.clone());
        let host = match &self.store {
            Some(store) => host.with_store(Arc::clone(store)),
            None => host,
        };
        let bridge = DeferralBridge::new(
            self.client.clone(),
            self.watcher.clone(),
            Arc::new(host),
            BridgeConfig::from(&self.config),
        )
        .with_clock(self.clock)
        .with_metrics(Arc::clone(&self.metrics))
        .with_cancel(cancel.clone());
        (bridge, parked)
    }

    async fn run_blocking(
        &self,
        descriptor: JobDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Outcome, JobError> {
        let handle = match self.client.submit(descriptor).await {
            Ok(handle) => handle,
            Err(JobError::Rejected { kind, message }) => {
                warn!(%kind, %message, "submission rejected");
                return Ok(Outcome::Failed {
                    job_id: None,
                    reason: format!("submission rejected ({kind}): {message}"),
                });
            }
            Err(err) => return Err(err),
        };
        self.watch_to_end(&handle, cancel).await
    }

    async fn watch_to_end(
        &self,
        handle: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<Outcome, JobError> {
        let job_id = handle.job_id();
        let deadline = Instant::now() + self.config.timeout();
        let mut last: Option<JobStatus> = None;
        let mut restarts = 0;

        loop {
            let mut session = self
                .watcher
                .watch(handle, self.config.poll_interval(), deadline, cancel.clone())
                .resume_from(last.clone());
            let err = loop {
                match session.next().await {
                    Some(Ok(status)) => {
                        if let Some(outcome) = Outcome::from_terminal(job_id, &status) {
                            return Ok(outcome);
                        }
                        last = Some(status);
                    }
                    Some(Err(err)) => break err,
                    None => {
                        break JobError::transport(
                            "status",
                            "watch ended without a terminal status",
                        );
                    }
                }
            };

            match err {
                JobError::Cancelled { .. } => {
                    self.cancel_remote(handle, "cancelled by caller").await;
                    return Ok(Outcome::Cancelled {
                        job_id: job_id.clone(),
                    });
                }
                JobError::Timeout { .. } => {
                    if self.config.cancel_on_timeout {
                        self.cancel_remote(handle, "deadline exceeded").await;
                    }
                    return Ok(Outcome::TimedOut {
                        job_id: job_id.clone(),
                    });
                }
                err if err.is_retryable() && restarts < self.config.max_watch_restarts => {
                    restarts += 1;
                    warn!(%job_id, restarts, error = %err, "watch failed; starting a fresh session");
                }
                err => return Err(err),
            }
        }
    }

    async fn cancel_remote(&self, handle: &JobHandle, reason: &str) {
        cancel_best_effort(
            Arc::clone(self.client.service()),
            handle.clone(),
            reason.to_string(),
            self.config.cancel_timeout(),
            Arc::clone(&self.metrics),
        )
        .await;
    }
}

/// Feed wake-ups from `parked` back into `bridge` until the job resolves.
///
/// Remote cancels issued on the way are awaited before returning.
async fn drive(
    bridge: &DeferralBridge,
    parked: &mut ParkedQueue,
    mut state: BridgeState,
    cancel: &CancellationToken,
) -> Result<Outcome, JobError> {
    let result = loop {
        match state {
            BridgeState::Resolved(outcome) => break Ok(outcome),
            BridgeState::Parked { .. } => {
                let Some((token, reason)) = parked.next_wake(cancel).await else {
                    break Err(JobError::Host(HostError::Closed));
                };
                state = match bridge.resume(token, reason).await {
                    Ok(next) => next,
                    Err(err) => break Err(err),
                };
            }
        }
    };
    bridge.flush_cancels().await;
    result
}

/// Collapse an outcome into the job id on success, or the matching [`JobError`].
pub fn into_job_result(outcome: Outcome) -> Result<JobId, JobError> {
    match outcome {
        Outcome::Success { job_id } => Ok(job_id),
        Outcome::Failed {
            job_id: Some(job_id),
            reason,
        } => Err(JobError::RemoteJobFailed { job_id, reason }),
        Outcome::Failed {
            job_id: None,
            reason,
        } => Err(JobError::Rejected {
            kind: ServiceErrorKind::InvalidArgument,
            message: reason,
        }),
        Outcome::Cancelled { job_id } => Err(JobError::Cancelled { job_id }),
        Outcome::TimedOut { job_id } => Err(JobError::Timeout { job_id }),
    }
}
