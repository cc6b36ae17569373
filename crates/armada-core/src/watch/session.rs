use std::sync::Arc;
use std::time::Duration;

use armada_model::{JobHandle, JobStatus};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::Backoff;
use crate::error::{JobError, ServiceError};
use crate::metrics::MetricsHandle;
use crate::service::{JobService, StatusPush};

enum Push {
    Untried,
    Active(StatusPush),
    Disabled,
}

enum Step {
    Observed(JobStatus),
    Again,
    Stop(JobError),
}

/// Lazy, finite sequence of status changes for one job.
///
/// Each call to [`WatchSession::next`] yields the next status whose rank is strictly higher
/// than the last one yielded; duplicates and out-of-order reports are dropped. The sequence
/// ends after the first terminal status, or with `Err(Timeout)` at the deadline, or with
/// `Err(Cancelled)` once the cancellation token fires, or with `Err(Transport)` when transient
/// errors exhaust the retry budget.
pub struct WatchSession<'a> {
    service: Arc<dyn JobService>,
    handle: &'a JobHandle,
    poll_interval: Duration,
    deadline: Instant,
    cancel: CancellationToken,
    backoff: Backoff,
    metrics: MetricsHandle,
    push: Push,
    last: Option<JobStatus>,
    pending_delay: Option<Duration>,
    done: bool,
}

impl<'a> WatchSession<'a> {
    pub(crate) fn new(
        service: Arc<dyn JobService>,
        handle: &'a JobHandle,
        poll_interval: Duration,
        deadline: Instant,
        cancel: CancellationToken,
        backoff: Backoff,
        metrics: MetricsHandle,
    ) -> Self {
        Self {
            service,
            handle,
            poll_interval,
            deadline,
            cancel,
            backoff,
            metrics,
            push: Push::Untried,
            last: None,
            pending_delay: None,
            done: false,
        }
    }

    /// Seed the ordering filter with the last status seen before a restart.
    ///
    /// A terminal seed ends the session immediately: its status was already reported.
    pub fn resume_from(mut self, last_seen: Option<JobStatus>) -> Self {
        self.done = last_seen.as_ref().is_some_and(JobStatus::is_terminal);
        self.last = last_seen;
        self
    }

    /// Never open a push stream, only poll.
    pub fn polling_only(mut self) -> Self {
        self.push = Push::Disabled;
        self
    }

    pub fn handle(&self) -> &JobHandle {
        self.handle
    }

    pub fn last_seen(&self) -> Option<&JobStatus> {
        self.last.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Wait for the next status change.
    ///
    /// Returns `None` once the session has ended.
    pub async fn next(&mut self) -> Option<Result<JobStatus, JobError>> {
        if self.done {
            return None;
        }
        loop {
            if let Some(err) = self.interrupted() {
                self.done = true;
                return Some(Err(err));
            }
            match self.step().await {
                Step::Observed(status) => {
                    if let Some(status) = self.accept(status) {
                        self.done = status.is_terminal();
                        return Some(Ok(status));
                    }
                }
                Step::Again => {}
                Step::Stop(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }

    /// One status check, without waiting for the poll interval.
    ///
    /// Transient failures are retried with backoff within the deadline. Returns `Ok(None)` when
    /// the fetched status does not advance past the last one seen.
    pub async fn poll_once(&mut self) -> Result<Option<JobStatus>, JobError> {
        loop {
            if let Some(err) = self.interrupted() {
                return Err(err);
            }
            if !self.wait_pending_delay().await {
                continue;
            }
            match self.poll().await {
                Step::Observed(status) => return Ok(self.accept(status)),
                Step::Again => {}
                Step::Stop(err) => return Err(err),
            }
        }
    }

    fn interrupted(&self) -> Option<JobError> {
        let job_id = self.handle.job_id().clone();
        if self.cancel.is_cancelled() {
            Some(JobError::Cancelled { job_id })
        } else if Instant::now() >= self.deadline {
            Some(JobError::Timeout { job_id })
        } else {
            None
        }
    }

    async fn step(&mut self) -> Step {
        if matches!(self.push, Push::Untried) {
            self.open_push().await;
        }
        if matches!(self.push, Push::Active(_)) {
            return self.receive().await;
        }
        if !self.wait_pending_delay().await {
            return Step::Again;
        }
        let step = self.poll().await;
        if matches!(step, Step::Observed(_)) {
            self.pending_delay = Some(self.poll_interval);
        }
        step
    }

    /// Sleep out the delay scheduled by the previous step.
    ///
    /// Returns `false` if cancellation or the deadline cut the sleep short.
    async fn wait_pending_delay(&mut self) -> bool {
        let Some(delay) = self.pending_delay.take() else {
            return true;
        };
        let wake = (Instant::now() + delay).min(self.deadline);
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep_until(wake) => Instant::now() < self.deadline,
        }
    }

    async fn open_push(&mut self) {
        if !self.service.supports_watch() {
            self.push = Push::Disabled;
            return;
        }
        let handle = self.handle;
        let opened = tokio::select! {
            _ = self.cancel.cancelled() => return,
            _ = sleep_until(self.deadline) => return,
            opened = self.service.watch(handle) => opened,
        };
        match opened {
            Ok(rx) => {
                debug!(job_id = %handle.job_id(), "following status push stream");
                self.push = Push::Active(rx);
            }
            Err(e) => {
                if e.is_transient() {
                    self.metrics.record_transport_error("watch");
                }
                debug!(job_id = %handle.job_id(), error = %e, "status push stream unavailable; polling");
                self.push = Push::Disabled;
            }
        }
    }

    async fn receive(&mut self) -> Step {
        let Push::Active(rx) = &mut self.push else {
            return Step::Again;
        };
        let received = tokio::select! {
            _ = self.cancel.cancelled() => return Step::Again,
            _ = sleep_until(self.deadline) => return Step::Again,
            item = rx.recv() => item,
        };
        let job_id = self.handle.job_id();
        match received {
            Some(Ok(status)) => Step::Observed(status),
            Some(Err(e)) => {
                if e.is_transient() {
                    self.metrics.record_transport_error("watch");
                }
                warn!(%job_id, error = %e, "status push stream failed; falling back to polling");
                self.push = Push::Disabled;
                Step::Again
            }
            None => {
                debug!(%job_id, "status push stream closed; falling back to polling");
                self.push = Push::Disabled;
                Step::Again
            }
        }
    }

    async fn poll(&mut self) -> Step {
        let handle = self.handle;
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => return Step::Again,
            fetched = tokio::time::timeout(
                remaining,
                self.service.status(std::slice::from_ref(handle.job_id())),
            ) => fetched,
        };
        match fetched {
            Err(_) => Step::Again,
            Ok(Ok(mut statuses)) => {
                self.backoff.reset();
                // Not listed yet: the service has not caught up with the submission.
                let status = statuses
                    .remove(handle.job_id())
                    .unwrap_or(JobStatus::Pending);
                trace!(job_id = %handle.job_id(), %status, "polled job status");
                Step::Observed(status)
            }
            Ok(Err(e)) if e.is_transient() => self.retry_later(e),
            Ok(Err(e)) => Step::Stop(JobError::from_service("status", e)),
        }
    }

    fn retry_later(&mut self, err: ServiceError) -> Step {
        self.metrics.record_transport_error("status");
        let job_id = self.handle.job_id();
        match self.backoff.record_failure() {
            Some(delay) => {
                warn!(
                    %job_id,
                    attempt = self.backoff.failures(),
                    ?delay,
                    error = %err,
                    "status check failed; retrying"
                );
                self.pending_delay = Some(delay);
                Step::Again
            }
            None => Step::Stop(JobError::transport(
                "status",
                format!(
                    "{} consecutive failures, last: {err}",
                    self.backoff.failures()
                ),
            )),
        }
    }

    fn accept(&mut self, status: JobStatus) -> Option<JobStatus> {
        if !status.advances(self.last.as_ref()) {
            trace!(job_id = %self.handle.job_id(), %status, "dropping stale status");
            return None;
        }
        debug!(
            job_id = %self.handle.job_id(),
            from = self.last.as_ref().map(JobStatus::as_str).unwrap_or("none"),
            to = %status,
            "job status changed"
        );
        self.last = Some(status.clone());
        Some(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatusWatcher;
    use crate::error::{ServiceError, ServiceErrorKind};
    use crate::testing::ScriptedService;
    use armada_model::{BackoffStrategy, JitterStrategy, JobId};

    const POLL: Duration = Duration::from_secs(10);

    fn handle() -> JobHandle {
        JobHandle::new(JobId::from("job-0001"), "test", "test", 0)
    }

    fn retry(max_retries: u32) -> BackoffStrategy {
        BackoffStrategy {
            jitter: JitterStrategy::None,
            first_ms: 1_000,
            max_ms: 4_000,
            factor: 2.0,
            max_retries,
        }
    }

    fn watcher(service: &Arc<ScriptedService>) -> StatusWatcher {
        StatusWatcher::new(service.clone(), retry(5))
    }

    async fn drain(session: &mut WatchSession<'_>) -> Vec<Result<JobStatus, JobError>> {
        let mut out = Vec::new();
        while let Some(item) = session.next().await {
            out.push(item);
        }
        out
    }

    fn statuses(items: Vec<Result<JobStatus, JobError>>) -> Vec<JobStatus> {
        items.into_iter().map(|r| r.unwrap()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_terminal() {
        let service = Arc::new(ScriptedService::new().reporting(&[
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Succeeded,
        ]));
        let handle = handle();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session =
            watcher(&service).watch(&handle, POLL, deadline, CancellationToken::new());

        let started = Instant::now();
        let seen = statuses(drain(&mut session).await);
        assert_eq!(
            seen,
            vec![JobStatus::Pending, JobStatus::Running, JobStatus::Succeeded]
        );
        assert_eq!(service.status_calls(), 4);
        assert_eq!(started.elapsed(), POLL * 3);
        assert!(session.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_is_monotonic_and_stops_at_terminal() {
        let service = Arc::new(ScriptedService::new().reporting(&[
            JobStatus::Running,
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::failed("OOMKilled"),
            JobStatus::Running,
        ]));
        let handle = handle();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session =
            watcher(&service).watch(&handle, POLL, deadline, CancellationToken::new());

        let seen = statuses(drain(&mut session).await);
        assert_eq!(seen, vec![JobStatus::Running, JobStatus::failed("OOMKilled")]);
        for pair in seen.windows(2) {
            assert!(pair[1].rank() > pair[0].rank());
        }
        assert_eq!(service.status_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn push_stream_falls_back_to_polling_when_closed() {
        let service = Arc::new(
            ScriptedService::new()
                .with_push([Ok(JobStatus::Running), Ok(JobStatus::Pending)])
                .reporting(&[JobStatus::Succeeded]),
        );
        let handle = handle();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session =
            watcher(&service).watch(&handle, POLL, deadline, CancellationToken::new());

        let seen = statuses(drain(&mut session).await);
        assert_eq!(seen, vec![JobStatus::Running, JobStatus::Succeeded]);
        assert_eq!(service.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn push_stream_error_falls_back_to_polling() {
        let service = Arc::new(
            ScriptedService::new()
                .with_push([
                    Ok(JobStatus::Pending),
                    Err(ServiceError::unavailable("stream reset")),
                ])
                .reporting(&[JobStatus::Running, JobStatus::Cancelled]),
        );
        let handle = handle();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session =
            watcher(&service).watch(&handle, POLL, deadline, CancellationToken::new());

        let seen = statuses(drain(&mut session).await);
        assert_eq!(
            seen,
            vec![JobStatus::Pending, JobStatus::Running, JobStatus::Cancelled]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_with_backoff() {
        let service = Arc::new(ScriptedService::new().with_statuses([
            Err(ServiceError::unavailable("connection reset")),
            Err(ServiceError::unavailable("connection reset")),
            Ok(JobStatus::Running),
            Ok(JobStatus::Succeeded),
        ]));
        let handle = handle();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session =
            watcher(&service).watch(&handle, POLL, deadline, CancellationToken::new());

        let started = Instant::now();
        assert_eq!(session.next().await.unwrap().unwrap(), JobStatus::Running);
        // 1s + 2s of backoff, no jitter.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(session.next().await.unwrap().unwrap(), JobStatus::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_transport_error() {
        let service = Arc::new(
            ScriptedService::new().with_statuses([Err(ServiceError::unavailable("down"))]),
        );
        let handle = handle();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session = StatusWatcher::new(service.clone(), retry(3)).watch(
            &handle,
            POLL,
            deadline,
            CancellationToken::new(),
        );

        let err = session.next().await.unwrap().unwrap_err();
        assert!(matches!(err, JobError::Transport { operation: "status", .. }));
        assert_eq!(service.status_calls(), 3);
        assert!(session.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_errors_surface_immediately() {
        let service = Arc::new(ScriptedService::new().with_statuses([Err(ServiceError::new(
            ServiceErrorKind::PermissionDenied,
            "queue test",
        ))]));
        let handle = handle();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session =
            watcher(&service).watch(&handle, POLL, deadline, CancellationToken::new());

        assert!(matches!(
            session.next().await,
            Some(Err(JobError::Rejected { .. }))
        ));
        assert_eq!(service.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_ends_the_session_with_timeout() {
        let service = Arc::new(ScriptedService::new().reporting(&[JobStatus::Running]));
        let handle = handle();
        let started = Instant::now();
        let deadline = started + Duration::from_secs(35);
        let mut session =
            watcher(&service).watch(&handle, POLL, deadline, CancellationToken::new());

        let items = drain(&mut session).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &JobStatus::Running);
        assert!(matches!(items[1], Err(JobError::Timeout { .. })));
        assert_eq!(started.elapsed(), Duration::from_secs(35));
        assert_eq!(service.status_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let service = Arc::new(ScriptedService::new().reporting(&[JobStatus::Pending]));
        let handle = handle();
        let cancel = CancellationToken::new();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session = watcher(&service).watch(&handle, POLL, deadline, cancel.clone());

        assert_eq!(session.next().await.unwrap().unwrap(), JobStatus::Pending);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        assert!(matches!(
            session.next().await,
            Some(Err(JobError::Cancelled { .. }))
        ));
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert!(session.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_session_from_persisted_handle_reaches_same_terminal() {
        let script = [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Succeeded,
        ];
        let deadline = Instant::now() + Duration::from_secs(600);

        let continuous = Arc::new(ScriptedService::new().reporting(&script));
        let handle = handle();
        let mut session =
            watcher(&continuous).watch(&handle, POLL, deadline, CancellationToken::new());
        let expected = statuses(drain(&mut session).await).pop();

        let interrupted = Arc::new(ScriptedService::new().reporting(&script));
        let watcher = watcher(&interrupted);
        let mut first = watcher.watch(&handle, POLL, deadline, CancellationToken::new());
        first.next().await.unwrap().unwrap();
        let last_seen = first.next().await.unwrap().ok();
        drop(first);

        let persisted = serde_json::to_string(&handle).unwrap();
        let restored: JobHandle = serde_json::from_str(&persisted).unwrap();
        let mut second = watcher
            .watch(&restored, POLL, deadline, CancellationToken::new())
            .resume_from(last_seen);
        let resumed = statuses(drain(&mut second).await).pop();

        assert_eq!(expected, Some(JobStatus::Succeeded));
        assert_eq!(resumed, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_seed_ends_session_without_calls() {
        let service = Arc::new(ScriptedService::new().reporting(&[JobStatus::Running]));
        let handle = handle();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session = watcher(&service)
            .watch(&handle, POLL, deadline, CancellationToken::new())
            .resume_from(Some(JobStatus::Succeeded));

        assert!(session.is_done());
        assert!(session.next().await.is_none());
        assert_eq!(service.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_once_reports_only_changes() {
        let service = Arc::new(ScriptedService::new().reporting(&[JobStatus::Running]));
        let handle = handle();
        let deadline = Instant::now() + Duration::from_secs(600);
        let mut session = watcher(&service)
            .watch(&handle, POLL, deadline, CancellationToken::new())
            .polling_only();

        let started = Instant::now();
        assert_eq!(session.poll_once().await.unwrap(), Some(JobStatus::Running));
        assert_eq!(session.poll_once().await.unwrap(), None);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(service.status_calls(), 2);
    }
}
