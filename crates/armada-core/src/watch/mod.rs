//! Status observation for submitted jobs.
mod backoff;
pub(crate) use backoff::Backoff;

mod session;
pub use session::WatchSession;

use std::sync::Arc;
use std::time::Duration;

use armada_model::{BackoffStrategy, JobHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::metrics::{MetricsHandle, noop_metrics};
use crate::service::JobService;

/// Factory for [`WatchSession`]s against one job service.
///
/// Holds no per-job state, so a session can be rebuilt from a [`JobHandle`] at any time.
#[derive(Clone)]
pub struct StatusWatcher {
    service: Arc<dyn JobService>,
    retry: BackoffStrategy,
    metrics: MetricsHandle,
}

impl StatusWatcher {
    pub fn new(service: Arc<dyn JobService>, retry: BackoffStrategy) -> Self {
        Self {
            service,
            retry,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Start watching `handle`.
    ///
    /// The session polls every `poll_interval` (or follows the service push stream when there
    /// is one) until a terminal status, `deadline`, or `cancel`.
    pub fn watch<'a>(
        &self,
        handle: &'a JobHandle,
        poll_interval: Duration,
        deadline: Instant,
        cancel: CancellationToken,
    ) -> WatchSession<'a> {
        WatchSession::new(
            Arc::clone(&self.service),
            handle,
            poll_interval,
            deadline,
            cancel,
            Backoff::new(self.retry.clone()),
            Arc::clone(&self.metrics),
        )
    }
}
