use std::time::Duration;

use armada_model::BackoffStrategy;
use taskvisor::BackoffPolicy;

use crate::map::to_backoff_policy;

/// Consecutive-failure counter driving retry delays for one watch session.
///
/// Delay growth and jitter come from taskvisor's [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    policy: BackoffPolicy,
    max_retries: u32,
    failures: u32,
    prev: Option<Duration>,
}

impl Backoff {
    pub(crate) fn new(strategy: BackoffStrategy) -> Self {
        Self {
            policy: to_backoff_policy(&strategy),
            max_retries: strategy.max_retries,
            failures: 0,
            prev: None,
        }
    }

    pub(crate) fn failures(&self) -> u32 {
        self.failures
    }

    pub(crate) fn reset(&mut self) {
        self.failures = 0;
        self.prev = None;
    }

    /// Count one more failure.
    ///
    /// Returns the delay before the next attempt, or `None` once `max_retries`
    /// consecutive failures have been reached and the error should surface.
    pub(crate) fn record_failure(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.max_retries {
            return None;
        }
        let delay = self.policy.next(self.prev);
        self.prev = Some(delay);
        Some(delay)
    }
}
