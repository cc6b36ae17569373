use std::time::Duration;

use armada_model::{BackoffStrategy, TimeoutMs, TriggerConfig};
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Behaviour of [`crate::JobOrchestrator`], loadable from JSON.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Interval between status checks.
    pub poll_interval_ms: TimeoutMs,
    /// Overall time allowed from submission to a terminal status.
    pub timeout_ms: TimeoutMs,
    /// Park the caller between checks instead of holding it in a polling loop.
    pub deferrable: bool,
    /// Backoff for transient transport errors while watching.
    pub retry: BackoffStrategy,
    /// Ask the remote service to cancel jobs that exceed `timeout_ms`.
    pub cancel_on_timeout: bool,
    /// Upper bound for a best-effort remote cancel.
    pub cancel_timeout_ms: TimeoutMs,
    /// Upper bound for the single status check performed on each wake.
    pub wake_check_timeout_ms: TimeoutMs,
    /// Fresh watch sessions started after a session surfaced a transport error.
    pub max_watch_restarts: u32,
    /// Consecutive failed wake checks tolerated before giving up.
    pub max_failed_wakes: u32,
    /// Job UI link logged on submission; `<job_id>` is replaced by the job id.
    pub lookout_url_template: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30_000,
            timeout_ms: 3_600_000,
            deferrable: false,
            retry: BackoffStrategy::default(),
            cancel_on_timeout: true,
            cancel_timeout_ms: 5_000,
            wake_check_timeout_ms: 10_000,
            max_watch_restarts: 3,
            max_failed_wakes: 5,
            lookout_url_template: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn trigger(&self) -> TriggerConfig {
        TriggerConfig::new(self.poll_interval_ms, self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cancel_timeout(&self) -> Duration {
        Duration::from_millis(self.cancel_timeout_ms)
    }

    pub fn wake_check_timeout(&self) -> Duration {
        Duration::from_millis(self.wake_check_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), JobError> {
        self.trigger()
            .validate()
            .and_then(|_| self.retry.validate())
            .map_err(|e| JobError::Config(e.to_string()))?;
        if self.cancel_timeout_ms == 0 {
            return Err(JobError::Config("cancelTimeoutMs cannot be zero".into()));
        }
        if self.wake_check_timeout_ms == 0 {
            return Err(JobError::Config("wakeCheckTimeoutMs cannot be zero".into()));
        }
        if self.max_failed_wakes == 0 {
            return Err(JobError::Config("maxFailedWakes cannot be zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, OrchestratorConfig::default());
        assert_eq!(cfg.poll_interval(), Duration::from_secs(30));
        assert_eq!(cfg.timeout(), Duration::from_secs(3600));
        assert!(cfg.cancel_on_timeout);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let cfg: OrchestratorConfig = serde_json::from_str(
            r#"{"pollIntervalMs": 5000, "deferrable": true, "retry": {"maxRetries": 2}}"#,
        )
        .unwrap();
        assert_eq!(cfg.poll_interval_ms, 5_000);
        assert!(cfg.deferrable);
        assert_eq!(cfg.retry.max_retries, 2);
        assert_eq!(cfg.retry.first_ms, 1_000);
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let cfg = OrchestratorConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(JobError::Config(_))));

        let cfg = OrchestratorConfig {
            max_failed_wakes: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
