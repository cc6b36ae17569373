use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Retry policy for transient transport failures while watching a job.
///
/// The first retry waits `first_ms`, each further one multiplies the previous delay by `factor`,
/// capped at `max_ms` and then jittered. After `max_retries` consecutive failures the error is
/// surfaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffStrategy {
    pub jitter: super::JitterStrategy,
    pub first_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
    pub max_retries: u32,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self {
            jitter: super::JitterStrategy::Full,
            first_ms: 1_000,
            max_ms: 30_000,
            factor: 2.0,
            max_retries: 5,
        }
    }
}

impl BackoffStrategy {
    pub fn validate(&self) -> ModelResult<()> {
        if self.first_ms == 0 {
            return Err(ModelError::Invalid("backoff first_ms cannot be zero".into()));
        }
        if self.max_ms < self.first_ms {
            return Err(ModelError::Invalid(
                "backoff max_ms must be >= first_ms".into(),
            ));
        }
        if !(self.factor >= 1.0) {
            return Err(ModelError::Invalid("backoff factor must be >= 1.0".into()));
        }
        Ok(())
    }
}
