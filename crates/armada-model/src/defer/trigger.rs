use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    TimeoutMs, UnixMillis,
    error::{ModelError, ModelResult},
};

/// Polling cadence and overall time budget for watching one job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    /// Delay between two status checks.
    pub poll_interval_ms: TimeoutMs,
    /// Overall budget measured from submission. Once spent the job is reported as timed out.
    pub timeout_ms: TimeoutMs,
}

impl TriggerConfig {
    pub fn new(poll_interval_ms: TimeoutMs, timeout_ms: TimeoutMs) -> Self {
        Self {
            poll_interval_ms,
            timeout_ms,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Both values must be non-zero.
    pub fn validate(&self) -> ModelResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(ModelError::InvalidTrigger(
                "poll interval cannot be zero".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ModelError::InvalidTrigger("timeout cannot be zero".into()));
        }
        Ok(())
    }
}

/// Wake-up condition handed to the host scheduler while a job is parked.
///
/// The host resumes the parked task at `wake_at_ms` (timer), earlier if an external event
/// arrives, and in any case no later than `deadline_at_ms`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub wake_at_ms: UnixMillis,
    pub deadline_at_ms: UnixMillis,
}

impl Trigger {
    /// Returns `true` when the next wake-up coincides with the overall deadline.
    pub fn is_final(&self) -> bool {
        self.wake_at_ms >= self.deadline_at_ms
    }

    /// Time left until the trigger fires, measured from `now_ms`.
    pub fn delay_from(&self, now_ms: UnixMillis) -> Duration {
        Duration::from_millis(self.wake_at_ms.min(self.deadline_at_ms).saturating_sub(now_ms))
    }

    /// The wake reason a plain timer expiry maps to.
    pub fn timer_reason(&self) -> WakeReason {
        if self.is_final() {
            WakeReason::Timeout
        } else {
            WakeReason::Timer
        }
    }
}

/// Why the host re-entered a parked task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WakeReason {
    /// The poll-interval timer fired.
    Timer,
    /// An external notification suggested the job may have changed state.
    Event,
    /// The overall deadline was reached.
    Timeout,
    /// The host asked for the task to be cancelled.
    Cancelled,
}
