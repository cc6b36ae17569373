use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    JobHandle, JobStatus, Trigger, TriggerConfig, UnixMillis,
    error::{ModelError, ModelResult},
};

/// Current on-disk format of [`ResumptionToken`].
const TOKEN_FORMAT_VERSION: u32 = 1;

fn token_format_version() -> u32 {
    TOKEN_FORMAT_VERSION
}

/// Plain-data state handed to the host scheduler while a job is parked.
///
/// Carries only identifiers, timestamps and counters, never in-memory references, so a
/// token written before a process restart can be decoded and resumed afterwards.
///
/// Tokens are values: every transition (`observe`, `record_failed_wake`) returns a new token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumptionToken {
    #[serde(default = "token_format_version")]
    version: u32,
    handle: JobHandle,
    trigger: TriggerConfig,
    /// Absolute overall deadline in Unix milliseconds.
    deadline_at_ms: UnixMillis,
    /// Most advanced status observed so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_status: Option<JobStatus>,
    /// Number of times the job was woken.
    #[serde(default)]
    wakes: u32,
    /// Consecutive wakes whose status check failed on transport errors.
    #[serde(default)]
    failed_wakes: u32,
}

impl ResumptionToken {
    /// Build the first token for a freshly submitted job.
    ///
    /// The deadline is `now_ms + trigger.timeout_ms`.
    pub fn new(handle: JobHandle, trigger: TriggerConfig, now_ms: UnixMillis) -> Self {
        Self {
            version: TOKEN_FORMAT_VERSION,
            deadline_at_ms: now_ms.saturating_add(trigger.timeout_ms),
            handle,
            trigger,
            last_status: None,
            wakes: 0,
            failed_wakes: 0,
        }
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    pub fn trigger_config(&self) -> &TriggerConfig {
        &self.trigger
    }

    pub fn deadline_at_ms(&self) -> UnixMillis {
        self.deadline_at_ms
    }

    pub fn last_status(&self) -> Option<&JobStatus> {
        self.last_status.as_ref()
    }

    pub fn wakes(&self) -> u32 {
        self.wakes
    }

    pub fn failed_wakes(&self) -> u32 {
        self.failed_wakes
    }

    /// Returns `true` once a terminal status has been recorded.
    pub fn is_resolved(&self) -> bool {
        self.last_status.as_ref().is_some_and(JobStatus::is_terminal)
    }

    /// Returns `true` when `now_ms` is at or past the overall deadline.
    pub fn is_expired(&self, now_ms: UnixMillis) -> bool {
        now_ms >= self.deadline_at_ms
    }

    /// Time left before the deadline.
    pub fn remaining(&self, now_ms: UnixMillis) -> Duration {
        Duration::from_millis(self.deadline_at_ms.saturating_sub(now_ms))
    }

    /// The next wake-up: one poll interval from `now_ms`, never past the deadline.
    pub fn next_trigger(&self, now_ms: UnixMillis) -> Trigger {
        let wake_at_ms = now_ms
            .saturating_add(self.trigger.poll_interval_ms)
            .min(self.deadline_at_ms);
        Trigger {
            wake_at_ms,
            deadline_at_ms: self.deadline_at_ms,
        }
    }

    /// Record a successful wake check.
    ///
    /// `status` replaces the last status only if it advances the lattice; stale or
    /// duplicate observations keep the previous value.
    pub fn observe(self, status: JobStatus) -> Self {
        let mut token = self.record_wake();
        if status.advances(token.last_status.as_ref()) {
            token.last_status = Some(status);
        }
        token
    }

    /// Record a successful wake check that saw nothing new.
    pub fn record_wake(mut self) -> Self {
        self.wakes = self.wakes.saturating_add(1);
        self.failed_wakes = 0;
        self
    }

    /// Record a wake whose status check failed on transport errors.
    pub fn record_failed_wake(mut self) -> Self {
        self.wakes = self.wakes.saturating_add(1);
        self.failed_wakes = self.failed_wakes.saturating_add(1);
        self
    }

    /// Check the invariants a decoded token must satisfy.
    pub fn validate(&self) -> ModelResult<()> {
        if self.version != TOKEN_FORMAT_VERSION {
            return Err(ModelError::MalformedToken(format!(
                "unsupported token version {}",
                self.version
            )));
        }
        if self.handle.job_id().is_empty() {
            return Err(ModelError::MalformedToken("empty job id".into()));
        }
        self.trigger
            .validate()
            .map_err(|e| ModelError::MalformedToken(e.to_string()))
    }

    /// Encode as JSON for persistence by the host.
    pub fn to_json(&self) -> ModelResult<String> {
        serde_json::to_string(self).map_err(|e| ModelError::MalformedToken(e.to_string()))
    }

    /// Decode a persisted token and validate it.
    pub fn from_json(raw: &str) -> ModelResult<Self> {
        let token: Self =
            serde_json::from_str(raw).map_err(|e| ModelError::MalformedToken(e.to_string()))?;
        token.validate()?;
        Ok(token)
    }
}
