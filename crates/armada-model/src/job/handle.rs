use serde::{Deserialize, Serialize};

use crate::{JobId, UnixMillis};

/// Reference to a job accepted by the remote service.
///
/// Sufficient on its own to query or cancel the job, which is what makes watching restartable:
/// nothing beyond a handle is needed to rebuild a watch session after a process restart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    job_id: JobId,
    queue: String,
    job_set: String,
    submitted_at_ms: UnixMillis,
}

impl JobHandle {
    pub fn new(
        job_id: JobId,
        queue: impl Into<String>,
        job_set: impl Into<String>,
        submitted_at_ms: UnixMillis,
    ) -> Self {
        Self {
            job_id,
            queue: queue.into(),
            job_set: job_set.into(),
            submitted_at_ms,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn job_set(&self) -> &str {
        &self.job_set
    }

    /// Submission instant in Unix milliseconds.
    pub fn submitted_at_ms(&self) -> UnixMillis {
        self.submitted_at_ms
    }
}
