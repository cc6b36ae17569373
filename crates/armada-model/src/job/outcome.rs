use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus};

/// Final result of running one job through the client.
///
/// `Cancelled` is a distinct, non-error outcome. `Failed` carries no job id when the
/// submission itself was rejected and no remote job was ever created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Outcome {
    Success {
        job_id: JobId,
    },
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<JobId>,
        reason: String,
    },
    Cancelled {
        job_id: JobId,
    },
    TimedOut {
        job_id: JobId,
    },
}

impl Outcome {
    /// Map a terminal status observed for `job_id` into an outcome.
    ///
    /// Returns `None` for non-terminal statuses.
    pub fn from_terminal(job_id: &JobId, status: &JobStatus) -> Option<Self> {
        match status {
            JobStatus::Succeeded => Some(Outcome::Success {
                job_id: job_id.clone(),
            }),
            JobStatus::Failed { reason } => Some(Outcome::Failed {
                job_id: Some(job_id.clone()),
                reason: reason.clone(),
            }),
            JobStatus::Cancelled => Some(Outcome::Cancelled {
                job_id: job_id.clone(),
            }),
            JobStatus::Pending | JobStatus::Running => None,
        }
    }

    /// Remote job id, if a job was created.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Outcome::Success { job_id }
            | Outcome::Cancelled { job_id }
            | Outcome::TimedOut { job_id } => Some(job_id),
            Outcome::Failed { job_id, .. } => job_id.as_ref(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::Failed { .. } => "failure",
            Outcome::Cancelled { .. } => "cancelled",
            Outcome::TimedOut { .. } => "timeout",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { job_id } => write!(f, "job {job_id} succeeded"),
            Outcome::Failed {
                job_id: Some(job_id),
                reason,
            } => write!(f, "job {job_id} failed: {reason}"),
            Outcome::Failed { job_id: None, reason } => write!(f, "submission failed: {reason}"),
            Outcome::Cancelled { job_id } => write!(f, "job {job_id} cancelled"),
            Outcome::TimedOut { job_id } => write!(f, "job {job_id} timed out"),
        }
    }
}
