use std::fmt;

use serde::{Deserialize, Serialize};

/// Observed state of a remote job.
///
/// Statuses form a lattice `Pending < Running < {Succeeded, Failed, Cancelled}`.
/// A job never leaves a terminal state, and watchers only ever report statuses of
/// strictly increasing [`rank`](JobStatus::rank).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum JobStatus {
    /// Accepted by the remote service but not yet running.
    Pending,
    /// Running on the cluster.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished unsuccessfully.
    Failed {
        /// Human-readable reason reported by the remote service.
        reason: String,
    },
    /// Cancelled, either remotely or at the client's request.
    Cancelled,
}

impl JobStatus {
    /// Convenience constructor for [`JobStatus::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        JobStatus::Failed {
            reason: reason.into(),
        }
    }

    /// Returns `true` for `Succeeded`, `Failed` and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed { .. } | JobStatus::Cancelled
        )
    }

    /// Position in the `Pending → Running → Terminal` lattice.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Succeeded | JobStatus::Failed { .. } | JobStatus::Cancelled => 2,
        }
    }

    /// Returns `true` if `self` may be reported after `previous`.
    ///
    /// Anything may follow "nothing seen yet"; otherwise the rank must strictly increase,
    /// which also rejects every status after a terminal one.
    pub fn advances(&self, previous: Option<&JobStatus>) -> bool {
        match previous {
            None => true,
            Some(prev) => self.rank() > prev.rank(),
        }
    }

    /// Returns the status name as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed { .. } => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Failed { reason } if !reason.is_empty() => write!(f, "failed: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}
