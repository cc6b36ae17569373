use std::fmt;

use armada_model::{JobId, ModelError};
use thiserror::Error;

/// Classification of a failed call against the remote job service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    InvalidArgument,
    PermissionDenied,
    NotFound,
    /// Endpoint unreachable, overloaded or restarting.
    Unavailable,
    /// The call did not complete within its own timeout.
    DeadlineExceeded,
    /// The service does not implement the operation (e.g. push streams).
    Unimplemented,
    Internal,
}

impl ServiceErrorKind {
    /// Transient kinds may succeed when the same call is retried.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ServiceErrorKind::Unavailable | ServiceErrorKind::DeadlineExceeded
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceErrorKind::InvalidArgument => "invalid_argument",
            ServiceErrorKind::PermissionDenied => "permission_denied",
            ServiceErrorKind::NotFound => "not_found",
            ServiceErrorKind::Unavailable => "unavailable",
            ServiceErrorKind::DeadlineExceeded => "deadline_exceeded",
            ServiceErrorKind::Unimplemented => "unimplemented",
            ServiceErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a [`crate::JobService`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unavailable, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::InvalidArgument, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Failure reported by the host scheduler.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("host refused to park job: {0}")]
    Rejected(String),

    #[error("host queue is closed")]
    Closed,

    #[error("token store error: {0}")]
    Store(String),
}

/// Errors surfaced by the submission client, watcher, bridge and facade.
#[derive(Debug, Error)]
pub enum JobError {
    /// The remote service could not be reached, or kept failing transiently.
    #[error("transport error during {operation}: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// The job was refused and never created; retrying the same descriptor will not help.
    #[error("submission rejected ({kind}): {message}")]
    Rejected {
        kind: ServiceErrorKind,
        message: String,
    },

    #[error("remote job {job_id} failed: {reason}")]
    RemoteJobFailed { job_id: JobId, reason: String },

    #[error("deadline exceeded while waiting for job {job_id}")]
    Timeout { job_id: JobId },

    #[error("waiting for job {job_id} was cancelled")]
    Cancelled { job_id: JobId },

    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("resumption token error: {0}")]
    Token(#[from] ModelError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl JobError {
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        JobError::Transport {
            operation,
            message: message.into(),
        }
    }

    /// Classify a service error raised by `operation`.
    ///
    /// Invalid-argument and permission errors become [`JobError::Rejected`]; everything else is
    /// reported as transport trouble.
    pub fn from_service(operation: &'static str, err: ServiceError) -> Self {
        match err.kind {
            ServiceErrorKind::InvalidArgument | ServiceErrorKind::PermissionDenied => {
                JobError::Rejected {
                    kind: err.kind,
                    message: err.message,
                }
            }
            _ => JobError::Transport {
                operation,
                message: err.to_string(),
            },
        }
    }

    /// Returns `true` if a fresh attempt (new watch session, next wake) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::Transport { .. })
    }
}
