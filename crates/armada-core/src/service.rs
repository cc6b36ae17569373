use std::collections::HashMap;

use armada_model::{Annotations, JobDescriptor, JobHandle, JobId, JobStatus, Priority};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{ServiceError, ServiceErrorKind};

/// Receiving end of a server push stream of status updates for one job.
///
/// The stream ends when the sender is dropped; an `Err` item ends it as well.
pub type StatusPush = mpsc::Receiver<Result<JobStatus, ServiceError>>;

/// One job in a submission request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitItem {
    pub priority: Priority,
    pub namespace: String,
    pub payload: Vec<u8>,
    pub annotations: Annotations,
    pub labels: Annotations,
    /// Server-side deduplication key.
    pub client_id: Option<String>,
}

/// Batch submission against one queue and job set.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub queue: String,
    pub job_set: String,
    pub items: Vec<SubmitItem>,
}

impl SubmitRequest {
    /// Build a one-item request, moving the payload out of the descriptor.
    pub fn single(descriptor: JobDescriptor) -> Self {
        let queue = descriptor.queue().to_string();
        let job_set = descriptor.job_set().to_string();
        let item = SubmitItem {
            priority: descriptor.priority(),
            namespace: descriptor.namespace().to_string(),
            annotations: descriptor.annotations().clone(),
            labels: descriptor.labels().clone(),
            client_id: descriptor.idempotency_key().map(str::to_string),
            payload: descriptor.into_payload(),
        };
        Self {
            queue,
            job_set,
            items: vec![item],
        }
    }
}

/// Per-item submission result; exactly one of the fields is set by a well-behaved service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitResponseItem {
    pub job_id: Option<JobId>,
    pub error: Option<String>,
}

impl SubmitResponseItem {
    pub fn accepted(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: Some(job_id.into()),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            job_id: None,
            error: Some(error.into()),
        }
    }
}

/// Transport seam to the remote job service.
///
/// Implementations must be cheap to share (`Arc<dyn JobService>`) and safe for concurrent
/// calls. They perform exactly one remote call per method invocation and never retry.
#[async_trait]
pub trait JobService: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn submit(&self, request: SubmitRequest)
    -> Result<Vec<SubmitResponseItem>, ServiceError>;

    /// Current status of each requested job.
    ///
    /// Jobs the service does not know yet may be absent from the map.
    async fn status(&self, job_ids: &[JobId]) -> Result<HashMap<JobId, JobStatus>, ServiceError>;

    async fn cancel(&self, handle: &JobHandle, reason: &str) -> Result<(), ServiceError>;

    /// Whether [`JobService::watch`] is implemented.
    fn supports_watch(&self) -> bool {
        false
    }

    /// Open a push stream of status updates for `handle`.
    async fn watch(&self, handle: &JobHandle) -> Result<StatusPush, ServiceError> {
        Err(ServiceError::new(
            ServiceErrorKind::Unimplemented,
            format!("{} has no status stream for {}", self.name(), handle.job_id()),
        ))
    }
}
