use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Annotations, DEFAULT_PRIORITY, MAX_IDEMPOTENCY_KEY_LEN, Priority,
    error::{ModelError, ModelResult},
};

/// Everything needed to submit one unit of work to the remote service.
///
/// A descriptor is assembled once with the builder-style `with_*` helpers and then handed
/// by value to the submission client. It is never mutated afterwards.
///
/// The payload is opaque to this crate: typically a serialized pod spec, forwarded verbatim.
///
/// ```rust
/// use armada_model::JobDescriptor;
///
/// let job = JobDescriptor::new("test", "personal-anonymous", b"<pod spec>".to_vec())
///     .with_priority(1)
///     .with_annotation("armadaproject.io/hello", "world");
///
/// assert_eq!(job.job_set(), "test");
/// assert!(job.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    priority: Priority,
    queue: String,
    /// Job set the submission is grouped under. Defaults to the queue name.
    job_set: String,
    namespace: String,
    payload: Vec<u8>,
    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    annotations: Annotations,
    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    labels: Annotations,
    /// Caller-assigned key forwarded to the remote service to deduplicate retried submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    idempotency_key: Option<String>,
}

impl JobDescriptor {
    /// Create a descriptor with default priority, no metadata and `job_set == queue`.
    pub fn new(queue: impl Into<String>, namespace: impl Into<String>, payload: Vec<u8>) -> Self {
        let queue = queue.into();
        Self {
            priority: DEFAULT_PRIORITY,
            job_set: queue.clone(),
            queue,
            namespace: namespace.into(),
            payload,
            annotations: Annotations::new(),
            labels: Annotations::new(),
            idempotency_key: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_job_set(mut self, job_set: impl Into<String>) -> Self {
        self.job_set = job_set.into();
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key, value);
        self
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key, value);
        self
    }

    /// Attach a caller-chosen idempotency key.
    ///
    /// Resubmitting a descriptor with the same key lets the remote service return the
    /// already-created job instead of creating a duplicate.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Attach a freshly generated random idempotency key.
    pub fn with_generated_idempotency_key(self) -> Self {
        self.with_idempotency_key(uuid::Uuid::new_v4().to_string())
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn job_set(&self) -> &str {
        &self.job_set
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the descriptor, keeping only the payload bytes.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn labels(&self) -> &Annotations {
        &self.labels
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    /// Validate the descriptor before it is sent anywhere.
    ///
    /// Rules:
    /// - `queue`, `job_set` and `namespace` are not empty or whitespace-only;
    /// - the idempotency key, when present, is non-empty and at most [`MAX_IDEMPOTENCY_KEY_LEN`] bytes.
    pub fn validate(&self) -> ModelResult<()> {
        if self.queue.trim().is_empty() {
            return Err(ModelError::InvalidDescriptor("queue cannot be empty".into()));
        }
        if self.job_set.trim().is_empty() {
            return Err(ModelError::InvalidDescriptor("job set cannot be empty".into()));
        }
        if self.namespace.trim().is_empty() {
            return Err(ModelError::InvalidDescriptor("namespace cannot be empty".into()));
        }
        if let Some(key) = &self.idempotency_key {
            if key.trim().is_empty() {
                return Err(ModelError::InvalidDescriptor(
                    "idempotency key cannot be empty".into(),
                ));
            }
            if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
                return Err(ModelError::InvalidDescriptor(format!(
                    "idempotency key exceeds {MAX_IDEMPOTENCY_KEY_LEN} bytes"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("priority", &self.priority)
            .field("queue", &self.queue)
            .field("job_set", &self.job_set)
            .field("namespace", &self.namespace)
            .field("payload_len", &self.payload.len())
            .field("annotations", &self.annotations)
            .field("labels", &self.labels)
            .field("idempotency_key", &self.idempotency_key)
            .finish()
    }
}
