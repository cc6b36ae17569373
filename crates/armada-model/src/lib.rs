mod domain;
pub use domain::{
    Annotations, DEFAULT_PRIORITY, JobId, LOOKOUT_JOB_ID_PLACEHOLDER, MAX_IDEMPOTENCY_KEY_LEN,
    Priority, TimeoutMs, UnixMillis,
};

mod error;
pub use error::{ModelError, ModelResult};

mod job;
pub use job::{JobDescriptor, JobHandle, JobStatus, Outcome};

mod defer;
pub use defer::{ResumptionToken, Trigger, TriggerConfig, WakeReason};

mod strategy;
pub use strategy::{BackoffStrategy, JitterStrategy};
