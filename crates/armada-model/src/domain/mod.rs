mod annotations;
pub use annotations::Annotations;

mod constants;
pub use constants::{DEFAULT_PRIORITY, LOOKOUT_JOB_ID_PLACEHOLDER, MAX_IDEMPOTENCY_KEY_LEN};

mod id;
pub use id::JobId;

/// Per-queue priority of a job. Lower values are scheduled first by the remote service.
pub type Priority = u32;

/// Timeout value in milliseconds.
pub type TimeoutMs = u64;

/// Wall-clock instant expressed as milliseconds since the Unix epoch.
///
/// Resumption state stores absolute instants in this form so it stays meaningful across process restarts.
pub type UnixMillis = u64;
