//! Common model-level constants.

/// Priority used when a descriptor does not set one explicitly.
pub const DEFAULT_PRIORITY: u32 = 1;

/// Upper bound for a caller-supplied idempotency key.
///
/// The remote service stores the key alongside the job, so it is kept short.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Placeholder replaced by the job id when rendering a lookout URL template.
///
/// Example template: `http://127.0.0.1:8089/jobs?job_id=<job_id>`.
pub const LOOKOUT_JOB_ID_PLACEHOLDER: &str = "<job_id>";
