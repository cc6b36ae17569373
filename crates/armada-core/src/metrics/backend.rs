use std::sync::Arc;

use armada_model::Outcome;

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record a job accepted by the remote service.
    fn record_job_submitted(&self, queue: &str);

    /// Record a resolved job.
    ///
    /// # Arguments
    /// - `queue`: queue the job was submitted to
    /// - `outcome`: final outcome, labelled via [`Outcome::as_label`]
    /// - `duration_ms`: time from submission request to resolution
    fn record_job_resolved(&self, queue: &str, outcome: &Outcome, duration_ms: u64);

    /// Record a transient transport failure of a remote call (`submit`, `status`, `cancel`, `watch`).
    fn record_transport_error(&self, operation: &str);
}

/// Shared handle to a metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
