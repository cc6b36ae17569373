use armada_model::Outcome;

use crate::metrics::backend::MetricsBackend;

/// Backend that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_job_submitted(&self, _: &str) {}

    #[inline(always)]
    fn record_job_resolved(&self, _: &str, _: &Outcome, _: u64) {}

    #[inline(always)]
    fn record_transport_error(&self, _: &str) {}
}
