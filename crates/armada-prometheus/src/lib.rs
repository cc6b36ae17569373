//! Prometheus implementation of [`armada_core::MetricsBackend`].
//!
//! ## Metrics
//! - `armada_jobs_submitted_total{queue}` - Counter
//! - `armada_jobs_resolved_total{queue, outcome}` - Counter
//! - `armada_job_duration_seconds{queue, outcome}` - Histogram
//! - `armada_transport_errors_total{operation}` - Counter
//!
//! No `/metrics` endpoint is served here; encode [`PrometheusMetrics::gather`] with a
//! [`TextEncoder`] from whatever HTTP surface the host already has.
mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
