use std::sync::Arc;

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry, proto::MetricFamily};

use armada_core::MetricsBackend;
use armada_model::Outcome;

const NAMESPACE: &str = "armada";

/// Remote jobs run from seconds to hours.
const DURATION_BUCKETS: &[f64] = &[
    1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0,
];

/// Prometheus metrics backend.
///
/// Label values are bounded: `queue` comes from configuration, `outcome` from
/// [`Outcome::as_label`] and `operation` is one of `submit`, `status`, `cancel`, `watch`.
#[derive(Clone)]
pub struct PrometheusMetrics {
    jobs_submitted: CounterVec,
    jobs_resolved: CounterVec,
    job_duration: HistogramVec,
    transport_errors: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Register the job metrics in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let jobs_submitted = CounterVec::new(
            Opts::new("jobs_submitted_total", "Jobs accepted by the remote service")
                .namespace(NAMESPACE),
            &["queue"],
        )?;
        registry.register(Box::new(jobs_submitted.clone()))?;

        let jobs_resolved = CounterVec::new(
            Opts::new("jobs_resolved_total", "Jobs that reached a final outcome")
                .namespace(NAMESPACE),
            &["queue", "outcome"],
        )?;
        registry.register(Box::new(jobs_resolved.clone()))?;

        let job_duration = HistogramVec::new(
            HistogramOpts::new(
                "job_duration_seconds",
                "Time from submission to final outcome in seconds",
            )
            .namespace(NAMESPACE)
            .buckets(DURATION_BUCKETS.to_vec()),
            &["queue", "outcome"],
        )?;
        registry.register(Box::new(job_duration.clone()))?;

        let transport_errors = CounterVec::new(
            Opts::new(
                "transport_errors_total",
                "Transient failures talking to the remote service",
            )
            .namespace(NAMESPACE),
            &["operation"],
        )?;
        registry.register(Box::new(transport_errors.clone()))?;

        Ok(Self {
            jobs_submitted,
            jobs_resolved,
            job_duration,
            transport_errors,
            registry,
        })
    }

    /// Backend with a private registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Collect all registered families for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_job_submitted(&self, queue: &str) {
        self.jobs_submitted.with_label_values(&[queue]).inc();
    }

    fn record_job_resolved(&self, queue: &str, outcome: &Outcome, duration_ms: u64) {
        let labels = [queue, outcome.as_label()];
        self.jobs_resolved.with_label_values(&labels).inc();
        self.job_duration
            .with_label_values(&labels)
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_transport_error(&self, operation: &str) {
        self.transport_errors.with_label_values(&[operation]).inc();
    }
}
