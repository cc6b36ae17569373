use std::sync::Arc;
use std::time::Duration;

use armada_model::{JobDescriptor, JobHandle, JobId, LOOKOUT_JOB_ID_PLACEHOLDER};
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::error::{JobError, ServiceErrorKind};
use crate::metrics::{MetricsHandle, noop_metrics};
use crate::service::{JobService, SubmitRequest};

/// Turns one [`JobDescriptor`] into one remote job.
///
/// Stateless apart from shared handles; cloning is cheap.
#[derive(Clone)]
pub struct SubmissionClient {
    service: Arc<dyn JobService>,
    clock: Clock,
    metrics: MetricsHandle,
    lookout_url_template: Option<String>,
}

impl SubmissionClient {
    pub fn new(service: Arc<dyn JobService>) -> Self {
        Self {
            service,
            clock: Clock::system(),
            metrics: noop_metrics(),
            lookout_url_template: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_lookout_url_template(mut self, template: Option<String>) -> Self {
        self.lookout_url_template = template;
        self
    }

    pub fn service(&self) -> &Arc<dyn JobService> {
        &self.service
    }

    /// Render the job UI link for `job_id`, if a template is configured.
    pub fn lookout_url(&self, job_id: &JobId) -> Option<String> {
        self.lookout_url_template
            .as_ref()
            .map(|t| t.replace(LOOKOUT_JOB_ID_PLACEHOLDER, job_id.as_str()))
    }

    /// Submit the descriptor with exactly one remote call.
    ///
    /// Never retries: a caller that retries after a transport error may create a second job
    /// unless the descriptor carries an idempotency key.
    #[instrument(
        level = "debug",
        skip(self, descriptor),
        fields(queue = %descriptor.queue(), job_set = %descriptor.job_set())
    )]
    pub async fn submit(&self, descriptor: JobDescriptor) -> Result<JobHandle, JobError> {
        descriptor.validate().map_err(|e| JobError::Rejected {
            kind: ServiceErrorKind::InvalidArgument,
            message: e.to_string(),
        })?;

        let queue = descriptor.queue().to_string();
        let job_set = descriptor.job_set().to_string();
        let request = SubmitRequest::single(descriptor);
        debug!(
            service = self.service.name(),
            payload_len = request.items[0].payload.len(),
            "submitting job"
        );

        let mut items = self.service.submit(request).await.map_err(|e| {
            if e.is_transient() {
                self.metrics.record_transport_error("submit");
            }
            JobError::from_service("submit", e)
        })?;
        if items.len() != 1 {
            return Err(JobError::transport(
                "submit",
                format!("expected one response item, got {}", items.len()),
            ));
        }
        let item = items.remove(0);
        if let Some(message) = item.error.filter(|e| !e.is_empty()) {
            return Err(JobError::Rejected {
                kind: ServiceErrorKind::InvalidArgument,
                message,
            });
        }
        let job_id = item
            .job_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| JobError::transport("submit", "response carried no job id"))?;

        let handle = JobHandle::new(job_id, queue, job_set, self.clock.now_ms());
        self.metrics.record_job_submitted(handle.queue());
        match self.lookout_url(handle.job_id()) {
            Some(url) => info!(job_id = %handle.job_id(), %url, "job submitted"),
            None => info!(job_id = %handle.job_id(), "job submitted"),
        }
        Ok(handle)
    }
}

/// Ask the remote service to cancel `handle`, bounded by `timeout`.
///
/// Failures are logged and reported as `false`; they never escalate.
pub async fn cancel_best_effort(
    service: Arc<dyn JobService>,
    handle: JobHandle,
    reason: String,
    timeout: Duration,
    metrics: MetricsHandle,
) -> bool {
    match tokio::time::timeout(timeout, service.cancel(&handle, &reason)).await {
        Ok(Ok(())) => {
            info!(job_id = %handle.job_id(), %reason, "remote job cancel requested");
            true
        }
        Ok(Err(e)) => {
            if e.is_transient() {
                metrics.record_transport_error("cancel");
            }
            warn!(job_id = %handle.job_id(), error = %e, "remote cancel failed; job may keep running");
            false
        }
        Err(_) => {
            warn!(job_id = %handle.job_id(), ?timeout, "remote cancel timed out; job may keep running");
            false
        }
    }
}
