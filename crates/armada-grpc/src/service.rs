use std::collections::HashMap;

use armada_core::{JobService, ServiceError, SubmitRequest, SubmitResponseItem};
use armada_model::{JobHandle, JobId, JobStatus};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::client::ArmadaClient;
use crate::config::ChannelConfig;
use crate::convert;
use crate::error::{GrpcError, service_error};
use crate::proto;

/// [`JobService`] backed by the Armada gRPC API.
///
/// Armada has no per-job status stream on this API surface, so watching falls back to polling.
#[derive(Clone, Debug)]
pub struct GrpcJobService {
    client: ArmadaClient,
}

impl GrpcJobService {
    pub fn new(client: ArmadaClient) -> Self {
        Self { client }
    }

    pub fn connect_lazy(cfg: &ChannelConfig) -> Result<Self, GrpcError> {
        Ok(Self::new(ArmadaClient::connect_lazy(cfg)?))
    }

    async fn failure_reasons(&self, job_ids: Vec<String>) -> HashMap<String, String> {
        if job_ids.is_empty() {
            return HashMap::new();
        }
        let mut client = self.client.clone();
        match client
            .get_job_errors(proto::JobErrorsRequest { job_ids })
            .await
        {
            Ok(resp) => resp.job_errors,
            Err(status) => {
                debug!(code = ?status.code(), "job errors unavailable; using state names");
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl JobService for GrpcJobService {
    fn name(&self) -> &'static str {
        "armada-grpc"
    }

    #[instrument(level = "trace", skip(self, request), fields(queue = %request.queue))]
    async fn submit(
        &self,
        request: SubmitRequest,
    ) -> Result<Vec<SubmitResponseItem>, ServiceError> {
        let mut client = self.client.clone();
        let response = client
            .submit_jobs(convert::submit_request(request))
            .await
            .map_err(service_error)?;
        Ok(response
            .job_response_items
            .into_iter()
            .map(convert::response_item)
            .collect())
    }

    async fn status(&self, job_ids: &[JobId]) -> Result<HashMap<JobId, JobStatus>, ServiceError> {
        let mut client = self.client.clone();
        let states = client
            .get_job_status(proto::JobStatusRequest {
                job_ids: job_ids.iter().map(JobId::to_string).collect(),
            })
            .await
            .map_err(service_error)?
            .job_states;

        let failed = states
            .iter()
            .filter(|(_, raw)| convert::is_failure(**raw))
            .map(|(id, _)| id.clone())
            .collect();
        let reasons = self.failure_reasons(failed).await;

        Ok(states
            .into_iter()
            .map(|(id, raw)| {
                let status = convert::job_status(raw, reasons.get(&id).map(String::as_str));
                (JobId::from(id), status)
            })
            .collect())
    }

    async fn cancel(&self, handle: &JobHandle, reason: &str) -> Result<(), ServiceError> {
        let mut client = self.client.clone();
        let result = client
            .cancel_jobs(convert::cancel_request(handle, reason))
            .await
            .map_err(service_error)?;
        debug!(cancelled = ?result.cancelled_ids, "cancel acknowledged");
        Ok(())
    }
}
