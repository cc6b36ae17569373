use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::Channel;
use tonic::{Request, Status};
use tracing::trace;

use crate::config::ChannelConfig;
use crate::error::GrpcError;
use crate::proto;

/// Minimal unary client for the Armada `Submit` and `Jobs` services.
///
/// Cloning shares the underlying channel; every call works on its own clone.
#[derive(Clone, Debug)]
pub struct ArmadaClient {
    inner: Grpc<Channel>,
    auth: Option<MetadataValue<Ascii>>,
}

impl ArmadaClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
            auth: None,
        }
    }

    /// Lazily connected client for `cfg`.
    pub fn connect_lazy(cfg: &ChannelConfig) -> Result<Self, GrpcError> {
        let mut client = Self::new(cfg.connect_lazy()?);
        client.auth = cfg.auth_header()?;
        Ok(client)
    }

    pub async fn submit_jobs(
        &mut self,
        request: proto::JobSubmitRequest,
    ) -> Result<proto::JobSubmitResponse, Status> {
        self.unary(proto::SUBMIT_JOBS_PATH, request).await
    }

    pub async fn cancel_jobs(
        &mut self,
        request: proto::JobCancelRequest,
    ) -> Result<proto::CancellationResult, Status> {
        self.unary(proto::CANCEL_JOBS_PATH, request).await
    }

    pub async fn get_job_status(
        &mut self,
        request: proto::JobStatusRequest,
    ) -> Result<proto::JobStatusResponse, Status> {
        self.unary(proto::GET_JOB_STATUS_PATH, request).await
    }

    pub async fn get_job_errors(
        &mut self,
        request: proto::JobErrorsRequest,
    ) -> Result<proto::JobErrorsResponse, Status> {
        self.unary(proto::GET_JOB_ERRORS_PATH, request).await
    }

    async fn unary<Req, Resp>(&mut self, path: &'static str, message: Req) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unavailable(format!("channel not ready: {e}")))?;

        let mut request = Request::new(message);
        if let Some(auth) = &self.auth {
            request.metadata_mut().insert("authorization", auth.clone());
        }
        trace!(path, "grpc call");
        let response = self
            .inner
            .unary(request, PathAndQuery::from_static(path), ProstCodec::<Req, Resp>::default())
            .await?;
        Ok(response.into_inner())
    }
}
