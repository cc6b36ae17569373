//! In-process Armada server for exercising the client over a real channel.
//!
//! The service impls follow the shape of tonic-generated servers, routing on the request path.
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::net::TcpListener;
use tonic::body::{BoxBody, empty_body};
use tonic::codec::ProstCodec;
use tonic::codegen::{Body, BoxFuture, Service, StdError, http};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::transport::Server;
use tonic::transport::server::TcpIncoming;
use tonic::{Code, Request, Response, Status};

use crate::proto::{self, JobState};

#[derive(Default)]
struct State {
    next_id: u64,
    item_error: Option<String>,
    /// State reported for every job this server accepted.
    submitted_state: Option<JobState>,
    states: HashMap<String, JobState>,
    job_errors: HashMap<String, String>,
    status_unavailable: bool,
    errors_unavailable: bool,
    submits: Vec<proto::JobSubmitRequest>,
    error_requests: Vec<proto::JobErrorsRequest>,
    cancels: Vec<proto::JobCancelRequest>,
}

impl State {
    fn submit(&mut self, req: proto::JobSubmitRequest) -> Result<proto::JobSubmitResponse, Status> {
        let mut items = Vec::with_capacity(req.job_request_items.len());
        for _ in &req.job_request_items {
            if let Some(error) = &self.item_error {
                items.push(proto::JobSubmitResponseItem {
                    job_id: String::new(),
                    error: error.clone(),
                });
                continue;
            }
            self.next_id += 1;
            let job_id = format!("job-{:04}", self.next_id);
            if let Some(state) = self.submitted_state {
                self.states.insert(job_id.clone(), state);
            }
            items.push(proto::JobSubmitResponseItem {
                job_id,
                error: String::new(),
            });
        }
        self.submits.push(req);
        Ok(proto::JobSubmitResponse {
            job_response_items: items,
        })
    }

    fn status(&mut self, req: proto::JobStatusRequest) -> Result<proto::JobStatusResponse, Status> {
        if self.status_unavailable {
            return Err(Status::unavailable("scheduler restarting"));
        }
        let job_states = req
            .job_ids
            .iter()
            .filter_map(|id| self.states.get(id).map(|s| (id.clone(), *s as i32)))
            .collect();
        Ok(proto::JobStatusResponse { job_states })
    }

    fn errors(&mut self, req: proto::JobErrorsRequest) -> Result<proto::JobErrorsResponse, Status> {
        let job_errors = req
            .job_ids
            .iter()
            .filter_map(|id| self.job_errors.get(id).map(|e| (id.clone(), e.clone())))
            .collect();
        self.error_requests.push(req);
        if self.errors_unavailable {
            return Err(Status::internal("lookout database unavailable"));
        }
        Ok(proto::JobErrorsResponse { job_errors })
    }

    fn cancel(
        &mut self,
        req: proto::JobCancelRequest,
    ) -> Result<proto::CancellationResult, Status> {
        let cancelled_ids = vec![req.job_id.clone()];
        self.cancels.push(req);
        Ok(proto::CancellationResult { cancelled_ids })
    }
}

/// Scripted Armada server answering `api.Submit` and `api.Jobs` calls.
#[derive(Clone, Default)]
pub(crate) struct FakeArmada {
    state: Arc<Mutex<State>>,
}

impl FakeArmada {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_state(self, job_id: &str, state: JobState) -> Self {
        self.lock().states.insert(job_id.to_string(), state);
        self
    }

    pub(crate) fn with_job_error(self, job_id: &str, reason: &str) -> Self {
        self.lock()
            .job_errors
            .insert(job_id.to_string(), reason.to_string());
        self
    }

    pub(crate) fn finishing_as(self, state: JobState) -> Self {
        self.lock().submitted_state = Some(state);
        self
    }

    pub(crate) fn rejecting_items(self, reason: &str) -> Self {
        self.lock().item_error = Some(reason.to_string());
        self
    }

    pub(crate) fn failing_status(self) -> Self {
        self.lock().status_unavailable = true;
        self
    }

    pub(crate) fn failing_job_errors(self) -> Self {
        self.lock().errors_unavailable = true;
        self
    }

    pub(crate) fn submits(&self) -> Vec<proto::JobSubmitRequest> {
        self.lock().submits.clone()
    }

    pub(crate) fn error_requests(&self) -> Vec<proto::JobErrorsRequest> {
        self.lock().error_requests.clone()
    }

    pub(crate) fn cancels(&self) -> Vec<proto::JobCancelRequest> {
        self.lock().cancels.clone()
    }

    /// Serve on an ephemeral local port until the runtime shuts down.
    pub(crate) async fn serve(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let incoming = TcpIncoming::from_listener(listener, true, None).unwrap();
        let router = Server::builder()
            .add_service(SubmitServer(Arc::clone(&self.state)))
            .add_service(JobsServer(Arc::clone(&self.state)));
        tokio::spawn(router.serve_with_incoming(incoming));
        addr
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

struct Handler<F>(F);

impl<Req, Resp, F> UnaryService<Req> for Handler<F>
where
    F: FnMut(Req) -> Result<Resp, Status>,
{
    type Response = Resp;
    type Future = std::future::Ready<Result<Response<Resp>, Status>>;

    fn call(&mut self, request: Request<Req>) -> Self::Future {
        std::future::ready((self.0)(request.into_inner()).map(Response::new))
    }
}

async fn unary<B, Req, Resp, F>(req: http::Request<B>, handler: F) -> http::Response<BoxBody>
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
    Req: prost::Message + Default + Send + 'static,
    Resp: prost::Message + Send + 'static,
    F: FnMut(Req) -> Result<Resp, Status> + Send + 'static,
{
    let mut grpc = Grpc::new(ProstCodec::<Resp, Req>::default());
    grpc.unary(Handler(handler), req).await
}

fn unimplemented() -> http::Response<BoxBody> {
    let mut response = http::Response::new(empty_body());
    let headers = response.headers_mut();
    headers.insert("grpc-status", http::HeaderValue::from(Code::Unimplemented as i32));
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/grpc"),
    );
    response
}

async fn dispatch<B>(
    state: Arc<Mutex<State>>,
    req: http::Request<B>,
) -> Result<http::Response<BoxBody>, Infallible>
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    let path = req.uri().path().to_string();
    let response = match path.as_str() {
        proto::SUBMIT_JOBS_PATH => {
            unary(req, move |r: proto::JobSubmitRequest| state.lock().unwrap().submit(r)).await
        }
        proto::CANCEL_JOBS_PATH => {
            unary(req, move |r: proto::JobCancelRequest| state.lock().unwrap().cancel(r)).await
        }
        proto::GET_JOB_STATUS_PATH => {
            unary(req, move |r: proto::JobStatusRequest| state.lock().unwrap().status(r)).await
        }
        proto::GET_JOB_ERRORS_PATH => {
            unary(req, move |r: proto::JobErrorsRequest| state.lock().unwrap().errors(r)).await
        }
        _ => unimplemented(),
    };
    Ok(response)
}

macro_rules! named_server {
    ($server:ident, $name:literal) => {
        #[derive(Clone)]
        struct $server(Arc<Mutex<State>>);

        impl NamedService for $server {
            const NAME: &'static str = $name;
        }

        impl<B> Service<http::Request<B>> for $server
        where
            B: Body + Send + 'static,
            B::Error: Into<StdError> + Send + 'static,
        {
            type Response = http::Response<BoxBody>;
            type Error = Infallible;
            type Future = BoxFuture<Self::Response, Self::Error>;

            fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
                Poll::Ready(Ok(()))
            }

            fn call(&mut self, req: http::Request<B>) -> Self::Future {
                Box::pin(dispatch(Arc::clone(&self.0), req))
            }
        }
    };
}

named_server!(SubmitServer, "api.Submit");
named_server!(JobsServer, "api.Jobs");
