//! Armada API messages (package `api`), limited to the fields this client uses.
//!
//! `pod_spec` is kept as raw bytes: an embedded message and a `bytes` field share the same
//! wire encoding, and the payload format is owned by the caller.
use std::collections::HashMap;

pub const SUBMIT_JOBS_PATH: &str = "/api.Submit/SubmitJobs";
pub const CANCEL_JOBS_PATH: &str = "/api.Submit/CancelJobs";
pub const GET_JOB_STATUS_PATH: &str = "/api.Jobs/GetJobStatus";
pub const GET_JOB_ERRORS_PATH: &str = "/api.Jobs/GetJobErrors";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobSubmitRequestItem {
    #[prost(double, tag = "1")]
    pub priority: f64,
    #[prost(bytes = "vec", tag = "2")]
    pub pod_spec: Vec<u8>,
    #[prost(string, tag = "3")]
    pub namespace: String,
    #[prost(map = "string, string", tag = "4")]
    pub labels: HashMap<String, String>,
    #[prost(map = "string, string", tag = "5")]
    pub annotations: HashMap<String, String>,
    #[prost(string, tag = "8")]
    pub client_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobSubmitRequest {
    #[prost(string, tag = "1")]
    pub queue: String,
    #[prost(string, tag = "2")]
    pub job_set_id: String,
    #[prost(message, repeated, tag = "3")]
    pub job_request_items: Vec<JobSubmitRequestItem>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobSubmitResponseItem {
    #[prost(string, tag = "1")]
    pub job_id: String,
    #[prost(string, tag = "2")]
    pub error: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobSubmitResponse {
    #[prost(message, repeated, tag = "1")]
    pub job_response_items: Vec<JobSubmitResponseItem>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobCancelRequest {
    #[prost(string, tag = "1")]
    pub job_id: String,
    #[prost(string, tag = "2")]
    pub job_set_id: String,
    #[prost(string, tag = "3")]
    pub queue: String,
    #[prost(string, repeated, tag = "4")]
    pub job_ids: Vec<String>,
    #[prost(string, tag = "5")]
    pub reason: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CancellationResult {
    #[prost(string, repeated, tag = "1")]
    pub cancelled_ids: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobStatusRequest {
    #[prost(string, repeated, tag = "1")]
    pub job_ids: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobStatusResponse {
    #[prost(map = "string, enumeration(JobState)", tag = "1")]
    pub job_states: HashMap<String, i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobErrorsRequest {
    #[prost(string, repeated, tag = "1")]
    pub job_ids: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobErrorsResponse {
    #[prost(map = "string, string", tag = "1")]
    pub job_errors: HashMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum JobState {
    Queued = 0,
    Pending = 1,
    Running = 2,
    Succeeded = 3,
    Failed = 4,
    Unknown = 5,
    Submitted = 6,
    Leased = 7,
    Preempted = 8,
    Cancelled = 9,
    Rejected = 10,
}
