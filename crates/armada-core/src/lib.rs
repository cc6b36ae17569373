//! Deferrable remote-job submission and watching.
//!
//! Layers, leaves first:
//! - [`JobService`]: transport seam to the remote job service (see `armada-grpc`);
//! - [`SubmissionClient`]: one descriptor in, one remote job out;
//! - [`StatusWatcher`] / [`WatchSession`]: lazy, monotonic status observation;
//! - [`DeferralBridge`]: parks a job with a [`Host`] scheduler and resumes it from a token;
//! - [`JobOrchestrator`]: `run_job(descriptor, deferrable)`.
mod clock;
pub use clock::Clock;

mod config;
pub use config::OrchestratorConfig;

mod error;
pub use error::{HostError, JobError, ServiceError, ServiceErrorKind};

mod service;
pub use service::{JobService, StatusPush, SubmitItem, SubmitRequest, SubmitResponseItem};

mod metrics;
pub use metrics::{MetricsBackend, MetricsHandle, NoOpMetrics, noop_metrics};

mod submit;
pub use submit::{SubmissionClient, cancel_best_effort};

mod watch;
pub use watch::{StatusWatcher, WatchSession};

mod bridge;
pub use bridge::{
    BridgeConfig, BridgeState, DeferralBridge, EventNotifier, FileTokenStore, Host, LocalHost,
    Parked, ParkedQueue, TokenStore,
};

mod facade;
pub use facade::{JobOrchestrator, into_job_result};

mod map;

mod task;
pub use task::{job_controller_spec, job_task, to_task_result};

#[cfg(test)]
mod testing;

pub mod prelude {
    pub use crate::bridge::{BridgeState, DeferralBridge, Host};
    pub use crate::error::{JobError, ServiceError};
    pub use crate::facade::JobOrchestrator;
    pub use crate::service::JobService;
    pub use armada_model::{JobDescriptor, JobHandle, JobStatus, Outcome, ResumptionToken};
}
