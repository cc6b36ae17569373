//! Running a job as a taskvisor task.
//!
//! The supervisor owns retries: a failed task means the job outcome was not a success, and
//! re-running the task submits a new remote job.
use std::sync::Arc;
use std::time::Duration;

use armada_model::{BackoffStrategy, JobDescriptor, Outcome};
use taskvisor::{
    AdmissionPolicy, ControllerSpec, RestartPolicy, TaskError, TaskFn, TaskRef, TaskSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::JobError;
use crate::facade::{JobOrchestrator, into_job_result};
use crate::map::to_backoff_policy;

/// Wrap one job run into a [`TaskRef`].
///
/// Each task run clones `descriptor`; give it an idempotency key if supervisor restarts must
/// not create duplicate remote jobs.
pub fn job_task(
    orchestrator: Arc<JobOrchestrator>,
    name: impl Into<String>,
    descriptor: JobDescriptor,
    deferrable: bool,
) -> TaskRef {
    let name: String = name.into();
    TaskFn::arc(name, move |cancel: CancellationToken| {
        let orchestrator = Arc::clone(&orchestrator);
        let descriptor = descriptor.clone();
        async move {
            let result = orchestrator
                .run_job_with_cancel(descriptor, deferrable, cancel)
                .await;
            to_task_result(result)
        }
    })
}

/// Map a run result onto taskvisor's failure contract.
///
/// Rejections and broken configuration are fatal: re-running cannot fix them.
pub fn to_task_result(result: Result<Outcome, JobError>) -> Result<(), TaskError> {
    match result.and_then(into_job_result) {
        Ok(job_id) => {
            debug!(%job_id, "job task succeeded");
            Ok(())
        }
        Err(JobError::Cancelled { .. }) => Err(TaskError::Canceled),
        Err(err @ (JobError::Rejected { .. } | JobError::Config(_) | JobError::Token(_))) => {
            Err(TaskError::Fatal {
                reason: err.to_string(),
            })
        }
        Err(err) => Err(TaskError::Fail {
            reason: err.to_string(),
        }),
    }
}

/// Controller spec for a job task: one run at a time per slot, restarted on failure when
/// `restart_on_failure` is set, backing off per `retry`.
pub fn job_controller_spec(
    task: TaskRef,
    retry: &BackoffStrategy,
    restart_on_failure: bool,
    timeout: Option<Duration>,
) -> ControllerSpec {
    let restart = if restart_on_failure {
        RestartPolicy::OnFailure
    } else {
        RestartPolicy::Never
    };
    ControllerSpec::new(
        AdmissionPolicy::DropIfRunning,
        TaskSpec::new(task, restart, to_backoff_policy(retry), timeout),
    )
}
