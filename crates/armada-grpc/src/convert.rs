use armada_core::{SubmitItem, SubmitRequest, SubmitResponseItem};
use armada_model::{JobHandle, JobId, JobStatus};

use crate::proto::{self, JobState};

pub(crate) fn submit_request(request: SubmitRequest) -> proto::JobSubmitRequest {
    proto::JobSubmitRequest {
        queue: request.queue,
        job_set_id: request.job_set,
        job_request_items: request.items.into_iter().map(submit_item).collect(),
    }
}

fn submit_item(item: SubmitItem) -> proto::JobSubmitRequestItem {
    proto::JobSubmitRequestItem {
        priority: f64::from(item.priority),
        pod_spec: item.payload,
        namespace: item.namespace,
        labels: item.labels.to_hash_map(),
        annotations: item.annotations.to_hash_map(),
        client_id: item.client_id.unwrap_or_default(),
    }
}

pub(crate) fn response_item(item: proto::JobSubmitResponseItem) -> SubmitResponseItem {
    SubmitResponseItem {
        job_id: Some(item.job_id)
            .filter(|id| !id.is_empty())
            .map(JobId::from),
        error: Some(item.error).filter(|e| !e.is_empty()),
    }
}

pub(crate) fn cancel_request(handle: &JobHandle, reason: &str) -> proto::JobCancelRequest {
    proto::JobCancelRequest {
        job_id: handle.job_id().to_string(),
        job_set_id: handle.job_set().to_string(),
        queue: handle.queue().to_string(),
        job_ids: Vec::new(),
        reason: reason.to_string(),
    }
}

/// Whether a raw state needs a failure reason from `GetJobErrors`.
pub(crate) fn is_failure(raw: i32) -> bool {
    matches!(
        JobState::try_from(raw),
        Ok(JobState::Failed | JobState::Preempted | JobState::Rejected)
    )
}

/// Collapse the remote state machine onto [`JobStatus`].
///
/// States the client does not know are treated as pending: they cannot be terminal
/// without the service saying so.
pub(crate) fn job_status(raw: i32, reason: Option<&str>) -> JobStatus {
    let fallback = |default: &str| {
        JobStatus::failed(reason.filter(|r| !r.is_empty()).unwrap_or(default))
    };
    match JobState::try_from(raw) {
        Ok(JobState::Running) => JobStatus::Running,
        Ok(JobState::Succeeded) => JobStatus::Succeeded,
        Ok(JobState::Cancelled) => JobStatus::Cancelled,
        Ok(JobState::Failed) => fallback("job failed"),
        Ok(JobState::Preempted) => fallback("job preempted"),
        Ok(JobState::Rejected) => fallback("job rejected"),
        Ok(
            JobState::Queued
            | JobState::Submitted
            | JobState::Leased
            | JobState::Pending
            | JobState::Unknown,
        )
        | Err(_) => JobStatus::Pending,
    }
}
