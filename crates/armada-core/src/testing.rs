//! Scripted in-memory [`JobService`] for behaviour tests.
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use armada_model::{JobHandle, JobId, JobStatus};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ServiceError;
use crate::service::{JobService, StatusPush, SubmitRequest, SubmitResponseItem};

#[derive(Default)]
struct State {
    next_id: u64,
    submit_error: Option<ServiceError>,
    item_error: Option<String>,
    /// One entry consumed per status call; the last entry repeats.
    statuses: VecDeque<Result<JobStatus, ServiceError>>,
    push: Option<Vec<Result<JobStatus, ServiceError>>>,
    cancel_error: Option<ServiceError>,
    submits: Vec<SubmitRequest>,
    status_calls: usize,
    cancels: Vec<(JobId, String)>,
}

#[derive(Default)]
pub(crate) struct ScriptedService {
    state: Mutex<State>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_statuses<I>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = Result<JobStatus, ServiceError>>,
    {
        self.state.lock().unwrap().statuses = statuses.into_iter().collect();
        self
    }

    pub(crate) fn reporting(self, statuses: &[JobStatus]) -> Self {
        self.with_statuses(statuses.iter().cloned().map(Ok))
    }

    pub(crate) fn with_push<I>(self, items: I) -> Self
    where
        I: IntoIterator<Item = Result<JobStatus, ServiceError>>,
    {
        self.state.lock().unwrap().push = Some(items.into_iter().collect());
        self
    }

    pub(crate) fn failing_submit(self, err: ServiceError) -> Self {
        self.state.lock().unwrap().submit_error = Some(err);
        self
    }

    pub(crate) fn rejecting_items(self, reason: &str) -> Self {
        self.state.lock().unwrap().item_error = Some(reason.to_string());
        self
    }

    pub(crate) fn failing_cancel(self, err: ServiceError) -> Self {
        self.state.lock().unwrap().cancel_error = Some(err);
        self
    }

    pub(crate) fn submits(&self) -> Vec<SubmitRequest> {
        self.state.lock().unwrap().submits.clone()
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    pub(crate) fn cancels(&self) -> Vec<(JobId, String)> {
        self.state.lock().unwrap().cancels.clone()
    }
}

#[async_trait]
impl JobService for ScriptedService {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn submit(
        &self,
        request: SubmitRequest,
    ) -> Result<Vec<SubmitResponseItem>, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.submits.push(request.clone());
        if let Some(err) = state.submit_error.clone() {
            return Err(err);
        }
        let mut items = Vec::with_capacity(request.items.len());
        for _ in &request.items {
            if let Some(reason) = state.item_error.clone() {
                items.push(SubmitResponseItem::rejected(reason));
                continue;
            }
            state.next_id += 1;
            items.push(SubmitResponseItem::accepted(format!(
                "job-{:04}",
                state.next_id
            )));
        }
        Ok(items)
    }

    async fn status(&self, job_ids: &[JobId]) -> Result<HashMap<JobId, JobStatus>, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.status_calls += 1;
        let next = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        };
        match next {
            Some(Ok(status)) => Ok(job_ids
                .iter()
                .map(|id| (id.clone(), status.clone()))
                .collect()),
            Some(Err(err)) => Err(err),
            None => Ok(HashMap::new()),
        }
    }

    async fn cancel(&self, handle: &JobHandle, reason: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        state
            .cancels
            .push((handle.job_id().clone(), reason.to_string()));
        match state.cancel_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn supports_watch(&self) -> bool {
        self.state.lock().unwrap().push.is_some()
    }

    async fn watch(&self, _handle: &JobHandle) -> Result<StatusPush, ServiceError> {
        let items = self.state.lock().unwrap().push.clone().unwrap_or_default();
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            let _ = tx.try_send(item);
        }
        Ok(rx)
    }
}
