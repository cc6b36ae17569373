use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use armada_core::OrchestratorConfig;
use armada_grpc::{ChannelConfig, ContainerSpec};
use armada_model::{Annotations, DEFAULT_PRIORITY, JobDescriptor, Priority};
use armada_observe::LoggerConfig;

/// Overrides `channel.endpoint` when set.
pub const ENDPOINT_ENV: &str = "ARMADA_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    pub logger: LoggerConfig,
    pub channel: ChannelConfig,
    pub orchestrator: OrchestratorConfig,
    pub job: JobConfig,
    /// Directory for resumption tokens; parked jobs survive a restart when set.
    pub token_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            channel: ChannelConfig::default(),
            orchestrator: OrchestratorConfig {
                deferrable: true,
                lookout_url_template: Some("http://127.0.0.1:8089/jobs?job_id=<job_id>".into()),
                ..Default::default()
            },
            job: JobConfig::default(),
            token_dir: None,
        }
    }
}

impl AgentConfig {
    /// Read `path` if given, otherwise start from defaults; then apply `endpoint_override`.
    pub fn load(path: Option<&Path>, endpoint_override: Option<String>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        if let Some(endpoint) = endpoint_override.filter(|e| !e.trim().is_empty()) {
            cfg.channel.endpoint = endpoint;
        }
        cfg.channel.validate()?;
        cfg.orchestrator.validate()?;
        Ok(cfg)
    }
}

/// The job the agent submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobConfig {
    pub queue: String,
    pub namespace: String,
    pub job_set: Option<String>,
    pub priority: Priority,
    pub annotations: Annotations,
    pub labels: Annotations,
    pub idempotency_key: Option<String>,
    pub container: ContainerSpec,
    /// Pre-encoded `PodSpec` bytes; replaces `container` when set.
    pub payload_file: Option<PathBuf>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            queue: "test".into(),
            namespace: "personal-anonymous".into(),
            job_set: None,
            priority: DEFAULT_PRIORITY,
            annotations: [("armadaproject.io/hello", "world")].into_iter().collect(),
            labels: Annotations::default(),
            idempotency_key: None,
            container: ContainerSpec::default(),
            payload_file: None,
        }
    }
}

impl JobConfig {
    pub fn descriptor(&self) -> anyhow::Result<JobDescriptor> {
        let payload = match &self.payload_file {
            Some(path) => std::fs::read(path)
                .with_context(|| format!("reading payload {}", path.display()))?,
            None => self.container.encode_payload()?,
        };

        let mut descriptor = JobDescriptor::new(&self.queue, &self.namespace, payload)
            .with_priority(self.priority)
            .with_annotations(self.annotations.clone());
        for (key, value) in self.labels.iter() {
            descriptor = descriptor.with_label(key, value);
        }
        if let Some(job_set) = &self.job_set {
            descriptor = descriptor.with_job_set(job_set);
        }
        descriptor = match &self.idempotency_key {
            Some(key) => descriptor.with_idempotency_key(key),
            None => descriptor.with_generated_idempotency_key(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}
