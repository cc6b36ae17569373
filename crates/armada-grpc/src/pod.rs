//! Minimal Kubernetes `PodSpec` encoding for job payloads.
//!
//! Only single-container pods with resource requests, limits and a run-as user are covered;
//! callers with richer pods encode them elsewhere and hand the bytes to `JobDescriptor`
//! directly.
use std::collections::HashMap;

use prost::Message;
use serde::{Deserialize, Serialize};

use crate::GrpcError;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PodSpec {
    #[prost(message, repeated, tag = "2")]
    pub containers: Vec<Container>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Container {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub image: String,
    #[prost(string, repeated, tag = "4")]
    pub args: Vec<String>,
    #[prost(message, optional, tag = "8")]
    pub resources: Option<ResourceRequirements>,
    #[prost(message, optional, tag = "15")]
    pub security_context: Option<SecurityContext>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SecurityContext {
    #[prost(int64, optional, tag = "4")]
    pub run_as_user: Option<i64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResourceRequirements {
    #[prost(map = "string, message", tag = "1")]
    pub limits: HashMap<String, Quantity>,
    #[prost(map = "string, message", tag = "2")]
    pub requests: HashMap<String, Quantity>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Quantity {
    #[prost(string, tag = "1")]
    pub string: String,
}

/// One container with equal requests and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub args: Vec<String>,
    pub cpu: String,
    pub memory: String,
    /// UID the container process runs as; `None` keeps the image default.
    pub run_as_user: Option<i64>,
}

impl Default for ContainerSpec {
    fn default() -> Self {
        Self {
            name: "sleep".into(),
            image: "localhost:5051/busybox".into(),
            args: vec!["sleep".into(), "20s".into()],
            cpu: "120m".into(),
            memory: "510Mi".into(),
            run_as_user: Some(1000),
        }
    }
}

impl ContainerSpec {
    pub fn validate(&self) -> Result<(), GrpcError> {
        for (field, value) in [
            ("name", &self.name),
            ("image", &self.image),
            ("cpu", &self.cpu),
            ("memory", &self.memory),
        ] {
            if value.trim().is_empty() {
                return Err(GrpcError::Config(format!("container {field} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn to_pod_spec(&self) -> PodSpec {
        let quantities: HashMap<String, Quantity> = [("cpu", &self.cpu), ("memory", &self.memory)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Quantity { string: v.clone() }))
            .collect();
        PodSpec {
            containers: vec![Container {
                name: self.name.clone(),
                image: self.image.clone(),
                args: self.args.clone(),
                resources: Some(ResourceRequirements {
                    limits: quantities.clone(),
                    requests: quantities,
                }),
                security_context: self.run_as_user.map(|uid| SecurityContext {
                    run_as_user: Some(uid),
                }),
            }],
        }
    }

    /// Wire bytes for `JobSubmitRequestItem.pod_spec`.
    pub fn encode_payload(&self) -> Result<Vec<u8>, GrpcError> {
        self.validate()?;
        Ok(self.to_pod_spec().encode_to_vec())
    }
}
