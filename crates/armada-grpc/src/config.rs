use std::time::Duration;

use serde::{Deserialize, Serialize};
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, Endpoint};

use crate::error::GrpcError;

/// Connection settings for the Armada API server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelConfig {
    /// `host:port` or a full `http://` URI.
    pub endpoint: String,
    /// Sent as `authorization: Bearer <token>` when set.
    pub auth_token: Option<String>,
    pub connect_timeout_ms: u64,
    /// Per-call deadline.
    pub request_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:50051".to_string(),
            auth_token: None,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl ChannelConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Endpoint URI with a scheme, defaulting to plain `http`.
    pub fn uri(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("http://{}", self.endpoint)
        }
    }

    pub fn validate(&self) -> Result<(), GrpcError> {
        if self.endpoint.trim().is_empty() {
            return Err(GrpcError::Config("endpoint cannot be empty".into()));
        }
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(GrpcError::Config("timeouts cannot be zero".into()));
        }
        Ok(())
    }

    pub fn to_endpoint(&self) -> Result<Endpoint, GrpcError> {
        self.validate()?;
        let uri = self.uri();
        let endpoint = Endpoint::from_shared(uri.clone()).map_err(|e| GrpcError::InvalidEndpoint {
            endpoint: uri,
            reason: e.to_string(),
        })?;
        Ok(endpoint
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .timeout(Duration::from_millis(self.request_timeout_ms)))
    }

    /// Build a channel that connects on first use. Must be called inside a tokio runtime.
    pub fn connect_lazy(&self) -> Result<Channel, GrpcError> {
        Ok(self.to_endpoint()?.connect_lazy())
    }

    pub(crate) fn auth_header(&self) -> Result<Option<MetadataValue<Ascii>>, GrpcError> {
        self.auth_token
            .as_deref()
            .map(|token| {
                MetadataValue::try_from(format!("Bearer {token}"))
                    .map_err(|_| GrpcError::InvalidToken)
            })
            .transpose()
    }
}
