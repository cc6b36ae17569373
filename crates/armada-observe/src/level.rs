use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::{LoggerError, LoggerResult};

/// An `EnvFilter` directive string, checked when it is parsed.
///
/// Accepts anything `RUST_LOG` accepts, e.g. `"info"` or `"armada_core=debug,warn"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    pub fn new(filter: impl Into<String>) -> LoggerResult<Self> {
        let filter = filter.into();
        build_filter(&filter)?;
        Ok(Self(filter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the filter installed on the subscriber.
    pub fn to_env_filter(&self) -> LoggerResult<EnvFilter> {
        build_filter(&self.0)
    }
}

fn build_filter(filter: &str) -> LoggerResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| LoggerError::InvalidLevel {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LoggerLevel> for String {
    fn from(level: LoggerLevel) -> Self {
        level.0
    }
}

impl fmt::Display for LoggerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_levels_and_directives() {
        for ok in ["info", "trace", "armada_core=debug,warn", "armada_grpc=trace,info"] {
            assert!(ok.parse::<LoggerLevel>().is_ok(), "{ok} should parse");
        }
    }

    #[test]
    fn rejects_unknown_level_names() {
        for bad in ["armada_core=loud", "root=info,sub=xyz"] {
            assert!(matches!(
                bad.parse::<LoggerLevel>(),
                Err(LoggerError::InvalidLevel { .. })
            ));
        }
    }

    #[test]
    fn default_is_info() {
        let level = LoggerLevel::default();
        assert_eq!(level.as_str(), "info");
        assert!(level.to_env_filter().is_ok());
    }

    #[test]
    fn invalid_json_value_fails_deserialization() {
        assert!(serde_json::from_str::<LoggerLevel>(r#""armada=wat""#).is_err());
        let level: LoggerLevel = serde_json::from_str(r#""debug""#).unwrap();
        assert_eq!(level.to_string(), "debug");
    }
}
