use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Controls how random jitter is applied to retry delays.
///
/// Jitter spreads retries of many watchers hitting the same unavailable endpoint,
/// so they do not reconnect in lock-step.
///
/// Strategies:
/// - `None`: no jitter, delays are deterministic.
/// - `Full`: delay is uniform in `[0, base]`.
/// - `Equal`: delay is uniform in `[base/2, base]`.
/// - `Decorrelated`: delay is uniform in `[first, min(max, previous * 3)]`.
///
/// The math lives in the watcher's backoff state; this enum only names the policy.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JitterStrategy {
    None,
    #[default]
    Full,
    Equal,
    Decorrelated,
}

impl FromStr for JitterStrategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" => Ok(JitterStrategy::Equal),
            "" | "none" => Ok(JitterStrategy::None),
            "full" | "default" => Ok(JitterStrategy::Full),
            "decorrelated" => Ok(JitterStrategy::Decorrelated),
            other => Err(ModelError::UnknownJitter(other.to_string())),
        }
    }
}
