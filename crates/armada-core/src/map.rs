//! Model strategies mapped onto taskvisor policies.
use std::time::Duration;

use armada_model::{BackoffStrategy, JitterStrategy};
use taskvisor::{BackoffPolicy, JitterPolicy};

pub(crate) fn to_backoff_policy(s: &BackoffStrategy) -> BackoffPolicy {
    BackoffPolicy {
        first: Duration::from_millis(s.first_ms),
        max: Duration::from_millis(s.max_ms),
        jitter: to_jitter_policy(s.jitter),
        factor: s.factor,
    }
}

pub(crate) fn to_jitter_policy(s: JitterStrategy) -> JitterPolicy {
    match s {
        JitterStrategy::Decorrelated => JitterPolicy::Decorrelated,
        JitterStrategy::Equal => JitterPolicy::Equal,
        JitterStrategy::Full => JitterPolicy::Full,
        JitterStrategy::None => JitterPolicy::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_fields_carry_over() {
        let policy = to_backoff_policy(&BackoffStrategy {
            jitter: JitterStrategy::Equal,
            first_ms: 250,
            max_ms: 8_000,
            factor: 3.0,
            max_retries: 4,
        });
        assert_eq!(policy.first, Duration::from_millis(250));
        assert_eq!(policy.max, Duration::from_secs(8));
        assert_eq!(policy.factor, 3.0);
        assert_eq!(policy.jitter, JitterPolicy::Equal);
    }
}
