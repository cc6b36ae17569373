use std::time::{Duration, SystemTime, UNIX_EPOCH};

use armada_model::UnixMillis;
use tokio::time::Instant;

/// Wall clock anchored to the tokio monotonic clock.
///
/// Unix milliseconds are derived as `anchor_unix_ms + (Instant::now() - anchor)`, so stored
/// timestamps stay comparable across restarts while elapsed time follows tokio's clock
/// (and therefore `tokio::time::pause` in tests).
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    anchor_unix_ms: UnixMillis,
    anchor: Instant,
}

impl Clock {
    /// Anchor at the current system time.
    pub fn system() -> Self {
        let anchor_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as UnixMillis)
            .unwrap_or_default();
        Self::anchored_at(anchor_unix_ms)
    }

    /// Anchor the current tokio instant at an explicit Unix timestamp.
    pub fn anchored_at(anchor_unix_ms: UnixMillis) -> Self {
        Self {
            anchor_unix_ms,
            anchor: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> UnixMillis {
        let elapsed = Instant::now().saturating_duration_since(self.anchor);
        self.anchor_unix_ms
            .saturating_add(elapsed.as_millis() as UnixMillis)
    }

    /// Convert an absolute Unix timestamp into a tokio deadline.
    ///
    /// Timestamps in the past map to "now".
    pub fn deadline_for(&self, at_ms: UnixMillis) -> Instant {
        Instant::now() + Duration::from_millis(at_ms.saturating_sub(self.now_ms()))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}
