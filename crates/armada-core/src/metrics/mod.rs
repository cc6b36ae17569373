//! Metrics collection seam for job submission and resolution.
//!
//! Backends (prometheus, ...) implement [`MetricsBackend`] and are handed to the
//! [`crate::JobOrchestrator`], which shares them with the client and watcher.
mod backend;
pub use backend::{MetricsBackend, MetricsHandle};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
