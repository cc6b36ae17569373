use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{LoggerConfig, LoggerError, LoggerFormat, LoggerResult, UtcRfc3339};

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] on a second call.
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    match cfg.format {
        LoggerFormat::Text => install(
            registry.with(
                fmt::layer()
                    .with_ansi(cfg.ansi())
                    .with_target(cfg.with_targets)
                    .with_timer(UtcRfc3339),
            ),
        ),
        LoggerFormat::Json => install(
            registry.with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(cfg.with_targets)
                    .with_current_span(true)
                    .with_timer(UtcRfc3339),
            ),
        ),
        LoggerFormat::Journald => install(registry.with(journald()?)),
    }
}

#[cfg(target_os = "linux")]
fn journald() -> LoggerResult<tracing_journald::Layer> {
    tracing_journald::layer()
        .map(|layer| layer.with_syslog_identifier("armada".to_string()))
        .map_err(|e| LoggerError::Journald(e.to_string()))
}

#[cfg(not(target_os = "linux"))]
fn journald() -> LoggerResult<tracing_subscriber::layer::Identity> {
    Err(LoggerError::JournaldNotSupported)
}

fn install<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
