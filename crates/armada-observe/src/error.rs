use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?} (expected text, json or journald)")]
    InvalidFormat(String),

    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidLevel { filter: String, reason: String },

    #[error("journald output is only available on linux")]
    JournaldNotSupported,

    #[error("cannot connect to journald: {0}")]
    Journald(String),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

pub type LoggerResult<T> = Result<T, LoggerError>;
