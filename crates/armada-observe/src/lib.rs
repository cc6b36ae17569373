//! Logging setup shared by the armada binaries.
//!
//! Library crates only emit `tracing` events; installing a subscriber is left to the
//! process entry point through [`init_logger`].
mod config;
mod error;
mod format;
mod init;
mod level;
mod timer;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use init::init_logger;
pub use level::LoggerLevel;
pub use timer::UtcRfc3339;
