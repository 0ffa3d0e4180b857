//! Core logging pipeline types

pub mod buffer;
pub mod config;
pub mod error;
pub mod formatter;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod template;

pub use buffer::{BoundedBuffer, RenderStats};
pub use config::LogConfig;
pub use error::{Result, UtilsError};
pub use formatter::Exchange;
pub use log_level::LogLevel;
pub use logger::{LogOutcome, Logger, LoggerBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use template::{render, LogArg};
