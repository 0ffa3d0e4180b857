//! # Device Utils
//!
//! Firmware utilities for a networked device: a remote logging pipeline with
//! console, persistent file and network outputs, wifi supervision, clock
//! helpers and small encoding utilities.
//!
//! ## Features
//!
//! - **Serialized Logging**: Every caller goes through one gate, so lines never interleave
//! - **Dedicated Formatter**: Messages are rendered on a worker thread into bounded buffers
//! - **Three Sinks**: Console monitor, durable log file and network listeners
//! - **Never Blocks Forever**: A busy gate drops the message, a stalled formatter falls back to the console
//!
//! ```
//! use device_utils::prelude::*;
//! use device_utils::log_inf;
//!
//! let logger = Logger::builder().min_level(LogLevel::Debug).build()?;
//! log_inf!(logger, "Free heap {} bytes", 81234u32);
//! # Ok::<(), UtilsError>(())
//! ```

pub mod core;
pub mod macros;
pub mod net;
pub mod sinks;
pub mod util;

pub mod prelude {
    pub use crate::core::{
        BoundedBuffer, LogArg, LogConfig, LogLevel, LogOutcome, Logger, LoggerBuilder,
        LoggerMetrics, RenderStats, Result, UtilsError, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{Broadcaster, ChannelBroadcaster, TcpBroadcaster};
}

pub use core::{
    render, BoundedBuffer, Exchange, LogArg, LogConfig, LogLevel, LogOutcome, Logger,
    LoggerBuilder, LoggerMetrics, RenderStats, Result, UtilsError, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use sinks::{
    Broadcaster, ChannelBroadcaster, ConsoleSink, NetworkSink, PersistentLog, PersistentStats,
    Sink, TcpBroadcaster,
};
