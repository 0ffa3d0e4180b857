//! Sink implementations

pub mod console;
pub mod file;
pub mod network;

pub use console::ConsoleSink;
pub use file::{PersistentLog, PersistentStats};
pub use network::{Broadcaster, ChannelBroadcaster, NetworkSink, TcpBroadcaster};

use crate::core::{LogLevel, Result};

/// A rendered line on its way to a sink
///
/// `text` never carries the trailing newline; sinks that need one add it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLine<'a> {
    pub level: Option<LogLevel>,
    pub text: &'a str,
}

impl<'a> LogLine<'a> {
    pub fn new(level: Option<LogLevel>, text: &'a str) -> Self {
        Self { level, text }
    }
}

/// Destination of rendered log lines
pub trait Sink: Send {
    fn write_line(&mut self, line: &LogLine<'_>) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
