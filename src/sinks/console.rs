//! Console sink implementation

use super::{LogLine, Sink};
use crate::core::Result;
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::{self, Write};

pub struct ConsoleSink {
    writer: Box<dyn Write + Send>,
    use_colors: bool,
}

impl ConsoleSink {
    /// Console sink writing to stdout
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Console sink writing to any target, e.g. a serial port or a test buffer
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            use_colors: false,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[cfg(feature = "console")]
    fn decorate(&self, line: &LogLine<'_>) -> String {
        match line.level {
            Some(level) if self.use_colors => line.text.color(level.color_code()).to_string(),
            _ => line.text.to_string(),
        }
    }

    #[cfg(not(feature = "console"))]
    fn decorate(&self, line: &LogLine<'_>) -> String {
        line.text.to_string()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn write_line(&mut self, line: &LogLine<'_>) -> Result<()> {
        let text = self.decorate(line);
        writeln!(self.writer, "{}", text)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
