//! Log dispatcher
//!
//! [`Logger::log_print`] is the single entry point for every caller thread.
//! One gate serializes the whole cycle: load the exchange, wake the
//! formatter, wait for the rendering, fan the line out to the console, the
//! persistent file and the network listeners. A caller that cannot get the
//! gate within `lock_wait` loses its message instead of blocking.

use super::{
    buffer::{BoundedBuffer, RenderStats},
    config::LogConfig,
    error::{Result, UtilsError},
    formatter::{Exchange, FormatterHandle},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    template::{self, LogArg},
};
use crate::sinks::{Broadcaster, ConsoleSink, LogLine, NetworkSink, PersistentLog, PersistentStats, Sink};
use chrono::Local;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for the formatter worker (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened to one log call
///
/// Never an error: logging failures do not reach the caller's control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    /// Rendered by the formatter and fanned out to the enabled sinks
    Delivered(RenderStats),
    /// Formatter did not answer in time; rendered locally, console only
    ConsoleFallback(RenderStats),
    /// Gate not acquired within the lock wait
    Dropped,
    /// Below the minimum level
    Filtered,
}

impl LogOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, LogOutcome::Delivered(_))
    }

    /// Render statistics, if the message was rendered at all
    pub fn stats(&self) -> Option<RenderStats> {
        match self {
            LogOutcome::Delivered(stats) | LogOutcome::ConsoleFallback(stats) => Some(*stats),
            LogOutcome::Dropped | LogOutcome::Filtered => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    AllSinks,
    /// Notices about the log file are not written into it
    SkipPersistent,
}

/// Everything the gate protects
struct DispatchState {
    console: ConsoleSink,
    persistent: PersistentLog,
    network: Option<NetworkSink>,
    seq: u64,
}

pub struct Logger {
    config: LogConfig,
    gate: Mutex<DispatchState>,
    formatter: FormatterHandle,
    metrics: Arc<LoggerMetrics>,
    monitor_open: AtomicBool,
    log_mode: AtomicBool,
    min_level: RwLock<LogLevel>,
}

impl Logger {
    /// Logger writing to stdout, without network listeners
    pub fn new(config: LogConfig) -> Result<Self> {
        LoggerBuilder::new().config(config).build()
    }

    fn from_parts(
        config: LogConfig,
        console: ConsoleSink,
        broadcaster: Option<Arc<dyn Broadcaster>>,
    ) -> Result<Self> {
        config.validate()?;
        let formatter = FormatterHandle::spawn(config.format_capacity, config.output_capacity)?;

        let state = DispatchState {
            console: console.with_colors(config.use_colors),
            persistent: PersistentLog::new(config.log_path(), config.write_cache_cycle),
            network: broadcaster.map(NetworkSink::new),
            seq: 0,
        };

        Ok(Self {
            monitor_open: AtomicBool::new(config.monitor_open),
            log_mode: AtomicBool::new(config.log_mode),
            min_level: RwLock::new(config.min_level),
            gate: Mutex::new(state),
            formatter,
            metrics: Arc::new(LoggerMetrics::new()),
            config,
        })
    }

    /// Render `template` with `args` and send the line to every enabled sink
    ///
    /// The template is expected to end with a newline, which is stripped
    /// before fan-out. Output beyond the buffer capacities is truncated.
    pub fn log_print(&self, template: &str, args: &[LogArg]) -> LogOutcome {
        self.dispatch(None, template, args, Route::AllSinks)
    }

    /// Level-filtered logging with a `[time level module:line]` prefix
    pub fn log_at(
        &self,
        level: LogLevel,
        module: &str,
        line: u32,
        template: &str,
        args: &[LogArg],
    ) -> LogOutcome {
        if level < self.min_level() {
            return LogOutcome::Filtered;
        }

        let mut full = Self::prefix(level, module, line);
        full.push_str(template);
        full.push('\n');
        self.dispatch(Some(level), &full, args, Route::AllSinks)
    }

    fn prefix(level: LogLevel, module: &str, line: u32) -> String {
        let module = module.replace('{', "{{").replace('}', "}}");
        format!(
            "[{} {} {}:{}] ",
            Local::now().format("%H:%M:%S"),
            level.tag(),
            module,
            line
        )
    }

    /// Report on the logger itself, to console and network only
    fn notice(&self, level: LogLevel, message: String) {
        if level < self.min_level() {
            return;
        }
        let mut full = Self::prefix(level, module_path!(), line!());
        full.push_str("{}\n");
        self.dispatch(Some(level), &full, &[LogArg::Str(message)], Route::SkipPersistent);
    }

    fn dispatch(
        &self,
        level: Option<LogLevel>,
        template: &str,
        args: &[LogArg],
        route: Route,
    ) -> LogOutcome {
        let Some(mut state) = self.gate.try_lock_for(self.config.lock_wait) else {
            self.metrics.record_dropped();
            return LogOutcome::Dropped;
        };
        state.seq = state.seq.wrapping_add(1);
        let seq = state.seq;

        let mut file_error = None;
        let outcome = match self.render_remote(seq, template, args) {
            Some(mut exchange) => {
                let stats = exchange.last_render();
                let output = exchange.output_mut();
                output.strip_trailing_newline();
                file_error = self.fan_out(&mut state, &LogLine::new(level, output.as_str()), route);
                self.metrics.record_delivered();
                LogOutcome::Delivered(stats)
            }
            None => {
                self.metrics.record_render_timeout();
                let mut local = BoundedBuffer::with_capacity(self.config.output_capacity);
                let stats = self.render_local(template, args, &mut local);
                local.strip_trailing_newline();
                if state.console.write_line(&LogLine::new(level, local.as_str())).is_err() {
                    self.metrics.record_sink_error();
                }
                LogOutcome::ConsoleFallback(stats)
            }
        };

        if outcome.stats().is_some_and(|s| s.truncated) {
            self.metrics.record_truncated();
        }
        if !self.config.flush_delay.is_zero() {
            thread::sleep(self.config.flush_delay);
        }
        drop(state);

        if let Some(err) = file_error {
            self.notice(
                LogLevel::Error,
                format!("Persistent logging stopped after write failure: {}", err),
            );
        }
        outcome
    }

    /// Hand the job to the formatter and wait for it, bounded by the render timeout
    fn render_remote(
        &self,
        seq: u64,
        template: &str,
        args: &[LogArg],
    ) -> Option<MutexGuard<'_, Exchange>> {
        let deadline = Instant::now() + self.config.render_timeout;
        let notify = self.formatter.notify.as_ref()?;

        self.formatter
            .exchange
            .try_lock_until(deadline)?
            .load(seq, template, args);

        // completions of earlier jobs that timed out
        while self.formatter.done.try_recv().is_ok() {}

        notify.send_deadline(seq, deadline).ok()?;
        loop {
            match self.formatter.done.recv_deadline(deadline) {
                Ok(done) if done == seq => break,
                Ok(_) => continue,
                Err(_) => return None,
            }
        }

        self.formatter.exchange.try_lock_until(deadline)
    }

    fn render_local(&self, template: &str, args: &[LogArg], out: &mut BoundedBuffer) -> RenderStats {
        let mut format = BoundedBuffer::with_capacity(self.config.format_capacity);
        let format_truncated = format.load(template).truncated;
        let mut stats = template::render(format.as_str(), args, out);
        stats.truncated |= format_truncated;
        stats
    }

    /// Console, then file, then network; each one independent of the others
    fn fan_out(
        &self,
        state: &mut DispatchState,
        line: &LogLine<'_>,
        route: Route,
    ) -> Option<UtilsError> {
        if self.monitor_open() {
            if state.console.write_line(line).is_err() {
                self.metrics.record_sink_error();
            }
        } else {
            thread::yield_now();
        }

        let mut file_error = None;
        if route == Route::AllSinks && state.persistent.is_open() {
            if let Err(e) = state.persistent.write_line(line) {
                self.metrics.record_sink_error();
                state.persistent.abandon();
                file_error = Some(e);
            }
        }

        if let Some(ref mut network) = state.network {
            if network.write_line(line).is_err() {
                self.metrics.record_sink_error();
            }
        }

        file_error
    }

    /// Open the persistent log file, closing any previous handle first
    ///
    /// A failure is logged to the remaining sinks and leaves persistent
    /// logging unavailable; it is returned for callers that care.
    pub fn enable_logging(&self) -> Result<()> {
        let result = self.gate.lock().persistent.open();
        match result {
            Ok(()) => {
                self.notice(
                    LogLevel::Info,
                    format!("Opened log file {}", self.config.log_path().display()),
                );
                Ok(())
            }
            Err(e) => {
                self.notice(LogLevel::Error, format!("Failed to open log file: {}", e));
                Err(e)
            }
        }
    }

    /// Flush and close the persistent log file
    pub fn disable_logging(&self) -> Result<()> {
        self.flush_log(true)
    }

    /// Delete the log file, reopening it when log mode is on
    pub fn clear_log(&self) -> Result<()> {
        let reopen = self.log_mode();
        let result = self.gate.lock().persistent.clear(reopen);
        match result {
            Ok(()) => {
                self.notice(LogLevel::Info, "Cleared log file".to_string());
                Ok(())
            }
            Err(e) => {
                self.notice(LogLevel::Error, format!("Failed to clear log file: {}", e));
                Err(e)
            }
        }
    }

    /// Force a durability sync, optionally closing the file afterwards
    pub fn flush_log(&self, and_close: bool) -> Result<()> {
        let (was_open, result) = {
            let mut state = self.gate.lock();
            let was_open = state.persistent.is_open();
            (was_open, state.persistent.flush_log(and_close))
        };
        if let Err(ref e) = result {
            self.notice(LogLevel::Error, format!("Failed to flush log file: {}", e));
        } else if and_close && was_open {
            self.notice(LogLevel::Info, "Closed log file".to_string());
        }
        result
    }

    /// Apply the current log mode: open the file when on, close it when off
    pub fn remote_log_init(&self) -> Result<()> {
        if self.log_mode() {
            self.flush_log(false)?;
            self.enable_logging()
        } else {
            self.flush_log(true)
        }
    }

    pub fn set_log_mode(&self, enabled: bool) -> Result<()> {
        self.log_mode.store(enabled, Ordering::Relaxed);
        self.remote_log_init()
    }

    #[inline]
    pub fn log_mode(&self) -> bool {
        self.log_mode.load(Ordering::Relaxed)
    }

    /// Whether a console consumer is attached
    pub fn set_monitor_open(&self, open: bool) {
        self.monitor_open.store(open, Ordering::Relaxed);
    }

    #[inline]
    pub fn monitor_open(&self) -> bool {
        self.monitor_open.load(Ordering::Relaxed)
    }

    pub fn set_min_level(&self, level: LogLevel) {
        *self.min_level.write() = level;
    }

    pub fn min_level(&self) -> LogLevel {
        *self.min_level.read()
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    pub fn log_path(&self) -> PathBuf {
        self.config.log_path()
    }

    /// Counters of the persistent log file
    pub fn persistent_stats(&self) -> PersistentStats {
        self.gate.lock().persistent.stats()
    }

    /// Free bytes on the storage volume holding the log file
    #[cfg(feature = "file")]
    pub fn storage_available(&self) -> Result<u64> {
        self.gate.lock().persistent.available_space()
    }

    /// Get the logger metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```
    /// use device_utils::{LogConfig, Logger};
    ///
    /// let logger = Logger::new(LogConfig::default()).unwrap();
    /// logger.log_print("boot\n", &[]);
    ///
    /// let metrics = logger.metrics();
    /// assert_eq!(metrics.delivered_count(), 1);
    /// assert_eq!(metrics.dropped_count(), 0);
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Stop the formatter and close the log file
    ///
    /// Returns `true` if the formatter finished within `timeout` and the file
    /// closed cleanly.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let mut clean = true;

        if let Some(handle) = self.formatter.stop() {
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!("[LOGGER ERROR] Formatter thread panicked during shutdown: {:?}", e);
                        clean = false;
                    }
                    break;
                }
                if start.elapsed() >= timeout {
                    eprintln!(
                        "[LOGGER WARNING] Formatter thread did not finish within {:?}",
                        timeout
                    );
                    clean = false;
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }

        let state = self.gate.get_mut();
        if let Err(e) = state.persistent.close() {
            eprintln!("[LOGGER ERROR] Failed to close log file during shutdown: {}", e);
            clean = false;
        }
        let _ = state.console.flush();
        clean
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

/// Builder for constructing a Logger with a fluent API
///
/// # Example
/// ```
/// use device_utils::prelude::*;
/// use device_utils::sinks::ChannelBroadcaster;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let listeners = Arc::new(ChannelBroadcaster::new(32));
/// let web = listeners.subscribe();
///
/// let logger = Logger::builder()
///     .min_level(LogLevel::Debug)
///     .lock_wait(Duration::from_millis(50))
///     .broadcaster(listeners)
///     .build()
///     .unwrap();
///
/// logger.log_print("heap {} bytes free\n", &[LogArg::from(81234u32)]);
/// assert_eq!(web.try_recv().unwrap(), "heap 81234 bytes free");
/// ```
pub struct LoggerBuilder {
    config: LogConfig,
    console: Option<ConsoleSink>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
}

impl LoggerBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
            console: None,
            broadcaster: None,
        }
    }

    /// Replace the whole configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn log_mode(mut self, enabled: bool) -> Self {
        self.config.log_mode = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn monitor_open(mut self, open: bool) -> Self {
        self.config.monitor_open = open;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn use_colors(mut self, enabled: bool) -> Self {
        self.config.use_colors = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.config.min_level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn write_cache_cycle(mut self, cycle: u32) -> Self {
        self.config.write_cache_cycle = cycle;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn capacities(mut self, format_capacity: usize, output_capacity: usize) -> Self {
        self.config.format_capacity = format_capacity;
        self.config.output_capacity = output_capacity;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn lock_wait(mut self, wait: Duration) -> Self {
        self.config.lock_wait = wait;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn render_timeout(mut self, timeout: Duration) -> Self {
        self.config.render_timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flush_delay(mut self, delay: Duration) -> Self {
        self.config.flush_delay = delay;
        self
    }

    /// Storage mount point; the log file lives in `<root>/<data_dir>/<file_name>`
    #[must_use = "builder methods return a new value"]
    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.storage_root = root.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn data_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    /// Send console output somewhere other than stdout
    #[must_use = "builder methods return a new value"]
    pub fn console_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.console = Some(ConsoleSink::with_writer(writer));
        self
    }

    /// Network listeners that receive every line
    #[must_use = "builder methods return a new value"]
    pub fn broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Build the Logger, starting its formatter and applying the log mode
    pub fn build(self) -> Result<Logger> {
        let console = self.console.unwrap_or_default();
        let logger = Logger::from_parts(self.config, console, self.broadcaster)?;
        if logger.log_mode() {
            // failure is already reported through the other sinks
            let _ = logger.remote_log_init();
        }
        Ok(logger)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().clone())
                .unwrap()
                .lines()
                .map(String::from)
                .collect()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logger_with_capture() -> (Logger, Capture) {
        let capture = Capture::default();
        let logger = Logger::builder()
            .console_writer(capture.clone())
            .render_timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        (logger, capture)
    }

    #[test]
    fn test_log_print_strips_newline() {
        let (logger, capture) = logger_with_capture();

        let outcome = logger.log_print("value {}\n", &[LogArg::from(42)]);

        assert!(outcome.is_delivered());
        assert_eq!(outcome.stats().unwrap().written, "value 42\n".len());
        assert_eq!(capture.lines(), vec!["value 42"]);
    }

    #[test]
    fn test_empty_message_is_an_empty_line() {
        let (logger, capture) = logger_with_capture();

        let outcome = logger.log_print("", &[]);

        assert!(outcome.is_delivered());
        assert_eq!(String::from_utf8(capture.0.lock().clone()).unwrap(), "\n");
    }

    #[test]
    fn test_monitor_closed_skips_console() {
        let (logger, capture) = logger_with_capture();
        logger.set_monitor_open(false);

        assert!(logger.log_print("hidden\n", &[]).is_delivered());
        assert!(capture.lines().is_empty());
    }

    #[test]
    fn test_level_filter_and_prefix() {
        let (logger, capture) = logger_with_capture();
        logger.set_min_level(LogLevel::Warn);

        assert_eq!(
            logger.log_at(LogLevel::Info, "app::wifi", 10, "quiet", &[]),
            LogOutcome::Filtered
        );
        logger.log_at(LogLevel::Warn, "app::wifi", 11, "loud {}", &[LogArg::from(1)]);

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(" WRN app::wifi:11] loud 1"), "{}", lines[0]);
    }

    #[test]
    fn test_contention_drops_message() {
        let capture = Capture::default();
        let logger = Logger::builder()
            .console_writer(capture.clone())
            .lock_wait(Duration::from_millis(10))
            .build()
            .unwrap();

        let held = logger.gate.lock();
        let outcome = thread::scope(|s| s.spawn(|| logger.log_print("lost\n", &[])).join().unwrap());
        drop(held);

        assert_eq!(outcome, LogOutcome::Dropped);
        assert_eq!(logger.metrics().dropped_count(), 1);
        assert!(capture.lines().is_empty());
    }

    #[test]
    fn test_stalled_formatter_falls_back_to_console() {
        let (logger, capture) = logger_with_capture();

        let stalled = logger.formatter.exchange.lock();
        let outcome = thread::scope(|s| {
            s.spawn(|| logger.log_print("fallback {}\n", &[LogArg::from("ok")]))
                .join()
                .unwrap()
        });
        drop(stalled);

        assert!(matches!(outcome, LogOutcome::ConsoleFallback(_)));
        assert_eq!(logger.metrics().render_timeouts(), 1);
        assert_eq!(capture.lines(), vec!["fallback ok"]);

        // the formatter recovers for the next message
        assert!(logger.log_print("recovered\n", &[]).is_delivered());
        assert_eq!(capture.lines(), vec!["fallback ok", "recovered"]);
    }

    #[test]
    fn test_stopped_formatter_falls_back_to_console() {
        let (mut logger, capture) = logger_with_capture();
        let worker = logger.formatter.stop().unwrap();
        worker.join().unwrap();

        let outcome = logger.log_print("still here\n", &[]);

        assert!(matches!(outcome, LogOutcome::ConsoleFallback(_)));
        assert_eq!(capture.lines(), vec!["still here"]);
    }

    #[test]
    fn test_truncation_is_counted() {
        let capture = Capture::default();
        let logger = Logger::builder()
            .console_writer(capture.clone())
            .capacities(8, 10)
            .build()
            .unwrap();

        let outcome = logger.log_print("{}\n", &[LogArg::from("a long argument")]);

        assert!(outcome.stats().unwrap().truncated);
        assert_eq!(logger.metrics().truncated_count(), 1);
        assert_eq!(capture.lines(), vec!["a long arg"]);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = Logger::builder().write_cache_cycle(0).build();
        assert!(matches!(result, Err(UtilsError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_shutdown_is_clean() {
        let (mut logger, _capture) = logger_with_capture();
        assert!(logger.shutdown(Duration::from_secs(1)));
        // second shutdown from Drop is a no-op
    }
}
