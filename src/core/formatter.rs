//! Format buffer exchange and the formatter worker
//!
//! The dispatcher loads a template and its arguments into the [`Exchange`],
//! sends the job's sequence number to the worker, and waits for the same
//! number to come back on the completion channel. The worker renders the
//! format buffer into the output buffer in between. Callers therefore never
//! run the renderer on their own stack.

use super::buffer::{BoundedBuffer, RenderStats};
use super::error::{Result, UtilsError};
use super::template::{self, LogArg};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

/// Name of the formatter thread
pub const FORMATTER_THREAD_NAME: &str = "log-formatter";

/// Buffers handed back and forth between dispatcher and formatter
#[derive(Debug)]
pub struct Exchange {
    format: BoundedBuffer,
    args: Vec<LogArg>,
    output: BoundedBuffer,
    seq: u64,
    format_truncated: bool,
    last_render: RenderStats,
}

impl Exchange {
    pub fn new(format_capacity: usize, output_capacity: usize) -> Self {
        Self {
            format: BoundedBuffer::with_capacity(format_capacity),
            args: Vec::new(),
            output: BoundedBuffer::with_capacity(output_capacity),
            seq: 0,
            format_truncated: false,
            last_render: RenderStats::default(),
        }
    }

    /// Copy a job into the buffers, truncating the template if needed
    pub fn load(&mut self, seq: u64, template: &str, args: &[LogArg]) {
        self.seq = seq;
        self.format_truncated = self.format.load(template).truncated;
        self.args.clear();
        self.args.extend_from_slice(args);
        self.output.clear();
        self.last_render = RenderStats::default();
    }

    /// Render the loaded job into the output buffer
    pub fn render(&mut self) -> RenderStats {
        self.output.clear();
        let mut stats = template::render(self.format.as_str(), &self.args, &mut self.output);
        stats.truncated |= self.format_truncated;
        self.last_render = stats;
        stats
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn output(&self) -> &BoundedBuffer {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut BoundedBuffer {
        &mut self.output
    }

    pub fn last_render(&self) -> RenderStats {
        self.last_render
    }
}

/// Channels connecting the dispatcher to a running formatter worker
pub struct FormatterHandle {
    pub(crate) exchange: Arc<Mutex<Exchange>>,
    pub(crate) notify: Option<Sender<u64>>,
    pub(crate) done: Receiver<u64>,
    pub(crate) worker: Option<thread::JoinHandle<()>>,
}

impl FormatterHandle {
    /// Start the worker thread
    pub fn spawn(format_capacity: usize, output_capacity: usize) -> Result<Self> {
        let exchange = Arc::new(Mutex::new(Exchange::new(format_capacity, output_capacity)));
        // One job in flight at a time; the gate guarantees it
        let (notify_tx, notify_rx) = bounded::<u64>(1);
        let (done_tx, done_rx) = bounded::<u64>(1);

        let worker_exchange = Arc::clone(&exchange);
        let worker = thread::Builder::new()
            .name(FORMATTER_THREAD_NAME.to_string())
            .spawn(move || run(worker_exchange, notify_rx, done_tx))
            .map_err(|e| UtilsError::FormatterUnavailable(e.to_string()))?;

        Ok(Self {
            exchange,
            notify: Some(notify_tx),
            done: done_rx,
            worker: Some(worker),
        })
    }

    /// Disconnect the worker, returning its join handle
    pub(crate) fn stop(&mut self) -> Option<thread::JoinHandle<()>> {
        drop(self.notify.take());
        self.worker.take()
    }
}

fn run(exchange: Arc<Mutex<Exchange>>, notify: Receiver<u64>, done: Sender<u64>) {
    // Exits once the dispatcher side drops its sender
    while let Ok(seq) = notify.recv() {
        {
            let mut ex = exchange.lock();
            if ex.seq() == seq {
                ex.render();
            }
        }
        if done.send(seq).is_err() {
            break;
        }
    }
}
