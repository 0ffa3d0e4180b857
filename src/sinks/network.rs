//! Network broadcast of log lines
//!
//! Listeners (web console clients, TCP log viewers) are set up and torn down
//! elsewhere; this module only pushes each rendered line to whoever is
//! currently attached. Delivery is best effort: a listener that cannot keep
//! up misses lines, a listener that went away is detached.

use super::{LogLine, Sink};
use crate::core::{Result, UtilsError};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default write timeout for attached TCP listeners
pub const DEFAULT_TCP_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of lines queued per TCP listener
pub const DEFAULT_TCP_QUEUE_LINES: usize = 64;

/// Fan-out of one line to every connected listener
pub trait Broadcaster: Send + Sync {
    /// Push `line` to all listeners, returning how many received it
    fn broadcast(&self, line: &str) -> Result<usize>;

    fn listener_count(&self) -> usize;
}

/// In-process listeners fed through bounded channels
///
/// # Example
///
/// ```
/// use device_utils::sinks::{Broadcaster, ChannelBroadcaster};
///
/// let hub = ChannelBroadcaster::new(16);
/// let rx = hub.subscribe();
///
/// hub.broadcast("wifi connected").unwrap();
/// assert_eq!(rx.try_recv().unwrap(), "wifi connected");
/// ```
pub struct ChannelBroadcaster {
    listeners: Mutex<Vec<Sender<String>>>,
    capacity: usize,
}

impl ChannelBroadcaster {
    /// Each listener buffers at most `capacity` lines
    pub fn new(capacity: usize) -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Receiver<String> {
        let (tx, rx) = bounded(self.capacity);
        self.listeners.lock().push(tx);
        rx
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn broadcast(&self, line: &str) -> Result<usize> {
        let mut listeners = self.listeners.lock();
        let mut reached = 0;

        listeners.retain(|tx| match tx.try_send(line.to_string()) {
            Ok(()) => {
                reached += 1;
                true
            }
            // slow listener, keep it but skip this line
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });

        Ok(reached)
    }

    fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

struct TcpListenerConn {
    queue: Sender<String>,
    peer: Option<SocketAddr>,
}

/// Remote listeners connected over TCP
///
/// Streams are accepted by the caller's server loop and handed over with
/// [`TcpBroadcaster::attach`]. Each stream gets its own bounded queue and a
/// writer thread, so [`Broadcaster::broadcast`] never touches a socket. A
/// listener whose queue is full misses lines; a listener whose write fails
/// or times out is shut down and detached on the next broadcast.
pub struct TcpBroadcaster {
    conns: Mutex<Vec<TcpListenerConn>>,
    write_timeout: Duration,
    queue_lines: usize,
}

impl TcpBroadcaster {
    pub fn new() -> Self {
        Self::with_write_timeout(DEFAULT_TCP_WRITE_TIMEOUT)
    }

    pub fn with_write_timeout(write_timeout: Duration) -> Self {
        Self {
            conns: Mutex::new(Vec::new()),
            write_timeout,
            queue_lines: DEFAULT_TCP_QUEUE_LINES,
        }
    }

    /// Lines buffered per listener before it starts missing lines
    pub fn queue_lines(mut self, lines: usize) -> Self {
        self.queue_lines = lines.max(1);
        self
    }

    /// Attach an accepted stream
    pub fn attach(&self, stream: TcpStream) -> Result<()> {
        // Set timeouts so a stalled viewer ends its writer thread
        stream.set_write_timeout(Some(self.write_timeout))?;
        // Enable TCP_NODELAY for low-latency logging
        stream.set_nodelay(true)?;

        let peer = stream.peer_addr().ok();
        let (queue, lines) = bounded(self.queue_lines);
        thread::Builder::new()
            .name("log-tcp-writer".to_string())
            .spawn(move || write_lines(stream, lines))?;

        self.conns.lock().push(TcpListenerConn { queue, peer });
        Ok(())
    }

    /// Addresses of the attached listeners
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.conns.lock().iter().filter_map(|c| c.peer).collect()
    }
}

impl Default for TcpBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer thread body: drains one listener's queue until the stream fails
/// or the broadcaster drops the sending side.
fn write_lines(mut stream: TcpStream, lines: Receiver<String>) {
    for line in lines.iter() {
        if stream.write_all(line.as_bytes()).is_err() {
            // a timed out write may have left half a line behind
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }
    }
}

impl Broadcaster for TcpBroadcaster {
    fn broadcast(&self, line: &str) -> Result<usize> {
        let mut message = String::with_capacity(line.len() + 1);
        message.push_str(line);
        message.push('\n');

        let mut conns = self.conns.lock();
        let before = conns.len();
        let mut reached = 0;

        // Connection lost: the listener reconnects on its own
        conns.retain(|conn| match conn.queue.try_send(message.clone()) {
            Ok(()) => {
                reached += 1;
                true
            }
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });

        if before > 0 && conns.is_empty() {
            return Err(UtilsError::sink(
                "network",
                format!("all {} listeners disconnected", before),
            ));
        }
        Ok(reached)
    }

    fn listener_count(&self) -> usize {
        self.conns.lock().len()
    }
}

/// Adapts a shared [`Broadcaster`] to the [`Sink`] interface
pub struct NetworkSink {
    broadcaster: Arc<dyn Broadcaster>,
}

impl NetworkSink {
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl Sink for NetworkSink {
    fn write_line(&mut self, line: &LogLine<'_>) -> Result<()> {
        self.broadcaster.broadcast(line.text).map(|_| ())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "network"
    }
}
