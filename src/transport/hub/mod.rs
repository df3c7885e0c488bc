//! Hub channel: a duplex stream emulated over HTTP polling
//!
//! - Poller thread: fetches the hub ring buffer every interval, appends new
//!   bytes to a `BlockingByteBuffer`
//! - `read()`: blocks on that buffer
//! - `write()`: forces one poll (drains backlog first), then sends the
//!   message hex-encoded
//!
//! Polls and sends are serialized by the poller lock so inbound and
//! outbound traffic keep their relative order.
//!
//! After `HUB_MAX_POLL_FAILURES` consecutive failed requests the poller
//! stops, and the next `read()` returns the last error. A malformed status
//! body only resets the baseline.

pub mod client;
pub mod poller;

pub use client::{HttpHubClient, HubClient};
pub use poller::{parse_buffer_status, BufferStatus, HubPoller};

use super::ByteChannel;
use crate::buffer::BlockingByteBuffer;
use crate::constants::HUB_MAX_POLL_FAILURES;
use crate::error::{PortError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

struct Shared {
    client: Box<dyn HubClient>,
    buffer: BlockingByteBuffer,
    poller: Mutex<HubPoller>,
    open: AtomicBool,
    /// Error that stopped the poller, handed to the next `read()`
    failure: Mutex<Option<PortError>>,
}

impl Shared {
    fn poll(&self) -> Result<()> {
        let mut poller = self.poller.lock();
        self.poll_locked(&mut poller)
    }

    fn poll_locked(&self, poller: &mut HubPoller) -> Result<()> {
        let body = self.client.fetch_buffer()?;

        let status = match parse_buffer_status(&body) {
            Ok(s) => s,
            Err(e) => {
                warn!("{}, resetting hub baseline", e);
                poller.reset();
                return Ok(());
            }
        };

        let fresh = poller.update(&status);
        if fresh.is_empty() {
            return Ok(());
        }

        match hex::decode(&fresh) {
            Ok(bytes) => {
                debug!("Hub delivered {} bytes: {}", bytes.len(), fresh);
                // All buffer operations share one lock, compacting here is safe
                self.buffer.compact();
                self.buffer.append(&bytes);
            }
            Err(e) => warn!("Dropping undecodable hub data {:?}: {}", fresh, e),
        }
        Ok(())
    }

    /// Give up on the hub: wake the reader with `error`
    fn fail(&self, error: PortError) {
        *self.failure.lock() = Some(error);
        self.buffer.close();
    }
}

struct PollThread {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Channel to a modem behind a network hub
pub struct HubChannel {
    shared: Arc<Shared>,
    poll_interval: Duration,
    poll_thread: Mutex<Option<PollThread>>,
}

impl HubChannel {
    /// Create a channel over any `HubClient`
    pub fn new(client: Box<dyn HubClient>, poll_interval: Duration) -> Self {
        let buffer = BlockingByteBuffer::new();
        // Reads on a never-opened channel return end of stream
        buffer.close();

        Self {
            shared: Arc::new(Shared {
                client,
                buffer,
                poller: Mutex::new(HubPoller::new()),
                open: AtomicBool::new(false),
                failure: Mutex::new(None),
            }),
            poll_interval,
            poll_thread: Mutex::new(None),
        }
    }

    /// Create a channel talking HTTP to `host:port`
    pub fn http(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        poll_interval: Duration,
    ) -> Result<Self> {
        let client = HttpHubClient::new(host, port, username, password)?;
        Ok(Self::new(Box::new(client), poll_interval))
    }

    /// Run one poll tick immediately
    pub fn poll_now(&self) -> Result<()> {
        self.shared.poll()
    }

    fn spawn_poller(&self) -> PollThread {
        let (stop, stop_rx) = mpsc::channel::<()>();
        let shared = self.shared.clone();
        let interval = self.poll_interval;

        let handle = thread::spawn(move || {
            let mut failures = 0u32;
            loop {
                match shared.poll() {
                    Ok(()) => failures = 0,
                    Err(e) => {
                        failures += 1;
                        warn!(
                            "Hub poll failed ({}/{}): {}",
                            failures, HUB_MAX_POLL_FAILURES, e
                        );
                        if failures >= HUB_MAX_POLL_FAILURES {
                            shared.fail(e);
                            break;
                        }
                    }
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    // Stop signal, or channel dropped
                    _ => break,
                }
            }
        });

        PollThread { stop, handle }
    }
}

impl ByteChannel for HubChannel {
    fn open(&self) -> Result<()> {
        let mut poll_thread = self.poll_thread.lock();
        if self.shared.open.load(Ordering::SeqCst) {
            return Err(PortError::AlreadyOpen);
        }

        self.shared.client.clear_buffer()?;
        self.shared.poller.lock().reset();
        self.shared.failure.lock().take();
        self.shared.buffer.reopen();
        self.shared.open.store(true, Ordering::SeqCst);

        *poll_thread = Some(self.spawn_poller());
        info!("Hub channel open, polling every {:?}", self.poll_interval);
        Ok(())
    }

    fn close(&self) {
        let mut poll_thread = self.poll_thread.lock();
        self.shared.open.store(false, Ordering::SeqCst);
        self.shared.buffer.close();

        if let Some(PollThread { stop, handle }) = poll_thread.take() {
            let _ = stop.send(());
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
            info!("Hub channel closed");
        }
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        match self.shared.buffer.read_into(buf) {
            Some(n) => Ok(n),
            None => match self.shared.failure.lock().take() {
                Some(e) => Err(e),
                None => Ok(0),
            },
        }
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(PortError::NotOpen);
        }

        let mut poller = self.shared.poller.lock();
        if let Err(e) = self.shared.poll_locked(&mut poller) {
            warn!("Hub poll before send failed: {}", e);
        }
        self.shared.client.send_hex(&hex::encode(data))
    }
}
