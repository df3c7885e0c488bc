//! Message pump with half-duplex ACK/NACK flow control
//!
//! Owns one `ByteChannel` and runs two threads:
//! - Reader: reads bytes, decodes messages, notifies listeners and resolves
//!   the outstanding send
//! - Writer: takes messages from the queue, sends one at a time, waits for
//!   the ACK (or times out) and retransmits on NACK
//!
//! At most one message is unacknowledged at any time. Messages leave the
//! queue in FIFO order.
//!
//! # Example
//!
//! ```ignore
//! let pump = MessagePump::new(transport::create(&config.port)?, Box::new(codec), options);
//! pump.add_listener(listener);
//! pump.start()?;
//! pump.write(Message::new(vec![0x02, 0x60]));
//! ```

pub mod flow;
pub mod listener;
pub mod queue;
pub mod stats;

pub use flow::ReplyState;
pub use listener::{ListenerSet, PortListener};
pub use stats::{PumpStats, StatsSnapshot};

use self::flow::FlowControl;
use self::queue::WriteQueue;
use crate::codec::MessageCodec;
use crate::config::PumpConfig;
use crate::constants::READ_BUFFER_SIZE;
use crate::error::{FramingError, PortError, Result};
use crate::message::Message;
use crate::transport::ByteChannel;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Flow-control tuning
#[derive(Debug, Clone)]
pub struct PumpOptions {
    pub ack_timeout: Duration,
    pub retry_backoff: Duration,
    /// Retransmissions before a message is dropped
    pub max_retries: u32,
    pub queue_capacity: usize,
    pub read_buffer_size: usize,
}

impl Default for PumpOptions {
    fn default() -> Self {
        Self::from(&PumpConfig::default())
    }
}

impl From<&PumpConfig> for PumpOptions {
    fn from(config: &PumpConfig) -> Self {
        Self {
            ack_timeout: config.ack_timeout(),
            retry_backoff: config.retry_backoff(),
            max_retries: config.max_retries,
            queue_capacity: config.queue_capacity,
            read_buffer_size: READ_BUFFER_SIZE,
        }
    }
}

struct Shared {
    channel: Box<dyn ByteChannel>,
    codec: Mutex<Box<dyn MessageCodec>>,
    queue: WriteQueue,
    flow: FlowControl,
    /// Orders listener delivery: a send is announced before its echo
    delivery: Mutex<()>,
    listeners: ListenerSet,
    stats: PumpStats,
    options: PumpOptions,
    running: AtomicBool,
    /// Cleared by the first disconnect so it is broadcast once
    connected: AtomicBool,
}

struct Workers {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Reader/writer engine over one channel
pub struct MessagePump {
    shared: Arc<Shared>,
    workers: Mutex<Option<Workers>>,
}

impl MessagePump {
    pub fn new(
        channel: Box<dyn ByteChannel>,
        codec: Box<dyn MessageCodec>,
        options: PumpOptions,
    ) -> Self {
        let queue = WriteQueue::new(options.queue_capacity);
        Self {
            shared: Arc::new(Shared {
                channel,
                codec: Mutex::new(codec),
                queue,
                flow: FlowControl::new(),
                delivery: Mutex::new(()),
                listeners: ListenerSet::new(),
                stats: PumpStats::new(),
                options,
                running: AtomicBool::new(false),
                connected: AtomicBool::new(false),
            }),
            workers: Mutex::new(None),
        }
    }

    /// Open the channel and start the reader and writer threads
    ///
    /// No-op if already running.
    pub fn start(&self) -> Result<()> {
        let mut workers = self.workers.lock();
        if self.shared.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        // Threads left over from a disconnect are exiting. When restarting
        // from a `disconnected` callback one of them is the current thread.
        if let Some(old) = workers.take() {
            let current = thread::current().id();
            for handle in [old.reader, old.writer] {
                if handle.thread().id() != current {
                    let _ = handle.join();
                }
            }
        }

        self.shared.channel.open()?;
        self.shared.codec.lock().clear();
        self.shared.flow.reset();
        self.shared.queue.reopen();
        self.shared.connected.store(true, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);

        let spawned = self.spawn_workers();
        match spawned {
            Ok(w) => {
                *workers = Some(w);
                info!("Message pump started");
                Ok(())
            }
            Err(e) => {
                self.shared.connected.store(false, Ordering::SeqCst);
                self.shared.shutdown();
                Err(e)
            }
        }
    }

    fn spawn_workers(&self) -> Result<Workers> {
        let reader_shared = self.shared.clone();
        let reader = thread::Builder::new()
            .name("insteon-reader".into())
            .spawn(move || reader_shared.run_reader())?;

        let writer_shared = self.shared.clone();
        let writer = thread::Builder::new()
            .name("insteon-writer".into())
            .spawn(move || writer_shared.run_writer())?;

        Ok(Workers { reader, writer })
    }

    /// Stop both threads and close the channel
    ///
    /// Does not broadcast `disconnected`. May be called from a listener
    /// callback, in which case the worker threads are left to exit on
    /// their own instead of being joined.
    pub fn stop(&self) {
        let workers = self.workers.lock().take();
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared.shutdown();

        if let Some(w) = workers {
            let current = thread::current().id();
            if w.reader.thread().id() != current && w.writer.thread().id() != current {
                let _ = w.reader.join();
                let _ = w.writer.join();
            }
            info!("Message pump stopped");
        }
    }

    /// Enqueue a message for transmission
    ///
    /// Returns `false` (and logs) if the queue is full; never blocks.
    pub fn write(&self, msg: Message) -> bool {
        if self.shared.queue.push(msg) {
            return true;
        }
        warn!(
            "Write queue full ({} messages), dropping message",
            self.shared.queue.capacity()
        );
        self.shared.stats.add_dropped();
        false
    }

    pub fn add_listener(&self, listener: Arc<dyn PortListener>) -> bool {
        self.shared.listeners.add(listener)
    }

    pub fn remove_listener(&self, listener: &Arc<dyn PortListener>) -> bool {
        self.shared.listeners.remove(listener)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Messages waiting in the queue (the one in flight is not counted)
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn reply_state(&self) -> ReplyState {
        self.shared.flow.current()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl Drop for MessagePump {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal both loops, close the channel and wake every wait
    ///
    /// The channel is closed first: a writer blocked in `write` holds the
    /// flow lock until the close fails its write.
    /// Must not be called while holding the flow lock.
    fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.queue.shutdown();
        self.channel.close();
        self.flow.wake_all();
    }

    /// Handle a fatal I/O failure, broadcasting at most once
    fn disconnect(&self, reason: &str) {
        self.shutdown();
        if self.connected.swap(false, Ordering::SeqCst) {
            warn!("Port disconnected: {}", reason);
            self.listeners.notify_disconnected();
        }
    }

    // =========================================================================
    // Reader
    // =========================================================================

    fn run_reader(&self) {
        let mut buf = vec![0u8; self.options.read_buffer_size.max(1)];

        while self.is_running() {
            match self.channel.read(&mut buf) {
                Ok(0) => {
                    if self.is_running() {
                        self.disconnect("end of stream");
                    }
                    break;
                }
                Ok(n) => {
                    self.stats.add_rx_bytes(n);
                    self.process_input(&buf[..n]);
                }
                Err(e) => {
                    if self.is_running() {
                        self.disconnect(&e.to_string());
                    }
                    break;
                }
            }
        }
        debug!("Reader loop exited");
    }

    fn process_input(&self, data: &[u8]) {
        // Drain under the codec lock, deliver without it
        let decoded: Vec<std::result::Result<Message, FramingError>> = {
            let mut codec = self.codec.lock();
            codec.feed(data);
            let mut out = Vec::new();
            while codec.has_complete_message() {
                out.push(codec.take_message());
            }
            out
        };

        for result in decoded {
            match result {
                Ok(msg) => self.handle_message(msg),
                Err(e) => self.handle_framing_error(e),
            }
        }
    }

    fn handle_message(&self, msg: Message) {
        self.stats.add_received();
        debug!("Received {}", msg);
        {
            let _delivery = self.delivery.lock();
            self.listeners.notify_received(&msg);
        }

        let mut state = self.flow.lock();
        if let Some(next) = flow::classify(*state, &msg) {
            *state = next;
            self.flow.notify();
        }
    }

    fn handle_framing_error(&self, e: FramingError) {
        warn!("Discarding unparsable data: {}", e);
        self.stats.add_framing_error();

        // The modem consumed the send even though its answer is garbled
        let mut state = self.flow.lock();
        if *state == ReplyState::AwaitingAck {
            *state = ReplyState::GotAck;
            self.flow.notify();
        }
    }

    // =========================================================================
    // Writer
    // =========================================================================

    fn run_writer(&self) {
        while let Some(msg) = self.queue.take() {
            if !self.is_running() {
                self.queue.requeue(msg);
                break;
            }
            if let Err(e) = self.send_with_retries(&msg) {
                self.disconnect(&e.to_string());
                break;
            }
            if !self.is_running() {
                break;
            }
        }
        debug!("Writer loop exited");
    }

    /// Send one message until acknowledged or out of retries
    fn send_with_retries(&self, msg: &Message) -> Result<()> {
        let mut retransmissions = 0u32;

        loop {
            if !self.is_running() {
                return Ok(());
            }
            self.transmit(msg, retransmissions > 0)?;

            let outcome = self.await_reply();
            match outcome {
                None => return Ok(()),
                Some(ReplyState::GotAck) => break,
                Some(_) => {
                    if retransmissions >= self.options.max_retries {
                        warn!(
                            "Giving up on {} after {} retransmissions",
                            msg, retransmissions
                        );
                        self.stats.add_dropped();
                        break;
                    }
                    retransmissions += 1;
                    warn!("No ACK for {}, retransmitting ({})", msg, retransmissions);
                    self.pause(self.options.retry_backoff);
                }
            }
        }

        self.pause(msg.quiet_time());
        Ok(())
    }

    /// Write the message and announce it, leaving the state `AwaitingAck`
    fn transmit(&self, msg: &Message, retransmission: bool) -> Result<()> {
        let _delivery = self.delivery.lock();
        {
            let mut state = self.flow.lock();
            if !self.is_running() {
                return Err(PortError::NotOpen);
            }
            self.channel.write(msg.data())?;
            *state = ReplyState::AwaitingAck;
        }

        self.stats.add_sent(msg.len());
        if retransmission {
            self.stats.add_retransmission();
        }
        debug!("Sent {}", msg);
        self.listeners.notify_sent(msg);
        Ok(())
    }

    /// Wait for the reader to resolve the send
    ///
    /// A timeout counts as a NACK. Returns `None` when stopping.
    fn await_reply(&self) -> Option<ReplyState> {
        let deadline = Instant::now() + self.options.ack_timeout;
        let mut state = self.flow.lock();

        while *state == ReplyState::AwaitingAck && self.is_running() {
            if self.flow.wait_until(&mut state, deadline) {
                break;
            }
        }

        if !self.is_running() {
            *state = ReplyState::AwaitingNone;
            return None;
        }
        if *state == ReplyState::AwaitingAck {
            debug!("ACK timeout after {:?}", self.options.ack_timeout);
            *state = ReplyState::GotNack;
        }

        let outcome = *state;
        // Late echoes for this send must not resolve the next one
        *state = ReplyState::AwaitingNone;
        Some(outcome)
    }

    /// Sleep, waking early on stop
    fn pause(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let deadline = Instant::now() + duration;
        let mut state = self.flow.lock();
        while self.is_running() {
            if self.flow.wait_until(&mut state, deadline) {
                break;
            }
        }
    }
}
