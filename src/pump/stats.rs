//! Traffic statistics for the pump
//!
//! Thread-safe counters updated by the reader and writer loops.
//! Uses lock-free atomics for all operations.

use std::sync::atomic::{AtomicU64, Ordering};

/// Message counters (fully lock-free)
#[derive(Default)]
pub struct PumpStats {
    /// Messages written to the channel, retransmissions included
    sent: AtomicU64,
    /// Messages decoded from the channel
    received: AtomicU64,
    /// Bytes written to the channel
    tx_bytes: AtomicU64,
    /// Bytes read from the channel
    rx_bytes: AtomicU64,
    retransmissions: AtomicU64,
    /// Messages rejected by a full queue or given up after retries
    dropped: AtomicU64,
    framing_errors: AtomicU64,
}

/// Point-in-time copy of `PumpStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub received: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub retransmissions: u64,
    pub dropped: u64,
    pub framing_errors: u64,
}

impl PumpStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_sent(&self, bytes: usize) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.tx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_rx_bytes(&self, bytes: usize) {
        self.rx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_retransmission(&self) {
        self.retransmissions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_framing_error(&self) {
        self.framing_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            retransmissions: self.retransmissions.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
        }
    }
}
