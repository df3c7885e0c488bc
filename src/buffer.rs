//! Growable blocking byte queue
//!
//! Bridges a producer thread (e.g. the hub poller) and a consumer blocked in
//! `ByteChannel::read`. Reads block while the buffer is empty and open;
//! `close()` turns every pending and future read into end of stream.

use crate::constants::INITIAL_BUFFER_CAPACITY;
use parking_lot::{Condvar, Mutex};

struct Inner {
    /// Physical storage, `data.len()` is the capacity
    data: Vec<u8>,
    /// Read cursor
    pos: usize,
    /// Number of valid bytes written into `data`
    limit: usize,
    closed: bool,
}

impl Inner {
    fn available(&self) -> usize {
        self.limit - self.pos
    }
}

/// Thread-safe byte queue with blocking reads
///
/// Invariant: `pos <= limit <= capacity`. Capacity grows to
/// `max(2 * capacity, needed)` and never shrinks.
///
/// One logical reader and one logical producer per instance.
pub struct BlockingByteBuffer {
    inner: Mutex<Inner>,
    readable: Condvar,
}

impl BlockingByteBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                data: vec![0; capacity],
                pos: 0,
                limit: 0,
                closed: false,
            }),
            readable: Condvar::new(),
        }
    }

    /// Append bytes and wake a blocked reader
    ///
    /// No-op once the buffer is closed.
    pub fn append(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }

        let needed = inner.limit + bytes.len();
        if needed > inner.data.len() {
            let grown = (inner.data.len() * 2).max(needed);
            inner.data.resize(grown, 0);
        }

        let start = inner.limit;
        inner.data[start..needed].copy_from_slice(bytes);
        inner.limit = needed;
        self.readable.notify_all();
    }

    /// Read a single byte, blocking while empty
    ///
    /// Returns `None` at end of stream.
    pub fn read(&self) -> Option<u8> {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return None;
            }
            if inner.available() > 0 {
                let b = inner.data[inner.pos];
                inner.pos += 1;
                return Some(b);
            }
            self.readable.wait(&mut inner);
        }
    }

    /// Read up to `dest.len()` bytes, blocking until at least one is available
    ///
    /// Returns `None` at end of stream.
    pub fn read_into(&self, dest: &mut [u8]) -> Option<usize> {
        if dest.is_empty() {
            return Some(0);
        }
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return None;
            }
            let available = inner.available();
            if available > 0 {
                let n = available.min(dest.len());
                let start = inner.pos;
                dest[..n].copy_from_slice(&inner.data[start..start + n]);
                inner.pos += n;
                return Some(n);
            }
            self.readable.wait(&mut inner);
        }
    }

    /// Discard already consumed bytes
    ///
    /// Must not race with a reader that is mid-read.
    pub fn compact(&self) {
        let mut inner = self.inner.lock();
        if inner.pos == 0 {
            return;
        }
        let (pos, limit) = (inner.pos, inner.limit);
        inner.data.copy_within(pos..limit, 0);
        inner.limit = limit - pos;
        inner.pos = 0;
    }

    /// Close the buffer, waking every blocked reader with end of stream
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        self.readable.notify_all();
    }

    /// Clear contents and accept data again after a `close()`
    pub fn reopen(&self) {
        let mut inner = self.inner.lock();
        inner.pos = 0;
        inner.limit = 0;
        inner.closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of unread bytes
    pub fn len(&self) -> usize {
        self.inner.lock().available()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().data.len()
    }
}

impl Default for BlockingByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
