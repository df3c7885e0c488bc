//! Half-duplex flow control state
//!
//! The writer owns the outstanding send; the reader resolves it. Both
//! access `ReplyState` only under `FlowControl::state`, and the writer
//! checks the state under that lock before every wait, so a reply that
//! arrives before the writer starts waiting is never lost.

use crate::message::Message;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::Instant;

/// State of the outstanding send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    /// Nothing in flight
    AwaitingNone,
    /// Sent, waiting for the modem to answer
    AwaitingAck,
    GotAck,
    GotNack,
}

/// How an incoming message resolves the outstanding send
///
/// While awaiting an ack, a pure NACK rejects the send and an echo accepts
/// it. Anything else (including plain replies) leaves the state alone.
pub fn classify(state: ReplyState, msg: &Message) -> Option<ReplyState> {
    if state != ReplyState::AwaitingAck {
        return None;
    }
    if msg.is_pure_nack() {
        Some(ReplyState::GotNack)
    } else if msg.is_echo() {
        Some(ReplyState::GotAck)
    } else {
        None
    }
}

/// Lock and condition shared by the reader and writer loops
pub struct FlowControl {
    state: Mutex<ReplyState>,
    signal: Condvar,
}

impl FlowControl {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReplyState::AwaitingNone),
            signal: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, ReplyState> {
        self.state.lock()
    }

    /// Wake the writer (state must have been changed under the lock)
    pub fn notify(&self) {
        self.signal.notify_all();
    }

    /// Wait for a notification or the deadline
    ///
    /// Returns `true` if the deadline passed.
    pub fn wait_until(&self, guard: &mut MutexGuard<'_, ReplyState>, deadline: Instant) -> bool {
        self.signal.wait_until(guard, deadline).timed_out()
    }

    /// Wake every waiter, taking the lock so the wakeup cannot be missed
    pub fn wake_all(&self) {
        let _state = self.state.lock();
        self.signal.notify_all();
    }

    pub fn reset(&self) {
        *self.state.lock() = ReplyState::AwaitingNone;
    }

    pub fn current(&self) -> ReplyState {
        *self.state.lock()
    }
}

impl Default for FlowControl {
    fn default() -> Self {
        Self::new()
    }
}
