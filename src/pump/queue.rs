//! Bounded FIFO of messages awaiting transmission
//!
//! Many producers push, the writer thread is the only consumer. Pushing
//! never blocks: a full queue rejects the message.

use crate::message::Message;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct State {
    messages: VecDeque<Message>,
    shutdown: bool,
}

pub struct WriteQueue {
    state: Mutex<State>,
    available: Condvar,
    capacity: usize,
}

impl WriteQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                messages: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append a message, returns `false` if the queue is full
    ///
    /// Messages pushed while the pump is stopped wait for the next start.
    pub fn push(&self, msg: Message) -> bool {
        let mut state = self.state.lock();
        if state.messages.len() >= self.capacity {
            return false;
        }
        state.messages.push_back(msg);
        self.available.notify_one();
        true
    }

    /// Put back a message taken just before shutdown
    pub fn requeue(&self, msg: Message) {
        self.state.lock().messages.push_front(msg);
    }

    /// Block until a message is available
    ///
    /// Returns `None` once the queue is shut down.
    pub fn take(&self) -> Option<Message> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(msg) = state.messages.pop_front() {
                return Some(msg);
            }
            self.available.wait(&mut state);
        }
    }

    /// Wake the consumer with `None`; queued messages are kept
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.available.notify_all();
    }

    pub fn reopen(&self) {
        self.state.lock().shutdown = false;
    }

    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
