//! Raw pass-through codec
//!
//! Performs no framing:
//! - each fed chunk becomes one message
//! - every message is classified as an echo reply
//!
//! Suitable for monitoring a link, or for any transport where the peer
//! answers each send with exactly one chunk.

use super::MessageCodec;
use crate::error::FramingError;
use crate::message::Message;
use bytes::Bytes;
use std::collections::VecDeque;

/// Pass-through codec
///
/// # Example
///
/// ```ignore
/// let mut codec = RawCodec::new();
/// codec.feed(&[0x02, 0x60]);
/// let msg = codec.take_message()?;
/// // msg.data() == [0x02, 0x60], msg.is_echo() == true
/// ```
pub struct RawCodec {
    pending: VecDeque<Bytes>,
}

impl RawCodec {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }
}

impl Default for RawCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCodec for RawCodec {
    fn feed(&mut self, data: &[u8]) {
        if !data.is_empty() {
            self.pending.push_back(Bytes::copy_from_slice(data));
        }
    }

    fn has_complete_message(&self) -> bool {
        !self.pending.is_empty()
    }

    fn take_message(&mut self) -> Result<Message, FramingError> {
        let data = self
            .pending
            .pop_front()
            .ok_or_else(|| FramingError::new("no buffered data"))?;
        Ok(Message::new(data).with_reply(true).with_echo(true))
    }

    fn clear(&mut self) {
        self.pending.clear();
    }
}
