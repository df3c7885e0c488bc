//! Framed modem messages as seen by the pump

use bytes::Bytes;
use std::fmt;
use std::time::Duration;

/// One framed unit produced by a codec
///
/// Immutable once built. Cloning is cheap (the payload is shared).
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    data: Bytes,
    quiet_time: Duration,
    reply: bool,
    pure_nack: bool,
    echo: bool,
}

impl Message {
    /// Create an outbound message with no quiet time and no classification
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            quiet_time: Duration::ZERO,
            reply: false,
            pure_nack: false,
            echo: false,
        }
    }

    /// Minimum spacing after this message is acknowledged before the next send
    pub fn with_quiet_time(mut self, quiet_time: Duration) -> Self {
        self.quiet_time = quiet_time;
        self
    }

    pub fn with_reply(mut self, reply: bool) -> Self {
        self.reply = reply;
        self
    }

    pub fn with_pure_nack(mut self, pure_nack: bool) -> Self {
        self.pure_nack = pure_nack;
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Wire encoding, retransmitted verbatim on NACK
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn quiet_time(&self) -> Duration {
        self.quiet_time
    }

    pub fn is_reply(&self) -> bool {
        self.reply
    }

    /// The modem rejected the last send without echoing it (busy)
    pub fn is_pure_nack(&self) -> bool {
        self.pure_nack
    }

    /// The modem reflected the message we just sent
    pub fn is_echo(&self) -> bool {
        self.echo
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("data", &hex::encode(&self.data))
            .field("quiet_time", &self.quiet_time)
            .field("reply", &self.reply)
            .field("pure_nack", &self.pure_nack)
            .field("echo", &self.echo)
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(&self.data))
    }
}
