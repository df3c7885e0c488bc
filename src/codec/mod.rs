//! Codec abstraction for message framing
//!
//! Separates framing concerns from transport:
//! - **Codec**: how bytes become messages (modem grammar lives elsewhere)
//! - **Transport**: how bytes flow (Serial, TCP, Hub)
//!
//! The pump only needs the pull interface below; it never inspects the
//! byte grammar itself.

pub mod raw;

pub use raw::RawCodec;

use crate::error::FramingError;
use crate::message::Message;

/// Pull-style message codec
///
/// The reader loop calls `feed` with every chunk read from the channel,
/// then drains with `take_message` while `has_complete_message` is true.
pub trait MessageCodec: Send {
    /// Buffer incoming bytes
    fn feed(&mut self, data: &[u8]);

    /// True when `take_message` would return a unit (or a framing error)
    fn has_complete_message(&self) -> bool;

    /// Remove the next unit
    ///
    /// A framing error discards only the bad unit, not the whole buffer.
    fn take_message(&mut self) -> Result<Message, FramingError>;

    /// Drop any partially buffered data (called on every pump start)
    fn clear(&mut self);
}
