//! Insteon Port - transport engine for Insteon modems
//!
//! Talks to a PowerLinc-style modem over a serial port, a raw TCP socket, or
//! a network hub's HTTP buffer, with half-duplex ACK/NACK flow control:
//!
//! - `transport` - `ByteChannel` and its Serial/TCP/Hub variants
//! - `buffer` - blocking byte queue feeding the hub channel
//! - `pump` - reader/writer threads, retransmission, listeners
//! - `codec` - the framing interface the pump consumes

pub mod buffer;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod message;
pub mod pump;
pub mod transport;

pub use buffer::BlockingByteBuffer;
pub use codec::MessageCodec;
pub use config::{Config, PortConfig, PumpConfig};
pub use error::{FramingError, PortError, Result};
pub use message::Message;
pub use pump::{MessagePump, PortListener, PumpOptions};
pub use transport::ByteChannel;
