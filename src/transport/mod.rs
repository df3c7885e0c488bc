//! Transport abstraction for byte-level I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: How bytes flow (Serial, TCP, Hub)
//! - **Codec**: How messages are framed (handled separately)
//!
//! A `ByteChannel` is shared between exactly one reader thread and one
//! writer thread, so `read` and `write` take `&self` and must be safe to
//! call concurrently with each other and with `close`.
//!
//! # Adding a new transport
//!
//! 1. Create `transport/my_transport.rs`
//! 2. Implement the `ByteChannel` trait
//! 3. Add a `PortConfig` variant and a match arm in `create`

pub mod hub;
pub mod serial;
pub mod tcp;

pub use hub::HubChannel;
pub use serial::SerialChannel;
pub use tcp::TcpChannel;

use crate::config::PortConfig;
use crate::error::Result;

/// Duplex byte stream to a modem
///
/// # Lifecycle
///
/// 1. Create from a `PortConfig` (nothing is opened yet)
/// 2. `open()` acquires the underlying resource
/// 3. `read()`/`write()` from the pump's threads
/// 4. `close()` releases the resource and unblocks a pending `read()`
///
/// A channel may be reopened after `close()`.
pub trait ByteChannel: Send + Sync {
    /// Acquire the underlying resource
    ///
    /// Fails if already open; on failure the channel stays closed.
    fn open(&self) -> Result<()>;

    /// Release the underlying resource
    ///
    /// Idempotent, and safe to call on a channel that was never opened.
    fn close(&self);

    fn is_open(&self) -> bool;

    /// Block until at least one byte is available
    ///
    /// `Ok(0)` means end of stream: the peer closed, or `close()` was called.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Block until all bytes are accepted by the transport
    fn write(&self, data: &[u8]) -> Result<()>;
}

/// Build the channel variant selected by the config
///
/// Nothing is opened; only the hub HTTP client setup can fail here.
pub fn create(config: &PortConfig) -> Result<Box<dyn ByteChannel>> {
    let channel: Box<dyn ByteChannel> = match config {
        PortConfig::Serial { device, baud_rate } => {
            Box::new(SerialChannel::new(device.clone(), *baud_rate))
        }
        PortConfig::Tcp { host, port } => Box::new(TcpChannel::new(host.clone(), *port)),
        PortConfig::Hub {
            host,
            port,
            username,
            password,
            poll_interval_ms,
        } => Box::new(HubChannel::http(
            host,
            *port,
            username,
            password,
            std::time::Duration::from_millis(*poll_interval_ms),
        )?),
    };
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_starts_closed() {
        let configs = [
            PortConfig::Serial {
                device: "/dev/null-modem".into(),
                baud_rate: 19_200,
            },
            PortConfig::Tcp {
                host: "127.0.0.1".into(),
                port: 9761,
            },
            PortConfig::Hub {
                host: "127.0.0.1".into(),
                port: 25105,
                username: "u".into(),
                password: "p".into(),
                poll_interval_ms: 1000,
            },
        ];

        for config in &configs {
            let channel = create(config).unwrap();
            assert!(!channel.is_open());
            // Closing a never-opened channel is fine
            channel.close();
            assert!(!channel.is_open());
        }
    }
}
