//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Serial
// =============================================================================

/// Default modem baud rate
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Serial read timeout used internally so that `close()` is observed promptly
pub const SERIAL_READ_TIMEOUT_MS: u64 = 50;

// =============================================================================
// Network
// =============================================================================

/// Default TCP port of serial-over-IP modems
pub const DEFAULT_TCP_PORT: u16 = 9761;

/// Default HTTP port of the hub
pub const DEFAULT_HUB_PORT: u16 = 25105;

/// TCP connect timeout (seconds)
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Hub HTTP request timeout (seconds)
pub const HUB_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default hub polling interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Consecutive failed hub polls before the channel reports a disconnect
pub const HUB_MAX_POLL_FAILURES: u32 = 3;

// =============================================================================
// Flow control
// =============================================================================

/// Time to wait for an ACK before treating the send as NACKed (milliseconds)
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 30_000;

/// Pause before retransmitting a NACKed message (milliseconds)
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;

/// Retransmissions of one message before it is dropped
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Write queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

// =============================================================================
// Buffers
// =============================================================================

/// Channel read buffer size
pub const READ_BUFFER_SIZE: usize = 1024;

/// Initial capacity of a `BlockingByteBuffer`
pub const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Consecutive zero-byte serial reads before assuming the device is gone
pub const SERIAL_DISCONNECT_THRESHOLD: u32 = 10;
