//! Configuration management
//!
//! Config is a TOML file with a `[port]` section selecting the transport
//! and an optional `[pump]` section tuning flow control.
//!
//! ```toml
//! [port]
//! type = "hub"
//! host = "192.168.1.20"
//! username = "admin"
//! password = "secret"
//!
//! [pump]
//! ack_timeout_ms = 30000
//! ```

use crate::constants::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_BAUD_RATE, DEFAULT_HUB_PORT, DEFAULT_MAX_RETRIES,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_QUEUE_CAPACITY, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_TCP_PORT,
};
use crate::error::{PortError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// =============================================================================
// Port Configuration
// =============================================================================

/// Connection descriptor, selects the `ByteChannel` variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PortConfig {
    /// Local serial device (PowerLinc modem)
    Serial {
        device: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    /// Serial-over-IP bridge speaking the raw modem protocol
    Tcp {
        host: String,
        #[serde(default = "default_tcp_port")]
        port: u16,
    },
    /// Network hub exposing the modem through its HTTP buffer
    Hub {
        host: String,
        #[serde(default = "default_hub_port")]
        port: u16,
        username: String,
        password: String,
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
    },
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_tcp_port() -> u16 {
    DEFAULT_TCP_PORT
}

fn default_hub_port() -> u16 {
    DEFAULT_HUB_PORT
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl PortConfig {
    /// Short human-readable description for logs
    pub fn describe(&self) -> String {
        match self {
            Self::Serial { device, baud_rate } => format!("serial {} @ {} baud", device, baud_rate),
            Self::Tcp { host, port } => format!("tcp {}:{}", host, port),
            Self::Hub { host, port, .. } => format!("hub {}:{}", host, port),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Serial { device, baud_rate } => {
                if device.trim().is_empty() {
                    return Err(invalid("device", "must not be empty"));
                }
                if *baud_rate == 0 {
                    return Err(invalid("baud_rate", "must be positive"));
                }
            }
            Self::Tcp { host, port } => {
                if host.trim().is_empty() {
                    return Err(invalid("host", "must not be empty"));
                }
                if *port == 0 {
                    return Err(invalid("port", "must be positive"));
                }
            }
            Self::Hub {
                host,
                port,
                poll_interval_ms,
                ..
            } => {
                if host.trim().is_empty() {
                    return Err(invalid("host", "must not be empty"));
                }
                if *port == 0 {
                    return Err(invalid("port", "must be positive"));
                }
                if *poll_interval_ms == 0 {
                    return Err(invalid("poll_interval_ms", "must be positive"));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Pump Configuration
// =============================================================================

/// Flow-control tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// Time to wait for an ACK before retransmitting
    pub ack_timeout_ms: u64,
    /// Pause before each retransmission
    pub retry_backoff_ms: u64,
    /// Retransmissions before a message is dropped
    pub max_retries: u32,
    /// Write queue capacity
    pub queue_capacity: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PumpConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ack_timeout_ms == 0 {
            return Err(invalid("ack_timeout_ms", "must be positive"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be positive"));
        }
        Ok(())
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub port: PortConfig,
    #[serde(default)]
    pub pump: PumpConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.port.validate()?;
        self.pump.validate()
    }
}

fn invalid(field: &'static str, reason: &str) -> PortError {
    PortError::ConfigValidation {
        field,
        reason: reason.to_string(),
    }
}

/// Parse and validate config from TOML text
pub fn parse(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).map_err(|e| PortError::ConfigValidation {
        field: "config",
        reason: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Load and validate config from a file
pub fn load(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| PortError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&content)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial_with_defaults() {
        let config = parse(
            r#"
            [port]
            type = "serial"
            device = "/dev/ttyUSB0"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.port,
            PortConfig::Serial {
                device: "/dev/ttyUSB0".into(),
                baud_rate: 19_200,
            }
        );
        assert_eq!(config.pump, PumpConfig::default());
    }

    #[test]
    fn test_parse_hub() {
        let config = parse(
            r#"
            [port]
            type = "hub"
            host = "192.168.1.20"
            username = "admin"
            password = "pw"
            poll_interval_ms = 500

            [pump]
            ack_timeout_ms = 2000
            max_retries = 2
            "#,
        )
        .unwrap();

        match config.port {
            PortConfig::Hub {
                port,
                poll_interval_ms,
                ..
            } => {
                assert_eq!(port, 25105);
                assert_eq!(poll_interval_ms, 500);
            }
            other => panic!("Expected hub config, got {:?}", other),
        }
        assert_eq!(config.pump.ack_timeout(), Duration::from_secs(2));
        assert_eq!(config.pump.max_retries, 2);
        assert_eq!(config.pump.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_parse_tcp_default_port() {
        let config = parse("[port]\ntype = \"tcp\"\nhost = \"modem.local\"\n").unwrap();
        assert_eq!(config.port.describe(), "tcp modem.local:9761");
    }

    #[test]
    fn test_rejects_empty_device() {
        let err = parse("[port]\ntype = \"serial\"\ndevice = \"\"\n").unwrap_err();
        assert!(matches!(
            err,
            PortError::ConfigValidation {
                field: "device",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_queue_capacity() {
        let err = parse(
            "[port]\ntype = \"tcp\"\nhost = \"h\"\n[pump]\nqueue_capacity = 0\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PortError::ConfigValidation {
                field: "queue_capacity",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_unknown_type() {
        assert!(parse("[port]\ntype = \"usb\"\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/insteon-port.toml")).unwrap_err();
        assert!(matches!(err, PortError::ConfigRead { .. }));
    }
}
