//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use clap::{ArgGroup, Parser};
use insteon_port::config::{self, Config, PortConfig, PumpConfig};
use insteon_port::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_HUB_PORT, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TCP_PORT,
};
use insteon_port::error::{PortError, Result};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Monitor and drive an Insteon modem over serial, TCP or a hub
#[derive(Parser, Debug)]
#[command(name = "insteon-port")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("target").args(["config", "serial", "tcp", "hub"]).required(true)))]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Load port and pump settings from a TOML file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serial device (e.g. /dev/ttyUSB0, COM3)
    #[arg(long, value_name = "DEVICE")]
    pub serial: Option<String>,

    /// Serial baud rate
    #[arg(long, value_name = "BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// TCP modem address (HOST[:PORT])
    #[arg(long, value_name = "ADDRESS")]
    pub tcp: Option<String>,

    /// Hub address (HOST[:PORT])
    #[arg(long, value_name = "ADDRESS", requires_all = ["user", "password"])]
    pub hub: Option<String>,

    /// Hub user name
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// Hub password
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Hub polling interval in milliseconds
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval: u64,

    /// Hex-encoded message to send after connecting (repeatable)
    #[arg(long, value_name = "HEX")]
    pub send: Vec<String>,
}

/// Split `HOST[:PORT]`, falling back to `default_port`
fn split_address(address: &str, default_port: u16) -> Result<(String, u16)> {
    match address.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|_| PortError::ConfigValidation {
                field: "port",
                reason: format!("invalid port in '{}'", address),
            })?;
            Ok((host.to_string(), port))
        }
        None => Ok((address.to_string(), default_port)),
    }
}

impl Cli {
    /// Build the effective config from the file or the port flags
    pub fn to_config(&self) -> Result<Config> {
        if let Some(path) = &self.config {
            return config::load(path);
        }

        let port = if let Some(device) = &self.serial {
            PortConfig::Serial {
                device: device.clone(),
                baud_rate: self.baud,
            }
        } else if let Some(address) = &self.tcp {
            let (host, port) = split_address(address, DEFAULT_TCP_PORT)?;
            PortConfig::Tcp { host, port }
        } else if let Some(address) = &self.hub {
            let (host, port) = split_address(address, DEFAULT_HUB_PORT)?;
            PortConfig::Hub {
                host,
                port,
                username: self.user.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
                poll_interval_ms: self.poll_interval,
            }
        } else {
            return Err(PortError::ConfigValidation {
                field: "port",
                reason: "one of --config, --serial, --tcp or --hub is required".into(),
            });
        };

        let config = Config {
            port,
            pump: PumpConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Decode the `--send` arguments
    pub fn messages(&self) -> Result<Vec<Vec<u8>>> {
        self.send
            .iter()
            .map(|hex_str| {
                hex::decode(hex_str.trim()).map_err(|e| PortError::ConfigValidation {
                    field: "send",
                    reason: format!("'{}': {}", hex_str, e),
                })
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_flags() {
        let cli = Cli::parse_from(["insteon-port", "--serial", "/dev/ttyUSB0"]);
        let config = cli.to_config().unwrap();
        assert_eq!(
            config.port,
            PortConfig::Serial {
                device: "/dev/ttyUSB0".into(),
                baud_rate: 19_200,
            }
        );
    }

    #[test]
    fn test_tcp_default_port() {
        let cli = Cli::parse_from(["insteon-port", "--tcp", "modem.local"]);
        let config = cli.to_config().unwrap();
        assert_eq!(
            config.port,
            PortConfig::Tcp {
                host: "modem.local".into(),
                port: 9761,
            }
        );
    }

    #[test]
    fn test_hub_requires_credentials() {
        assert!(Cli::try_parse_from(["insteon-port", "--hub", "10.0.0.5"]).is_err());

        let cli = Cli::try_parse_from([
            "insteon-port",
            "--hub",
            "10.0.0.5:8080",
            "--user",
            "admin",
            "--password",
            "pw",
        ])
        .unwrap();
        match cli.to_config().unwrap().port {
            PortConfig::Hub { host, port, .. } => {
                assert_eq!(host, "10.0.0.5");
                assert_eq!(port, 8080);
            }
            other => panic!("Expected hub config, got {:?}", other),
        }
    }

    #[test]
    fn test_target_required() {
        assert!(Cli::try_parse_from(["insteon-port", "--verbose"]).is_err());
    }

    #[test]
    fn test_send_messages_decoded() {
        let cli = Cli::parse_from([
            "insteon-port",
            "--tcp",
            "h:1",
            "--send",
            "0260",
            "--send",
            "02621A2B3C0F1100",
        ]);
        let messages = cli.messages().unwrap();
        assert_eq!(messages[0], vec![0x02, 0x60]);
        assert_eq!(messages[1].len(), 8);
    }

    #[test]
    fn test_bad_hex_rejected() {
        let cli = Cli::parse_from(["insteon-port", "--tcp", "h", "--send", "02G"]);
        assert!(cli.messages().is_err());
    }

    #[test]
    fn test_bad_port_rejected() {
        let cli = Cli::parse_from(["insteon-port", "--tcp", "h:notaport"]);
        assert!(cli.to_config().is_err());
    }
}
