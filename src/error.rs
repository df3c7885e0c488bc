//! Centralized error types for the port layer
//!
//! All port errors are represented by the `PortError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, PortError>`.

use std::fmt;
use std::path::PathBuf;

/// A codec could not parse one framed unit
///
/// Only the bad unit is discarded; the stream continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingError {
    pub reason: String,
}

impl FramingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "framing error: {}", self.reason)
    }
}

impl std::error::Error for FramingError {}

/// All port errors
#[derive(Debug)]
pub enum PortError {
    // === Transport ===
    /// Failed to open serial device
    SerialOpen {
        device: String,
        source: std::io::Error,
    },
    /// Failed to resolve or connect to a TCP endpoint
    TcpConnect {
        address: String,
        source: std::io::Error,
    },
    /// Hub HTTP request failed
    HubRequest { url: String, reason: String },
    /// Channel is already open
    AlreadyOpen,
    /// Channel is not open
    NotOpen,
    /// Read or write on an open channel failed
    Io { source: std::io::Error },

    // === Protocol ===
    /// Codec rejected a framed unit
    Framing(FramingError),
    /// Hub buffer cursor could not be parsed
    HubCursor { raw: String },

    // === Config ===
    /// Config file could not be read
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
}

impl std::error::Error for PortError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. }
            | Self::TcpConnect { source, .. }
            | Self::Io { source }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source } => Some(source),
            Self::Framing(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialOpen { device, .. } => write!(f, "Cannot open serial device: {}", device),
            Self::TcpConnect { address, .. } => write!(f, "Cannot connect to {}", address),
            Self::HubRequest { url, reason } => write!(f, "Hub request {} failed: {}", url, reason),
            Self::AlreadyOpen => write!(f, "Channel already open"),
            Self::NotOpen => write!(f, "Channel not open"),
            Self::Io { source } => write!(f, "IO error: {}", source),
            Self::Framing(e) => write!(f, "{}", e),
            Self::HubCursor { raw } => write!(f, "Invalid hub buffer cursor: {:?}", raw),
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

impl From<std::io::Error> for PortError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

impl From<FramingError> for PortError {
    fn from(e: FramingError) -> Self {
        Self::Framing(e)
    }
}

/// Alias for Result with PortError
pub type Result<T> = std::result::Result<T, PortError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_includes_context() {
        let err = PortError::SerialOpen {
            device: "/dev/ttyUSB0".into(),
            source: std::io::Error::other("busy"),
        };
        assert_eq!(err.to_string(), "Cannot open serial device: /dev/ttyUSB0");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_framing_error_converts() {
        let err: PortError = FramingError::new("bad start byte").into();
        assert!(matches!(err, PortError::Framing(_)));
        assert_eq!(err.to_string(), "framing error: bad start byte");
    }

    #[test]
    fn test_io_error_converts() {
        let err: PortError = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err, PortError::Io { .. }));
    }
}
