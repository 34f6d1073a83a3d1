//! Error handling for SerialKit
//!
//! Provides the error taxonomy of the terminal core:
//! - Open errors (claiming a device)
//! - Write errors (sending on a channel)
//! - Read errors (polling an open channel)
//! - Configuration errors (rejected before any timer is armed)
//! - Probe errors (absorbed by the port monitor, never surfaced)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Why a device could not be claimed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The device exists but another handle holds it
    #[error("Port {port} is busy or inaccessible: {reason}")]
    Busy {
        /// The port that could not be claimed.
        port: String,
        /// Driver-reported detail.
        reason: String,
    },

    /// The requested line settings are not supported by the device
    #[error("Invalid configuration for {port}: {reason}")]
    InvalidConfig {
        /// The port being configured.
        port: String,
        /// Which setting was rejected.
        reason: String,
    },

    /// No device with that name exists
    #[error("Port not found: {port}")]
    NotFound {
        /// The name that did not resolve.
        port: String,
    },
}

impl OpenError {
    /// The port the error refers to
    pub fn port(&self) -> &str {
        match self {
            OpenError::Busy { port, .. }
            | OpenError::InvalidConfig { port, .. }
            | OpenError::NotFound { port } => port,
        }
    }
}

/// Why a write did not reach the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The channel is closed
    #[error("Port not open")]
    NotOpen,

    /// The driver rejected or dropped the write
    #[error("Data send failed: {reason}")]
    DeviceError {
        /// Last error reported by the device.
        reason: String,
    },
}

/// Why polling the device for inbound data failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Data receive from {port} failed: {reason}")]
pub struct ReadError {
    /// The port being polled.
    pub port: String,
    /// Last error reported by the device.
    pub reason: String,
}

/// Configuration rejected at the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Timed send interval below the minimum
    #[error("Timed send interval {interval_ms}ms is below the minimum of {minimum_ms}ms")]
    IntervalTooSmall {
        /// The rejected interval.
        interval_ms: u64,
        /// The smallest accepted interval.
        minimum_ms: u64,
    },

    /// A setting value is not in its value table
    #[error("Unknown value '{value}' for {key}")]
    UnknownValue {
        /// The setting name.
        key: String,
        /// The offending value.
        value: String,
    },
}

/// Availability probe failure. The monitor treats this as "disconnected".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The port could not be opened for probing
    #[error("Port {port} inaccessible: {reason}")]
    Inaccessible {
        /// The probed port.
        port: String,
        /// Driver-reported detail.
        reason: String,
    },
}

/// Main error type for SerialKit
///
/// A unified error type that can represent any error from the core.
#[derive(Error, Debug)]
pub enum Error {
    /// Open error
    #[error(transparent)]
    Open(#[from] OpenError),

    /// Write error
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Read error
    #[error(transparent)]
    Read(#[from] ReadError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OpenError::NotFound {
            port: "COM9".to_string(),
        };
        assert_eq!(err.to_string(), "Port not found: COM9");
        assert_eq!(err.port(), "COM9");

        let err = WriteError::DeviceError {
            reason: "broken pipe".to_string(),
        };
        assert_eq!(err.to_string(), "Data send failed: broken pipe");

        let err = ConfigError::IntervalTooSmall {
            interval_ms: 5,
            minimum_ms: 10,
        };
        assert_eq!(
            err.to_string(),
            "Timed send interval 5ms is below the minimum of 10ms"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = WriteError::NotOpen.into();
        assert!(matches!(err, Error::Write(WriteError::NotOpen)));

        let err: Error = ReadError {
            port: "/dev/ttyUSB0".to_string(),
            reason: "No such device".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Data receive from /dev/ttyUSB0 failed: No such device"
        );

        let err: Error = ConfigError::IntervalTooSmall {
            interval_ms: 1,
            minimum_ms: 10,
        }
        .into();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(Error::other("boom").to_string(), "boom");
    }
}
