//! Serial channel
//!
//! Owns the session's device handle. Only a successful `open` or `close`
//! changes the channel state; the line configuration is fixed for the
//! lifetime of one handle.

use super::{SerialBackend, SerialDevice};
use serialkit_core::{ChannelState, OpenError, PortConfig, ReadError, WriteError};
use std::sync::Arc;

/// The session's one serial connection
pub struct SerialChannel {
    backend: Arc<dyn SerialBackend>,
    device: Option<Box<dyn SerialDevice>>,
    config: Option<PortConfig>,
}

impl SerialChannel {
    /// Closed channel on the given backend
    pub fn new(backend: Arc<dyn SerialBackend>) -> Self {
        Self {
            backend,
            device: None,
            config: None,
        }
    }

    /// Claim the configured port
    ///
    /// An already open channel is closed first, so reopening is how a new
    /// configuration is applied.
    pub fn open(&mut self, config: PortConfig) -> Result<(), OpenError> {
        if self.is_open() {
            tracing::debug!("Reopening channel with {}", config);
            self.close();
        }

        let device = self.backend.open(&config)?;
        tracing::info!("Opened {}", config);
        self.device = Some(device);
        self.config = Some(config);
        Ok(())
    }

    /// Release the port; closing a closed channel does nothing
    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.close() {
                tracing::warn!("Error closing {}: {}", device.name(), e);
            }
            tracing::info!("Closed {}", device.name());
        }
    }

    /// Write bytes to the device
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, WriteError> {
        let device = self.device.as_mut().ok_or(WriteError::NotOpen)?;
        device.write(bytes).map_err(|e| {
            let reason = device.last_error().unwrap_or_else(|| e.to_string());
            tracing::warn!("Write to {} failed: {}", device.name(), reason);
            WriteError::DeviceError { reason }
        })
    }

    /// Everything the device has pending, without blocking
    ///
    /// Empty when closed or when nothing is pending. A failed poll means the
    /// handle is no longer usable; the caller decides whether to close.
    pub fn read_available(&mut self) -> Result<Vec<u8>, ReadError> {
        let Some(device) = self.device.as_mut() else {
            return Ok(Vec::new());
        };
        device.read_available().map_err(|e| {
            let reason = device.last_error().unwrap_or_else(|| e.to_string());
            tracing::warn!("Read from {} failed: {}", device.name(), reason);
            ReadError {
                port: device.name().to_string(),
                reason,
            }
        })
    }

    /// Whether a device handle is held
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Current state
    pub fn state(&self) -> ChannelState {
        if self.is_open() {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }

    /// Configuration of the last successful open
    pub fn config(&self) -> Option<&PortConfig> {
        self.config.as_ref()
    }

    /// Name of the open port, if any
    pub fn open_port(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.name())
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mock::MockBackend;
    use serialkit_core::{BaudRate, StopBits};

    fn channel(backend: &MockBackend) -> SerialChannel {
        SerialChannel::new(Arc::new(backend.clone()))
    }

    #[test]
    fn test_open_close_lifecycle() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut ch = channel(&backend);
        assert_eq!(ch.state(), ChannelState::Closed);

        ch.open(PortConfig::new("COM3").with_baud_rate(BaudRate::B115200))
            .unwrap();
        assert_eq!(ch.state(), ChannelState::Open);
        assert_eq!(ch.open_port(), Some("COM3"));
        assert_eq!(
            backend.last_config("COM3").map(|c| c.baud_rate),
            Some(BaudRate::B115200)
        );

        ch.close();
        assert_eq!(ch.state(), ChannelState::Closed);
        assert!(!backend.is_claimed("COM3"));

        // idempotent
        ch.close();
        assert_eq!(ch.state(), ChannelState::Closed);
    }

    #[test]
    fn test_open_failures_leave_channel_closed() {
        let backend = MockBackend::with_ports(["COM3"]);
        backend.reject_one_and_half_stop_bits(true);
        let mut ch = channel(&backend);

        assert!(matches!(
            ch.open(PortConfig::new("COM4")),
            Err(OpenError::NotFound { .. })
        ));
        assert!(matches!(
            ch.open(PortConfig::new("COM3").with_stop_bits(StopBits::OneAndHalf)),
            Err(OpenError::InvalidConfig { .. })
        ));
        backend.hold("COM3", true);
        assert!(matches!(
            ch.open(PortConfig::new("COM3")),
            Err(OpenError::Busy { .. })
        ));
        assert!(!ch.is_open());
    }

    #[test]
    fn test_write_requires_open() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut ch = channel(&backend);
        assert_eq!(ch.write(b"AT"), Err(WriteError::NotOpen));

        ch.open(PortConfig::new("COM3")).unwrap();
        assert_eq!(ch.write(b"AT"), Ok(2));
        assert_eq!(backend.written("COM3"), b"AT".to_vec());
    }

    #[test]
    fn test_write_error_carries_last_error() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut ch = channel(&backend);
        ch.open(PortConfig::new("COM3")).unwrap();
        backend.fail_writes("COM3", Some("Resource temporarily unavailable"));
        assert_eq!(
            ch.write(b"AT"),
            Err(WriteError::DeviceError {
                reason: "Resource temporarily unavailable".to_string()
            })
        );
    }

    #[test]
    fn test_read_available_is_non_blocking() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut ch = channel(&backend);
        assert_eq!(ch.read_available(), Ok(Vec::new()));

        ch.open(PortConfig::new("COM3")).unwrap();
        assert_eq!(ch.read_available(), Ok(Vec::new()));
        backend.push_inbound("COM3", &[0x41, 0x42]);
        assert_eq!(ch.read_available(), Ok(vec![0x41, 0x42]));
    }

    #[test]
    fn test_read_from_unplugged_device_fails() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut ch = channel(&backend);
        ch.open(PortConfig::new("COM3")).unwrap();

        backend.remove_port("COM3");
        assert_eq!(
            ch.read_available(),
            Err(ReadError {
                port: "COM3".to_string(),
                reason: "Device disconnected".to_string(),
            })
        );
    }

    #[test]
    fn test_reopen_applies_new_config() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut ch = channel(&backend);
        ch.open(PortConfig::new("COM3")).unwrap();
        ch.open(PortConfig::new("COM3").with_baud_rate(BaudRate::B57600))
            .unwrap();
        assert!(ch.is_open());
        assert_eq!(ch.config().map(|c| c.baud_rate), Some(BaudRate::B57600));
    }
}
