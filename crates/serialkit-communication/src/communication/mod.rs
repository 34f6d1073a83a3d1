//! Device boundary and the components built directly on it
//!
//! The OS serial driver is seen only through [`SerialBackend`] (enumerate,
//! open, probe) and [`SerialDevice`] (write, poll, last error, close).

pub mod channel;
pub mod mock;
pub mod monitor;
pub mod registry;
pub mod scheduler;
pub mod serial;

use serialkit_core::{OpenError, PortConfig, ProbeError, Result};
use std::io;

/// An open serial device handle
pub trait SerialDevice: Send {
    /// Port name the handle was opened on
    fn name(&self) -> &str;

    /// Write bytes, returning how many the driver accepted
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Non-blocking read of everything pending; empty when nothing is waiting
    fn read_available(&mut self) -> io::Result<Vec<u8>>;

    /// Text of the last driver error on this handle
    fn last_error(&self) -> Option<String>;

    /// Release the handle
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Access to the serial devices of the host
pub trait SerialBackend: Send + Sync {
    /// Enumerate the ports currently present
    fn list_available(&self) -> Result<Vec<serial::SerialPortInfo>>;

    /// Claim a port exclusively with the given line settings
    fn open(&self, config: &PortConfig) -> std::result::Result<Box<dyn SerialDevice>, OpenError>;

    /// Throwaway exclusive open/close to test whether a port is claimable
    fn probe(&self, port_name: &str) -> std::result::Result<(), ProbeError> {
        let mut device = self
            .open(&PortConfig::new(port_name))
            .map_err(|e| ProbeError::Inaccessible {
                port: port_name.to_string(),
                reason: e.to_string(),
            })?;
        if let Err(e) = device.close() {
            tracing::debug!("Probe close of {} failed: {}", port_name, e);
        }
        Ok(())
    }
}
