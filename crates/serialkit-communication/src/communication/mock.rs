//! In-memory serial backend
//!
//! Stands in for the host driver in tests and demos. Ports are created with
//! [`MockBackend::add_port`]; bytes pushed with [`MockBackend::push_inbound`]
//! become readable on the open handle, and everything written is recorded.
//! A port can be held by a simulated foreign process with
//! [`MockBackend::hold`], which makes opens and probes fail as busy.

use super::serial::SerialPortInfo;
use super::{SerialBackend, SerialDevice};
use parking_lot::Mutex;
use serialkit_core::{OpenError, PortConfig, Result, StopBits};
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MockPort {
    claimed: bool,
    held_externally: bool,
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    write_failure: Option<String>,
    write_limit: Option<usize>,
    last_config: Option<PortConfig>,
    open_count: usize,
}

#[derive(Debug, Default)]
struct MockState {
    ports: BTreeMap<String, MockPort>,
    reject_one_and_half: bool,
}

/// Shared handle on a simulated set of serial ports
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Backend with no ports
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with the named ports present
    pub fn with_ports<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        for name in names {
            backend.add_port(name);
        }
        backend
    }

    /// Plug in a port
    pub fn add_port(&self, name: impl Into<String>) {
        self.state.lock().ports.entry(name.into()).or_default();
    }

    /// Unplug a port
    pub fn remove_port(&self, name: &str) {
        self.state.lock().ports.remove(name);
    }

    /// Make bytes readable on the port
    pub fn push_inbound(&self, name: &str, bytes: &[u8]) {
        if let Some(port) = self.state.lock().ports.get_mut(name) {
            port.inbound.extend(bytes);
        }
    }

    /// Everything written to the port so far
    pub fn written(&self, name: &str) -> Vec<u8> {
        self.state
            .lock()
            .ports
            .get(name)
            .map(|port| port.written.clone())
            .unwrap_or_default()
    }

    /// Make subsequent writes fail with the given driver message
    pub fn fail_writes(&self, name: &str, message: Option<&str>) {
        if let Some(port) = self.state.lock().ports.get_mut(name) {
            port.write_failure = message.map(str::to_string);
        }
    }

    /// Accept at most `limit` bytes per write
    pub fn limit_writes(&self, name: &str, limit: Option<usize>) {
        if let Some(port) = self.state.lock().ports.get_mut(name) {
            port.write_limit = limit;
        }
    }

    /// Simulate another process holding (`true`) or releasing the port
    pub fn hold(&self, name: &str, held: bool) {
        if let Some(port) = self.state.lock().ports.get_mut(name) {
            port.held_externally = held;
        }
    }

    /// Reject 1.5 stop bits like drivers without that mode
    pub fn reject_one_and_half_stop_bits(&self, reject: bool) {
        self.state.lock().reject_one_and_half = reject;
    }

    /// Whether a handle on the port is currently open
    pub fn is_claimed(&self, name: &str) -> bool {
        self.state
            .lock()
            .ports
            .get(name)
            .is_some_and(|port| port.claimed)
    }

    /// Line settings of the last successful open
    pub fn last_config(&self, name: &str) -> Option<PortConfig> {
        self.state
            .lock()
            .ports
            .get(name)
            .and_then(|port| port.last_config.clone())
    }

    /// Number of successful opens, probes included
    pub fn open_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .ports
            .get(name)
            .map_or(0, |port| port.open_count)
    }
}

impl SerialBackend for MockBackend {
    fn list_available(&self) -> Result<Vec<SerialPortInfo>> {
        Ok(self
            .state
            .lock()
            .ports
            .keys()
            .map(|name| SerialPortInfo::new(name, "Mock Serial Port"))
            .collect())
    }

    fn open(&self, config: &PortConfig) -> std::result::Result<Box<dyn SerialDevice>, OpenError> {
        let mut state = self.state.lock();
        let reject_one_and_half = state.reject_one_and_half;
        let port = state
            .ports
            .get_mut(&config.port_name)
            .ok_or_else(|| OpenError::NotFound {
                port: config.port_name.clone(),
            })?;

        if reject_one_and_half && config.stop_bits == StopBits::OneAndHalf {
            return Err(OpenError::InvalidConfig {
                port: config.port_name.clone(),
                reason: "1.5 stop bits not supported".to_string(),
            });
        }
        if port.claimed || port.held_externally {
            return Err(OpenError::Busy {
                port: config.port_name.clone(),
                reason: "Device or resource busy".to_string(),
            });
        }

        port.claimed = true;
        port.open_count += 1;
        port.last_config = Some(config.clone());

        Ok(Box::new(MockDevice {
            name: config.port_name.clone(),
            state: Arc::clone(&self.state),
            last_error: None,
            closed: false,
        }))
    }
}

/// Open handle on a mock port; dropping it releases the claim
#[derive(Debug)]
pub struct MockDevice {
    name: String,
    state: Arc<Mutex<MockState>>,
    last_error: Option<String>,
    closed: bool,
}

impl MockDevice {
    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(port) = self.state.lock().ports.get_mut(&self.name) {
            port.claimed = false;
        }
    }
}

impl SerialDevice for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let Some(port) = state.ports.get_mut(&self.name) else {
            self.last_error = Some("Device disconnected".to_string());
            return Err(io::Error::new(io::ErrorKind::NotConnected, "Device disconnected"));
        };

        if let Some(message) = port.write_failure.clone() {
            self.last_error = Some(message.clone());
            return Err(io::Error::new(io::ErrorKind::Other, message));
        }

        let n = port.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        port.written.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let mut state = self.state.lock();
        match state.ports.get_mut(&self.name) {
            Some(port) => Ok(port.inbound.drain(..).collect()),
            None => {
                self.last_error = Some("Device disconnected".to_string());
                Err(io::Error::new(io::ErrorKind::NotConnected, "Device disconnected"))
            }
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    fn close(&mut self) -> io::Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_is_exclusive() {
        let backend = MockBackend::with_ports(["COM3"]);
        let device = backend.open(&PortConfig::new("COM3")).unwrap();
        assert!(backend.is_claimed("COM3"));
        assert!(matches!(
            backend.open(&PortConfig::new("COM3")),
            Err(OpenError::Busy { .. })
        ));
        drop(device);
        assert!(!backend.is_claimed("COM3"));
    }

    #[test]
    fn test_probe_releases_port() {
        let backend = MockBackend::with_ports(["COM3"]);
        assert!(backend.probe("COM3").is_ok());
        assert!(!backend.is_claimed("COM3"));
        assert_eq!(backend.open_count("COM3"), 1);

        backend.hold("COM3", true);
        assert!(backend.probe("COM3").is_err());
        assert!(backend.probe("COM9").is_err());
    }

    #[test]
    fn test_inbound_drains_once() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut device = backend.open(&PortConfig::new("COM3")).unwrap();
        assert!(device.read_available().unwrap().is_empty());
        backend.push_inbound("COM3", b"AB");
        backend.push_inbound("COM3", b"C");
        assert_eq!(device.read_available().unwrap(), b"ABC".to_vec());
        assert!(device.read_available().unwrap().is_empty());
    }

    #[test]
    fn test_write_failure_sets_last_error() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut device = backend.open(&PortConfig::new("COM3")).unwrap();
        backend.fail_writes("COM3", Some("I/O error"));
        assert!(device.write(b"x").is_err());
        assert_eq!(device.last_error().as_deref(), Some("I/O error"));
        assert!(backend.written("COM3").is_empty());
    }
}
