//! Port registry
//!
//! Remembers the result of the last port enumeration so the session can
//! check that a selected name is one the OS actually offered.

use super::serial::SerialPortInfo;
use super::SerialBackend;
use std::sync::Arc;

/// Enumerates serial device names through a backend
pub struct PortRegistry {
    backend: Arc<dyn SerialBackend>,
    ports: Vec<SerialPortInfo>,
}

impl PortRegistry {
    /// Registry with an empty port list; call [`refresh`](Self::refresh) to populate
    pub fn new(backend: Arc<dyn SerialBackend>) -> Self {
        Self {
            backend,
            ports: Vec::new(),
        }
    }

    /// Re-enumerate ports and return their names
    ///
    /// An enumeration failure leaves an empty list.
    pub fn refresh(&mut self) -> Vec<String> {
        self.ports = match self.backend.list_available() {
            Ok(ports) => ports,
            Err(e) => {
                tracing::warn!("Port enumeration failed: {}", e);
                Vec::new()
            }
        };
        tracing::debug!("Found {} serial ports", self.ports.len());
        self.names()
    }

    /// Names from the last enumeration
    pub fn names(&self) -> Vec<String> {
        self.ports.iter().map(|p| p.port_name.clone()).collect()
    }

    /// Details from the last enumeration
    pub fn ports(&self) -> &[SerialPortInfo] {
        &self.ports
    }

    /// Whether the last enumeration offered this name
    pub fn contains(&self, name: &str) -> bool {
        self.ports.iter().any(|p| p.port_name == name)
    }

    /// Resolve a name against a fresh enumeration
    pub fn resolve(&self, name: &str) -> Option<SerialPortInfo> {
        match self.backend.list_available() {
            Ok(ports) => ports.into_iter().find(|p| p.port_name == name),
            Err(e) => {
                tracing::debug!("Port enumeration failed while resolving {}: {}", name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mock::MockBackend;

    #[test]
    fn test_refresh_tracks_hotplug() {
        let backend = MockBackend::with_ports(["COM1", "COM3"]);
        let mut registry = PortRegistry::new(Arc::new(backend.clone()));
        assert!(registry.names().is_empty());

        assert_eq!(registry.refresh(), vec!["COM1", "COM3"]);
        assert!(registry.contains("COM3"));

        backend.remove_port("COM3");
        backend.add_port("COM7");
        // cached list is unchanged until the next refresh
        assert!(registry.contains("COM3"));
        assert!(registry.resolve("COM3").is_none());
        assert!(registry.resolve("COM7").is_some());

        assert_eq!(registry.refresh(), vec!["COM1", "COM7"]);
        assert!(!registry.contains("COM3"));
    }
}
