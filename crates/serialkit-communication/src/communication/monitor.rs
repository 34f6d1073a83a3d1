//! Port availability monitor
//!
//! Periodically checks whether the selected port exists and can be claimed,
//! using a throwaway exclusive open that is closed immediately. Only changes
//! are reported. Probe failures of any kind count as "disconnected" and are
//! never raised.

use super::registry::PortRegistry;
use super::SerialBackend;
use serialkit_core::{PortStatus, ProbeError};
use std::sync::Arc;
use std::time::Duration;

/// Default polling period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Last known reachability of the monitored port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    /// Not probed since the target was set
    #[default]
    Unknown,
    /// Port exists and is claimable
    Connected,
    /// Port missing or held by someone
    Disconnected,
}

impl MonitorState {
    fn from_reachable(reachable: bool) -> Self {
        if reachable {
            MonitorState::Connected
        } else {
            MonitorState::Disconnected
        }
    }
}

/// Edge-triggered reachability monitor for one port
pub struct PortMonitor {
    backend: Arc<dyn SerialBackend>,
    registry: PortRegistry,
    target: Option<String>,
    state: MonitorState,
    poll_interval: Duration,
}

impl PortMonitor {
    /// Monitor with no target and the default polling period
    pub fn new(backend: Arc<dyn SerialBackend>) -> Self {
        Self {
            registry: PortRegistry::new(Arc::clone(&backend)),
            backend,
            target: None,
            state: MonitorState::Unknown,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the polling period
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Change the polling period
    pub fn set_poll_interval(&mut self, poll_interval: Duration) {
        self.poll_interval = poll_interval;
    }

    /// Polling period
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Select the port to watch; a different target restarts from `Unknown`
    pub fn set_target(&mut self, target: Option<String>) {
        let target = target.filter(|name| !name.is_empty());
        if target != self.target {
            self.target = target;
            self.state = MonitorState::Unknown;
        }
    }

    /// Watched port
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Last known state
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Forget the last known state so the next poll reports again
    pub fn reset(&mut self) {
        self.state = MonitorState::Unknown;
    }

    /// Run one polling cycle
    ///
    /// Returns the new status when reachability changed, `None` when it did
    /// not or when no port is selected.
    pub fn poll(&mut self) -> Option<PortStatus> {
        let name = self.target.clone()?;

        let reachable = match self.probe(&name) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Probe failed: {}", e);
                false
            }
        };

        let next = MonitorState::from_reachable(reachable);
        if next == self.state {
            return None;
        }

        tracing::info!("Port {} is now {:?}", name, next);
        self.state = next;
        Some(PortStatus { name, reachable })
    }

    fn probe(&self, name: &str) -> Result<(), ProbeError> {
        if self.registry.resolve(name).is_none() {
            return Err(ProbeError::Inaccessible {
                port: name.to_string(),
                reason: "not present".to_string(),
            });
        }
        self.backend.probe(name)
    }
}
