//! Event system for session output
//!
//! Provides:
//! - Event types emitted by the session (status, counters, display lines,
//!   notifications, port availability)
//! - Event dispatcher for publishing events to subscribers

use crate::data::{ByteCounters, ChannelState, PortStatus, StatusLine};
use tokio::sync::broadcast;

/// Severity of a user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Operation failed but the session is intact
    Warning,
    /// Operation failed and needs user attention
    Critical,
}

/// Session event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Channel opened or closed
    ChannelChanged(ChannelState),
    /// Status line text changed
    StatusChanged(StatusLine),
    /// Byte counters changed
    CountersChanged(ByteCounters),
    /// A line was appended to the display log
    DisplayLine(String),
    /// The display log was cleared
    DisplayCleared,
    /// The send buffer was cleared
    SendBufferCleared,
    /// Blocking notification for the user
    Notification {
        /// Severity
        level: NotificationLevel,
        /// Short title
        title: String,
        /// Detail text
        message: String,
    },
    /// Monitored port reachability changed
    PortStatusChanged(PortStatus),
    /// Available port names were re-enumerated
    PortsListed(Vec<String>),
    /// Timed send armed (`Some(interval_ms)`) or disarmed (`None`)
    TimedSendChanged(Option<u64>),
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::ChannelChanged(state) => write!(f, "Channel: {}", state),
            SessionEvent::StatusChanged(status) => write!(f, "Status: {}", status),
            SessionEvent::CountersChanged(c) => write!(f, "S: {} R: {}", c.sent, c.received),
            SessionEvent::DisplayLine(line) => write!(f, "{}", line),
            SessionEvent::DisplayCleared => write!(f, "Display cleared"),
            SessionEvent::SendBufferCleared => write!(f, "Send buffer cleared"),
            SessionEvent::Notification { title, message, .. } => {
                write!(f, "{}: {}", title, message)
            }
            SessionEvent::PortStatusChanged(status) => write!(
                f,
                "{} {}",
                status.name,
                if status.reachable {
                    "Connected"
                } else {
                    "Disconnected"
                }
            ),
            SessionEvent::PortsListed(ports) => write!(f, "Ports: {}", ports.join(", ")),
            SessionEvent::TimedSendChanged(Some(ms)) => write!(f, "Timed send every {}ms", ms),
            SessionEvent::TimedSendChanged(None) => write!(f, "Timed send off"),
        }
    }
}

/// Event dispatcher for publishing events to subscribers
#[derive(Clone)]
pub struct EventDispatcher {
    /// Broadcast sender channel for session events.
    tx: broadcast::Sender<SessionEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the broadcast buffer
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size);
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers
    ///
    /// Having no subscribers is not an error; the event is dropped.
    pub fn publish(&self, event: SessionEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!("No subscribers for event: {}", event);
                0
            }
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let dispatcher = EventDispatcher::default();
        let mut rx = dispatcher.subscribe();
        assert_eq!(dispatcher.subscriber_count(), 1);

        let sent = dispatcher.publish(SessionEvent::DisplayLine("[recv:] hi".to_string()));
        assert_eq!(sent, 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::DisplayLine("[recv:] hi".to_string())
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let dispatcher = EventDispatcher::new(8);
        assert_eq!(dispatcher.publish(SessionEvent::DisplayCleared), 0);
    }

    #[test]
    fn test_event_display() {
        let event = SessionEvent::PortStatusChanged(PortStatus {
            name: "COM3".to_string(),
            reachable: true,
        });
        assert_eq!(event.to_string(), "COM3 Connected");
        assert_eq!(
            SessionEvent::TimedSendChanged(Some(20)).to_string(),
            "Timed send every 20ms"
        );
    }
}
