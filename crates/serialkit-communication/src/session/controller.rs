//! Session controller
//!
//! Glue between the serial channel, the frame formatter and the port
//! monitor. Owns the byte counters, the display log, the send buffer and
//! the status line, and publishes a [`SessionEvent`] for every change.
//!
//! Everything here is synchronous and expects to be driven from one place
//! at a time (see [`super::SessionRuntime`]).

use super::{SessionError, SessionResult};
use crate::communication::channel::SerialChannel;
use crate::communication::monitor::PortMonitor;
use crate::communication::registry::PortRegistry;
use crate::communication::SerialBackend;
use serialkit_core::{
    hex_decode, ByteCounters, ChannelState, DisplayMode, EventDispatcher, FrameFormatter,
    NotificationLevel, OpenError, PortConfig, PortStatus, SendJob, SendMode, SendOptions,
    SessionEvent, StatusLine, WriteError, LINE_TERMINATOR,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const OPEN_FAILED_MESSAGE: &str =
    "Failed to open serial port. The port may be in use or inaccessible; select the correct port.";

/// Single owner of one terminal session's state
pub struct SessionController {
    channel: SerialChannel,
    registry: PortRegistry,
    monitor: PortMonitor,
    formatter: FrameFormatter,
    events: EventDispatcher,
    port_config: PortConfig,
    send_options: SendOptions,
    display_mode: DisplayMode,
    send_buffer: String,
    counters: ByteCounters,
    display_log: Vec<String>,
    status: StatusLine,
}

impl SessionController {
    /// Closed session on the given backend; enumerates ports once
    pub fn new(backend: Arc<dyn SerialBackend>) -> Self {
        let mut registry = PortRegistry::new(Arc::clone(&backend));
        registry.refresh();

        Self {
            channel: SerialChannel::new(Arc::clone(&backend)),
            monitor: PortMonitor::new(backend),
            registry,
            formatter: FrameFormatter::new(),
            events: EventDispatcher::default(),
            port_config: PortConfig::default(),
            send_options: SendOptions::default(),
            display_mode: DisplayMode::default(),
            send_buffer: String::new(),
            counters: ByteCounters::default(),
            display_log: Vec::new(),
            status: StatusLine::default(),
        }
    }

    /// Use a specific formatter (e.g. one with a fixed clock)
    pub fn with_formatter(mut self, formatter: FrameFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Publish through an existing dispatcher
    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Set the port monitor polling period
    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor.set_poll_interval(interval);
        self
    }

    /// Event dispatcher
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ----------------------------------------------------------------- ports

    /// Re-enumerate available ports
    pub fn refresh_ports(&mut self) -> Vec<String> {
        let names = self.registry.refresh();
        self.events.publish(SessionEvent::PortsListed(names.clone()));
        names
    }

    /// Port names from the last enumeration
    pub fn available_ports(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Choose the port for the next open and for availability polling
    pub fn select_port(&mut self, name: impl Into<String>) -> SessionResult<()> {
        let config = PortConfig {
            port_name: name.into(),
            ..self.port_config.clone()
        };
        self.set_port_config(config)
    }

    /// Set the line configuration used by the next open
    ///
    /// The port name is locked while the channel is open.
    pub fn set_port_config(&mut self, config: PortConfig) -> SessionResult<()> {
        if let Some(open) = self.channel.open_port() {
            if open != config.port_name {
                return Err(SessionError::SelectionLocked {
                    port: open.to_string(),
                });
            }
        }
        self.monitor.set_target(Some(config.port_name.clone()));
        self.port_config = config;
        Ok(())
    }

    /// Line configuration for the next open
    pub fn port_config(&self) -> &PortConfig {
        &self.port_config
    }

    // ------------------------------------------------------------- lifecycle

    /// Open the selected port with the current configuration
    pub fn open(&mut self) -> SessionResult<()> {
        let config = self.port_config.clone();

        if !self.registry.contains(&config.port_name) {
            self.registry.refresh();
        }
        let result = if config.port_name.is_empty() || !self.registry.contains(&config.port_name)
        {
            Err(OpenError::NotFound {
                port: config.port_name.clone(),
            })
        } else {
            self.channel.open(config.clone())
        };

        if let Err(e) = result {
            tracing::warn!("Open of {} failed: {}", config.port_name, e);
            self.notify(
                NotificationLevel::Critical,
                "Open failed",
                format!("{}\n{}", OPEN_FAILED_MESSAGE, e),
            );
            return Err(e.into());
        }

        self.set_status(StatusLine::ok(format!(
            "{} OPENED, {}",
            config.port_name,
            config.status_codes()
        )));
        self.events
            .publish(SessionEvent::ChannelChanged(ChannelState::Open));
        Ok(())
    }

    /// Close the channel; does nothing when already closed
    pub fn close(&mut self) {
        let Some(name) = self.channel.open_port().map(str::to_string) else {
            return;
        };
        self.channel.close();
        self.monitor.reset();
        self.set_status(StatusLine::error(format!("{} CLOSED", name)));
        self.events
            .publish(SessionEvent::ChannelChanged(ChannelState::Closed));
    }

    /// Open when closed, close when open
    pub fn toggle_open(&mut self) -> SessionResult<()> {
        if self.channel.is_open() {
            self.close();
            Ok(())
        } else {
            self.open()
        }
    }

    /// Channel state
    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    // ------------------------------------------------------------------ send

    /// Replace the editable send buffer
    pub fn set_send_buffer(&mut self, text: impl Into<String>) {
        self.send_buffer = text.into();
    }

    /// Editable send buffer
    pub fn send_buffer(&self) -> &str {
        &self.send_buffer
    }

    /// Set hex/newline handling for sends
    pub fn set_send_options(&mut self, options: SendOptions) {
        self.send_options = options;
    }

    /// Hex/newline handling for sends
    pub fn send_options(&self) -> SendOptions {
        self.send_options
    }

    /// Encode the send buffer as it is right now
    pub fn prepare_send(&self, mode: SendMode) -> SendJob {
        let mut payload = if self.send_options.hex {
            hex_decode(&self.send_buffer)
        } else {
            self.send_buffer.as_bytes().to_vec()
        };
        if self.send_options.append_newline {
            payload.extend_from_slice(LINE_TERMINATOR.as_bytes());
        }
        SendJob { payload, mode }
    }

    /// Encode and write the send buffer
    ///
    /// Fails without queueing when the channel is closed. Counters and the
    /// display log change only when bytes were written.
    pub fn send(&mut self, mode: SendMode) -> SessionResult<usize> {
        if !self.channel.is_open() {
            let text = self.status.text.clone();
            self.set_status(StatusLine::error(text));
            self.notify(
                NotificationLevel::Warning,
                "Port not open",
                "Open the serial port first.",
            );
            return Err(WriteError::NotOpen.into());
        }

        let job = self.prepare_send(mode);
        let written = match self.channel.write(&job.payload) {
            Ok(0) => Err(WriteError::DeviceError {
                reason: "no bytes written".to_string(),
            }),
            other => other,
        };

        match written {
            Ok(n) => {
                tracing::debug!("Sent {} bytes ({:?})", n, job.mode);
                self.counters.add_sent(n);
                let line = self.formatter.outbound_line(&job.payload);
                self.append_display(line);
                self.publish_counters();
                Ok(n)
            }
            Err(e) => {
                self.notify(NotificationLevel::Warning, "Send failed", e.to_string());
                Err(e.into())
            }
        }
    }

    // --------------------------------------------------------------- receive

    /// Read everything pending as one chunk and log it
    ///
    /// Returns the chunk length; 0 when nothing was pending. A failed poll
    /// closes the channel and raises one critical notification.
    pub fn poll_inbound(&mut self) -> SessionResult<usize> {
        let bytes = match self.channel.read_available() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.close();
                self.notify(
                    NotificationLevel::Critical,
                    "Device error",
                    format!("{}
The port has been closed.", e),
                );
                return Err(e.into());
            }
        };
        if bytes.is_empty() {
            return Ok(0);
        }

        tracing::debug!("Received {} bytes", bytes.len());
        self.counters.add_received(bytes.len());
        let line = self.formatter.inbound_line(&bytes, &self.display_mode);
        self.append_display(line);
        self.publish_counters();
        Ok(bytes.len())
    }

    /// Set how received chunks are rendered
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    /// How received chunks are rendered
    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    // --------------------------------------------------------------- monitor

    /// Run one availability check of the selected port
    ///
    /// Skipped while this session holds that port open: the probe would
    /// always fail against our own handle.
    pub fn poll_port_status(&mut self) -> Option<PortStatus> {
        if let (Some(open), Some(target)) = (self.channel.open_port(), self.monitor.target()) {
            if open == target {
                tracing::trace!("Skipping probe of {}, held by this session", open);
                return None;
            }
        }

        let status = self.monitor.poll()?;
        if !self.channel.is_open() {
            self.set_status(if status.reachable {
                StatusLine::ok("Connected")
            } else {
                StatusLine::error("Disconnected")
            });
        }
        self.events
            .publish(SessionEvent::PortStatusChanged(status.clone()));
        Some(status)
    }

    /// Polling period of the port monitor
    pub fn monitor_interval(&self) -> Duration {
        self.monitor.poll_interval()
    }

    // ----------------------------------------------------------------- reset

    /// Clear the display log, the send buffer and both counters
    pub fn reset(&mut self) {
        self.display_log.clear();
        self.send_buffer.clear();
        self.counters.reset();
        self.events.publish(SessionEvent::DisplayCleared);
        self.events.publish(SessionEvent::SendBufferCleared);
        self.publish_counters();
    }

    /// Clear the send buffer and the sent counter
    pub fn reset_send(&mut self) {
        self.send_buffer.clear();
        self.counters.reset_sent();
        self.events.publish(SessionEvent::SendBufferCleared);
        self.publish_counters();
    }

    // --------------------------------------------------------------- getters

    /// Byte counters
    pub fn counters(&self) -> ByteCounters {
        self.counters
    }

    /// Display lines in order of arrival
    pub fn display_log(&self) -> &[String] {
        &self.display_log
    }

    /// Current status line
    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    /// Publish a blocking notification for the user
    pub fn notify(
        &self,
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.events.publish(SessionEvent::Notification {
            level,
            title: title.into(),
            message: message.into(),
        });
    }

    fn append_display(&mut self, line: String) {
        self.display_log.push(line.clone());
        self.events.publish(SessionEvent::DisplayLine(line));
    }

    fn publish_counters(&self) {
        self.events
            .publish(SessionEvent::CountersChanged(self.counters));
    }

    fn set_status(&mut self, status: StatusLine) {
        self.status = status.clone();
        self.events.publish(SessionEvent::StatusChanged(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mock::MockBackend;
    use serialkit_core::{StatusTone, WriteError};

    fn session(backend: &MockBackend) -> SessionController {
        SessionController::new(Arc::new(backend.clone()))
    }

    #[test]
    fn test_open_status_line() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut s = session(&backend);
        s.select_port("COM3").unwrap();
        s.open().unwrap();
        assert_eq!(s.status().text, "COM3 OPENED, 9600, 8, 1, 0");
        assert_eq!(s.status().tone, StatusTone::Ok);

        s.close();
        assert_eq!(s.status().text, "COM3 CLOSED");
        assert_eq!(s.status().tone, StatusTone::Error);
    }

    #[test]
    fn test_send_on_closed_channel() {
        let backend = MockBackend::with_ports(["COM3"]);
        let mut s = session(&backend);
        s.set_send_buffer("AT");
        assert_eq!(
            s.send(SendMode::Manual),
            Err(SessionError::Write(WriteError::NotOpen))
        );
        assert_eq!(s.counters().sent, 0);
        assert!(s.display_log().is_empty());
        assert_eq!(s.status().tone, StatusTone::Error);
    }

    #[test]
    fn test_selection_locked_while_open() {
        let backend = MockBackend::with_ports(["COM1", "COM3"]);
        let mut s = session(&backend);
        s.select_port("COM3").unwrap();
        s.open().unwrap();
        assert_eq!(
            s.select_port("COM1"),
            Err(SessionError::SelectionLocked {
                port: "COM3".to_string()
            })
        );
        assert!(s.select_port("COM3").is_ok());
        s.close();
        assert!(s.select_port("COM1").is_ok());
    }

    #[test]
    fn test_prepare_send_encodes_at_send_time() {
        let backend = MockBackend::new();
        let mut s = session(&backend);
        s.set_send_buffer("41 42");
        assert_eq!(s.prepare_send(SendMode::Manual).payload, b"41 42".to_vec());

        s.set_send_options(SendOptions {
            hex: true,
            append_newline: true,
        });
        assert_eq!(
            s.prepare_send(SendMode::Manual).payload,
            vec![0x41, 0x42, b'\r', b'\n']
        );

        s.set_send_buffer("ff");
        assert_eq!(
            s.prepare_send(SendMode::Timed { interval_ms: 10 }).payload,
            vec![0xFF, b'\r', b'\n']
        );
    }
}
