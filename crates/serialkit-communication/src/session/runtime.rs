//! Session runtime
//!
//! One spawned task owns the [`SessionController`] and the
//! [`SendScheduler`]. User commands, timed send ticks, read polls and
//! monitor cycles all arrive through a single `select!`, so the controller
//! only ever sees one of them at a time. A manual send is performed while its
//! command is handled, so it writes the buffer as set by the commands queued
//! before it.

use super::{SessionController, SessionError, SessionResult};
use crate::communication::monitor::DEFAULT_POLL_INTERVAL;
use crate::communication::scheduler::{SendScheduler, SendTick};
use serialkit_core::{
    DisplayMode, EventDispatcher, NotificationLevel, PortConfig, SendMode, SendOptions,
    SessionEvent, WriteError,
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Default period between inbound read polls
pub const DEFAULT_READ_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Requests a front end can make of a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Open the selected port
    Open,
    /// Close the channel
    Close,
    /// Open when closed, close when open
    ToggleOpen,
    /// Choose the port for the next open
    SelectPort(String),
    /// Replace the whole line configuration
    SetPortConfig(PortConfig),
    /// Re-enumerate ports
    RefreshPorts,
    /// Replace the send buffer
    SetSendBuffer(String),
    /// Change hex/newline handling for sends
    SetSendOptions(SendOptions),
    /// Change how received chunks are rendered
    SetDisplayMode(DisplayMode),
    /// Send the buffer once
    Send,
    /// Send the buffer every `interval_ms`
    EnableTimed {
        /// Repeat interval
        interval_ms: u64,
    },
    /// Stop timed sends
    DisableTimed,
    /// Clear display, send buffer and counters
    Reset,
    /// Clear send buffer and sent counter
    ResetSend,
    /// Stop timed sends, close the channel and end the loop
    Shutdown,
}

/// Polling periods of the session loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Period between inbound read polls
    pub read_poll_interval: Duration,
    /// Period between port availability checks
    pub monitor_poll_interval: Duration,
    /// Whether availability checks run at all
    pub monitor_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            read_poll_interval: DEFAULT_READ_POLL_INTERVAL,
            monitor_poll_interval: DEFAULT_POLL_INTERVAL,
            monitor_enabled: true,
        }
    }
}

/// Cloneable front-end handle on a running session
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
    events: EventDispatcher,
}

impl SessionHandle {
    /// Queue a command
    pub fn send(&self, command: SessionCommand) -> SessionResult<()> {
        self.tx.send(command).map_err(|_| SessionError::Stopped)
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Whether the session loop has ended
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The session event loop
pub struct SessionRuntime {
    controller: SessionController,
    scheduler: SendScheduler,
    ticks: mpsc::UnboundedReceiver<SendTick>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    config: RuntimeConfig,
}

impl SessionRuntime {
    /// Start the loop on the current tokio runtime
    ///
    /// The join handle yields the controller back once the loop ends, either
    /// on [`SessionCommand::Shutdown`] or when every handle is dropped.
    pub fn spawn(
        controller: SessionController,
        config: RuntimeConfig,
    ) -> (SessionHandle, JoinHandle<SessionController>) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (scheduler, ticks) = SendScheduler::new();
        let handle = SessionHandle {
            tx,
            events: controller.events().clone(),
        };

        let runtime = Self {
            controller,
            scheduler,
            ticks,
            commands,
            config,
        };
        (handle, tokio::spawn(runtime.run()))
    }

    async fn run(mut self) -> SessionController {
        let read_period = self.config.read_poll_interval.max(Duration::from_millis(1));
        let mut read_tick = time::interval(read_period);
        read_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let monitor_period = self
            .config
            .monitor_poll_interval
            .max(Duration::from_millis(1));
        let mut monitor_tick = time::interval_at(Instant::now() + monitor_period, monitor_period);
        monitor_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(
            "Session loop started (read every {:?}, monitor every {:?})",
            read_period,
            monitor_period
        );

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(tick) = self.ticks.recv() => self.handle_tick(tick),
                _ = read_tick.tick() => {
                    if let Err(e) = self.controller.poll_inbound() {
                        tracing::debug!("Inbound poll failed: {}", e);
                    }
                }
                _ = monitor_tick.tick(), if self.config.monitor_enabled => {
                    self.controller.poll_port_status();
                }
            }
        }

        self.disable_timed();
        self.controller.close();
        tracing::debug!("Session loop stopped");
        self.controller
    }

    fn handle_command(&mut self, command: SessionCommand) {
        tracing::trace!("Command: {:?}", command);
        match command {
            SessionCommand::Open => {
                if let Err(e) = self.controller.open() {
                    tracing::debug!("Open rejected: {}", e);
                }
            }
            SessionCommand::Close => self.controller.close(),
            SessionCommand::ToggleOpen => {
                if let Err(e) = self.controller.toggle_open() {
                    tracing::debug!("Toggle rejected: {}", e);
                }
            }
            SessionCommand::SelectPort(name) => {
                if let Err(e) = self.controller.select_port(name) {
                    self.controller.notify(
                        NotificationLevel::Warning,
                        "Port selection",
                        e.to_string(),
                    );
                }
            }
            SessionCommand::SetPortConfig(config) => {
                if let Err(e) = self.controller.set_port_config(config) {
                    self.controller.notify(
                        NotificationLevel::Warning,
                        "Port configuration",
                        e.to_string(),
                    );
                }
            }
            SessionCommand::RefreshPorts => {
                self.controller.refresh_ports();
            }
            SessionCommand::SetSendBuffer(text) => self.controller.set_send_buffer(text),
            SessionCommand::SetSendOptions(options) => self.controller.set_send_options(options),
            SessionCommand::SetDisplayMode(mode) => self.controller.set_display_mode(mode),
            SessionCommand::Send => {
                if let Err(e) = self.controller.send(SendMode::Manual) {
                    tracing::debug!("Send failed: {}", e);
                }
            }
            SessionCommand::EnableTimed { interval_ms } => {
                match self.scheduler.enable_timed(interval_ms) {
                    Ok(()) => {
                        self.controller
                            .events()
                            .publish(SessionEvent::TimedSendChanged(Some(interval_ms)));
                    }
                    Err(e) => {
                        self.controller.notify(
                            NotificationLevel::Critical,
                            "Invalid interval",
                            e.to_string(),
                        );
                    }
                }
            }
            SessionCommand::DisableTimed => self.disable_timed(),
            SessionCommand::Reset => self.controller.reset(),
            SessionCommand::ResetSend => self.controller.reset_send(),
            // handled by the loop
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_tick(&mut self, tick: SendTick) {
        if !self.scheduler.accepts(tick) {
            tracing::trace!("Dropping stale tick {:?}", tick);
            return;
        }

        let mode = SendMode::Timed {
            interval_ms: self.scheduler.active_interval().unwrap_or_default(),
        };

        match self.controller.send(mode) {
            Ok(_) => {}
            Err(SessionError::Write(WriteError::NotOpen)) => {
                tracing::info!("Channel closed, stopping timed send");
                self.disable_timed();
            }
            Err(e) => tracing::debug!("Send failed: {}", e),
        }
    }

    fn disable_timed(&mut self) {
        if self.scheduler.is_timed_active() {
            self.scheduler.disable_timed();
            self.controller
                .events()
                .publish(SessionEvent::TimedSendChanged(None));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::mock::MockBackend;
    use std::sync::Arc;

    fn spawn(backend: &MockBackend) -> (SessionHandle, JoinHandle<SessionController>) {
        let controller = SessionController::new(Arc::new(backend.clone()));
        SessionRuntime::spawn(
            controller,
            RuntimeConfig {
                monitor_enabled: false,
                ..RuntimeConfig::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_returns_closed_controller() {
        let backend = MockBackend::with_ports(["COM3"]);
        let (handle, task) = spawn(&backend);

        handle
            .send(SessionCommand::SelectPort("COM3".to_string()))
            .unwrap();
        handle.send(SessionCommand::Open).unwrap();
        time::sleep(Duration::from_millis(5)).await;
        assert!(backend.is_claimed("COM3"));

        handle.send(SessionCommand::Shutdown).unwrap();
        let controller = task.await.unwrap();
        assert!(!backend.is_claimed("COM3"));
        assert_eq!(controller.status().text, "COM3 CLOSED");
        assert_eq!(handle.send(SessionCommand::Open), Err(SessionError::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_sends_follow_command_order() {
        let backend = MockBackend::with_ports(["COM3"]);
        let (handle, task) = spawn(&backend);

        handle
            .send(SessionCommand::SelectPort("COM3".to_string()))
            .unwrap();
        handle.send(SessionCommand::Open).unwrap();
        handle
            .send(SessionCommand::SetSendBuffer("AT".to_string()))
            .unwrap();
        handle.send(SessionCommand::Send).unwrap();
        handle
            .send(SessionCommand::SetSendBuffer("ATZ".to_string()))
            .unwrap();
        handle.send(SessionCommand::Send).unwrap();
        time::sleep(Duration::from_millis(5)).await;

        handle.send(SessionCommand::Shutdown).unwrap();
        let controller = task.await.unwrap();
        assert_eq!(backend.written("COM3"), b"ATATZ".to_vec());
        assert_eq!(controller.counters().sent, 5);
        assert_eq!(
            controller.display_log(),
            ["[send:] AT".to_string(), "[send:] ATZ".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_interval_notifies() {
        let backend = MockBackend::new();
        let (handle, task) = spawn(&backend);
        let mut events = handle.subscribe();

        handle
            .send(SessionCommand::EnableTimed { interval_ms: 5 })
            .unwrap();
        time::sleep(Duration::from_millis(5)).await;
        handle.send(SessionCommand::Shutdown).unwrap();
        task.await.unwrap();

        let mut saw_notification = false;
        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::Notification { level, .. } => {
                    assert_eq!(level, NotificationLevel::Critical);
                    saw_notification = true;
                }
                SessionEvent::TimedSendChanged(Some(_)) => panic!("timer armed"),
                _ => {}
            }
        }
        assert!(saw_notification);
    }
}
