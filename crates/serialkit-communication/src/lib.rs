//! # SerialKit Communication
//!
//! Serial port access and session control for SerialKit.
//! Wraps the OS serial ports behind a small backend trait, watches the
//! selected port for availability, schedules manual and timed sends, and
//! drives a terminal session from a single event loop.

pub mod communication;
pub mod session;

pub use communication::{
    channel::SerialChannel,
    mock::MockBackend,
    monitor::{MonitorState, PortMonitor},
    registry::PortRegistry,
    scheduler::{ScheduledTask, SendScheduler, SendTick},
    serial::{list_ports, SerialPortInfo, SystemSerialBackend},
    SerialBackend, SerialDevice,
};

pub use session::{
    RuntimeConfig, SessionCommand, SessionController, SessionError, SessionHandle, SessionResult,
    SessionRuntime,
};
