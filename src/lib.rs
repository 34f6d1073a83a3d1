//! # SerialKit
//!
//! A serial-port terminal core: open a port with a chosen line
//! configuration, send text or hex once or on a timer, and watch received
//! data as text or hex with optional timestamps.
//!
//! ## Architecture
//!
//! SerialKit is organized as a workspace with multiple crates:
//!
//! 1. **serialkit-core** - Line configuration, errors, frame formatting, events
//! 2. **serialkit-communication** - Serial backends, port monitor, send scheduler, session
//! 3. **serialkit-settings** - Configuration file handling
//! 4. **serialkit** - Command line terminal that integrates all crates

pub mod cli;

pub use serialkit_communication::{
    list_ports, MockBackend, RuntimeConfig, SerialBackend, SerialPortInfo, SessionCommand,
    SessionController, SessionError, SessionHandle, SessionRuntime, SystemSerialBackend,
};

pub use serialkit_core::{
    BaudRate, ByteCounters, ChannelState, DataBits, DisplayMode, Encoding, Error, EventDispatcher,
    FrameFormatter, Parity, PortConfig, Result, SendOptions, SessionEvent, StatusLine, StopBits,
};

pub use serialkit_settings::{Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Cargo profile the binary was built with
pub const BUILD_PROFILE: &str = env!("BUILD_PROFILE");

/// Session loop periods from the settings file
pub fn runtime_config(config: &Config) -> RuntimeConfig {
    RuntimeConfig {
        read_poll_interval: config.io.read_poll_interval(),
        monitor_poll_interval: config.monitor.poll_interval(),
        monitor_enabled: config.monitor.enabled,
    }
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, so stdout carries only terminal traffic
/// - RUST_LOG environment variable support (default `info`)
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
