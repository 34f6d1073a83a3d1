//! Data model for the terminal core
//!
//! - Port line configuration and its value tables
//! - Channel state, byte counters, display and send options
//! - Port status and the status line

pub mod port;
pub mod session;

pub use port::{BaudRate, DataBits, Parity, PortConfig, StopBits};
pub use session::{
    ByteCounters, ChannelState, DisplayMode, Encoding, PortStatus, SendJob, SendMode,
    SendOptions, StatusLine, StatusTone, MIN_SEND_INTERVAL_MS,
};
