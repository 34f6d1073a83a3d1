//! # SerialKit Core
//!
//! Core types and utilities for SerialKit.
//! Provides the serial line configuration model, the error taxonomy,
//! frame formatting for the display log, and session events.

pub mod data;
pub mod error;
pub mod event;
pub mod format;

pub use data::{
    BaudRate, ByteCounters, ChannelState, DataBits, DisplayMode, Encoding, Parity, PortConfig,
    PortStatus, SendJob, SendMode, SendOptions, StatusLine, StatusTone, StopBits,
    MIN_SEND_INTERVAL_MS,
};

pub use error::{ConfigError, Error, OpenError, ProbeError, ReadError, Result, WriteError};

pub use event::{EventDispatcher, NotificationLevel, SessionEvent};

pub use format::{
    decode_text, hex_decode, hex_encode, Clock, FixedClock, FrameFormatter, SystemClock,
    LINE_TERMINATOR, RECV_TAG, SEND_TAG,
};
