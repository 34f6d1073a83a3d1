//! Session state types
//!
//! Channel state, byte counters, display mode, send jobs and the status line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest accepted timed send interval
pub const MIN_SEND_INTERVAL_MS: u64 = 10;

/// Lifecycle of the session's one serial channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No device handle held
    #[default]
    Closed,
    /// Device handle valid and claimed
    Open,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Closed => write!(f, "Closed"),
            ChannelState::Open => write!(f, "Open"),
        }
    }
}

/// Bytes moved through the session
///
/// Only grows while the session runs; zeroed by an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ByteCounters {
    /// Bytes written to the device
    pub sent: u64,
    /// Bytes read from the device
    pub received: u64,
}

impl ByteCounters {
    /// Record a successful write
    pub fn add_sent(&mut self, n: usize) {
        self.sent = self.sent.saturating_add(n as u64);
    }

    /// Record a received chunk
    pub fn add_received(&mut self, n: usize) {
        self.received = self.received.saturating_add(n as u64);
    }

    /// Zero both counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Zero the sent counter only
    pub fn reset_sent(&mut self) {
        self.sent = 0;
    }

    /// Status bar labels: ("S: <sent>", "R: <received>")
    pub fn labels(&self) -> (String, String) {
        (format!("S: {}", self.sent), format!("R: {}", self.received))
    }
}

/// How bytes are rendered as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Decode as text
    #[default]
    Text,
    /// Uppercase hex pairs
    Hex,
}

/// Display flags applied to each chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayMode {
    /// Text or hex rendering
    pub encoding: Encoding,
    /// Prefix a `[YYYY-MM-DD HH:MM:SS] ` timestamp
    pub timestamp: bool,
    /// Terminate the chunk with `\r\n`
    pub line_break: bool,
}

impl DisplayMode {
    /// Plain text, no timestamp, no line break
    pub fn text() -> Self {
        Self::default()
    }

    /// Hex, no timestamp, no line break
    pub fn hex() -> Self {
        Self {
            encoding: Encoding::Hex,
            ..Self::default()
        }
    }

    /// Set the timestamp flag
    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the line break flag
    pub fn with_line_break(mut self, line_break: bool) -> Self {
        self.line_break = line_break;
        self
    }

    /// Whether bytes are shown as hex
    pub fn is_hex(&self) -> bool {
        self.encoding == Encoding::Hex
    }
}

/// Options applied to the send buffer at send time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendOptions {
    /// Interpret the send buffer as hex digits
    pub hex: bool,
    /// Append `\r\n` to the payload
    pub append_newline: bool,
}

/// Whether a send is one-shot or repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Sent once on request
    Manual,
    /// Repeated every `interval_ms`
    Timed {
        /// Repeat interval, never below [`MIN_SEND_INTERVAL_MS`]
        interval_ms: u64,
    },
}

/// One send operation and how it is triggered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendJob {
    /// Bytes to write
    pub payload: Vec<u8>,
    /// Trigger mode
    pub mode: SendMode,
}

/// Reachability of the monitored port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatus {
    /// Monitored port name
    pub name: String,
    /// True when the port exists and could be claimed
    pub reachable: bool,
}

/// Colour hint for the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    /// Green
    Ok,
    /// Red
    Error,
}

/// Human-readable status line with its colour hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Status text
    pub text: String,
    /// Colour hint
    pub tone: StatusTone,
}

impl StatusLine {
    /// Green status
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: StatusTone::Ok,
        }
    }

    /// Red status
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: StatusTone::Error,
        }
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::error("Disconnected")
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
