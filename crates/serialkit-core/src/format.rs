//! Frame formatting
//!
//! Turns raw bytes into display text. The pure part is [`FrameFormatter::format`];
//! the only non-deterministic input is the timestamp, which comes from an
//! injectable [`Clock`].
//!
//! - Hex: uppercase pairs separated by one space ("41 42")
//! - Text: UTF-8, with undecodable bytes passed through one char per byte
//! - Timestamp: `[YYYY-MM-DD HH:MM:SS] ` prefix
//! - Line break: `\r\n` suffix

use crate::data::{DisplayMode, Encoding};
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Line terminator used for display line breaks and send newlines
pub const LINE_TERMINATOR: &str = "\r\n";

/// Tag prefixed to outbound display lines
pub const SEND_TAG: &str = "[send:] ";

/// Tag prefixed to inbound display lines
pub const RECV_TAG: &str = "[recv:] ";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Source of the wall-clock time used for timestamps
pub trait Clock: Send + Sync {
    /// Current local time
    fn now(&self) -> NaiveDateTime;
}

/// Local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Encode bytes as uppercase hex pairs separated by single spaces
pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
        out.push(HEX_DIGITS[(byte & 0x0F) as usize] as char);
    }
    out
}

/// Decode hex digits into bytes
///
/// Anything that is not a hex digit is skipped. An odd digit count leaves the
/// first digit as a byte of its own ("ABC" is `0x0A 0xBC`).
pub fn hex_decode(text: &str) -> Vec<u8> {
    let mut nibbles: Vec<u8> = text
        .chars()
        .filter_map(|c| c.to_digit(16).map(|d| d as u8))
        .collect();

    if nibbles.len() % 2 == 1 {
        nibbles.insert(0, 0);
    }

    nibbles
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect()
}

/// Decode bytes as UTF-8 without dropping anything
///
/// Invalid or truncated sequences come through as one `char` per byte
/// (Latin-1), so no byte is replaced by U+FFFD.
pub fn decode_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;

    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                // valid_up_to guarantees this prefix is UTF-8
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let bad = e.error_len().unwrap_or(after.len());
                out.extend(after[..bad].iter().map(|&b| char::from(b)));
                rest = &after[bad..];
            }
        }
    }

    out
}

/// Formats byte chunks for the display log
#[derive(Clone)]
pub struct FrameFormatter {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FrameFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameFormatter").finish_non_exhaustive()
    }
}

impl Default for FrameFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameFormatter {
    /// Formatter stamping with the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Formatter stamping with the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Format a chunk under the given display mode
    pub fn format(&self, bytes: &[u8], mode: &DisplayMode) -> String {
        let body = match mode.encoding {
            Encoding::Hex => hex_encode(bytes),
            Encoding::Text => decode_text(bytes),
        };
        self.compose(String::new(), &body, mode)
    }

    /// Display line for a received chunk: `[recv:] <formatted>`
    ///
    /// In hex mode every pair is terminated by a space, so the line for
    /// `41 42` reads `[recv:] 41 42 `.
    pub fn inbound_line(&self, bytes: &[u8], mode: &DisplayMode) -> String {
        let body = match mode.encoding {
            Encoding::Hex if !bytes.is_empty() => format!("{} ", hex_encode(bytes)),
            Encoding::Hex => String::new(),
            Encoding::Text => decode_text(bytes),
        };
        self.compose(RECV_TAG.to_string(), &body, mode)
    }

    /// Display line for bytes written: `[send:] <bytes as text>`
    pub fn outbound_line(&self, bytes: &[u8]) -> String {
        format!("{}{}", SEND_TAG, decode_text(bytes))
    }

    /// `[YYYY-MM-DD HH:MM:SS] ` for the current clock reading
    pub fn timestamp_prefix(&self) -> String {
        format!("[{}] ", self.clock.now().format(TIMESTAMP_FORMAT))
    }

    fn compose(&self, mut out: String, body: &str, mode: &DisplayMode) -> String {
        if mode.timestamp {
            out.push_str(&self.timestamp_prefix());
        }
        out.push_str(body);
        if mode.line_break {
            out.push_str(LINE_TERMINATOR);
        }
        out
    }
}
