//! Serial line configuration
//!
//! Every setting is a closed value table. `from_label` is the lenient lookup
//! used for user input (unknown keys fall back to the default value) and
//! `FromStr` is the strict one (unknown keys are an error).
//!
//! `status_code` is the numeric code each setting shows in the status line.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn unknown(key: &str, value: &str) -> ConfigError {
    ConfigError::UnknownValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Supported baud rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    /// 1200 baud
    B1200,
    /// 2400 baud
    B2400,
    /// 4800 baud
    B4800,
    /// 9600 baud
    B9600,
    /// 19200 baud
    B19200,
    /// 38400 baud
    B38400,
    /// 57600 baud
    B57600,
    /// 115200 baud
    B115200,
}

impl BaudRate {
    /// All rates in ascending order
    pub const ALL: [BaudRate; 8] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    /// Bits per second
    pub fn value(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }

    /// Look up a rate by bits per second
    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.value() == value)
    }

    /// Lenient lookup, falls back to 9600
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }

    /// Code shown in the status line
    pub fn status_code(self) -> u32 {
        self.value()
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate::B9600
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for BaudRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_value)
            .ok_or_else(|| unknown("baud rate", s))
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| unknown("baud rate", &value.to_string()))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.value()
    }
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    /// 5 bits
    Five,
    /// 6 bits
    Six,
    /// 7 bits
    Seven,
    /// 8 bits
    Eight,
}

impl DataBits {
    /// All widths in ascending order
    pub const ALL: [DataBits; 4] = [
        DataBits::Five,
        DataBits::Six,
        DataBits::Seven,
        DataBits::Eight,
    ];

    /// Bit count
    pub fn value(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }

    /// Look up a width by bit count
    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|bits| bits.value() == value)
    }

    /// Lenient lookup, falls back to 8
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }

    /// Code shown in the status line
    pub fn status_code(self) -> u8 {
        self.value()
    }
}

impl Default for DataBits {
    fn default() -> Self {
        DataBits::Eight
    }
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for DataBits {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::from_value)
            .ok_or_else(|| unknown("data bits", s))
    }
}

impl TryFrom<u8> for DataBits {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| unknown("data bits", &value.to_string()))
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        bits.value()
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopBits {
    /// 1 stop bit
    #[serde(rename = "1")]
    One,
    /// 1.5 stop bits
    #[serde(rename = "1.5")]
    OneAndHalf,
    /// 2 stop bits
    #[serde(rename = "2")]
    Two,
}

impl StopBits {
    /// All settings
    pub const ALL: [StopBits; 3] = [StopBits::One, StopBits::OneAndHalf, StopBits::Two];

    /// Label as shown to the user
    pub fn label(self) -> &'static str {
        match self {
            StopBits::One => "1",
            StopBits::OneAndHalf => "1.5",
            StopBits::Two => "2",
        }
    }

    /// Lenient lookup, falls back to 1
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }

    /// Code shown in the status line (1.5 stop bits is code 3)
    pub fn status_code(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
            StopBits::OneAndHalf => 3,
        }
    }
}

impl Default for StopBits {
    fn default() -> Self {
        StopBits::One
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StopBits {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|bits| bits.label() == s.trim())
            .ok_or_else(|| unknown("stop bits", s))
    }
}

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

impl Parity {
    /// All settings
    pub const ALL: [Parity; 3] = [Parity::None, Parity::Odd, Parity::Even];

    /// Label as shown to the user
    pub fn label(self) -> &'static str {
        match self {
            Parity::None => "none",
            Parity::Odd => "odd",
            Parity::Even => "even",
        }
    }

    /// Lenient lookup, falls back to none
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }

    /// Code shown in the status line: none=0, even=2, odd=3
    pub fn status_code(self) -> u8 {
        match self {
            Parity::None => 0,
            Parity::Even => 2,
            Parity::Odd => 3,
        }
    }
}

impl Default for Parity {
    fn default() -> Self {
        Parity::None
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Parity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "odd" | "o" => Ok(Parity::Odd),
            "even" | "e" => Ok(Parity::Even),
            _ => Err(unknown("parity", s)),
        }
    }
}

/// Complete line configuration for one port
///
/// Applied as a whole when a channel opens. Changing it on an open channel
/// requires close and reopen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// Device name (e.g., "COM3", "/dev/ttyUSB0")
    pub port_name: String,
    /// Line speed
    pub baud_rate: BaudRate,
    /// Character width
    pub data_bits: DataBits,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Parity mode
    pub parity: Parity,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: BaudRate::default(),
            data_bits: DataBits::default(),
            stop_bits: StopBits::default(),
            parity: Parity::default(),
        }
    }
}

impl PortConfig {
    /// Default 9600/8/1/none settings for the named port
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: BaudRate) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the data bits
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Set the stop bits
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set the parity
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Line settings as status codes: "<baud>, <databits>, <stopbits>, <parity>"
    pub fn status_codes(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.baud_rate.status_code(),
            self.data_bits.status_code(),
            self.stop_bits.status_code(),
            self.parity.status_code()
        )
    }
}

impl fmt::Display for PortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}/{}/{}",
            self.port_name, self.baud_rate, self.data_bits, self.parity, self.stop_bits
        )
    }
}
