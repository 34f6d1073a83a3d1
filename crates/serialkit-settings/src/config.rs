//! Configuration for SerialKit
//!
//! Persisted terminal settings, stored as JSON or TOML. Every field has a
//! default, so a partial file (or none at all) loads fine.
//!
//! Sections:
//! - `connection`: the serial line configuration
//! - `send`: hex/newline handling and the timed send interval
//! - `display`: how received chunks are rendered
//! - `monitor`: port availability polling
//! - `io`: inbound read polling

use crate::error::{SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use serialkit_core::{
    BaudRate, DataBits, DisplayMode, Encoding, Parity, PortConfig, SendOptions, StopBits,
    MIN_SEND_INTERVAL_MS,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory under the platform config dir
pub const APP_DIR_NAME: &str = "serialkit";

/// File name of the default configuration
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Send settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendSettings {
    /// Parse the send buffer as hex pairs
    pub hex: bool,
    /// Append `\r\n` to every send
    pub append_newline: bool,
    /// Start timed sending when the port opens
    pub timed_enabled: bool,
    /// Timed send interval in milliseconds
    pub interval_ms: u64,
}

impl Default for SendSettings {
    fn default() -> Self {
        Self {
            hex: false,
            append_newline: false,
            timed_enabled: false,
            interval_ms: 1000,
        }
    }
}

impl SendSettings {
    /// Options for the send path
    pub fn options(&self) -> SendOptions {
        SendOptions {
            hex: self.hex,
            append_newline: self.append_newline,
        }
    }
}

/// Display settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Render received chunks as hex
    pub hex: bool,
    /// Prefix each chunk with a timestamp
    pub timestamp: bool,
    /// Terminate each chunk with `\r\n`
    pub line_break: bool,
}

impl DisplaySettings {
    /// Display mode for the formatter
    pub fn mode(&self) -> DisplayMode {
        DisplayMode {
            encoding: if self.hex {
                Encoding::Hex
            } else {
                Encoding::Text
            },
            timestamp: self.timestamp,
            line_break: self.line_break,
        }
    }
}

/// Port monitor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Milliseconds between availability checks
    pub poll_interval_ms: u64,
    /// Run availability checks at all
    pub enabled: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            enabled: true,
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// I/O settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoSettings {
    /// Milliseconds between inbound read polls
    pub read_poll_interval_ms: u64,
}

impl Default for IoSettings {
    fn default() -> Self {
        Self {
            read_poll_interval_ms: 10,
        }
    }
}

impl IoSettings {
    pub fn read_poll_interval(&self) -> Duration {
        Duration::from_millis(self.read_poll_interval_ms)
    }
}

/// Values given on the command line, applied over a loaded config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub port: Option<String>,
    pub baud_rate: Option<BaudRate>,
    pub data_bits: Option<DataBits>,
    pub stop_bits: Option<StopBits>,
    pub parity: Option<Parity>,
    pub hex_display: bool,
    pub timestamp: bool,
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Format by file extension
    pub fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line configuration
    pub connection: PortConfig,
    /// Send settings
    pub send: SendSettings,
    /// Display settings
    pub display: DisplaySettings,
    /// Port monitor settings
    pub monitor: MonitorSettings,
    /// I/O settings
    pub io: IoSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config_dir>/serialkit/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no config directory on this platform".to_string())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load from `path`, or defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::ConfigDirectory(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| SettingsError::SaveError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.send.interval_ms < MIN_SEND_INTERVAL_MS {
            return Err(SettingsError::invalid(
                "send.interval_ms",
                format!("must be at least {}", MIN_SEND_INTERVAL_MS),
            ));
        }

        if self.monitor.poll_interval_ms == 0 {
            return Err(SettingsError::invalid(
                "monitor.poll_interval_ms",
                "must be > 0",
            ));
        }

        if self.io.read_poll_interval_ms == 0 {
            return Err(SettingsError::invalid(
                "io.read_poll_interval_ms",
                "must be > 0",
            ));
        }

        Ok(())
    }

    /// Apply command line values on top of this config
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(port) = &overrides.port {
            self.connection.port_name = port.clone();
        }
        if let Some(baud_rate) = overrides.baud_rate {
            self.connection.baud_rate = baud_rate;
        }
        if let Some(data_bits) = overrides.data_bits {
            self.connection.data_bits = data_bits;
        }
        if let Some(stop_bits) = overrides.stop_bits {
            self.connection.stop_bits = stop_bits;
        }
        if let Some(parity) = overrides.parity {
            self.connection.parity = parity;
        }
        if overrides.hex_display {
            self.display.hex = true;
        }
        if overrides.timestamp {
            self.display.timestamp = true;
        }
    }
}
