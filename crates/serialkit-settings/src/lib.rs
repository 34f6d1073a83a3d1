//! SerialKit Settings Crate
//!
//! Loads, validates and saves the terminal configuration.

pub mod config;
pub mod error;

pub use config::{
    Config, ConfigFormat, DisplaySettings, IoSettings, MonitorSettings, Overrides, SendSettings,
};
pub use error::{SettingsError, SettingsResult};
