//! Command line flags layered over a settings file

use clap::Parser;
use serialkit::cli::Args;
use serialkit::{runtime_config, BaudRate, Config, Parity, StopBits};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_flags_override_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("serialkit.toml");
    std::fs::write(
        &path,
        "[connection]\nport_name = \"COM1\"\nbaud_rate = 4800\n\n[monitor]\npoll_interval_ms = 2000\n",
    )
    .unwrap();

    let args = Args::parse_from([
        "serialkit",
        "--config",
        path.to_str().unwrap(),
        "--port",
        "COM3",
        "--parity",
        "even",
        "--stop-bits",
        "2",
        "--hex-display",
    ]);
    let config = args.resolve_config().unwrap();

    assert_eq!(config.connection.port_name, "COM3");
    assert_eq!(config.connection.baud_rate, BaudRate::B4800);
    assert_eq!(config.connection.parity, Parity::Even);
    assert_eq!(config.connection.stop_bits, StopBits::Two);
    assert!(config.display.hex);
    assert_eq!(
        runtime_config(&config).monitor_poll_interval,
        Duration::from_secs(2)
    );
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("none.json");

    let args = Args::parse_from(["serialkit", "--config", path.to_str().unwrap()]);
    assert_eq!(args.resolve_config().unwrap(), Config::default());
}

#[test]
fn test_invalid_flag_values_are_rejected() {
    assert!(Args::try_parse_from(["serialkit", "--baud", "12345"]).is_err());
    assert!(Args::try_parse_from(["serialkit", "--parity", "mark"]).is_err());
    assert!(Args::try_parse_from(["serialkit", "--data-bits", "9"]).is_err());

    let args = Args::try_parse_from(["serialkit", "-b", "115200", "--list"]).unwrap();
    assert_eq!(args.baud, Some(BaudRate::B115200));
    assert!(args.list);
}
