//! Serial port communication implementation
//!
//! Provides the host backend on top of the `serialport` crate:
//! - Port enumeration and discovery
//! - Baud rate, data bit, stop bit and parity configuration
//! - Exclusive open, non-blocking polled reads

use super::{SerialBackend, SerialDevice};
use serialkit_core::{DataBits, Error, OpenError, Parity, PortConfig, Result, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Read/write timeout on the native handle; reads never wait longer than this
const IO_TIMEOUT: Duration = Duration::from_millis(10);

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set serial number
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List available serial ports on the system
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports
            .iter()
            .map(|port| {
                let info = SerialPortInfo::new(&port.port_name, get_port_description(port));

                match &port.port_type {
                    serialport::SerialPortType::UsbPort(usb_info) => {
                        let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
                        if let Some(ref mfg) = usb_info.manufacturer {
                            info = info.with_manufacturer(mfg);
                        }
                        if let Some(ref serial) = usb_info.serial_number {
                            info = info.with_serial_number(serial);
                        }
                        info
                    }
                    _ => info,
                }
            })
            .collect()),
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(Error::other(format!("Failed to enumerate ports: {}", e)))
        }
    }
}

/// Get a user-friendly description for a port
fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

fn to_serialport_data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

/// The driver has no 1.5 stop bit mode
fn to_serialport_stop_bits(bits: StopBits) -> Option<serialport::StopBits> {
    match bits {
        StopBits::One => Some(serialport::StopBits::One),
        StopBits::Two => Some(serialport::StopBits::Two),
        StopBits::OneAndHalf => None,
    }
}

fn to_serialport_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

/// Classify a driver open failure
fn classify_open_error(port: &str, e: serialport::Error) -> OpenError {
    let reason = e.description.clone();
    match e.kind() {
        serialport::ErrorKind::InvalidInput => OpenError::InvalidConfig {
            port: port.to_string(),
            reason,
        },
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => OpenError::NotFound {
            port: port.to_string(),
        },
        _ => OpenError::Busy {
            port: port.to_string(),
            reason,
        },
    }
}

/// Host serial ports through the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSerialBackend;

impl SystemSerialBackend {
    /// Create the host backend
    pub fn new() -> Self {
        Self
    }
}

impl SerialBackend for SystemSerialBackend {
    fn list_available(&self) -> Result<Vec<SerialPortInfo>> {
        list_ports()
    }

    fn open(&self, config: &PortConfig) -> std::result::Result<Box<dyn SerialDevice>, OpenError> {
        let stop_bits =
            to_serialport_stop_bits(config.stop_bits).ok_or_else(|| OpenError::InvalidConfig {
                port: config.port_name.clone(),
                reason: format!("{} stop bits not supported", config.stop_bits),
            })?;

        let builder = serialport::new(&config.port_name, config.baud_rate.value())
            .timeout(IO_TIMEOUT)
            .data_bits(to_serialport_data_bits(config.data_bits))
            .stop_bits(stop_bits)
            .parity(to_serialport_parity(config.parity))
            .flow_control(serialport::FlowControl::None);

        match builder.open() {
            Ok(port) => Ok(Box::new(SystemSerialDevice {
                name: config.port_name.clone(),
                port,
                last_error: None,
            })),
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", config.port_name, e);
                Err(classify_open_error(&config.port_name, e))
            }
        }
    }
}

/// Open handle on a host serial port
pub struct SystemSerialDevice {
    name: String,
    port: Box<dyn serialport::SerialPort>,
    last_error: Option<String>,
}

impl SystemSerialDevice {
    fn record<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if let Err(ref e) = result {
            self.last_error = Some(e.to_string());
        }
        result
    }
}

impl SerialDevice for SystemSerialDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let result = self.port.write(data).and_then(|n| {
            self.port.flush()?;
            Ok(n)
        });
        self.record(result)
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let pending = match self.port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) => {
                let e = io::Error::new(io::ErrorKind::Other, e.to_string());
                return self.record(Err(e));
            }
        };
        if pending == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; pending];
        let result = match self.port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(e),
        };
        self.record(result)
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_info_builder() {
        let info = SerialPortInfo::new("/dev/ttyUSB0", "USB FTDI Serial Port")
            .with_manufacturer("FTDI")
            .with_serial_number("A50285BI")
            .with_usb_ids(0x0403, 0x6001);
        assert_eq!(info.vid, Some(0x0403));
        assert_eq!(info.pid, Some(0x6001));
        assert_eq!(info.manufacturer.as_deref(), Some("FTDI"));
    }

    #[test]
    fn test_one_and_half_stop_bits_rejected() {
        let config = PortConfig::new("/dev/does-not-exist").with_stop_bits(StopBits::OneAndHalf);
        match SystemSerialBackend::new().open(&config) {
            Err(OpenError::InvalidConfig { port, .. }) => assert_eq!(port, "/dev/does-not-exist"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("1.5 stop bits should not open"),
        }
    }

    #[test]
    fn test_missing_device_does_not_open() {
        let config = PortConfig::new("/dev/serialkit-missing-port");
        assert!(SystemSerialBackend::new().open(&config).is_err());
    }

    #[test]
    fn test_classify_open_error() {
        let e = serialport::Error::new(serialport::ErrorKind::InvalidInput, "bad baud");
        assert!(matches!(
            classify_open_error("COM1", e),
            OpenError::InvalidConfig { .. }
        ));

        let e = serialport::Error::new(serialport::ErrorKind::NoDevice, "in use");
        assert!(matches!(classify_open_error("COM1", e), OpenError::Busy { .. }));

        let e = serialport::Error::new(
            serialport::ErrorKind::Io(io::ErrorKind::NotFound),
            "no such file",
        );
        assert_eq!(
            classify_open_error("COM1", e),
            OpenError::NotFound {
                port: "COM1".to_string()
            }
        );
    }
}
