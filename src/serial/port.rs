//! Serial port configuration, enumeration and connection management

use anyhow::{Context, Result};
use colored::Colorize;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

use crate::error::MonitorError;

/// Default baud rate when the user submits an empty baud prompt.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Fixed read timeout configured on the port. The session loop polls
/// `bytes_to_read` and never issues a blind blocking read, so this only
/// bounds the driver-level read call itself.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a serial port connection
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Serial port path (e.g., /dev/ttyUSB0, COM3)
    pub port_path: String,
    /// Baud rate (default: 115200)
    pub baud_rate: u32,
    /// Parity (default: None)
    pub parity: Parity,
    /// Read timeout
    pub timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_path: String::from("/dev/ttyUSB0"),
            baud_rate: DEFAULT_BAUD,
            parity: Parity::None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PortConfig {
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            ..Default::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }
}

/// Human-readable label for a parity mode, used in prompts and the status line.
pub fn parity_label(parity: Parity) -> &'static str {
    match parity {
        Parity::None => "None",
        Parity::Even => "Even",
        Parity::Odd => "Odd",
    }
}

/// The transport operations the session loop needs from an open connection.
/// Implemented by [`SerialConnection`] and by test doubles.
pub trait SerialLink {
    /// Number of bytes sitting in the receive buffer, without blocking.
    fn bytes_to_read(&mut self) -> io::Result<usize>;

    /// Read exactly `buf.len()` bytes.
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Write all of `data` and flush.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
}

/// An open serial connection.
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
}

impl SerialConnection {
    /// Open a serial connection with the given configuration.
    ///
    /// 8 data bits, 1 stop bit and no flow control are fixed; only port,
    /// baud and parity are user-selectable. Driver buffers are cleared so a
    /// stale receive backlog doesn't replay into the fresh session.
    pub fn open(config: PortConfig) -> Result<Self, MonitorError> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(config.parity)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|source| MonitorError::Connect {
                port: config.port_path.clone(),
                source,
            })?;

        port.clear(serialport::ClearBuffer::All)
            .map_err(|source| MonitorError::Connect {
                port: config.port_path.clone(),
                source,
            })?;

        log::debug!(
            "opened {} at {} baud, parity {}",
            config.port_path,
            config.baud_rate,
            parity_label(config.parity)
        );

        Ok(Self { port })
    }
}

impl SerialLink for SerialConnection {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.port.read_exact(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }
}

/// Information about an enumerated serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub path: String,
    pub description: String,
}

/// List all available serial ports, in enumeration order.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;

    let infos = ports
        .into_iter()
        .map(|p| {
            let description = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => {
                    info.product.unwrap_or_else(|| String::from("USB Serial"))
                }
                serialport::SerialPortType::PciPort => String::from("PCI Serial"),
                serialport::SerialPortType::BluetoothPort => String::from("Bluetooth"),
                serialport::SerialPortType::Unknown => String::from("Unknown"),
            };
            PortInfo {
                path: p.port_name,
                description,
            }
        })
        .collect();

    Ok(infos)
}

/// Print the port enumeration (the `--list` flag).
pub fn print_ports() -> Result<()> {
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
        println!("\n{}", "Troubleshooting tips:".cyan().bold());
        println!("  1. Connect a USB-to-serial adapter");
        println!("  2. Check if the device is recognized: ls -la /dev/ttyUSB* /dev/ttyACM*");
        println!("  3. Add your user to the 'dialout' group: sudo usermod -aG dialout $USER");
        return Ok(());
    }

    println!("{}", "Available Serial Ports:".green().bold());
    for (i, port) in ports.iter().enumerate() {
        println!(
            "- [{}] {} ({})",
            i,
            port.path.white().bold(),
            port.description
        );
    }

    Ok(())
}
