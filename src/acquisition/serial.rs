use std::io::{self, BufRead, Read, Write};
use std::time::{Duration, Instant};

use serialport::{SerialPort, SerialPortType};

use super::source::LineSource;
use crate::config::SerialConfig;
use crate::error::{PpgError, Result};

/// An enumerated serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

/// List serial ports visible to the OS
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|e| PpgError::SerialDevice(format!("cannot enumerate ports: {}", e)))?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match &p.port_type {
                SerialPortType::UsbPort(usb) => {
                    let parts: Vec<&str> = [usb.manufacturer.as_deref(), usb.product.as_deref()]
                        .into_iter()
                        .flatten()
                        .collect();
                    if parts.is_empty() {
                        format!("USB {:04x}:{:04x}", usb.vid, usb.pid)
                    } else {
                        parts.join(" ")
                    }
                }
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::Unknown => "n/a".to_string(),
            };
            PortInfo {
                name: p.port_name,
                description,
            }
        })
        .collect())
}

/// Pick a port by its 1-based position in `ports`, as shown to the operator
pub fn select_port(ports: &[PortInfo], choice: &str) -> Result<PortInfo> {
    if ports.is_empty() {
        return Err(PpgError::NoPorts);
    }
    let index: usize = choice
        .trim()
        .parse()
        .map_err(|_| PpgError::InvalidSelection(format!("{:?} is not a number", choice.trim())))?;
    if index == 0 || index > ports.len() {
        return Err(PpgError::InvalidSelection(format!(
            "{} is outside 1..={}",
            index,
            ports.len()
        )));
    }
    Ok(ports[index - 1].clone())
}

/// Print `ports` as a numbered list and read a 1-based choice from `input`
pub fn prompt_for_port<R: BufRead, W: Write>(
    ports: &[PortInfo],
    input: &mut R,
    output: &mut W,
) -> Result<PortInfo> {
    if ports.is_empty() {
        return Err(PpgError::NoPorts);
    }
    let prompt_failed =
        |e: io::Error| PpgError::InvalidSelection(format!("no choice read: {}", e));

    writeln!(output, "Available serial ports:").map_err(prompt_failed)?;
    for (i, port) in ports.iter().enumerate() {
        writeln!(output, "{}: {} - {}", i + 1, port.name, port.description)
            .map_err(prompt_failed)?;
    }
    write!(output, "Select port number: ").map_err(prompt_failed)?;
    output.flush().map_err(prompt_failed)?;

    let mut choice = String::new();
    input.read_line(&mut choice).map_err(prompt_failed)?;
    select_port(ports, &choice)
}

/// Line reader over an open serial port
///
/// A single `read_line` call never runs longer than about one port timeout,
/// even when the device streams bytes without ever sending a newline.
pub struct SerialSource {
    port: Box<dyn SerialPort>,
    name: String,
    pending: Vec<u8>,
    timeout: Duration,
}

impl SerialSource {
    /// Open `name` at 8N1, no flow control
    pub fn open(name: &str, config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(name, config.baud_rate)
            .timeout(config.timeout())
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| PpgError::SerialDevice(format!("open {}: {}", name, e)))?;

        log::info!("Opened {} at {} baud", name, config.baud_rate);

        Ok(Self::from_port(port, name))
    }

    /// Wrap an already-configured port; its timeout bounds each `read_line`
    pub fn from_port(port: Box<dyn SerialPort>, name: impl Into<String>) -> Self {
        let timeout = port.timeout();
        Self {
            port,
            name: name.into(),
            pending: Vec::with_capacity(256),
            timeout,
        }
    }

    fn take_line(&mut self, end: usize) -> String {
        let rest = self.pending.split_off(end + 1);
        let line = std::mem::replace(&mut self.pending, rest);
        String::from_utf8_lossy(&line).trim().to_string()
    }

    fn take_partial(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        line
    }
}

impl LineSource for SerialSource {
    fn has_input(&mut self) -> io::Result<bool> {
        if self.pending.contains(&b'\n') {
            return Ok(true);
        }
        let waiting = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(waiting > 0)
    }

    fn read_line(&mut self) -> io::Result<String> {
        let deadline = Instant::now() + self.timeout;
        let mut chunk = [0u8; 256];
        loop {
            if let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
                return Ok(self.take_line(end));
            }
            // Unterminated stream; give the caller a chance to observe a stop request
            if !self.pending.is_empty() && Instant::now() >= deadline {
                return Ok(self.take_partial());
            }
            match self.port.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("{} closed", self.name),
                    ));
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                    // A partial line is returned as-is once the timeout expires
                    return Ok(self.take_partial());
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        log::info!("Closed {}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> Vec<PortInfo> {
        vec![
            PortInfo {
                name: "/dev/ttyUSB0".into(),
                description: "FTDI FT232R".into(),
            },
            PortInfo {
                name: "/dev/ttyACM0".into(),
                description: "n/a".into(),
            },
        ]
    }

    #[test]
    fn test_select_port_one_based() {
        let port = select_port(&ports(), "2\n").unwrap();
        assert_eq!(port.name, "/dev/ttyACM0");
    }

    #[test]
    fn test_select_port_out_of_range() {
        assert!(matches!(
            select_port(&ports(), "0"),
            Err(PpgError::InvalidSelection(_))
        ));
        assert!(matches!(
            select_port(&ports(), "3"),
            Err(PpgError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_select_port_not_a_number() {
        assert!(matches!(
            select_port(&ports(), "usb"),
            Err(PpgError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_select_port_empty_list() {
        assert!(matches!(select_port(&[], "1"), Err(PpgError::NoPorts)));
    }

    #[test]
    fn test_prompt_lists_ports_and_reads_choice() {
        let mut input = io::Cursor::new("2\n");
        let mut output: Vec<u8> = Vec::new();

        let port = prompt_for_port(&ports(), &mut input, &mut output).unwrap();

        assert_eq!(port.name, "/dev/ttyACM0");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("1: /dev/ttyUSB0 - FTDI FT232R"));
        assert!(shown.contains("2: /dev/ttyACM0 - n/a"));
    }

    #[test]
    fn test_prompt_without_ports_is_no_ports() {
        let mut input = io::Cursor::new("1\n");
        let mut output: Vec<u8> = Vec::new();

        let result = prompt_for_port(&[], &mut input, &mut output);

        assert!(matches!(result, Err(PpgError::NoPorts)));
        assert!(output.is_empty());
    }

    #[test]
    fn test_prompt_rejects_bad_choice() {
        let mut input = io::Cursor::new("seven\n");
        let result = prompt_for_port(&ports(), &mut input, &mut Vec::<u8>::new());
        assert!(matches!(result, Err(PpgError::InvalidSelection(_))));
    }
}
