//! The serial port device (port 0x03): a connect/disconnect/connection-state
//! shape without termios plumbing. Opening an actual TTY is out of scope, so
//! this is a disabled-by-default loopback stand-in that reports its
//! connection state honestly instead of touching the OS.

use crate::bus::{DeviceEndpoint, RealDeviceEndpoint};
use crate::error::DeviceError;

#[derive(Debug)]
pub struct SerialDevice {
    port_name: String,
    connected: bool,
    rx: std::collections::VecDeque<u8>,
}

impl SerialDevice {
    pub const DEFAULT_PORT: u8 = 0x03;

    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            connected: false,
            rx: std::collections::VecDeque::new(),
        }
    }

    /// Feed bytes as if they arrived from the wire, for tests.
    pub fn inject_rx(&mut self, byte: u8) {
        self.rx.push_back(byte);
    }
}

impl DeviceEndpoint for SerialDevice {
    fn name(&self) -> String {
        format!("Serial Port ({})", self.port_name)
    }

    fn read(&mut self) -> u8 {
        if !self.connected {
            return 0;
        }
        self.rx.pop_front().unwrap_or(0)
    }

    fn write(&mut self, _value: u8) {
        // No real TTY is opened; a connected port silently accepts writes.
    }

    fn reset(&mut self) {
        self.rx.clear();
    }
}

impl RealDeviceEndpoint for SerialDevice {
    fn connect(&mut self) -> Result<(), DeviceError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
