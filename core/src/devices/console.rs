//! The console device (port 0x01): writes go to stdout, reads drain a
//! FIFO that tests populate with [`ConsoleDevice::push_input`].

use std::collections::VecDeque;
use std::io::Write;

use crate::bus::DeviceEndpoint;

#[derive(Debug, Default)]
pub struct ConsoleDevice {
    input: VecDeque<u8>,
}

impl ConsoleDevice {
    pub const DEFAULT_PORT: u8 = 0x01;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, byte: u8) {
        self.input.push_back(byte);
    }

    pub fn push_input_str(&mut self, text: &str) {
        self.input.extend(text.bytes());
    }
}

impl DeviceEndpoint for ConsoleDevice {
    fn name(&self) -> String {
        "Virtual Console".to_string()
    }

    fn read(&mut self) -> u8 {
        self.input.pop_front().unwrap_or(0)
    }

    fn write(&mut self, value: u8) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(&[value]);
        let _ = stdout.flush();
    }

    fn reset(&mut self) {
        self.input.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_drains_fifo_then_returns_zero() {
        let mut console = ConsoleDevice::new();
        console.push_input_str("hi");
        assert_eq!(console.read(), b'h');
        assert_eq!(console.read(), b'i');
        assert_eq!(console.read(), 0);
    }

    #[test]
    fn reset_clears_pending_input() {
        let mut console = ConsoleDevice::new();
        console.push_input(1);
        console.reset();
        assert_eq!(console.read(), 0);
    }
}
