//! The process-wide device bus: an 8-bit port number keyed registry of
//! device endpoints, generalized from `DotMatrix`'s paged memory `Bus`
//! into a port-addressed I/O bus, grounded on
//! `examples/original_source/src/vhardware/device_manager.hpp`'s
//! `DeviceManager` singleton. Exposed here as an explicit handle the CPU
//! borrows, rather than a singleton.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::error::DeviceError;

/// A device reachable through the bus at one or more ports.
pub trait DeviceEndpoint: fmt::Debug {
    fn name(&self) -> String;
    fn read(&mut self) -> u8;
    fn write(&mut self, value: u8);
    fn reset(&mut self);
}

/// A device endpoint that wraps a real OS resource with connection state,
/// e.g. a serial port. File- and RAM-backed devices are not "real" in this
/// sense even though they touch the filesystem or heap.
pub trait RealDeviceEndpoint: DeviceEndpoint {
    fn connect(&mut self) -> Result<(), DeviceError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
}

const WORD_PORT_LIMIT: u8 = 254;
const DWORD_PORT_LIMIT: u8 = 252;
const MAX_STRING_LEN: usize = 255;

/// The shared bus. Registrations are append-mostly: re-registering an
/// occupied port without first unregistering it is rejected.
pub struct DeviceBus {
    devices: Mutex<HashMap<u8, Box<dyn DeviceEndpoint + Send>>>,
}

impl Default for DeviceBus {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBus {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(
        &self,
        port: u8,
        device: Box<dyn DeviceEndpoint + Send>,
    ) -> Result<(), DeviceError> {
        let mut devices = self.devices.lock().unwrap();
        if let Some(existing) = devices.get(&port) {
            return Err(DeviceError::PortCollision {
                port,
                existing: existing.name(),
            });
        }
        devices.insert(port, device);
        Ok(())
    }

    pub fn unregister(&self, port: u8) -> bool {
        self.devices.lock().unwrap().remove(&port).is_some()
    }

    pub fn is_registered(&self, port: u8) -> bool {
        self.devices.lock().unwrap().contains_key(&port)
    }

    pub fn registered_ports(&self) -> Vec<u8> {
        let mut ports: Vec<u8> = self.devices.lock().unwrap().keys().copied().collect();
        ports.sort_unstable();
        ports
    }

    pub fn reset_all(&self) {
        for device in self.devices.lock().unwrap().values_mut() {
            device.reset();
        }
    }

    /// Read a byte from `port`. Unregistered ports warn and return 0.
    pub fn read_byte(&self, port: u8) -> u8 {
        let mut devices = self.devices.lock().unwrap();
        match devices.get_mut(&port) {
            Some(device) => device.read(),
            None => {
                eprintln!(" [WARN] read from unregistered port {port:#04X}, returning 0");
                0
            }
        }
    }

    /// Write a byte to `port`. Unregistered ports warn and drop the write.
    pub fn write_byte(&self, port: u8, value: u8) {
        let mut devices = self.devices.lock().unwrap();
        match devices.get_mut(&port) {
            Some(device) => device.write(value),
            None => eprintln!(" [WARN] write to unregistered port {port:#04X} dropped"),
        }
    }

    /// Read a little-endian word from `port`/`port+1`. `port > 254` is out
    /// of range, warns, and returns 0.
    pub fn read_word(&self, port: u8) -> u16 {
        if port > WORD_PORT_LIMIT {
            eprintln!(" [WARN] word read at port {port:#04X} exceeds limit {WORD_PORT_LIMIT:#04X}, returning 0");
            return 0;
        }
        let lo = self.read_byte(port) as u16;
        let hi = self.read_byte(port + 1) as u16;
        lo | (hi << 8)
    }

    pub fn write_word(&self, port: u8, value: u16) {
        if port > WORD_PORT_LIMIT {
            eprintln!(" [WARN] word write at port {port:#04X} exceeds limit {WORD_PORT_LIMIT:#04X}, dropped");
            return;
        }
        self.write_byte(port, (value & 0xFF) as u8);
        self.write_byte(port + 1, (value >> 8) as u8);
    }

    /// Read a little-endian dword starting at `port`. `port > 252` is out of
    /// range, warns, and returns 0.
    pub fn read_dword(&self, port: u8) -> u32 {
        if port > DWORD_PORT_LIMIT {
            eprintln!(" [WARN] dword read at port {port:#04X} exceeds limit {DWORD_PORT_LIMIT:#04X}, returning 0");
            return 0;
        }
        let mut value = 0u32;
        for i in 0..4 {
            value |= (self.read_byte(port + i) as u32) << (8 * i);
        }
        value
    }

    pub fn write_dword(&self, port: u8, value: u32) {
        if port > DWORD_PORT_LIMIT {
            eprintln!(" [WARN] dword write at port {port:#04X} exceeds limit {DWORD_PORT_LIMIT:#04X}, dropped");
            return;
        }
        for i in 0..4 {
            self.write_byte(port + i, ((value >> (8 * i)) & 0xFF) as u8);
        }
    }

    /// Read bytes from `port` until a zero byte or `max_len` bytes
    /// (whichever comes first, capped at 255 regardless of `max_len`).
    pub fn read_string(&self, port: u8, max_len: u8) -> Vec<u8> {
        let cap = (max_len as usize).min(MAX_STRING_LEN);
        let mut out = Vec::new();
        for _ in 0..cap {
            let byte = self.read_byte(port);
            if byte == 0 {
                break;
            }
            out.push(byte);
        }
        out
    }

    /// Write `bytes` to `port` followed by a zero terminator.
    pub fn write_string(&self, port: u8, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(port, byte);
        }
        self.write_byte(port, 0);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Default)]
    struct MemoryDevice {
        value: u8,
    }

    impl DeviceEndpoint for MemoryDevice {
        fn name(&self) -> String {
            "memory".to_string()
        }
        fn read(&mut self) -> u8 {
            self.value
        }
        fn write(&mut self, value: u8) {
            self.value = value;
        }
        fn reset(&mut self) {
            self.value = 0;
        }
    }

    #[test]
    fn byte_read_after_write() {
        let bus = DeviceBus::new();
        bus.register(0x10, Box::new(MemoryDevice::default())).unwrap();
        bus.write_byte(0x10, 42);
        assert_eq!(bus.read_byte(0x10), 42);
    }

    #[test]
    fn unregistered_read_returns_zero() {
        let bus = DeviceBus::new();
        assert_eq!(bus.read_byte(0x99), 0);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let bus = DeviceBus::new();
        bus.register(0x10, Box::new(MemoryDevice::default())).unwrap();
        let err = bus
            .register(0x10, Box::new(MemoryDevice::default()))
            .unwrap_err();
        assert!(matches!(err, DeviceError::PortCollision { port: 0x10, .. }));
    }

    #[test]
    fn word_read_past_limit_returns_zero() {
        let bus = DeviceBus::new();
        assert_eq!(bus.read_word(255), 0);
    }

    #[test]
    fn dword_read_past_limit_returns_zero() {
        let bus = DeviceBus::new();
        assert_eq!(bus.read_dword(253), 0);
    }

    #[test]
    fn string_read_stops_at_zero_byte() {
        let bus = DeviceBus::new();
        bus.register(0x20, Box::new(MemoryDevice::default())).unwrap();
        bus.write_byte(0x20, 0);
        assert_eq!(bus.read_string(0x20, 10), Vec::<u8>::new());
    }
}
