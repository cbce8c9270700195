//! The file-backed storage device (port 0x04): reads pull the next byte
//! from an in-memory buffer loaded from disk, writes append (or overwrite,
//! if seeked backwards) and persist the buffer.
//!
//! Path validation rejects traversal (`..`), a fixed list of sensitive
//! directory prefixes, and symlinks. Max file size is capped to avoid
//! loading an unbounded buffer into memory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::bus::DeviceEndpoint;
use crate::error::DeviceError;

pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

const FORBIDDEN_PREFIXES: &[&str] = &[
    "/etc/", "/proc/", "/sys/", "/dev/", "/boot/", "/root/", "/var/log/",
];

#[derive(Debug)]
pub struct FileDevice {
    path: PathBuf,
    buffer: Vec<u8>,
    position: usize,
}

impl FileDevice {
    pub const DEFAULT_PORT: u8 = 0x04;

    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DeviceError> {
        let path = path.into();
        validate_path(&path)?;

        let buffer = match fs::metadata(&path) {
            Ok(meta) => {
                if meta.len() > MAX_FILE_SIZE {
                    return Err(DeviceError::OversizedFile {
                        path: path.display().to_string(),
                        max_bytes: MAX_FILE_SIZE,
                    });
                }
                fs::read(&path).unwrap_or_default()
            }
            Err(_) => Vec::new(),
        };

        Ok(Self {
            path,
            buffer,
            position: 0,
        })
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.buffer.len());
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn persist(&self) {
        let _ = fs::write(&self.path, &self.buffer);
    }
}

fn validate_path(path: &Path) -> Result<(), DeviceError> {
    let as_str = path.to_string_lossy();
    let reject = |reason: &str| {
        DeviceError::UnsafePath {
            path: format!("{as_str} ({reason})"),
        }
    };

    if as_str.is_empty() {
        return Err(reject("empty path"));
    }
    if as_str.contains("..") {
        return Err(reject("path traversal"));
    }
    for prefix in FORBIDDEN_PREFIXES {
        if as_str.starts_with(prefix) {
            return Err(reject("forbidden directory"));
        }
    }
    if let Ok(meta) = fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() {
            return Err(reject("symlink"));
        }
    }
    Ok(())
}

impl DeviceEndpoint for FileDevice {
    fn name(&self) -> String {
        format!("File Device ({})", self.path.display())
    }

    fn read(&mut self) -> u8 {
        if self.position >= self.buffer.len() {
            return 0;
        }
        let value = self.buffer[self.position];
        self.position += 1;
        value
    }

    fn write(&mut self, value: u8) {
        if self.position >= self.buffer.len() {
            self.buffer.push(value);
            self.position = self.buffer.len();
        } else {
            self.buffer[self.position] = value;
            self.position += 1;
        }
        self.persist();
    }

    fn reset(&mut self) {
        self.position = 0;
        if let Ok(contents) = fs::read(&self.path) {
            self.buffer = contents;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_path_traversal() {
        let err = FileDevice::new("./data/../escape.bin").unwrap_err();
        assert!(matches!(err, DeviceError::UnsafePath { .. }));
    }

    #[test]
    fn rejects_forbidden_directory() {
        let err = FileDevice::new("/etc/passwd").unwrap_err();
        assert!(matches!(err, DeviceError::UnsafePath { .. }));
    }

    #[test]
    fn write_appends_and_read_replays() {
        let dir = std::env::temp_dir().join(format!("virtcomp-file-device-test-{}", std::process::id()));
        let mut device = FileDevice::new(&dir).unwrap();
        device.write(1);
        device.write(2);
        device.seek(0);
        assert_eq!(device.read(), 1);
        assert_eq!(device.read(), 2);
        let _ = fs::remove_file(&dir);
    }
}
