//! Built-in device endpoints for the default port assignments described in
//! the device bus module: console, counter, file-backed storage, RAM disk,
//! and a disabled-by-default serial stub.

pub mod console;
pub mod counter;
pub mod file;
pub mod ramdisk;
pub mod serial;

pub use console::ConsoleDevice;
pub use counter::CounterDevice;
pub use file::FileDevice;
pub use ramdisk::{ramdisk_pair, RamDiskControlEndpoint, RamDiskDataEndpoint};
pub use serial::SerialDevice;
