//! The register-machine emulator core: memory, registers, flags, the
//! device bus, and the fetch/decode/execute loop. The assembler and
//! codegen crates depend on this crate only for [`virtcomp_opcodes`]'s
//! shared catalogue, not on anything here.

mod bus;
mod cpu;
pub mod devices;
mod error;
mod flags;
mod memory;
mod registers;

pub use bus::{DeviceBus, DeviceEndpoint, RealDeviceEndpoint};
pub use cpu::{Cpu, CpuMode, RunOutcome, StepOutcome, DEFAULT_STEP_BUDGET};
pub use error::{DeviceError, ExecuteError};
pub use flags::Flags;
pub use memory::{Memory, DEFAULT_MEMORY_SIZE, MAX_MEMORY_SIZE, MIN_MEMORY_SIZE};
pub use registers::{
    register_info, RegisterClass, RegisterFile, RegisterInfo, GP_COUNT, TOTAL_REGISTERS,
};

use std::sync::Arc;

/// A ready-to-run machine: a [`Cpu`] wired to its own [`DeviceBus`].
/// Callers that need to share a bus across multiple CPUs should build
/// `Cpu::new` directly instead.
pub struct VirtualComputer {
    pub cpu: Cpu,
    pub bus: Arc<DeviceBus>,
}

impl VirtualComputer {
    pub fn new(memory_size: usize) -> Self {
        let bus = Arc::new(DeviceBus::new());
        let cpu = Cpu::new(memory_size, bus.clone());
        Self { cpu, bus }
    }

    pub fn with_default_memory() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}
