//! Typed error kinds for the execution side of the machine. Lex/parse/
//! assemble error kinds live in the `assembler` crate, which has its own
//! accumulate-and-continue policy; these are the emulator's fault kinds,
//! which clear the running flag and increment a fault counter rather than
//! unwind (see `Cpu::step`).

use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ExecuteError {
    #[error("invalid opcode 0x{opcode:02X} at pc={pc:#06X}")]
    InvalidOpcode { opcode: u8, pc: u32 },

    #[error("jump target {target:#06X} is outside the {program_len}-byte program")]
    InvalidJumpTarget { target: u32, program_len: u32 },

    #[error("division by zero at pc={pc:#06X}")]
    DivisionByZero { pc: u32 },

    #[error("operand at pc={pc:#06X} runs past the end of the program")]
    OperandOutOfBounds { pc: u32 },

    #[error("memory access at address {addr:#010X} is out of bounds")]
    MemoryOutOfBounds { addr: u32 },

    #[error("port operation at port {port} exceeds the addressable port range")]
    PortBoundsExceeded { port: u8 },
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum DeviceError {
    #[error("port {port} already has a device registered ({existing})")]
    PortCollision { port: u8, existing: String },

    #[error("path {path:?} is not a safe location for file-backed storage")]
    UnsafePath { path: String },

    #[error("file at {path:?} exceeds the maximum size of {max_bytes} bytes")]
    OversizedFile { path: String, max_bytes: u64 },
}
