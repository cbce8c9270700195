//! The 134-entry register file, generalized from the teacher's packed
//! `proc_bitfield` register struct into an array of 64-bit cells, since the
//! full file is too wide to model as named sub-fields of one scalar.
//! Classification is a data-table lookup (see [`register_info`]), not a type
//! hierarchy, per the design notes.

use std::fmt;

/// The 16 general-purpose registers, R0-R7 aliasing the legacy 8-register
/// family onto the first eight slots of the x86-style names.
pub const GP_COUNT: usize = 16;
/// Segment registers: CS, DS, ES, FS, GS, SS.
pub const SEGMENT_START: u8 = 16;
pub const SEGMENT_COUNT: usize = 6;
/// Control registers CR0-CR8.
pub const CONTROL_START: u8 = 22;
pub const CONTROL_COUNT: usize = 9;
/// Debug registers DR0-DR15.
pub const DEBUG_START: u8 = 31;
pub const DEBUG_COUNT: usize = 16;
/// RIP, RFLAGS, MSW.
pub const SPECIAL_START: u8 = 47;
pub const SPECIAL_COUNT: usize = 3;
/// SIMD XMM registers stored as (low, high) pairs, 16 registers.
pub const SIMD_START: u8 = 50;
pub const SIMD_COUNT: usize = 16;
/// FPU ST registers stored as (value, tag) pairs, 8 registers.
pub const FPU_START: u8 = 82;
pub const FPU_COUNT: usize = 8;
/// SIMD/FPU control & status words.
pub const CONTROL_STATUS_START: u8 = 98;
pub const CONTROL_STATUS_COUNT: usize = 4;
/// AVX upper 128-bit halves, 16 registers as (low, high) pairs.
pub const AVX_UPPER_START: u8 = 102;
pub const AVX_UPPER_COUNT: usize = 16;

/// Total number of 64-bit cells in the register file.
pub const TOTAL_REGISTERS: usize = 134;

/// Classification of a register index, used by disassembly, debugging, and
/// any reader/writer that needs to know whether a cell is part of a pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RegisterClass {
    General,
    Segment,
    Control,
    Debug,
    Special,
    SimdLow,
    SimdHigh,
    FpuValue,
    FpuTag,
    ControlStatus,
    AvxUpperLow,
    AvxUpperHigh,
}

/// One row of the register classification table.
#[derive(Clone, Debug)]
pub struct RegisterInfo {
    pub index: u8,
    pub name: String,
    pub description: &'static str,
    pub class: RegisterClass,
    pub is_64bit: bool,
    pub is_system: bool,
}

const GP_NAMES: [&str; GP_COUNT] = [
    "RAX", "RCX", "RDX", "RBX", "RSP", "RBP", "RSI", "RDI", "R8", "R9", "R10", "R11", "R12",
    "R13", "R14", "R15",
];

const SEGMENT_NAMES: [&str; SEGMENT_COUNT] = ["CS", "DS", "ES", "FS", "GS", "SS"];

const SPECIAL_NAMES: [&str; SPECIAL_COUNT] = ["RIP", "RFLAGS", "MSW"];

/// Look up classification and naming information for a register index.
///
/// Panics if `index >= 134`; callers addressing the general-purpose bank
/// from an instruction operand should mask to `0..16` first.
pub fn register_info(index: u8) -> RegisterInfo {
    assert!((index as usize) < TOTAL_REGISTERS, "register index out of range");

    if (index as usize) < GP_COUNT {
        return RegisterInfo {
            index,
            name: GP_NAMES[index as usize].to_string(),
            description: "general purpose register",
            class: RegisterClass::General,
            is_64bit: true,
            is_system: false,
        };
    }
    if index < SEGMENT_START + SEGMENT_COUNT as u8 {
        let i = (index - SEGMENT_START) as usize;
        return RegisterInfo {
            index,
            name: SEGMENT_NAMES[i].to_string(),
            description: "segment register",
            class: RegisterClass::Segment,
            is_64bit: false,
            is_system: true,
        };
    }
    if index < CONTROL_START + CONTROL_COUNT as u8 {
        let i = index - CONTROL_START;
        return RegisterInfo {
            index,
            name: format!("CR{i}"),
            description: "control register",
            class: RegisterClass::Control,
            is_64bit: true,
            is_system: true,
        };
    }
    if index < DEBUG_START + DEBUG_COUNT as u8 {
        let i = index - DEBUG_START;
        return RegisterInfo {
            index,
            name: format!("DR{i}"),
            description: "debug register",
            class: RegisterClass::Debug,
            is_64bit: true,
            is_system: true,
        };
    }
    if index < SPECIAL_START + SPECIAL_COUNT as u8 {
        let i = (index - SPECIAL_START) as usize;
        return RegisterInfo {
            index,
            name: SPECIAL_NAMES[i].to_string(),
            description: "special purpose register",
            class: RegisterClass::Special,
            is_64bit: true,
            is_system: i != 0,
        };
    }
    if index < SIMD_START + (SIMD_COUNT * 2) as u8 {
        let offset = index - SIMD_START;
        let reg = offset / 2;
        let (class, suffix) = if offset % 2 == 0 {
            (RegisterClass::SimdLow, "LO")
        } else {
            (RegisterClass::SimdHigh, "HI")
        };
        return RegisterInfo {
            index,
            name: format!("XMM{reg}_{suffix}"),
            description: "SIMD register half",
            class,
            is_64bit: true,
            is_system: false,
        };
    }
    if index < FPU_START + (FPU_COUNT * 2) as u8 {
        let offset = index - FPU_START;
        let reg = offset / 2;
        let (class, suffix) = if offset % 2 == 0 {
            (RegisterClass::FpuValue, "VAL")
        } else {
            (RegisterClass::FpuTag, "TAG")
        };
        return RegisterInfo {
            index,
            name: format!("ST{reg}_{suffix}"),
            description: "FPU stack register half",
            class,
            is_64bit: true,
            is_system: false,
        };
    }
    if index < CONTROL_STATUS_START + CONTROL_STATUS_COUNT as u8 {
        let i = index - CONTROL_STATUS_START;
        return RegisterInfo {
            index,
            name: format!("MXFPCSR{i}"),
            description: "SIMD/FPU control or status word",
            class: RegisterClass::ControlStatus,
            is_64bit: false,
            is_system: true,
        };
    }
    let offset = index - AVX_UPPER_START;
    let reg = offset / 2;
    let (class, suffix) = if offset % 2 == 0 {
        (RegisterClass::AvxUpperLow, "LO")
    } else {
        (RegisterClass::AvxUpperHigh, "HI")
    };
    RegisterInfo {
        index,
        name: format!("YMM{reg}H_{suffix}"),
        description: "AVX upper 128-bit half",
        class,
        is_64bit: true,
        is_system: false,
    }
}

/// The register file: 134 uniform 64-bit cells.
#[derive(Clone, Eq, PartialEq)]
pub struct RegisterFile {
    cells: [u64; TOTAL_REGISTERS],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            cells: [0; TOTAL_REGISTERS],
        }
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the raw 64-bit cell at `index`.
    pub fn get(&self, index: u8) -> u64 {
        self.cells[index as usize]
    }

    /// Write the raw 64-bit cell at `index`.
    pub fn set(&mut self, index: u8, value: u64) {
        self.cells[index as usize] = value;
    }

    /// Read a general-purpose register by its 0..16 index, as used by
    /// single-byte instruction operands.
    pub fn gp(&self, index: u8) -> u64 {
        debug_assert!((index as usize) < GP_COUNT);
        self.cells[index as usize]
    }

    pub fn set_gp(&mut self, index: u8, value: u64) {
        debug_assert!((index as usize) < GP_COUNT);
        self.cells[index as usize] = value;
    }

    /// Legacy 32-bit projection of a general-purpose register (R0-R7): reads
    /// the low 32 bits, as the 8-register family of opcodes does.
    pub fn gp32(&self, index: u8) -> u32 {
        self.gp(index) as u32
    }

    /// Write the low 32 bits of a general-purpose register, preserving the
    /// high 32 bits, matching the legacy-aliasing invariant in the data
    /// model.
    pub fn set_gp32(&mut self, index: u8, value: u32) {
        let high = self.gp(index) & 0xFFFF_FFFF_0000_0000;
        self.set_gp(index, high | value as u64);
    }

    pub fn rip(&self) -> u64 {
        self.cells[SPECIAL_START as usize]
    }

    pub fn set_rip(&mut self, value: u64) {
        self.cells[SPECIAL_START as usize] = value;
    }

    pub fn rflags(&self) -> u64 {
        self.cells[SPECIAL_START as usize + 1]
    }

    pub fn set_rflags(&mut self, value: u64) {
        self.cells[SPECIAL_START as usize + 1] = value;
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegisterFile {{ ")?;
        for i in 0..GP_COUNT as u8 {
            write!(f, "{}:{:016X} ", GP_NAMES[i as usize], self.gp(i))?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_info_covers_every_index() {
        for i in 0..TOTAL_REGISTERS as u8 {
            let info = register_info(i);
            assert_eq!(info.index, i);
        }
    }

    #[test]
    fn gp32_preserves_high_bits_on_write() {
        let mut regs = RegisterFile::new();
        regs.set_gp(0, 0xAAAA_BBBB_0000_0000);
        regs.set_gp32(0, 0x1234_5678);
        assert_eq!(regs.gp(0), 0xAAAA_BBBB_1234_5678);
        assert_eq!(regs.gp32(0), 0x1234_5678);
    }

    #[test]
    fn simd_pairs_are_adjacent() {
        let lo = register_info(SIMD_START);
        let hi = register_info(SIMD_START + 1);
        assert_eq!(lo.class, RegisterClass::SimdLow);
        assert_eq!(hi.class, RegisterClass::SimdHigh);
        assert_eq!(lo.name, "XMM0_LO");
        assert_eq!(hi.name, "XMM0_HI");
    }

    #[test]
    fn total_register_count_matches_spans() {
        assert_eq!(
            TOTAL_REGISTERS,
            GP_COUNT
                + SEGMENT_COUNT
                + CONTROL_COUNT
                + DEBUG_COUNT
                + SPECIAL_COUNT
                + SIMD_COUNT * 2
                + FPU_COUNT * 2
                + CONTROL_STATUS_COUNT
                + AVX_UPPER_COUNT * 2
        );
    }
}
