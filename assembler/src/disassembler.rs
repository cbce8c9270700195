//! The inverse of the two-pass encoder: walk an assembled byte stream back
//! into one [`Instruction`] per opcode. Grounded on the same
//! [`virtcomp_opcodes::CATALOGUE`] the encoder consumes, so a disassembled
//! listing can never disagree with what [`crate::AssemblerEngine`] produced
//! it from — the catalogue is shared, not duplicated.
//!
//! Labels don't survive a round trip: addresses decode back as bare
//! [`Operand::Address`] values, not symbol names, since the symbol table
//! that named them exists only during assembly.

use thiserror::Error;

use virtcomp_opcodes::{Opcode, OperandShape};

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum DisassembleError {
    #[error("opcode byte {opcode:#04X} at offset {offset} has no allocated mnemonic")]
    ReservedOpcode { opcode: u8, offset: u32 },

    #[error("instruction at offset {offset} needs {needed} more byte(s) than the stream has")]
    TruncatedInstruction { offset: u32, needed: usize },
}

/// One decoded operand. Registers are printed as `R<index>`; this module
/// doesn't attempt to recover the x86-style aliases (`RAX`, `RBX`, ...) a
/// human author may have written, since the bytecode only ever stores the
/// numeric index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Register(u8),
    Address(u8),
    Port(u8),
    Immediate8(u8),
    Immediate64(u64),
    Bytes(Vec<u8>),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "R{r}"),
            Operand::Address(a) => write!(f, "{a:#04X}"),
            Operand::Port(p) => write!(f, "{p:#04X}"),
            Operand::Immediate8(v) => write!(f, "{v}"),
            Operand::Immediate64(v) => write!(f, "{v}"),
            Operand::Bytes(bytes) => {
                let rendered: Vec<String> = bytes.iter().map(|b| format!("{b:#04X}")).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

/// One decoded instruction, anchored to the byte offset its opcode byte
/// occupied in the source stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (index, operand) in self.operands.iter().enumerate() {
            write!(f, "{}{operand}", if index == 0 { " " } else { ", " })?;
        }
        Ok(())
    }
}

/// Decode `bytes` into one [`Instruction`] per opcode, front to back.
///
/// This has no notion of where code ends and `.db` data begins beyond what
/// `DefineBytes`' own length byte tells it; a caller that mixes code and
/// raw data outside of `DB` instructions (as the assembler's `.data`
/// section does, reachable only via computed jumps) must stop decoding at
/// the boundary it already knows, not rely on this function to find it.
pub fn disassemble(bytes: &[u8]) -> Result<Vec<Instruction>, DisassembleError> {
    let mut out = Vec::new();
    let mut pc = 0u32;

    while (pc as usize) < bytes.len() {
        let offset = pc;
        let opcode_byte = bytes[pc as usize];
        let opcode = Opcode::from(opcode_byte);
        if opcode.is_reserved() {
            return Err(DisassembleError::ReservedOpcode { opcode: opcode_byte, offset });
        }

        let (operands, consumed) = decode_operands(opcode, bytes, pc)?;
        out.push(Instruction { offset, opcode, operands });
        pc += consumed;
    }

    Ok(out)
}

fn require(bytes: &[u8], offset: u32, len: usize) -> Result<&[u8], DisassembleError> {
    let start = offset as usize;
    bytes
        .get(start..start + len)
        .ok_or(DisassembleError::TruncatedInstruction { offset, needed: len })
}

fn decode_operands(opcode: Opcode, bytes: &[u8], pc: u32) -> Result<(Vec<Operand>, u32), DisassembleError> {
    match opcode.shape() {
        OperandShape::Nullary => Ok((vec![], 1)),
        OperandShape::Register => {
            let reg = require(bytes, pc + 1, 1)?[0];
            Ok((vec![Operand::Register(reg)], 2))
        }
        OperandShape::Address => {
            let addr = require(bytes, pc + 1, 1)?[0];
            Ok((vec![Operand::Address(addr)], 2))
        }
        OperandShape::RegReg => {
            let pair = require(bytes, pc + 1, 2)?;
            Ok((vec![Operand::Register(pair[0]), Operand::Register(pair[1])], 3))
        }
        OperandShape::RegImm8 => {
            let pair = require(bytes, pc + 1, 2)?;
            Ok((vec![Operand::Register(pair[0]), Operand::Immediate8(pair[1])], 3))
        }
        OperandShape::RegAddress => {
            let pair = require(bytes, pc + 1, 2)?;
            Ok((vec![Operand::Register(pair[0]), Operand::Address(pair[1])], 3))
        }
        OperandShape::RegPort => {
            let pair = require(bytes, pc + 1, 2)?;
            Ok((vec![Operand::Register(pair[0]), Operand::Port(pair[1])], 3))
        }
        OperandShape::RegImm64 => {
            let reg = require(bytes, pc + 1, 1)?[0];
            let imm_bytes = require(bytes, pc + 2, 8)?;
            let imm = u64::from_le_bytes(imm_bytes.try_into().expect("checked length 8"));
            Ok((vec![Operand::Register(reg), Operand::Immediate64(imm)], 10))
        }
        OperandShape::DefineBytes => {
            let header = require(bytes, pc + 1, 2)?;
            let addr = header[0];
            let len = header[1] as usize;
            let payload = require(bytes, pc + 3, len)?.to_vec();
            Ok((vec![Operand::Address(addr), Operand::Bytes(payload)], 3 + len as u32))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assemble;

    #[test]
    fn disassembles_a_small_program() {
        let bytes = assemble("LOAD_IMM R0, 5\nLOAD_IMM R1, 10\nADD R0, R1\nHALT\n").unwrap();
        let program = disassemble(&bytes).unwrap();

        assert_eq!(program.len(), 4);
        assert_eq!(program[0].opcode, Opcode::LoadImm);
        assert_eq!(program[0].operands, vec![Operand::Register(0), Operand::Immediate8(5)]);
        assert_eq!(program[1].operands, vec![Operand::Register(1), Operand::Immediate8(10)]);
        assert_eq!(program[2].opcode, Opcode::Add);
        assert_eq!(program[2].operands, vec![Operand::Register(0), Operand::Register(1)]);
        assert_eq!(program[3].opcode, Opcode::Halt);
        assert!(program[3].operands.is_empty());
    }

    #[test]
    fn round_trips_operand_values_through_assemble_then_disassemble() {
        let source = "start:\nLOAD_IMM R2, 7\nJMP start\n";
        let bytes = assemble(source).unwrap();
        let program = disassemble(&bytes).unwrap();

        // The label `start` resolves to address 0; disassembly can't recover
        // its name, only the numeric operand value the assembler encoded.
        assert_eq!(program[1].opcode, Opcode::Jmp);
        assert_eq!(program[1].operands, vec![Operand::Address(0)]);
    }

    #[test]
    fn define_bytes_carries_its_payload() {
        let bytes = assemble("DB 0x10, 0x20, 0x30, 0x40\nHALT\n").unwrap();
        let program = disassemble(&bytes).unwrap();

        assert_eq!(program[0].opcode, Opcode::Db);
        assert_eq!(
            program[0].operands,
            vec![Operand::Address(0x10), Operand::Bytes(vec![0x20, 0x30, 0x40])]
        );
    }

    #[test]
    fn reserved_opcode_byte_is_rejected() {
        let err = disassemble(&[0x29]).unwrap_err();
        assert!(matches!(err, DisassembleError::ReservedOpcode { opcode: 0x29, offset: 0 }));
    }

    #[test]
    fn truncated_instruction_is_rejected() {
        let err = disassemble(&[0x01, 0x00]).unwrap_err();
        assert!(matches!(err, DisassembleError::TruncatedInstruction { .. }));
    }
}
