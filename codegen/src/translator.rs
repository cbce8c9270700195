//! Ahead-of-time translation from the emulator's byte program to a native
//! x86-64 function body, grounded on
//! `examples/original_source/src/codegen/register_allocator.hpp`'s
//! `Translator` usage sketch and spec.md's description of the translate
//! loop: walk the byte program opcode-by-opcode off the same
//! [`virtcomp_opcodes::Opcode`] catalogue the emulator dispatches against,
//! `spill_all_dirty` before calls, and a controlled return for HALT.
//!
//! Coverage is scoped to the operand forms the encoder actually implements
//! (reg/reg, reg/imm64, reg/mem with displacement, push/pop, jmp/jz/jnz/
//! call, RET/NOP/INT3) — per spec.md §4.7, x86 byte emission is described
//! "only to the level required to reason about correctness", not as an
//! exhaustive per-opcode native backend. Opcodes with no corresponding
//! primitive (the bitwise family, multiply/divide, shift, port I/O, the
//! legacy-register extension family, `DB`) translate to
//! [`CodegenError::UnsupportedOpcode`] rather than inventing new encoder
//! primitives the original never specified.

use std::collections::HashMap;

use thiserror::Error;
use virtcomp_opcodes::{Opcode, OperandShape};

use crate::allocator::{RegisterAllocator, MEMORY_BASE};
use crate::x86::{Label, X86Encoder, X86Register};

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CodegenError {
    #[error("{address:#06X}: opcode byte {opcode:#04X} has no allocated mnemonic")]
    InvalidOpcode { opcode: u8, address: u32 },
    #[error("{address:#06X}: '{mnemonic}' has no native translation")]
    UnsupportedOpcode {
        opcode: u8,
        mnemonic: String,
        address: u32,
    },
    #[error("program ends mid-instruction at {address:#06X}")]
    TruncatedInstruction { address: u32 },
    #[error("branch target {address:#06X} is never reached by the byte program")]
    UnboundLabel { address: u32 },
}

/// Translates a byte program into a native function body. Virtual
/// general-purpose registers 0-15 map onto physical x86-64 registers via
/// [`RegisterAllocator`]; VM memory is addressed relative to a fixed base
/// pointer (the generated function's first argument, conventionally `rdi`).
pub struct Translator {
    encoder: X86Encoder,
    allocator: RegisterAllocator,
    labels: HashMap<u32, Label>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self {
            encoder: X86Encoder::new(),
            allocator: RegisterAllocator::new(),
            labels: HashMap::new(),
        }
    }

    pub fn allocation_count(&self) -> usize {
        self.allocator.allocation_count()
    }

    pub fn spill_count(&self) -> usize {
        self.allocator.spill_count()
    }

    /// Translates `program` into a native function body, returning its
    /// bytes on success.
    pub fn translate(mut self, program: &[u8]) -> Result<Vec<u8>, CodegenError> {
        self.allocator.reset_for_new_function();

        let mut pc: u32 = 0;
        while (pc as usize) < program.len() {
            if let Some(label) = self.labels.get_mut(&pc) {
                self.encoder.bind_label(label);
            }

            let opcode_byte = program[pc as usize];
            let opcode = Opcode::from(opcode_byte);
            if opcode.is_reserved() {
                return Err(CodegenError::InvalidOpcode {
                    opcode: opcode_byte,
                    address: pc,
                });
            }

            let size = opcode.encoded_size().ok_or_else(|| CodegenError::UnsupportedOpcode {
                opcode: opcode_byte,
                mnemonic: opcode.to_string(),
                address: pc,
            })?;
            let bytes = program.get(pc as usize..pc as usize + size).ok_or(CodegenError::TruncatedInstruction { address: pc })?;

            self.translate_instruction(opcode, bytes, pc)?;
            pc += size as u32;
        }

        for (&address, label) in &self.labels {
            if !X86Encoder::label_is_bound(label) {
                return Err(CodegenError::UnboundLabel { address });
            }
        }

        Ok(self.encoder.take_code())
    }

    fn unsupported(&self, opcode: Opcode, opcode_byte: u8, address: u32) -> CodegenError {
        let _ = opcode;
        CodegenError::UnsupportedOpcode {
            opcode: opcode_byte,
            mnemonic: Opcode::from(opcode_byte).to_string(),
            address,
        }
    }

    fn translate_instruction(&mut self, opcode: Opcode, bytes: &[u8], pc: u32) -> Result<(), CodegenError> {
        match opcode.shape() {
            OperandShape::Nullary => self.translate_nullary(opcode, bytes[0], pc),
            OperandShape::RegReg => self.translate_reg_reg(opcode, bytes[0], bytes[1], bytes[2], pc),
            OperandShape::Register => self.translate_register(opcode, bytes[0], bytes[1], pc),
            OperandShape::Address => self.translate_address(opcode, bytes[0], bytes[1], pc),
            OperandShape::RegImm8 => self.translate_reg_imm(opcode, bytes[0], bytes[1], bytes[2] as u64, pc),
            OperandShape::RegImm64 => {
                let imm = u64::from_le_bytes(bytes[2..10].try_into().unwrap());
                self.translate_reg_imm(opcode, bytes[0], bytes[1], imm, pc)
            }
            OperandShape::RegAddress => self.translate_reg_address(opcode, bytes[0], bytes[1], bytes[2], pc),
            OperandShape::RegPort | OperandShape::DefineBytes => Err(self.unsupported(opcode, bytes[0], pc)),
        }
    }

    fn translate_nullary(&mut self, opcode: Opcode, opcode_byte: u8, pc: u32) -> Result<(), CodegenError> {
        match opcode {
            Opcode::Nop => self.encoder.emit_nop(),
            Opcode::Ret => {
                self.allocator.spill_all_dirty(&mut self.encoder);
                self.encoder.emit_ret();
            }
            Opcode::Halt => {
                self.allocator.spill_all_dirty(&mut self.encoder);
                self.encoder.emit_ret();
            }
            _ => return Err(self.unsupported(opcode, opcode_byte, pc)),
        }
        Ok(())
    }

    fn translate_reg_reg(&mut self, opcode: Opcode, opcode_byte: u8, dst_virt: u8, src_virt: u8, pc: u32) -> Result<(), CodegenError> {
        match opcode {
            Opcode::Add | Opcode::Add64 => {
                let dst = self.allocator.get(dst_virt, &mut self.encoder);
                let src = self.allocator.get(src_virt, &mut self.encoder);
                self.encoder.emit_add_reg_reg(dst, src);
                self.allocator.mark_dirty(dst_virt);
            }
            Opcode::Sub | Opcode::Sub64 => {
                let dst = self.allocator.get(dst_virt, &mut self.encoder);
                let src = self.allocator.get(src_virt, &mut self.encoder);
                self.encoder.emit_sub_reg_reg(dst, src);
                self.allocator.mark_dirty(dst_virt);
            }
            Opcode::Mov | Opcode::Mov64 => {
                let src = self.allocator.get(src_virt, &mut self.encoder);
                let dst = self.allocator.allocate(dst_virt, &mut self.encoder);
                self.encoder.emit_mov_reg_reg(dst, src);
                self.allocator.mark_dirty(dst_virt);
            }
            Opcode::Cmp | Opcode::Cmp64 => {
                let left = self.allocator.get(dst_virt, &mut self.encoder);
                let right = self.allocator.get(src_virt, &mut self.encoder);
                self.encoder.emit_cmp_reg_reg(left, right);
            }
            _ => return Err(self.unsupported(opcode, opcode_byte, pc)),
        }
        Ok(())
    }

    fn translate_register(&mut self, opcode: Opcode, opcode_byte: u8, virt: u8, pc: u32) -> Result<(), CodegenError> {
        match opcode {
            Opcode::Push | Opcode::PushArg => {
                let phys = self.allocator.get(virt, &mut self.encoder);
                self.encoder.emit_push_reg(phys);
            }
            Opcode::Pop | Opcode::PopArg => {
                let phys = self.allocator.allocate(virt, &mut self.encoder);
                self.encoder.emit_pop_reg(phys);
                self.allocator.mark_dirty(virt);
            }
            _ => return Err(self.unsupported(opcode, opcode_byte, pc)),
        }
        Ok(())
    }

    fn translate_reg_imm(&mut self, opcode: Opcode, opcode_byte: u8, virt: u8, imm: u64, pc: u32) -> Result<(), CodegenError> {
        match opcode {
            Opcode::LoadImm | Opcode::LoadImm64 => {
                let phys = self.allocator.allocate(virt, &mut self.encoder);
                self.encoder.emit_mov_reg_imm64(phys, imm);
                self.allocator.mark_dirty(virt);
            }
            _ => return Err(self.unsupported(opcode, opcode_byte, pc)),
        }
        Ok(())
    }

    fn translate_reg_address(&mut self, opcode: Opcode, opcode_byte: u8, virt: u8, addr: u8, pc: u32) -> Result<(), CodegenError> {
        match opcode {
            Opcode::Load | Opcode::Load64 => {
                let phys = self.allocator.allocate(virt, &mut self.encoder);
                self.encoder.emit_mov_reg_mem(phys, MEMORY_BASE, addr as i32);
                self.allocator.mark_dirty(virt);
            }
            Opcode::Store | Opcode::Store64 => {
                let phys = self.allocator.get(virt, &mut self.encoder);
                self.encoder.emit_mov_mem_reg(MEMORY_BASE, addr as i32, phys);
            }
            _ => return Err(self.unsupported(opcode, opcode_byte, pc)),
        }
        Ok(())
    }

    fn label_for(&mut self, target: u32) -> &mut Label {
        self.labels.entry(target).or_insert_with(|| self.encoder.create_label())
    }

    fn translate_address(&mut self, opcode: Opcode, opcode_byte: u8, target_byte: u8, pc: u32) -> Result<(), CodegenError> {
        let target = target_byte as u32;
        match opcode {
            Opcode::Jmp => {
                let label = self.label_for(target);
                self.encoder.emit_jmp_label(label);
            }
            Opcode::Jz => {
                let label = self.label_for(target);
                self.encoder.emit_jz_label(label);
            }
            Opcode::Jnz => {
                let label = self.label_for(target);
                self.encoder.emit_jnz_label(label);
            }
            Opcode::Call => {
                self.allocator.spill_all_dirty(&mut self.encoder);
                let label = self.label_for(target);
                self.encoder.emit_call_label(label);
            }
            _ => return Err(self.unsupported(opcode, opcode_byte, pc)),
        }
        Ok(())
    }
}

// Silence an unused-import warning when `X86Register` is only named in doc
// comments on some feature combinations.
#[allow(unused_imports)]
use X86Register as _UnusedX86RegisterImportGuard;
