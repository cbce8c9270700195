//! The two-pass encoder, grounded on
//! `examples/original_source/src/assembler/assembler.{hpp,cpp}`'s
//! `AssemblerEngine`, generalized from its per-mnemonic `if`/`else if` chain
//! onto a single shape-driven encoder that reuses
//! [`virtcomp_opcodes::Opcode::shape`] — the catalogue is the only place an
//! instruction's operand layout is allowed to live, per the shared-table
//! design note.

use virtcomp_opcodes::{Opcode, OperandShape};

use crate::ast::{Expression, Program, Statement};
use crate::error::AssembleError;
use crate::lexer::register_index;
use crate::symbol::{ForwardRef, SymbolTable};

pub struct AssemblerEngine {
    symbols: SymbolTable,
    forward_refs: Vec<ForwardRef>,
    bytecode: Vec<u8>,
    location: u32,
    errors: Vec<AssembleError>,
}

impl Default for AssemblerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblerEngine {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            forward_refs: Vec::new(),
            bytecode: Vec::new(),
            location: 0,
            errors: Vec::new(),
        }
    }

    /// Assemble a parsed program into its byte form. Returns the bytecode on
    /// success, or every diagnostic accumulated across both passes on
    /// failure.
    pub fn assemble(mut self, program: &Program) -> Result<Vec<u8>, Vec<AssembleError>> {
        self.first_pass(program);
        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        self.second_pass(program);
        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        self.resolve_forward_references();
        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        Ok(self.bytecode)
    }

    fn first_pass(&mut self, program: &Program) {
        self.location = 0;

        for stmt in &program.statements {
            match stmt {
                Statement::Label { name, line, column } => {
                    if self.symbols.define(name, self.location).is_err() {
                        self.errors.push(AssembleError::DuplicateLabel {
                            name: name.clone(),
                            line: *line,
                            column: *column,
                        });
                    }
                }
                Statement::Instruction {
                    mnemonic,
                    operands,
                    line,
                    column,
                } => match instruction_size(mnemonic, operands.len()) {
                    Ok(size) => self.location += size as u32,
                    Err(_) => self.errors.push(AssembleError::UnknownMnemonic {
                        mnemonic: mnemonic.clone(),
                        line: *line,
                        column: *column,
                    }),
                },
                Statement::Directive {
                    name,
                    arguments,
                    line,
                    column,
                } => self.measure_directive(name, arguments, *line, *column),
            }
        }
    }

    fn measure_directive(&mut self, name: &str, arguments: &[Expression], line: usize, column: usize) {
        match name {
            "org" => match arguments.first() {
                Some(Expression::Immediate { value, .. }) => {
                    let target = *value as u32;
                    if target < self.location {
                        self.errors.push(AssembleError::OrgBackward {
                            target,
                            current: self.location,
                            line,
                            column,
                        });
                        return;
                    }
                    self.location = target;
                }
                _ => self.errors.push(AssembleError::WrongOperandKind {
                    mnemonic: ".org".to_string(),
                    index: 0,
                    line,
                    column,
                }),
            },
            "db" => self.location += arguments.len() as u32,
            "dw" => self.location += arguments.len() as u32 * 2,
            "dd" => self.location += arguments.len() as u32 * 4,
            "string" => {
                for arg in arguments {
                    if let Expression::StringLiteral { value, .. } = arg {
                        self.location += value.len() as u32 + 1;
                    }
                }
            }
            "equ" | "include" | "data" | "text" | "end" => {}
            _ => unreachable!("lexer rejects unknown directive names"),
        }
    }

    fn second_pass(&mut self, program: &Program) {
        self.location = 0;
        self.bytecode.clear();

        for stmt in &program.statements {
            match stmt {
                Statement::Label { .. } => {}
                Statement::Instruction {
                    mnemonic,
                    operands,
                    line,
                    column,
                } => self.encode_instruction(mnemonic, operands, *line, *column),
                Statement::Directive {
                    name,
                    arguments,
                    line,
                    column,
                } => self.encode_directive(name, arguments, *line, *column),
            }
        }
    }

    fn encode_instruction(&mut self, mnemonic: &str, operands: &[Expression], line: usize, column: usize) {
        let Some(opcode) = Opcode::from_mnemonic(mnemonic) else {
            self.errors.push(AssembleError::UnknownMnemonic {
                mnemonic: mnemonic.to_string(),
                line,
                column,
            });
            return;
        };

        let shape = opcode.shape();
        if let Err(expected) = arity_for(shape, operands.len()) {
            self.errors.push(AssembleError::WrongArity {
                mnemonic: mnemonic.to_string(),
                expected,
                got: operands.len(),
                line,
                column,
            });
            return;
        }

        self.emit_byte(opcode as u8);

        match shape {
            OperandShape::Nullary => {}
            OperandShape::Register => self.emit_register(mnemonic, &operands[0], 0, line, column),
            OperandShape::Address => self.emit_address_operand(mnemonic, &operands[0], 0, line, column),
            OperandShape::RegReg => {
                self.emit_register(mnemonic, &operands[0], 0, line, column);
                self.emit_register(mnemonic, &operands[1], 1, line, column);
            }
            OperandShape::RegImm8 => {
                self.emit_register(mnemonic, &operands[0], 0, line, column);
                let symbolic_allowed = !matches!(mnemonic, "SHL" | "SHR");
                self.emit_imm8_operand(mnemonic, &operands[1], 1, symbolic_allowed, line, column);
            }
            OperandShape::RegAddress => {
                self.emit_register(mnemonic, &operands[0], 0, line, column);
                self.emit_address_operand(mnemonic, &operands[1], 1, line, column);
            }
            OperandShape::RegPort => {
                self.emit_register(mnemonic, &operands[0], 0, line, column);
                self.emit_imm8_operand(mnemonic, &operands[1], 1, false, line, column);
            }
            OperandShape::RegImm64 => {
                self.emit_register(mnemonic, &operands[0], 0, line, column);
                self.emit_imm64_operand(&operands[1]);
            }
            OperandShape::DefineBytes => {
                self.emit_address_operand(mnemonic, &operands[0], 0, line, column);
                let length = (operands.len() - 1) as u8;
                self.emit_byte(length);
                for (i, operand) in operands[1..].iter().enumerate() {
                    self.emit_imm8_operand(mnemonic, operand, i + 1, true, line, column);
                }
            }
        }
    }

    fn emit_register(&mut self, mnemonic: &str, expr: &Expression, index: usize, line: usize, column: usize) {
        match expr {
            Expression::Register { name, .. } => match register_index(name) {
                Some(reg) => self.emit_byte(reg),
                None => self.errors.push(AssembleError::UnknownRegister {
                    name: name.clone(),
                    line,
                    column,
                }),
            },
            _ => self.errors.push(AssembleError::WrongOperandKind {
                mnemonic: mnemonic.to_string(),
                index,
                line,
                column,
            }),
        }
    }

    /// Address operands (jump targets, LOAD/STORE addresses, DB's address
    /// field) accept a forward reference the way LOAD_IMM's immediate does.
    fn emit_address_operand(&mut self, mnemonic: &str, expr: &Expression, index: usize, line: usize, column: usize) {
        match self.evaluate_expression(expr) {
            Ok(Resolved::Value(v)) => self.emit_byte(v as u8),
            Ok(Resolved::Symbol(name)) => self.emit_forward_ref(name, 1, false),
            Err(()) => self.errors.push(AssembleError::WrongOperandKind {
                mnemonic: mnemonic.to_string(),
                index,
                line,
                column,
            }),
        }
    }

    fn emit_imm8_operand(
        &mut self,
        mnemonic: &str,
        expr: &Expression,
        index: usize,
        symbolic_allowed: bool,
        line: usize,
        column: usize,
    ) {
        match self.evaluate_expression(expr) {
            Ok(Resolved::Value(v)) => self.emit_byte(v as u8),
            Ok(Resolved::Symbol(name)) if symbolic_allowed => self.emit_forward_ref(name, 1, false),
            _ => self.errors.push(AssembleError::WrongOperandKind {
                mnemonic: mnemonic.to_string(),
                index,
                line,
                column,
            }),
        }
    }

    fn emit_imm64_operand(&mut self, expr: &Expression) {
        match self.evaluate_expression(expr) {
            Ok(Resolved::Value(v)) => self.emit_qword(v as u64),
            Ok(Resolved::Symbol(name)) => self.emit_forward_ref(name, 8, false),
            Err(()) => self.emit_qword(0),
        }
    }

    fn encode_directive(&mut self, name: &str, arguments: &[Expression], line: usize, column: usize) {
        match name {
            "db" => {
                for arg in arguments {
                    match self.evaluate_expression(arg) {
                        Ok(Resolved::Value(v)) => self.emit_byte(v as u8),
                        Ok(Resolved::Symbol(sym)) => self.emit_forward_ref(sym, 1, false),
                        Err(()) => self.errors.push(AssembleError::WrongOperandKind {
                            mnemonic: ".db".to_string(),
                            index: 0,
                            line,
                            column,
                        }),
                    }
                }
            }
            "dw" => {
                for arg in arguments {
                    match self.evaluate_expression(arg) {
                        Ok(Resolved::Value(v)) => self.emit_word(v as u16),
                        Ok(Resolved::Symbol(sym)) => self.emit_forward_ref(sym, 2, false),
                        Err(()) => self.errors.push(AssembleError::WrongOperandKind {
                            mnemonic: ".dw".to_string(),
                            index: 0,
                            line,
                            column,
                        }),
                    }
                }
            }
            "dd" => {
                for arg in arguments {
                    match self.evaluate_expression(arg) {
                        Ok(Resolved::Value(v)) => self.emit_dword(v as u32),
                        Ok(Resolved::Symbol(sym)) => self.emit_forward_ref(sym, 4, false),
                        Err(()) => self.errors.push(AssembleError::WrongOperandKind {
                            mnemonic: ".dd".to_string(),
                            index: 0,
                            line,
                            column,
                        }),
                    }
                }
            }
            "string" => {
                for arg in arguments {
                    if let Expression::StringLiteral { value, .. } = arg {
                        for byte in value.bytes() {
                            self.emit_byte(byte);
                        }
                        self.emit_byte(0);
                    } else {
                        self.errors.push(AssembleError::WrongOperandKind {
                            mnemonic: ".string".to_string(),
                            index: 0,
                            line,
                            column,
                        });
                    }
                }
            }
            "org" => {
                if let Some(Expression::Immediate { value, .. }) = arguments.first() {
                    let target = *value as u32;
                    while (self.bytecode.len() as u32) < target {
                        self.bytecode.push(0);
                    }
                    self.location = target;
                }
            }
            "equ" | "include" | "data" | "text" | "end" => {}
            _ => unreachable!("lexer rejects unknown directive names"),
        }
    }

    fn evaluate_expression(&self, expr: &Expression) -> Result<Resolved, ()> {
        match expr {
            Expression::Immediate { value, .. } => Ok(Resolved::Value(*value)),
            Expression::Identifier { name, .. } => match self.symbols.lookup(name) {
                Some(symbol) if symbol.defined => Ok(Resolved::Value(symbol.address as i64)),
                _ => Ok(Resolved::Symbol(name.clone())),
            },
            Expression::Register { name, .. } => match register_index(name) {
                Some(reg) => Ok(Resolved::Value(reg as i64)),
                None => Err(()),
            },
            _ => Err(()),
        }
    }

    fn emit_byte(&mut self, byte: u8) {
        self.bytecode.push(byte);
        self.location += 1;
    }

    fn emit_word(&mut self, word: u16) {
        self.emit_byte((word & 0xFF) as u8);
        self.emit_byte((word >> 8) as u8);
    }

    fn emit_dword(&mut self, dword: u32) {
        for i in 0..4 {
            self.emit_byte(((dword >> (8 * i)) & 0xFF) as u8);
        }
    }

    fn emit_qword(&mut self, qword: u64) {
        for i in 0..8 {
            self.emit_byte(((qword >> (8 * i)) & 0xFF) as u8);
        }
    }

    fn emit_forward_ref(&mut self, symbol: String, width: usize, relative: bool) {
        self.forward_refs.push(ForwardRef {
            site: self.location,
            symbol,
            width,
            relative,
        });
        for _ in 0..width {
            self.emit_byte(0);
        }
    }

    fn resolve_forward_references(&mut self) {
        for reference in self.forward_refs.clone() {
            let Some(symbol) = self.symbols.lookup(&reference.symbol) else {
                self.errors.push(AssembleError::SymbolUndefined {
                    name: reference.symbol,
                });
                continue;
            };
            if !symbol.defined {
                self.errors.push(AssembleError::SymbolUndefined {
                    name: reference.symbol,
                });
                continue;
            }

            let mut address = symbol.address;
            if reference.relative {
                address = address.wrapping_sub(reference.site + reference.width as u32);
            }

            let site = reference.site as usize;
            if site + reference.width > self.bytecode.len() {
                self.errors.push(AssembleError::ForwardRefOutOfBounds {
                    name: reference.symbol,
                    site: reference.site,
                    len: self.bytecode.len(),
                });
                continue;
            }

            for i in 0..reference.width {
                self.bytecode[site + i] = ((address >> (8 * i)) & 0xFF) as u8;
            }
        }
    }
}

enum Resolved {
    Value(i64),
    Symbol(String),
}

/// The operand count a shape's encoder expects; mismatches return the
/// expected arity for `WrongArity`.
fn arity_for(shape: OperandShape, got: usize) -> Result<(), usize> {
    let expected = match shape {
        OperandShape::Nullary => 0,
        OperandShape::Register | OperandShape::Address => 1,
        OperandShape::RegReg
        | OperandShape::RegImm8
        | OperandShape::RegAddress
        | OperandShape::RegPort
        | OperandShape::RegImm64 => 2,
        OperandShape::DefineBytes => {
            return if got >= 1 { Ok(()) } else { Err(1) };
        }
    };
    if got == expected {
        Ok(())
    } else {
        Err(expected)
    }
}

/// Mirrors [`arity_for`]/[`Opcode::shape`] to compute the size of an
/// instruction in the first pass, before any operand has been resolved.
fn instruction_size(mnemonic: &str, operand_count: usize) -> Result<usize, ()> {
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or(())?;
    Ok(match opcode.shape() {
        OperandShape::DefineBytes => 1 + 1 + 1 + operand_count.saturating_sub(1),
        _ => opcode.encoded_size().unwrap_or(1),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn assemble(source: &str) -> Result<Vec<u8>, Vec<AssembleError>> {
        let (tokens, lex_errors) = Lexer::new(source).tokenize();
        assert!(lex_errors.is_empty(), "{lex_errors:?}");
        let (program, parse_errors) = Parser::new(tokens).parse();
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        AssemblerEngine::new().assemble(&program)
    }

    #[test]
    fn load_immediate_scenario() {
        let bytes = assemble("LOAD_IMM R0, 5\nLOAD_IMM R1, 10\nHALT\n").unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x05, 0x01, 0x01, 0x0A, 0xFF]);
    }

    #[test]
    fn add_scenario() {
        let bytes = assemble("LOAD_IMM R0, 5\nLOAD_IMM R1, 3\nADD R0, R1\nHALT\n").unwrap();
        assert_eq!(
            bytes,
            vec![0x01, 0x00, 0x05, 0x01, 0x01, 0x03, 0x02, 0x00, 0x01, 0xFF]
        );
    }

    #[test]
    fn forward_reference_to_a_later_label() {
        let bytes = assemble("JMP skip\nHALT\nskip:\nNOP\n").unwrap();
        assert_eq!(bytes, vec![0x05, 0x03, 0xFF, 0x00]);
    }

    #[test]
    fn backward_reference_to_an_earlier_label() {
        let bytes = assemble("start:\nJMP start\n").unwrap();
        assert_eq!(bytes, vec![0x05, 0x00]);
    }

    #[test]
    fn db_directive_emits_raw_bytes() {
        let bytes = assemble(".db 1, 2, 3\n").unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn string_directive_null_terminates() {
        let bytes = assemble(".string \"hi\"\n").unwrap();
        assert_eq!(bytes, vec![b'h', b'i', 0]);
    }

    #[test]
    fn org_pads_with_zeroes() {
        let bytes = assemble(".org 4\nNOP\n").unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0x00]);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let errors = assemble("a:\na:\nNOP\n").unwrap_err();
        assert!(matches!(errors[0], AssembleError::DuplicateLabel { .. }));
    }

    #[test]
    fn unknown_mnemonic_is_an_error() {
        // The lexer only ever tags a token `Mnemonic` once it matches the
        // catalogue, so this path is reached by feeding the engine a
        // hand-built AST rather than through the lexer/parser.
        let program = Program {
            statements: vec![Statement::Instruction {
                mnemonic: "BOGUS".to_string(),
                operands: vec![],
                line: 1,
                column: 1,
            }],
        };
        let errors = AssemblerEngine::new().assemble(&program).unwrap_err();
        assert!(matches!(errors[0], AssembleError::UnknownMnemonic { .. }));
    }

    #[test]
    fn unknown_register_is_an_error() {
        // As with `unknown_mnemonic_is_an_error`, the lexer never tags a
        // token `Register` for a name outside the table, so this is driven
        // through a hand-built AST.
        let program = Program {
            statements: vec![Statement::Instruction {
                mnemonic: "PUSH".to_string(),
                operands: vec![Expression::Register {
                    name: "R99".to_string(),
                    line: 1,
                    column: 1,
                }],
                line: 1,
                column: 1,
            }],
        };
        let errors = AssemblerEngine::new().assemble(&program).unwrap_err();
        assert!(matches!(errors[0], AssembleError::UnknownRegister { .. }));
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let errors = assemble("ADD R0\n").unwrap_err();
        assert!(matches!(errors[0], AssembleError::WrongArity { .. }));
    }

    #[test]
    fn symbolic_port_number_is_rejected() {
        let errors = assemble("OUT R0, bogus\n").unwrap_err();
        assert!(matches!(errors[0], AssembleError::WrongOperandKind { .. }));
    }

    #[test]
    fn undefined_symbol_after_resolution_is_an_error() {
        let errors = assemble("JMP nowhere\n").unwrap_err();
        assert!(matches!(errors[0], AssembleError::SymbolUndefined { .. }));
    }

    #[test]
    fn org_backward_is_rejected() {
        let errors = assemble("NOP\nNOP\n.org 0\nNOP\n").unwrap_err();
        assert!(matches!(errors[0], AssembleError::OrgBackward { .. }));
    }

    #[test]
    fn shift_amount_must_be_immediate() {
        let errors = assemble("SHL R0, bogus\n").unwrap_err();
        assert!(matches!(errors[0], AssembleError::WrongOperandKind { .. }));
    }

    #[test]
    fn load_imm64_round_trips_a_forward_reference() {
        let bytes = assemble("LOAD_IMM64 R0, skip\nskip:\n").unwrap();
        assert_eq!(bytes.len(), 10);
        assert_eq!(bytes[0], 0x50); // LOAD_IMM64 opcode
        assert_eq!(bytes[1], 0x00); // R0
        let value = u64::from_le_bytes(bytes[2..10].try_into().unwrap());
        assert_eq!(value, 10);
    }
}
