//! The textual assembler: lexer, parser, and two-pass encoder, grounded on
//! `examples/original_source/src/assembler/`. This crate's only dependency
//! on the rest of the workspace is [`virtcomp_opcodes`] — the catalogue both
//! this crate and `virtcomp_core` dispatch against, so the two can never
//! silently drift apart on an opcode's shape or size.

mod ast;
mod disassembler;
mod engine;
mod error;
mod lexer;
mod parser;
mod symbol;
mod token;

pub use ast::{Expression, Program, Statement};
pub use disassembler::{disassemble, DisassembleError, Instruction, Operand};
pub use engine::AssemblerEngine;
pub use error::{AssembleError, LexError, ParseError};
pub use lexer::{register_index, Lexer};
pub use parser::Parser;
pub use token::{Token, TokenKind, TokenValue};

/// Any diagnostic produced by one of the three passes, surfaced together so
/// a caller can print whichever pass actually failed.
#[derive(Clone, Debug)]
pub enum Diagnostic {
    Lex(LexError),
    Parse(ParseError),
    Assemble(AssembleError),
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::Lex(e) => write!(f, "{e}"),
            Diagnostic::Parse(e) => write!(f, "{e}"),
            Diagnostic::Assemble(e) => write!(f, "{e}"),
        }
    }
}

/// Run all three passes over `source` and return the assembled bytecode, or
/// every diagnostic accumulated across whichever pass first failed. Lexing
/// and parsing both run to completion even in the presence of errors; the
/// assemble pass only runs if lexing and parsing produced none.
pub fn assemble(source: &str) -> Result<Vec<u8>, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors.into_iter().map(Diagnostic::Lex).collect());
    }

    let (program, parse_errors) = Parser::new(tokens).parse();
    if !parse_errors.is_empty() {
        return Err(parse_errors.into_iter().map(Diagnostic::Parse).collect());
    }

    AssemblerEngine::new()
        .assemble(&program)
        .map_err(|errors| errors.into_iter().map(Diagnostic::Assemble).collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn assembles_a_small_program_end_to_end() {
        let bytes = assemble("LOAD_IMM R0, 5\nLOAD_IMM R1, 10\nHALT\n").unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x05, 0x01, 0x01, 0x0A, 0xFF]);
    }

    #[test]
    fn lex_errors_short_circuit_before_parsing() {
        let errors = assemble("\"unterminated\nNOP\n").unwrap_err();
        assert!(matches!(errors[0], Diagnostic::Lex(_)));
    }

    /// Assembling and then disassembling a program must recover the same
    /// mnemonics and operand values, labels aside (disassembly only ever
    /// sees the numeric address a label resolved to).
    #[test]
    fn assemble_then_disassemble_round_trips_mnemonics_and_operands() {
        let source = "LOAD_IMM R0, 5\nLOAD_IMM R1, 3\nADD R0, R1\nCMP R0, R1\nHALT\n";
        let bytes = assemble(source).unwrap();
        let listing = disassemble(&bytes).unwrap();

        let rendered: Vec<String> = listing.iter().map(|ins| ins.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["LOAD_IMM R0, 5", "LOAD_IMM R1, 3", "ADD R0, R1", "CMP R0, R1", "HALT"]
        );
    }
}
