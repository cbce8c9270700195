//! Error kinds for the lex/parse/assemble passes. Each pass accumulates these
//! into a list and keeps going rather than aborting on the first one, per the
//! propagation policy: a whole assembly fails only once its pass completes
//! with a non-empty error list.

use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum LexError {
    #[error("{line}:{column}: unterminated string literal")]
    UnterminatedString { line: usize, column: usize },

    #[error("{line}:{column}: unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, line: usize, column: usize },

    #[error("{line}:{column}: unknown directive '{directive}'")]
    UnknownDirective { directive: String, line: usize, column: usize },

    #[error("{line}:{column}: invalid number literal '{text}'")]
    InvalidNumber { text: String, line: usize, column: usize },
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParseError {
    #[error("{line}:{column}: unexpected token (got '{text}')")]
    UnexpectedToken { text: String, line: usize, column: usize },

    #[error("{line}:{column}: expected an expression (got '{text}')")]
    MissingExpression { text: String, line: usize, column: usize },

    #[error("{line}:{column}: expected ']'")]
    ExpectedBracket { line: usize, column: usize },

    #[error("{line}:{column}: expected ':'")]
    ExpectedColon { line: usize, column: usize },
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AssembleError {
    #[error("{line}:{column}: label '{name}' is already defined")]
    DuplicateLabel { name: String, line: usize, column: usize },

    #[error("{line}:{column}: unknown mnemonic '{mnemonic}'")]
    UnknownMnemonic { mnemonic: String, line: usize, column: usize },

    #[error("{line}:{column}: unknown register '{name}'")]
    UnknownRegister { name: String, line: usize, column: usize },

    #[error("{line}:{column}: '{mnemonic}' expects {expected} operand(s), got {got}")]
    WrongArity {
        mnemonic: String,
        expected: usize,
        got: usize,
        line: usize,
        column: usize,
    },

    #[error("{line}:{column}: '{mnemonic}' operand {index} has the wrong kind")]
    WrongOperandKind {
        mnemonic: String,
        index: usize,
        line: usize,
        column: usize,
    },

    #[error("undefined symbol '{name}'")]
    SymbolUndefined { name: String },

    #[error("{line}:{column}: .org target {target:#06X} is below the current location {current:#06X}")]
    OrgBackward {
        target: u32,
        current: u32,
        line: usize,
        column: usize,
    },

    #[error("forward reference to '{name}' at {site:#06X} falls outside the {len}-byte output")]
    ForwardRefOutOfBounds { name: String, site: u32, len: usize },
}
