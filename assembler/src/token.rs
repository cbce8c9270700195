//! Token shapes, grounded on
//! `examples/original_source/src/assembler/token.hpp`'s `TokenType`/`Token`
//! pair, generalized from its `std::variant<int64_t, uint64_t, double,
//! std::string>` payload onto a plain Rust enum.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Register,
    Mnemonic,
    Directive,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Hash,
    LBracket,
    RBracket,
    Plus,
    Minus,
    Asterisk,
    Newline,
    Invalid,
    Eof,
}

/// A token's literal payload, present only for `Number` and `String` kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenValue {
    None,
    Number(u64),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub value: TokenValue,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            value: TokenValue::None,
            line,
            column,
        }
    }

    pub fn with_value(mut self, value: TokenValue) -> Self {
        self.value = value;
        self
    }

    pub fn as_number(&self) -> Option<u64> {
        match self.value {
            TokenValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> &str {
        match &self.value {
            TokenValue::Text(s) => s,
            _ => &self.text,
        }
    }
}
