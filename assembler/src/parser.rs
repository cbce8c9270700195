//! The recursive-descent parser, grounded on
//! `examples/original_source/src/assembler/parser.{hpp,cpp}`'s `Parser`
//! class: a flat token cursor, one statement per line, expressions handled
//! by a small primary-expression table plus a special case for bracketed
//! memory references. Recovery skips to the next newline (rather than the
//! original's single-token advance) per the line-sensitive grammar.

use crate::ast::{Expression, Program, Statement};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> (Program, Vec<ParseError>) {
        let mut statements = Vec::new();
        self.skip_newlines();

        while !self.is_at_end() {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.skip_newlines();
        }

        (Program { statements }, self.errors)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self, offset: usize) -> &Token {
        let i = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[i]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.current().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_newlines(&mut self) {
        while self.current().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn recover_to_newline(&mut self) {
        while !matches!(self.current().kind, TokenKind::Newline | TokenKind::Eof) {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        let token = self.current().clone();

        match token.kind {
            TokenKind::Mnemonic => {
                self.advance();
                let stmt = self.parse_instruction(token.text, token.line, token.column);
                Some(stmt)
            }
            TokenKind::Directive => {
                self.advance();
                let stmt = self.parse_directive(token.text, token.line, token.column);
                Some(stmt)
            }
            TokenKind::Identifier if self.peek(1).kind == TokenKind::Colon => {
                self.advance(); // identifier
                self.advance(); // colon
                Some(Statement::Label {
                    name: token.text,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenKind::Newline | TokenKind::Eof => {
                self.advance();
                None
            }
            _ => {
                self.errors.push(ParseError::UnexpectedToken {
                    text: token.text,
                    line: token.line,
                    column: token.column,
                });
                self.recover_to_newline();
                None
            }
        }
    }

    fn parse_instruction(&mut self, mnemonic: String, line: usize, column: usize) -> Statement {
        let mut operands = Vec::new();

        if !matches!(self.current().kind, TokenKind::Newline | TokenKind::Eof) {
            loop {
                if let Some(operand) = self.parse_expression() {
                    operands.push(operand);
                }
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        Statement::Instruction {
            mnemonic,
            operands,
            line,
            column,
        }
    }

    fn parse_directive(&mut self, name: String, line: usize, column: usize) -> Statement {
        let mut arguments = Vec::new();

        if !matches!(self.current().kind, TokenKind::Newline | TokenKind::Eof) {
            loop {
                if let Some(arg) = self.parse_expression() {
                    arguments.push(arg);
                }
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        Statement::Directive {
            name,
            arguments,
            line,
            column,
        }
    }

    fn parse_expression(&mut self) -> Option<Expression> {
        if self.current().kind == TokenKind::LBracket {
            return self.parse_memory_reference();
        }
        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> Option<Expression> {
        let token = self.current().clone();

        match token.kind {
            TokenKind::Register => {
                self.advance();
                Some(Expression::Register {
                    name: token.text,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenKind::Number => {
                self.advance();
                Some(Expression::Immediate {
                    value: token.as_number().unwrap_or(0) as i64,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenKind::Identifier => {
                self.advance();
                Some(Expression::Identifier {
                    name: token.text,
                    line: token.line,
                    column: token.column,
                })
            }
            TokenKind::String => {
                self.advance();
                Some(Expression::StringLiteral {
                    value: token.as_text().to_string(),
                    line: token.line,
                    column: token.column,
                })
            }
            _ => {
                self.errors.push(ParseError::MissingExpression {
                    text: token.text,
                    line: token.line,
                    column: token.column,
                });
                self.advance();
                None
            }
        }
    }

    fn parse_memory_reference(&mut self) -> Option<Expression> {
        let open = self.current().clone();
        self.advance(); // '['

        let base = self.parse_primary_expression()?;

        let mut offset = None;
        if matches!(self.current().kind, TokenKind::Plus | TokenKind::Minus) {
            let negative = self.current().kind == TokenKind::Minus;
            self.advance();
            let value = self.parse_primary_expression()?;
            offset = Some(if negative { negate(value) } else { value });
        }

        if !self.match_kind(TokenKind::RBracket) {
            self.errors.push(ParseError::ExpectedBracket {
                line: self.current().line,
                column: self.current().column,
            });
            return None;
        }

        Some(Expression::MemoryRef {
            base: Box::new(base),
            offset: offset.map(Box::new),
            line: open.line,
            column: open.column,
        })
    }
}

fn negate(expr: Expression) -> Expression {
    match expr {
        Expression::Immediate { value, line, column } => Expression::Immediate {
            value: -value,
            line,
            column,
        },
        other => other,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> (Program, Vec<ParseError>) {
        let (tokens, _lex_errors) = Lexer::new(source).tokenize();
        Parser::new(tokens).parse()
    }

    #[test]
    fn parses_a_label_and_instruction() {
        let (program, errors) = parse("start:\n  LOAD_IMM R0, 5\n");
        assert!(errors.is_empty());
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[0], Statement::Label { .. }));
        match &program.statements[1] {
            Statement::Instruction { mnemonic, operands, .. } => {
                assert_eq!(mnemonic, "LOAD_IMM");
                assert_eq!(operands.len(), 2);
            }
            other => panic!("expected instruction, got {other:?}"),
        }
    }

    #[test]
    fn parses_memory_reference_with_negative_offset() {
        let (program, errors) = parse("LOAD R0, [R1 - 4]\n");
        assert!(errors.is_empty());
        match &program.statements[0] {
            Statement::Instruction { operands, .. } => match &operands[1] {
                Expression::MemoryRef { offset, .. } => match offset.as_deref() {
                    Some(Expression::Immediate { value, .. }) => assert_eq!(*value, -4),
                    other => panic!("expected negative immediate offset, got {other:?}"),
                },
                other => panic!("expected memory reference, got {other:?}"),
            },
            other => panic!("expected instruction, got {other:?}"),
        }
    }

    #[test]
    fn parses_directive_with_string_argument() {
        let (program, errors) = parse(".string \"hi\"\n");
        assert!(errors.is_empty());
        match &program.statements[0] {
            Statement::Directive { name, arguments, .. } => {
                assert_eq!(name, "string");
                assert_eq!(arguments.len(), 1);
            }
            other => panic!("expected directive, got {other:?}"),
        }
    }

    #[test]
    fn recovers_at_the_next_newline() {
        let (program, errors) = parse("5 5 5\nNOP\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Statement::Instruction { .. }));
    }
}
