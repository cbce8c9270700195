//! The program tree, grounded on
//! `examples/original_source/src/assembler/ast.hpp`'s `Program`/`Statement`/
//! `Expression` hierarchy, generalized from its `unique_ptr`-owned class tree
//! onto plain Rust enums (no virtual dispatch needed once there is no
//! inheritance to model).

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Label {
        name: String,
        line: usize,
        column: usize,
    },
    Instruction {
        mnemonic: String,
        operands: Vec<Expression>,
        line: usize,
        column: usize,
    },
    Directive {
        name: String,
        arguments: Vec<Expression>,
        line: usize,
        column: usize,
    },
}

impl Statement {
    pub fn line(&self) -> usize {
        match self {
            Statement::Label { line, .. }
            | Statement::Instruction { line, .. }
            | Statement::Directive { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Statement::Label { column, .. }
            | Statement::Instruction { column, .. }
            | Statement::Directive { column, .. } => *column,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Register {
        name: String,
        line: usize,
        column: usize,
    },
    Immediate {
        value: i64,
        line: usize,
        column: usize,
    },
    Identifier {
        name: String,
        line: usize,
        column: usize,
    },
    StringLiteral {
        value: String,
        line: usize,
        column: usize,
    },
    MemoryRef {
        base: Box<Expression>,
        offset: Option<Box<Expression>>,
        line: usize,
        column: usize,
    },
}

impl Expression {
    pub fn line(&self) -> usize {
        match self {
            Expression::Register { line, .. }
            | Expression::Immediate { line, .. }
            | Expression::Identifier { line, .. }
            | Expression::StringLiteral { line, .. }
            | Expression::MemoryRef { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Expression::Register { column, .. }
            | Expression::Immediate { column, .. }
            | Expression::Identifier { column, .. }
            | Expression::StringLiteral { column, .. }
            | Expression::MemoryRef { column, .. } => *column,
        }
    }
}
