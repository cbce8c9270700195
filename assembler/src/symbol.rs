//! Symbol table and forward-reference bookkeeping, grounded on
//! `examples/original_source/src/assembler/assembler.hpp`'s `Symbol` and
//! `ForwardRef` structs.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Symbol {
    pub address: u32,
    pub defined: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForwardRef {
    pub site: u32,
    pub symbol: String,
    pub width: usize,
    pub relative: bool,
}

#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, address: u32) -> Result<(), ()> {
        if self.symbols.contains_key(name) {
            return Err(());
        }
        self.symbols.insert(
            name.to_string(),
            Symbol {
                address,
                defined: true,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).copied()
    }
}
