// This module maps source variable identifiers to their current defining SSA
// value. Identifier ids are the small dense integers handed out by the lexer's
// naming side-table; the first three are reserved for the I/O intrinsics and
// never hold storage. A BTreeMap keeps iteration deterministic, which matters
// because phi seeding walks the table and assigns value numbers in that order.
// The invariant carried here: a bound value either is unset or refers to an
// instruction that dominates every future read of the symbol in the region
// currently being built.

//! Symbol-to-value bindings.

use std::collections::BTreeMap;

use super::instr::ValueNum;

/// Identifier id assigned by the lexer's naming side-table.
pub type SymId = u64;

/// Read one integer from input.
pub const SYM_INPUT_NUM: SymId = 0;
/// Write one integer to output.
pub const SYM_OUTPUT_NUM: SymId = 1;
/// Write a newline to output.
pub const SYM_OUTPUT_NL: SymId = 2;

const INTRINSIC_COUNT: SymId = 3;

/// One declared symbol: display name plus current defining value.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub value: Option<ValueNum>,
}

/// Per-context symbol table.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: BTreeMap<SymId, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut symbols = BTreeMap::new();
        symbols.insert(
            SYM_INPUT_NUM,
            Symbol { name: "InputNum".into(), value: None },
        );
        symbols.insert(
            SYM_OUTPUT_NUM,
            Symbol { name: "OutputNum".into(), value: None },
        );
        symbols.insert(
            SYM_OUTPUT_NL,
            Symbol { name: "OutputNewLine".into(), value: None },
        );
        Self { symbols }
    }

    pub fn is_intrinsic(id: SymId) -> bool {
        id < INTRINSIC_COUNT
    }

    /// Introduce a fresh binding (variable declaration or parameter).
    pub fn declare(&mut self, id: SymId, name: &str, value: Option<ValueNum>) {
        self.symbols.insert(
            id,
            Symbol { name: name.to_string(), value },
        );
    }

    pub fn get(&self, id: SymId) -> Option<&Symbol> {
        self.symbols.get(&id)
    }

    /// Bind `id` to `value`. Returns false when the symbol was never
    /// declared.
    pub fn bind(&mut self, id: SymId, value: Option<ValueNum>) -> bool {
        match self.symbols.get_mut(&id) {
            Some(sym) => {
                sym.value = value;
                true
            }
            None => false,
        }
    }

    /// User-declared symbols in deterministic id order.
    pub fn user_symbols(&self) -> impl Iterator<Item = (SymId, &Symbol)> {
        self.symbols
            .iter()
            .filter(|(id, _)| !Self::is_intrinsic(**id))
            .map(|(id, sym)| (*id, sym))
    }

    /// Rewrite every binding of `from` to `to` (phi collapse propagation).
    pub(crate) fn rebind_all(&mut self, from: ValueNum, to: Option<ValueNum>) {
        for sym in self.symbols.values_mut() {
            if sym.value == Some(from) {
                sym.value = to;
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
