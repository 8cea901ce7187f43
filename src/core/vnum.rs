// This module holds the two value-numbering tables of one SSA context: the
// expression cache, keyed by opcode plus the unordered operand pair, and the
// constant cache keyed by literal. Keys are explicit structs rather than the
// instructions themselves so the phi-propagation walk can drop an entry before
// mutating an instruction's operands and re-insert the rewritten form, where a
// key collision is exactly the "two now-identical instructions" condition that
// triggers a transitive collapse. Both caches are scoped to one context; there
// is no cross-function sharing.

//! Value-numbering tables for local CSE.

use std::collections::HashMap;

use super::instr::{Instr, Opcode, ValueNum};

/// Cache key: opcode plus operand pair normalized for commutativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprKey {
    op: Opcode,
    a: Option<ValueNum>,
    b: Option<ValueNum>,
}

impl ExprKey {
    /// Build the normalized key for a cacheable instruction.
    pub fn of(instr: &Instr) -> Self {
        debug_assert!(instr.op.is_cacheable());
        let (a, b) = if instr.x <= instr.y {
            (instr.x, instr.y)
        } else {
            (instr.y, instr.x)
        };
        Self { op: instr.op, a, b }
    }
}

/// Expression and constant caches of one SSA context.
#[derive(Debug, Default)]
pub struct ValueTable {
    expressions: HashMap<ExprKey, ValueNum>,
    constants: HashMap<u64, ValueNum>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an equal, earlier-placed expression.
    pub fn lookup_expr(&self, instr: &Instr) -> Option<ValueNum> {
        self.expressions.get(&ExprKey::of(instr)).copied()
    }

    pub fn insert_expr(&mut self, instr: &Instr) {
        self.expressions.insert(ExprKey::of(instr), instr.num);
    }

    /// Drop the cache entry for `instr` if it is the cached instance. Called
    /// before propagation mutates its operands.
    pub fn forget_expr(&mut self, instr: &Instr) {
        let key = ExprKey::of(instr);
        if self.expressions.get(&key) == Some(&instr.num) {
            self.expressions.remove(&key);
        }
    }

    /// Re-insert a rewritten expression. On a collision with a different
    /// value number the existing entry wins and is returned: the caller must
    /// remove the rewritten instruction and propagate its references.
    pub fn reinsert_expr(&mut self, instr: &Instr) -> Option<ValueNum> {
        let key = ExprKey::of(instr);
        match self.expressions.get(&key) {
            Some(&prev) if prev != instr.num => Some(prev),
            _ => {
                self.expressions.insert(key, instr.num);
                None
            }
        }
    }

    pub fn lookup_const(&self, literal: u64) -> Option<ValueNum> {
        self.constants.get(&literal).copied()
    }

    pub fn insert_const(&mut self, literal: u64, num: ValueNum) {
        self.constants.insert(literal, num);
    }
}
