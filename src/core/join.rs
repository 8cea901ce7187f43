// This module defines the bookkeeping record for one open if/while construct.
// JoinNodes live on an explicit stack owned by the SsaContext, innermost last,
// so phi simplification can walk inner to outer deterministically instead of
// hiding the nesting in call-stack locals. The pending-phi map uses a BTreeMap
// for the same determinism reason as the symbol table: commit order decides
// which propagation runs first.

//! Join nodes: per-construct phi tracking.

use std::collections::BTreeMap;

use super::block::BlockId;
use super::instr::ValueNum;
use super::symbols::SymId;

/// Bookkeeping for one open if/while construct.
///
/// `branch_side` is `Some(true)` while the then-arm or loop body side of the
/// construct is being lowered, `Some(false)` for the else/exit side, and
/// `None` outside either arm. `loop_condition` is set for while-joins only
/// and references the Cmp feeding the loop's conditional branch.
#[derive(Debug, Clone)]
pub struct JoinNode {
    pub merge: BlockId,
    pub branch_side: Option<bool>,
    pub phis: BTreeMap<SymId, ValueNum>,
    pub loop_condition: Option<ValueNum>,
}

impl JoinNode {
    pub fn new(merge: BlockId) -> Self {
        Self {
            merge,
            branch_side: None,
            phis: BTreeMap::new(),
            loop_condition: None,
        }
    }
}
