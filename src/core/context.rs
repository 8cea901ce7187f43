// This module implements the SSA construction context, one per function. The
// context owns the block arena, the operand evaluation stack, the symbol
// table, the join stack and the value-numbering tables, and exposes the
// operations the grammar driver calls in lockstep with parsing: constant and
// instruction placement with CSE, symbol binding with pending-phi updates,
// phi seeding/resolution/commit with trivial-phi collapse and transitive
// operand propagation, and conditional-branch back-patching. Value numbers
// and block display ids come from a Counters handle shared by every context
// of one compilation, so numbers are globally unique and monotonic, which the
// cross-function Jump targets rely on.

//! Per-function SSA construction state and operations.

use std::cell::Cell;
use std::rc::Rc;

use super::block::{Block, BlockId};
use super::error::{CompileError, CompileResult, Diagnostic};
use super::instr::{Instr, Opcode, ValueNum};
use super::join::JoinNode;
use super::symbols::{SymId, SymbolTable};
use super::vnum::ValueTable;

/// Instruction-number and block-id counters shared across every context of
/// one compilation. Held behind `Rc` by each context; never process-global.
#[derive(Debug, Default)]
pub struct Counters {
    instrs: Cell<u64>,
    blocks: Cell<u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_instr(&self) -> u64 {
        let n = self.instrs.get();
        self.instrs.set(n + 1);
        n
    }

    fn next_block(&self) -> u64 {
        let n = self.blocks.get();
        self.blocks.set(n + 1);
        n
    }
}

/// SSA construction state for one function.
#[derive(Debug)]
pub struct SsaContext {
    name: String,
    counters: Rc<Counters>,
    blocks: Vec<Block>,
    entry: BlockId,
    current: BlockId,
    stack: Vec<ValueNum>,
    symbols: SymbolTable,
    joins: Vec<JoinNode>,
    values: ValueTable,
    last_value: ValueNum,
    diags: Vec<Diagnostic>,
}

impl SsaContext {
    pub fn new(name: impl Into<String>, counters: Rc<Counters>) -> Self {
        let entry = Block::new(counters.next_block());
        log::debug!("created BB{}", entry.id);
        Self {
            name: name.into(),
            counters,
            blocks: vec![entry],
            entry: BlockId(0),
            current: BlockId(0),
            stack: Vec::new(),
            symbols: SymbolTable::new(),
            joins: Vec::new(),
            values: ValueTable::new(),
            last_value: 0,
            diags: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ---- block graph ----------------------------------------------------

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn entry_block(&self) -> &Block {
        &self.blocks[self.entry.0]
    }

    pub fn current(&self) -> BlockId {
        self.current
    }

    pub fn set_current(&mut self, id: BlockId) {
        self.current = id;
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    /// Blocks in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    fn alloc_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        let block = Block::new(self.counters.next_block());
        log::debug!("created BB{}", block.id);
        self.blocks.push(block);
        id
    }

    /// Create a new block, link it as successor of the current block on the
    /// requested side, and make it current.
    pub fn open_block(&mut self, fallthrough: bool) -> BlockId {
        let id = self.alloc_block();
        let prev = self.current;
        self.blocks[id.0].pred = Some(prev);
        if fallthrough {
            self.blocks[prev.0].fallthrough = Some(id);
        } else {
            self.blocks[prev.0].branch = Some(id);
        }
        self.current = id;
        id
    }

    /// Create a detached block (an if construct's merge block is linked only
    /// once both arms are known).
    pub fn new_block(&mut self) -> BlockId {
        self.alloc_block()
    }

    /// Move "current" back to the primary predecessor without creating a
    /// block; returns the block that was current.
    pub fn reverse_to_predecessor(&mut self) -> BlockId {
        let prev = self.current;
        if let Some(p) = self.blocks[prev.0].pred {
            self.current = p;
        }
        prev
    }

    /// Value number of the first instruction of `id`, if any.
    pub fn first_instr_num(&self, id: BlockId) -> Option<ValueNum> {
        self.blocks[id.0].first_instr().map(|i| i.num)
    }

    /// Last instruction of the current block.
    pub fn last_instr(&self) -> Option<&Instr> {
        self.blocks[self.current.0].last_instr()
    }

    // ---- operand stack --------------------------------------------------

    pub fn push_value(&mut self, value: ValueNum) {
        self.stack.push(value);
    }

    pub fn pop_value(&mut self) -> Option<ValueNum> {
        self.stack.pop()
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Statement-level calls and returns discard their results.
    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Value number of the most recently placed (or CSE-reused) instruction.
    pub fn last_value(&self) -> ValueNum {
        self.last_value
    }

    /// Pop an operand. Underflow is reachable only after counted syntax
    /// errors; it degrades to constant 0 and records a tier-1 diagnostic.
    fn pop_or_zero(&mut self) -> ValueNum {
        if let Some(v) = self.stack.pop() {
            return v;
        }
        log::error!("operand stack underflow in '{}'", self.name);
        self.diags
            .push(Diagnostic::error("operand stack underflow; using constant 0"));
        self.const_value(0)
    }

    // ---- instruction placement ------------------------------------------

    /// Materialize a constant without pushing it.
    fn const_value(&mut self, literal: u64) -> ValueNum {
        if let Some(num) = self.values.lookup_const(literal) {
            self.last_value = num;
            return num;
        }
        let num = self.counters.next_instr();
        // Constants live in the entry block, which dominates everything.
        self.blocks[self.entry.0].push_back(Instr::new(num, Opcode::Const, Some(literal), None));
        self.values.insert_const(literal, num);
        self.last_value = num;
        num
    }

    /// Define (or reuse) an SSA value for a literal and push it.
    pub fn add_const(&mut self, literal: u64) -> ValueNum {
        let num = self.const_value(literal);
        self.stack.push(num);
        num
    }

    /// Build one instruction of the given opcode from the operand stack,
    /// perform the CSE lookup for arithmetic, place it in the current block
    /// and push its result where the opcode produces one. Returns the value
    /// number placed or reused.
    pub fn add_instr(&mut self, op: Opcode) -> CompileResult<ValueNum> {
        let (x, y) = match op {
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Cmp => {
                let y = self.pop_or_zero();
                let x = self.pop_or_zero();
                (Some(x), Some(y))
            }
            Opcode::SetParam => {
                let y = self.pop_or_zero();
                let x = self.pop_or_zero();
                (Some(x), Some(y))
            }
            Opcode::Write | Opcode::GetParam | Opcode::Jump => (Some(self.pop_or_zero()), None),
            // Conditional branches carry the comparison; the target is
            // back-patched once the destination block exists.
            Opcode::BranchNotEqual
            | Opcode::BranchEqual
            | Opcode::BranchLessOrEqual
            | Opcode::BranchLess
            | Opcode::BranchGreaterOrEqual
            | Opcode::BranchGreater => (Some(self.pop_or_zero()), None),
            Opcode::UnconditionalBranch => (None, Some(self.pop_or_zero())),
            Opcode::Read | Opcode::WriteNewline | Opcode::Placeholder => (None, None),
            Opcode::Return => (self.stack.pop(), None),
            Opcode::Const | Opcode::Phi => {
                return Err(CompileError::Inconsistent {
                    reason: format!("{op:?} cannot be emitted through add_instr"),
                })
            }
        };

        if op.is_cacheable() {
            let candidate = Instr::new(0, op, x, y);
            if let Some(prev) = self.values.lookup_expr(&candidate) {
                log::trace!("cse hit: {} {:?} {:?} -> {}", op.mnemonic(), x, y, prev);
                self.last_value = prev;
                self.stack.push(prev);
                return Ok(prev);
            }
        }

        let num = self.counters.next_instr();
        let instr = Instr::new(num, op, x, y);
        if op.is_cacheable() {
            self.values.insert_expr(&instr);
        }
        self.blocks[self.current.0].push_back(instr);
        self.last_value = num;

        if matches!(
            op,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Cmp
                | Opcode::Read
                | Opcode::GetParam
        ) {
            self.stack.push(num);
        }
        Ok(num)
    }

    // ---- symbols ---------------------------------------------------------

    /// Introduce a fresh binding (variable declaration or parameter).
    pub fn declare_symbol(&mut self, id: SymId, name: &str, value: Option<ValueNum>) {
        self.symbols.declare(id, name, value);
    }

    pub fn symbol_value(&self, id: SymId) -> Option<ValueNum> {
        self.symbols.get(id).and_then(|s| s.value)
    }

    /// Pop the top of the operand stack and bind it to `id`. Inside an open
    /// join arm the symbol's pending phi is updated as well; a missing phi
    /// there is an internal-consistency error, since every symbol in scope is
    /// seeded before either arm is entered.
    pub fn set_symbol(&mut self, id: SymId, name: &str) -> CompileResult<()> {
        let value = self.pop_or_zero();
        if self.symbols.get(id).is_none() {
            return Err(CompileError::UnknownSymbol { name: name.to_string() });
        }
        log::debug!("binding {name} = {value}");

        let pending = self
            .joins
            .last()
            .and_then(|j| j.branch_side.map(|side| (j.merge, side, j.phis.get(&id).copied())));
        if let Some((merge, side, phi)) = pending {
            let Some(phi_num) = phi else {
                return Err(CompileError::Inconsistent {
                    reason: format!("no pending phi for symbol '{name}' inside an open join"),
                });
            };
            self.write_phi_operand(merge, phi_num, side, value)?;
        }

        self.symbols.bind(id, Some(value));
        Ok(())
    }

    /// Update one side of a pending phi. Assignments on the true side write
    /// `x`; on the false side they write `y`, and the first one also fills a
    /// still-unset `x` so a single-arm construct merges against the incoming
    /// value.
    fn write_phi_operand(
        &mut self,
        merge: BlockId,
        phi_num: ValueNum,
        side: bool,
        value: ValueNum,
    ) -> CompileResult<()> {
        let phi = self.blocks[merge.0].instr_mut(phi_num).ok_or_else(|| {
            CompileError::Inconsistent {
                reason: format!("pending phi {phi_num} missing from its merge block"),
            }
        })?;
        if side {
            phi.x = Some(value);
        } else {
            if phi.x.is_none() {
                phi.x = Some(value);
            }
            phi.y = Some(value);
        }
        log::trace!("phi {} <- ({:?}) ({:?})", phi_num, phi.x, phi.y);
        Ok(())
    }

    /// Push the symbol's current value. The three intrinsic identifiers emit
    /// their instruction directly; an unset user symbol materializes constant
    /// zero, binds it, and records an uninitialized-read warning once.
    pub fn resolve_symbol(&mut self, id: SymId, name: &str) -> CompileResult<()> {
        match id {
            super::symbols::SYM_INPUT_NUM => {
                self.add_instr(Opcode::Read)?;
            }
            super::symbols::SYM_OUTPUT_NUM => {
                self.add_instr(Opcode::Write)?;
            }
            super::symbols::SYM_OUTPUT_NL => {
                self.add_instr(Opcode::WriteNewline)?;
            }
            _ => {
                let sym = self.symbols.get(id).ok_or_else(|| CompileError::UnknownSymbol {
                    name: name.to_string(),
                })?;
                match sym.value {
                    Some(v) => self.stack.push(v),
                    None => {
                        let sym_name = sym.name.clone();
                        log::warn!("read of uninitialized variable '{sym_name}'");
                        self.diags.push(Diagnostic::warning(format!(
                            "read of uninitialized variable '{sym_name}'"
                        )));
                        let num = self.add_const(0);
                        self.symbols.bind(id, Some(num));
                    }
                }
            }
        }
        Ok(())
    }

    /// Restore bindings captured by [`seed_phis`](Self::seed_phis) (used
    /// before lowering an else-arm).
    pub fn restore_symbols(&mut self, old: &[(SymId, Option<ValueNum>)]) {
        for (id, value) in old {
            self.symbols.bind(*id, *value);
        }
    }

    // ---- joins and phis --------------------------------------------------

    /// Pre-seed a trivial phi for every user symbol in scope at the front of
    /// the join's merge block, both operands initialized to the pre-branch
    /// value. Returns the pre-branch bindings for later restoration.
    pub fn seed_phis(&mut self, join: &mut JoinNode) -> Vec<(SymId, Option<ValueNum>)> {
        let live: Vec<(SymId, Option<ValueNum>)> = self
            .symbols
            .user_symbols()
            .map(|(id, sym)| (id, sym.value))
            .collect();
        for (id, value) in &live {
            let num = self.counters.next_instr();
            self.blocks[join.merge.0].push_front(Instr::new(num, Opcode::Phi, *value, *value));
            join.phis.insert(*id, num);
            log::trace!("seeded phi {} for symbol {} in BB{}", num, id, self.blocks[join.merge.0].id);
        }
        live
    }

    pub fn push_join(&mut self, join: JoinNode) {
        self.joins.push(join);
    }

    pub fn pop_join(&mut self) -> Option<JoinNode> {
        self.joins.pop()
    }

    /// Mark which arm of the innermost construct is being lowered.
    pub fn set_branch_side(&mut self, side: Option<bool>) {
        if let Some(join) = self.joins.last_mut() {
            join.branch_side = side;
        }
    }

    /// Record the Cmp feeding the innermost while's branch.
    pub fn set_loop_condition(&mut self, num: ValueNum) {
        if let Some(join) = self.joins.last_mut() {
            join.loop_condition = Some(num);
        }
    }

    /// Restore the symbol table from the innermost join's phi set, so code
    /// after (or, for a loop, inside) the merge reads through the phis.
    pub fn resolve_phi(&mut self) {
        let phis: Vec<(SymId, ValueNum)> = self
            .joins
            .last()
            .map(|j| j.phis.iter().map(|(id, num)| (*id, *num)).collect())
            .unwrap_or_default();
        for (id, num) in phis {
            self.symbols.bind(id, Some(num));
        }
    }

    /// Inspect every pending phi of the innermost join: collapse
    /// self-referential operands, remove trivial phis and back-propagate
    /// their references through the whole block graph (transitively removing
    /// instructions the rewrite makes redundant), push results outward into
    /// an enclosing active join, and keep the merge block a valid branch
    /// target.
    pub fn commit_phi(&mut self) -> CompileResult<()> {
        let Some(top) = self.joins.last() else {
            return Err(CompileError::Inconsistent {
                reason: "commit_phi with no open join".to_string(),
            });
        };
        let merge = top.merge;
        let loop_condition = top.loop_condition;
        let phis: Vec<(SymId, ValueNum)> = top.phis.iter().map(|(id, num)| (*id, *num)).collect();
        let outer = if self.joins.len() >= 2 {
            let idx = self.joins.len() - 2;
            self.joins[idx].branch_side.map(|side| (idx, side))
        } else {
            None
        };

        for (id, phi_num) in phis {
            let phi = self.blocks[merge.0].instr(phi_num).copied().ok_or_else(|| {
                CompileError::Inconsistent {
                    reason: format!("pending phi {phi_num} missing at commit"),
                }
            })?;
            let mut x = phi.x;
            let mut y = phi.y;
            // A loop-carried no-op: one operand points back at the phi.
            if x == Some(phi_num) {
                x = y;
            }
            if y == Some(phi_num) {
                y = x;
            }

            let merged = if x == y {
                log::debug!("phi {} is trivial, collapsing to {:?}", phi_num, x);
                self.blocks[merge.0].remove_instr(phi_num);
                self.propagate(phi_num, x);
                self.symbols.bind(id, x);
                x
            } else {
                let instr = self.blocks[merge.0].instr_mut(phi_num).ok_or_else(|| {
                    CompileError::Inconsistent {
                        reason: format!("pending phi {phi_num} missing at commit"),
                    }
                })?;
                instr.x = x;
                instr.y = y;
                self.symbols.bind(id, Some(phi_num));
                Some(phi_num)
            };

            // Nested constructs fold into the enclosing join's own phis.
            if let (Some((outer_idx, side)), Some(value)) = (outer, merged) {
                let phi = self.joins[outer_idx].phis.get(&id).copied();
                if let Some(outer_phi) = phi {
                    let outer_merge = self.joins[outer_idx].merge;
                    self.write_phi_operand(outer_merge, outer_phi, side, value)?;
                }
            }
        }

        if self.blocks[merge.0].is_empty() {
            let num = self.counters.next_instr();
            self.blocks[merge.0].push_back(Instr::new(num, Opcode::Placeholder, None, None));
            self.last_value = num;
        }

        if let Some(cmp) = loop_condition {
            debug_assert!(
                self.blocks[merge.0].instr(cmp).is_some(),
                "loop condition vanished during phi commit"
            );
        }
        Ok(())
    }

    /// Rewrite every reference to `from` into `to`, across the whole block
    /// graph, the symbol table and the operand stack. Rewriting may make an
    /// arithmetic instruction identical to an already-cached one; such
    /// duplicates are removed and their own references propagated
    /// transitively.
    fn propagate(&mut self, from: ValueNum, to: Option<ValueNum>) {
        let mut worklist = vec![(from, to)];
        while let Some((from, to)) = worklist.pop() {
            log::trace!("propagating {} -> {:?}", from, to);
            self.symbols.rebind_all(from, to);
            if let Some(t) = to {
                for v in self.stack.iter_mut() {
                    if *v == from {
                        *v = t;
                    }
                }
            }

            let mut removals: Vec<(usize, ValueNum, ValueNum)> = Vec::new();
            let Self { blocks, values, .. } = self;
            for (bi, block) in blocks.iter_mut().enumerate() {
                for instr in block.instrs_mut() {
                    let hit_x = instr.op.x_is_ref() && instr.x == Some(from);
                    let hit_y = instr.op.y_is_ref() && instr.y == Some(from);
                    if !hit_x && !hit_y {
                        continue;
                    }
                    if instr.op.is_cacheable() {
                        values.forget_expr(instr);
                    }
                    if hit_x {
                        instr.x = to;
                    }
                    if hit_y {
                        instr.y = to;
                    }
                    if instr.op.is_cacheable() {
                        if let Some(prev) = values.reinsert_expr(instr) {
                            removals.push((bi, instr.num, prev));
                        }
                    }
                }
            }
            for (bi, num, prev) in removals {
                log::trace!("collapse duplicate {} into {}", num, prev);
                self.blocks[bi].remove_instr(num);
                worklist.push((num, Some(prev)));
            }
        }
    }

    // ---- branches ---------------------------------------------------------

    /// Patch the trailing unpatched conditional branch of `from` so its
    /// target equals the first instruction of `to`. The target block gets a
    /// placeholder first when it is still empty. A missing unpatched branch
    /// is reachable only after counted syntax errors and records a tier-1
    /// diagnostic.
    pub fn resolve_branch(&mut self, from: BlockId, to: BlockId) {
        if self.blocks[to.0].is_empty() {
            let num = self.counters.next_instr();
            self.blocks[to.0].push_back(Instr::new(num, Opcode::Placeholder, None, None));
        }
        let Some(target) = self.first_instr_num(to) else {
            return;
        };
        let from_id = self.blocks[from.0].id;
        let branch = self.blocks[from.0]
            .instrs_mut()
            .rev()
            .find(|i| i.op.is_conditional_branch() && i.y.is_none());
        match branch {
            Some(instr) => {
                instr.y = Some(target);
                log::debug!("patched branch {} in BB{} -> {}", instr.num, from_id, target);
            }
            None => {
                log::error!("no unpatched branch in BB{from_id}");
                self.diags.push(Diagnostic::error(format!(
                    "no unpatched branch in BB{from_id} to resolve"
                )));
            }
        }
    }

    // ---- diagnostics ------------------------------------------------------

    pub(crate) fn take_diags(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diags)
    }
}
