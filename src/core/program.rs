// This module defines the result of one compilation: every per-function SSA
// context (main first), the module-level function table consulted at call
// sites, and the merged diagnostics of tiers one and two. The error-count
// query is the "did the phase succeed" contract the process boundary relies
// on; a nonzero count means the produced IR is not to be trusted, while fatal
// errors never reach a Program at all.

//! Compilation results.

use std::collections::HashMap;

use super::context::SsaContext;
use super::error::{Diagnostic, Severity};
use super::instr::ValueNum;
use super::symbols::SymId;

/// Module-level record of one declared function, looked up at every call
/// site.
#[derive(Debug, Clone, Copy)]
pub struct FunctionInfo {
    /// Value number of the function's first instruction (the Jump target).
    pub entry: ValueNum,
    pub params: u64,
    pub is_void: bool,
}

/// The finished compilation: main plus one context per declared function.
#[derive(Debug)]
pub struct Program {
    contexts: Vec<SsaContext>,
    functions: HashMap<SymId, FunctionInfo>,
    diags: Vec<Diagnostic>,
}

impl Program {
    pub(crate) fn new(
        contexts: Vec<SsaContext>,
        functions: HashMap<SymId, FunctionInfo>,
        diags: Vec<Diagnostic>,
    ) -> Self {
        Self {
            contexts,
            functions,
            diags,
        }
    }

    /// The main program's context.
    pub fn main(&self) -> &SsaContext {
        &self.contexts[0]
    }

    /// All contexts, main first, declared functions in declaration order.
    pub fn contexts(&self) -> impl Iterator<Item = &SsaContext> {
        self.contexts.iter()
    }

    pub fn context_named(&self, name: &str) -> Option<&SsaContext> {
        self.contexts.iter().find(|c| c.name() == name)
    }

    pub fn functions(&self) -> &HashMap<SymId, FunctionInfo> {
        &self.functions
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diags
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Count of recoverable errors. Zero means the parse phase succeeded and
    /// the IR can be trusted.
    pub fn error_count(&self) -> usize {
        self.diags
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Stable textual rendering of every context's block graph.
    pub fn dump(&self) -> String {
        crate::render::dump::render(self)
    }
}
