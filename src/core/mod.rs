// This module is the hub for the SSA construction engine. It organizes the
// leaf data types (instructions, blocks, value-numbering tables, symbol table,
// join nodes), the per-function SsaContext that orchestrates them, and the
// Program result type holding every context plus the module-level function
// table. The engine is driven online by the grammar driver in frontend::parser
// and never initiates parsing itself; all cross-context state (value-number
// and block-id counters) lives in an explicitly shared Counters handle rather
// than process-wide statics, keeping each context independently testable.

//! Core SSA construction engine.
//!
//! # Key Components
//!
//! ## Instructions (`instr`)
//! - Closed opcode set, commutative value equality, cacheability
//!
//! ## Basic Blocks (`block`)
//! - Arena-allocated blocks with index-based CFG links
//! - Front-insertion for phis, appends for ordinary instructions
//!
//! ## Value Numbering (`vnum`)
//! - Per-context expression and constant caches for local CSE
//!
//! ## Symbols (`symbols`)
//! - Identifier id to current-value bindings, intrinsic ids reserved
//!
//! ## Joins (`join`)
//! - One JoinNode per open if/while construct, kept on an explicit stack
//!
//! ## Context (`context`)
//! - One SsaContext per function: block graph, operand stack, join stack,
//!   caches, diagnostics, and every operation the driver calls

pub mod block;
pub mod context;
pub mod error;
pub mod instr;
pub mod join;
pub mod program;
pub mod symbols;
pub mod vnum;

// Re-export core components
pub use block::{Block, BlockId};
pub use context::{Counters, SsaContext};
pub use error::{CompileError, CompileResult, Diagnostic, Severity};
pub use instr::{Instr, Opcode, ValueNum};
pub use join::JoinNode;
pub use program::{FunctionInfo, Program};
pub use symbols::{Symbol, SymbolTable, SYM_INPUT_NUM, SYM_OUTPUT_NL, SYM_OUTPUT_NUM};
pub use vnum::ValueTable;
