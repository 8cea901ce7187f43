// This module defines error types for the smplc compiler using the thiserror
// crate for idiomatic Rust error handling. CompileError is the fatal tier:
// unknown symbols, call arity mismatches, void/non-void call-context misuse,
// and internal SSA consistency violations that should be unreachable by
// construction. Each variant carries the context (symbol or function name,
// expected/actual counts, a reason string) needed for a useful message. The
// recoverable tiers are modeled separately as accumulated Diagnostic records
// with a severity, so syntax errors and semantic warnings ride along with the
// produced IR instead of aborting it.

//! Error types for the smplc compiler.
//!
//! Fatal errors use thiserror; recoverable syntax errors and warnings are
//! accumulated as [`Diagnostic`]s on the program.

use thiserror::Error;

/// Fatal compilation error. Aborts the whole compilation; no partial output
/// is considered valid.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("unknown symbol '{name}'")]
    UnknownSymbol { name: String },

    #[error("function '{name}' expects {expected} arguments but got {got}")]
    ArityMismatch {
        name: String,
        expected: u64,
        got: usize,
    },

    #[error("void function '{name}' used in an expression")]
    VoidInExpression { name: String },

    #[error("non-void function '{name}' called as a statement")]
    ValueInStatement { name: String },

    #[error("inconsistent SSA state: {reason}")]
    Inconsistent { reason: String },
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Severity of an accumulated diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Semantic warning; compilation continues and the IR stays valid.
    Warning,
    /// Recoverable error; compilation continues but the IR is not to be
    /// trusted while the program's error count is nonzero.
    Error,
}

/// A recoverable diagnostic accumulated alongside the IR.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}
