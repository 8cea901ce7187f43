// This module holds the read-only output surfaces consumed after parsing
// completes: a textual tree dump of each function's block graph and a
// Graphviz export. Both walk the finished structure without mutating it and
// both are deterministic for a fixed source, so either format can be diffed
// across runs or reimplementations.

//! Read-only renderers for the finished block graph.

pub mod dot;
pub mod dump;
