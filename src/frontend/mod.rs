// This module contains the compiler frontend: the tokenizer that converts
// source characters into a finite token stream with lookahead-1 semantics, and
// the recursive-descent grammar driver that walks that stream and calls into
// the SSA engine in grammar order. The engine never calls back up; everything
// here is strictly a client of core.

//! Frontend: tokenizer and grammar driver.

pub mod parser;
pub mod token;

pub use parser::Parser;
pub use token::{Token, TokenKind, TokenList};
