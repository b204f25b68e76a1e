//! User-authored scoring formulas.
//!
//! A formula is a small imperative program with a required
//! `calculateScore(ctx)` entry point. Source is lexed, scanned against a
//! denylist, parsed, and compiled to stack bytecode; the bytecode runs in
//! a fuel-metered VM against an immutable board snapshot. There is no
//! dynamic evaluation and no host binding beyond the context object.

mod ast;
mod compiler;
mod context;
mod lexer;
mod parser;
mod validate;
mod vm;

pub use compiler::{CompiledFormula, DEFAULT_MAX_OPS, ENTRY_POINT, compile_formula};
pub(crate) use compiler::Program;
pub(crate) use context::Snapshot;
pub(crate) use vm::{Value, run};
