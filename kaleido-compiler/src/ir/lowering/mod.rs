//! AST to IR lowering.
//!
//! This module translates the parsed AST into an SSA module: structured
//! control flow becomes explicit basic blocks and branches, and mutable
//! variables become entry-block stack slots that the backend is expected to
//! promote to registers.

pub mod context;
pub mod expr;
pub mod item;

pub use context::Lower;

use crate::ast::Sequence;
use crate::ir::Module;
use crate::CompileError;

/// Lower a whole program. The sequence is taken mutably because top-level
/// expressions are rewritten in place into anonymous functions.
pub fn lower(root: &mut Sequence, module_name: &str, source: &str) -> Result<Module, CompileError> {
    let mut lower = Lower::new(module_name, source, false);
    lower.lower_sequence(root, 0)?;
    Ok(lower.finish())
}
