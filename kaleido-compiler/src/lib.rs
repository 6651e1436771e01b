pub mod ast;
pub mod frontend;
pub mod ir;
pub mod span;

use thiserror::Error;

/// Which category of semantic error the lowering pass detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    UnknownVariable,
    RedefinedVariable,
    UnknownFunction,
    ArityMismatch,
    RedefinedFunction,
    VerifierFailure,
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error: {0}")]
    Lexical(#[from] frontend::lexer::LexicalError),

    #[error("Parse error at Ln {line} Col {col}: {message}")]
    Parse {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("Error at Ln {line} Col {col}: {message}")]
    Semantic {
        kind: SemanticErrorKind,
        line: usize,
        col: usize,
        message: String,
    },
}

/// Debug trace switches threaded through the pipeline. All traces go to
/// stderr and their format is not a stable interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub trace_lowering: bool,
    pub trace_parser: bool,
    pub trace_scanner: bool,
}

/// Compile a source text into an IR module, or stop at the first error.
pub fn compile_to_ir(source: &str) -> Result<ir::Module, CompileError> {
    compile_to_ir_with(source, &CompileOptions::default())
}

pub fn compile_to_ir_with(
    source: &str,
    options: &CompileOptions,
) -> Result<ir::Module, CompileError> {
    let mut root = ast::parse_to_ast_with(source, options)?;
    let mut lower = ir::lowering::Lower::new("Kaleidoscope", source, options.trace_lowering);
    if let Some(root) = root.as_deref_mut() {
        lower.lower_sequence(root, 0)?;
    }
    Ok(lower.finish())
}
