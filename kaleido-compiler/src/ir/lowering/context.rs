use crate::ir::{
    BlockId, CmpPred, Function, Inst, InstKind, Module, Operand, Terminator, ValueId,
};
use crate::span::{SourceIndex, Span};
use crate::{CompileError, SemanticErrorKind};
use std::collections::HashMap;

/// Compilation context threaded through every lowering step: the module
/// under construction, the insertion point, the variable scope and the
/// anonymous-function counter.
pub struct Lower {
    pub module: Module,
    source_index: SourceIndex,
    cur_func: Option<usize>,
    cur_block: Option<BlockId>,
    /// Flat name-to-slot map. One frame per function: cleared on function
    /// entry, never popped when a `var` body or loop ends.
    scope: HashMap<String, ValueId>,
    anon_counter: usize,
    trace: bool,
}

impl Lower {
    pub fn new(module_name: &str, source: &str, trace: bool) -> Self {
        Self {
            module: Module::new(module_name),
            source_index: SourceIndex::new(source),
            cur_func: None,
            cur_block: None,
            scope: HashMap::new(),
            anon_counter: 0,
            trace,
        }
    }

    pub fn finish(self) -> Module {
        self.module
    }

    pub fn make_error(
        &self,
        kind: SemanticErrorKind,
        span: Span,
        message: String,
    ) -> CompileError {
        let (line, col) = self.source_index.to_line_col(span.start);
        CompileError::Semantic {
            kind,
            line: line + 1,
            col: col + 1,
            message,
        }
    }

    /// Next id for naming an anonymous top-level expression function.
    pub fn next_anon_id(&mut self) -> usize {
        let id = self.anon_counter;
        self.anon_counter += 1;
        id
    }

    pub fn dbglog(&self, construct: &str, detail: &str, depth: usize, span: Span) {
        if !self.trace {
            return;
        }
        let (bl, bc) = self.source_index.to_line_col(span.start);
        let (el, ec) = self.source_index.to_line_col(span.end);
        let marker = "'".repeat(depth);
        if detail.is_empty() {
            eprintln!(
                "{}[{}]  From {{{}, {}}} to {{{}, {}}}",
                marker,
                construct,
                bl + 1,
                bc + 1,
                el + 1,
                ec + 1
            );
        } else {
            eprintln!(
                "{}[{} \"{}\"]  From {{{}, {}}} to {{{}, {}}}",
                marker,
                construct,
                detail,
                bl + 1,
                bc + 1,
                el + 1,
                ec + 1
            );
        }
    }

    // ── Insertion point ──────────────────────────────────────────────────

    pub fn set_current_function(&mut self, index: usize) {
        self.cur_func = Some(index);
        self.cur_block = None;
    }

    fn func_mut(&mut self) -> &mut Function {
        let index = self.cur_func.expect("no current function");
        &mut self.module.functions[index]
    }

    /// The block instructions are currently emitted into. Callers that need
    /// "the block my children ended in" must re-read this after lowering
    /// them, since children may move the insertion point.
    pub fn insert_block(&self) -> BlockId {
        self.cur_block.expect("no insertion block")
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.cur_block = Some(block);
    }

    pub fn create_block(&mut self, name: &str) -> BlockId {
        self.func_mut().create_block(name)
    }

    pub fn append_block(&mut self, block: BlockId) {
        self.func_mut().append_block(block);
    }

    // ── Emission ─────────────────────────────────────────────────────────

    pub fn emit(&mut self, kind: InstKind) -> Operand {
        let block = self.insert_block();
        let func = self.func_mut();
        let id = func.fresh_value();
        func.block_mut(block).insts.push(Inst {
            result: Some(id),
            kind,
        });
        Operand::Value(id)
    }

    pub fn emit_void(&mut self, kind: InstKind) {
        let block = self.insert_block();
        let func = self.func_mut();
        func.block_mut(block).insts.push(Inst { result: None, kind });
    }

    pub fn terminate(&mut self, term: Terminator) {
        let block = self.insert_block();
        let block = self.func_mut().block_mut(block);
        debug_assert!(block.terminator.is_none(), "block already terminated");
        block.terminator = Some(term);
    }

    /// Reserve a slot at the front of the entry block, so slots always
    /// precede the stores that initialise them.
    pub fn entry_alloca(&mut self, name: &str) -> ValueId {
        let func = self.func_mut();
        let id = func.fresh_value();
        let display = func.uniquify(name);
        let entry = func.entry().expect("function has no entry block");
        func.block_mut(entry).insts.insert(
            0,
            Inst {
                result: Some(id),
                kind: InstKind::Alloca { name: display },
            },
        );
        id
    }

    // ── Variable scope ───────────────────────────────────────────────────

    pub fn clear_scope(&mut self) {
        self.scope.clear();
    }

    /// Allocate a slot for `name`, optionally store an initial value into
    /// it, and install the binding. Fails if the name is already bound.
    pub fn define_var(
        &mut self,
        name: &str,
        span: Span,
        init: Option<Operand>,
    ) -> Result<ValueId, CompileError> {
        if self.scope.contains_key(name) {
            return Err(self.make_error(
                SemanticErrorKind::RedefinedVariable,
                span,
                format!("Redefinition of variable {name}"),
            ));
        }
        let slot = self.entry_alloca(name);
        self.scope.insert(name.to_string(), slot);
        if let Some(value) = init {
            self.emit_void(InstKind::Store { slot, value });
        }
        Ok(slot)
    }

    pub fn lookup_var(&self, name: &str, span: Span) -> Result<ValueId, CompileError> {
        self.scope.get(name).copied().ok_or_else(|| {
            self.make_error(
                SemanticErrorKind::UnknownVariable,
                span,
                format!("Unknown variable name: {name}"),
            )
        })
    }

    // ── Truth values ─────────────────────────────────────────────────────

    /// Normalise a double to an i1: ordered-not-equal against 0.0, so NaN
    /// is falsy.
    pub fn double_to_bool(&mut self, value: Operand) -> Operand {
        self.emit(InstKind::FCmp {
            pred: CmpPred::One,
            lhs: value,
            rhs: Operand::Const(0.0),
        })
    }

    /// Widen an i1 back to 1.0 / 0.0.
    pub fn bool_to_double(&mut self, value: Operand) -> Operand {
        self.emit(InstKind::UiToFp { operand: value })
    }
}
