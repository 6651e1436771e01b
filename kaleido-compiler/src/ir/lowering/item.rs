use super::context::Lower;
use crate::ast::{FunctionDef, Item, Prototype, Sequence};
use crate::ir::{verify, Function, Operand, Terminator};
use crate::span::Span;
use crate::{CompileError, SemanticErrorKind};

impl Lower {
    /// Lower every top-level item in order. Bare expressions are first
    /// rewritten in place into anonymous zero-parameter functions, since the
    /// module has no notion of a free-standing expression.
    pub fn lower_sequence(
        &mut self,
        root: &mut Sequence,
        depth: usize,
    ) -> Result<(), CompileError> {
        let mut depth = depth;
        let mut cursor = Some(root);
        while let Some(node) = cursor {
            self.dbglog("Sequence", "", depth, node.span);
            self.promote_expr_item(&mut node.item);
            match &node.item {
                Item::Function(def) => self.lower_function(def, depth + 1)?,
                Item::Prototype(proto) => {
                    self.lower_prototype(proto, depth + 1);
                }
                Item::Expr(_) => unreachable!("top-level expressions are promoted before lowering"),
            }
            cursor = node.next.as_deref_mut();
            depth += 1;
        }
        Ok(())
    }

    fn promote_expr_item(&mut self, item: &mut Item) {
        if !matches!(item, Item::Expr(_)) {
            return;
        }
        let name = format!("__anon_expr{}", self.next_anon_id());
        let placeholder = Item::Prototype(Prototype {
            name: String::new(),
            params: Vec::new(),
            span: Span::new(0, 0),
        });
        let Item::Expr(body) = std::mem::replace(item, placeholder) else {
            unreachable!()
        };
        let span = body.span;
        let proto = Prototype {
            name,
            params: Vec::new(),
            span,
        };
        *item = Item::Function(FunctionDef { proto, body, span });
    }

    /// Install an externally linked declaration for the prototype, or return
    /// the function already known under that name.
    pub fn lower_prototype(&mut self, proto: &Prototype, depth: usize) -> usize {
        self.dbglog("Function prototype", &proto.name, depth, proto.span);
        if let Some(index) = self.module.find_function(&proto.name) {
            return index;
        }
        self.module
            .add_function(Function::new(&proto.name, proto.params.clone()))
    }

    pub fn lower_function(&mut self, def: &FunctionDef, depth: usize) -> Result<(), CompileError> {
        self.dbglog("Function", &def.proto.name, depth, def.span);

        let index = match self.module.find_function(&def.proto.name) {
            Some(index) => index,
            None => self.lower_prototype(&def.proto, depth + 1),
        };
        if !self.module.functions[index].is_declaration() {
            return Err(self.make_error(
                SemanticErrorKind::RedefinedFunction,
                def.span,
                format!("Redefinition of function {}", def.proto.name),
            ));
        }

        self.set_current_function(index);
        let entry = self.create_block("entry");
        self.append_block(entry);
        self.set_insert_point(entry);

        // One scope frame per function.
        self.clear_scope();

        // Parameter names come from the resolved declaration, which may be
        // an earlier extern for this name.
        let params = self.module.functions[index].params.clone();
        for (i, name) in params.iter().enumerate() {
            self.define_var(name, def.span, Some(Operand::Arg(i as u32)))?;
        }

        let ret = self.lower_expr(&def.body, depth + 1)?;
        self.terminate(Terminator::Ret(ret));

        let func = &self.module.functions[index];
        if let Err(message) = verify::verify_function(func) {
            return Err(self.make_error(
                SemanticErrorKind::VerifierFailure,
                def.span,
                format!("IR verifier rejected function '{}': {message}", func.name),
            ));
        }
        Ok(())
    }
}
