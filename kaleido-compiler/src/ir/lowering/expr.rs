use super::context::Lower;
use crate::ast::{Assign, BinOp, Expr, ExprKind, UnOp};
use crate::ir::{ArithOp, CmpPred, InstKind, Operand, Terminator};
use crate::{CompileError, SemanticErrorKind};

impl Lower {
    /// Lower an expression to exactly one double-typed operand.
    pub fn lower_expr(&mut self, expr: &Expr, depth: usize) -> Result<Operand, CompileError> {
        match &expr.kind {
            ExprKind::Number(value) => {
                self.dbglog("Number", &value.to_string(), depth, expr.span);
                Ok(Operand::Const(*value))
            }

            ExprKind::Variable(name) => {
                self.dbglog("Variable", name, depth, expr.span);
                let slot = self.lookup_var(name, expr.span)?;
                Ok(self.emit(InstKind::Load { slot }))
            }

            ExprKind::Binary { op, lhs, rhs } => {
                self.dbglog("Binary expression", &format!("{op:?}"), depth, expr.span);
                let lhs = self.lower_expr(lhs, depth + 1)?;
                let rhs = self.lower_expr(rhs, depth + 1)?;
                let value = match arith_op(*op) {
                    Some(op) => self.emit(InstKind::Arith { op, lhs, rhs }),
                    None => {
                        // Comparisons are normalised back to 0.0 / 1.0.
                        let pred = cmp_pred(*op);
                        let cmp = self.emit(InstKind::FCmp { pred, lhs, rhs });
                        self.bool_to_double(cmp)
                    }
                };
                Ok(value)
            }

            ExprKind::Unary { op: UnOp::Neg, operand } => {
                self.dbglog("Unary expression", "Neg", depth, expr.span);
                let operand = self.lower_expr(operand, depth + 1)?;
                Ok(self.emit(InstKind::FNeg { operand }))
            }

            ExprKind::Call { callee, args } => {
                self.dbglog("Function call", callee, depth, expr.span);
                let arity = match self.module.get_function(callee) {
                    Some(func) => func.arity(),
                    None => {
                        return Err(self.make_error(
                            SemanticErrorKind::UnknownFunction,
                            expr.span,
                            format!("Called unknown function {callee}"),
                        ));
                    }
                };
                if arity != args.len() {
                    return Err(self.make_error(
                        SemanticErrorKind::ArityMismatch,
                        expr.span,
                        format!(
                            "Function call argument count mismatch: expecting {}, got {}",
                            arity,
                            args.len()
                        ),
                    ));
                }
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower_expr(arg, depth + 1)?);
                }
                Ok(self.emit(InstKind::Call {
                    callee: callee.clone(),
                    args: lowered,
                }))
            }

            ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => self.lower_if(cond, then_expr, else_expr, depth, expr),

            ExprKind::For {
                init,
                cond,
                step,
                body,
            } => self.lower_for(init, cond, step, body, depth, expr),

            ExprKind::While { cond, body } => self.lower_while(cond, body, depth, expr),

            ExprKind::Assign(assign) => self.lower_assign(assign, depth),

            ExprKind::Var { decls, body } => {
                let names = decls
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.dbglog("VarExpr", &names, depth, expr.span);
                for (name, init) in decls {
                    // The initialiser sees the scope as it is before this
                    // declaration is installed.
                    let value = self.lower_expr(init, depth + 1)?;
                    self.define_var(name, expr.span, Some(value))?;
                }
                self.lower_expr(body, depth + 1)
            }

            ExprKind::Composite { current, next } => {
                self.dbglog("Composite expression", "", depth, expr.span);
                let value = self.lower_expr(current, depth + 1)?;
                match next {
                    Some(next) => self.lower_expr(next, depth + 1),
                    None => Ok(value),
                }
            }
        }
    }

    /// Store the value of an assignment into its target slot and yield the
    /// stored value.
    pub fn lower_assign(&mut self, assign: &Assign, depth: usize) -> Result<Operand, CompileError> {
        self.dbglog("Assignment", &assign.target, depth, assign.span);
        let value = self.lower_expr(&assign.value, depth + 1)?;
        let slot = self.lookup_var(&assign.target, assign.span)?;
        self.emit_void(InstKind::Store { slot, value });
        Ok(value)
    }

    fn lower_if(
        &mut self,
        cond: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
        depth: usize,
        expr: &Expr,
    ) -> Result<Operand, CompileError> {
        self.dbglog("If expression", "", depth, expr.span);

        let cond_val = self.lower_expr(cond, depth + 1)?;
        let cond_bool = self.double_to_bool(cond_val);

        // The arms and the merge block stay detached until each is filled,
        // so nested control flow keeps the layout in evaluation order.
        let then_block = self.create_block("then");
        let else_block = self.create_block("else");
        let merge_block = self.create_block("ifexit");

        self.terminate(Terminator::CondBr {
            cond: cond_bool,
            then_dest: then_block,
            else_dest: else_block,
        });

        self.append_block(then_block);
        self.set_insert_point(then_block);
        let then_val = self.lower_expr(then_expr, depth + 1)?;
        self.terminate(Terminator::Br(merge_block));
        // The arm may have ended in a different block than it started in.
        let then_end = self.insert_block();

        self.append_block(else_block);
        self.set_insert_point(else_block);
        let else_val = self.lower_expr(else_expr, depth + 1)?;
        self.terminate(Terminator::Br(merge_block));
        let else_end = self.insert_block();

        self.append_block(merge_block);
        self.set_insert_point(merge_block);
        Ok(self.emit(InstKind::Phi {
            incoming: vec![(then_val, then_end), (else_val, else_end)],
        }))
    }

    fn lower_for(
        &mut self,
        init: &Assign,
        cond: &Expr,
        step: &Assign,
        body: &Expr,
        depth: usize,
        expr: &Expr,
    ) -> Result<Operand, CompileError> {
        self.dbglog("For expression", "", depth, expr.span);

        let header = self.create_block("header");
        let body_block = self.create_block("body");
        let exit_block = self.create_block("exitBlock");
        self.append_block(header);
        self.append_block(body_block);
        self.append_block(exit_block);

        // The loop's value is kept in a slot so that a loop whose body never
        // runs yields 0.0.
        let exit_slot = self.entry_alloca("exitValuePtr");
        self.define_var(&init.target, expr.span, None)?;

        // Preheader
        self.emit_void(InstKind::Store {
            slot: exit_slot,
            value: Operand::Const(0.0),
        });
        self.lower_assign(init, depth + 1)?;
        self.terminate(Terminator::Br(header));

        // Header
        self.set_insert_point(header);
        let cond_val = self.lower_expr(cond, depth + 1)?;
        let cond_bool = self.double_to_bool(cond_val);
        self.terminate(Terminator::CondBr {
            cond: cond_bool,
            then_dest: body_block,
            else_dest: exit_block,
        });

        // Body
        self.set_insert_point(body_block);
        let body_val = self.lower_expr(body, depth + 1)?;
        self.emit_void(InstKind::Store {
            slot: exit_slot,
            value: body_val,
        });
        self.lower_assign(step, depth + 1)?;
        self.terminate(Terminator::Br(header));

        // Exit
        self.set_insert_point(exit_block);
        Ok(self.emit(InstKind::Load { slot: exit_slot }))
    }

    fn lower_while(
        &mut self,
        cond: &Expr,
        body: &Expr,
        depth: usize,
        expr: &Expr,
    ) -> Result<Operand, CompileError> {
        self.dbglog("While expression", "", depth, expr.span);

        let header = self.create_block("header");
        let body_block = self.create_block("body");
        let exit_block = self.create_block("exitBlock");
        self.append_block(header);
        self.append_block(body_block);
        self.append_block(exit_block);

        let exit_slot = self.entry_alloca("exitValuePtr");

        // Preheader
        self.emit_void(InstKind::Store {
            slot: exit_slot,
            value: Operand::Const(0.0),
        });
        self.terminate(Terminator::Br(header));

        // Header
        self.set_insert_point(header);
        let cond_val = self.lower_expr(cond, depth + 1)?;
        let cond_bool = self.double_to_bool(cond_val);
        self.terminate(Terminator::CondBr {
            cond: cond_bool,
            then_dest: body_block,
            else_dest: exit_block,
        });

        // Body
        self.set_insert_point(body_block);
        let body_val = self.lower_expr(body, depth + 1)?;
        self.emit_void(InstKind::Store {
            slot: exit_slot,
            value: body_val,
        });
        self.terminate(Terminator::Br(header));

        // Exit
        self.set_insert_point(exit_block);
        Ok(self.emit(InstKind::Load { slot: exit_slot }))
    }
}

fn arith_op(op: BinOp) -> Option<ArithOp> {
    match op {
        BinOp::Add => Some(ArithOp::Add),
        BinOp::Sub => Some(ArithOp::Sub),
        BinOp::Mul => Some(ArithOp::Mul),
        BinOp::Div => Some(ArithOp::Div),
        _ => None,
    }
}

fn cmp_pred(op: BinOp) -> CmpPred {
    match op {
        BinOp::Gt => CmpPred::Ogt,
        BinOp::Gte => CmpPred::Oge,
        BinOp::Lt => CmpPred::Olt,
        BinOp::Lte => CmpPred::Ole,
        BinOp::Eq => CmpPred::Oeq,
        BinOp::Neq => CmpPred::One,
        _ => unreachable!("not a comparison operator"),
    }
}
