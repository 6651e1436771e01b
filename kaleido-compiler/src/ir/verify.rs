//! Structural checks over emitted functions, standing in for the backend's
//! verifier. A violation here is a compiler bug, not a user error.

use crate::ir::{BlockId, Function, InstKind, Operand, Terminator, ValueId};
use std::collections::{HashMap, HashSet};

/// Type of a value as the verifier sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VType {
    Double,
    /// i1 result of a comparison.
    Bool,
    /// Stack slot address produced by an alloca.
    Slot,
}

fn result_type(kind: &InstKind) -> VType {
    match kind {
        InstKind::Alloca { .. } => VType::Slot,
        InstKind::FCmp { .. } => VType::Bool,
        _ => VType::Double,
    }
}

pub fn verify_function(func: &Function) -> Result<(), String> {
    let entry = match func.entry() {
        Some(entry) => entry,
        None => return Ok(()), // declarations have nothing to check
    };

    let appended: HashSet<BlockId> = func.layout.iter().copied().collect();

    // Collect definitions: value -> (block, position, type).
    let mut defs: HashMap<ValueId, (BlockId, usize, VType)> = HashMap::new();
    for block in func.blocks() {
        for (pos, inst) in block.insts.iter().enumerate() {
            match inst.result {
                Some(id) => {
                    if defs
                        .insert(id, (block.id, pos, result_type(&inst.kind)))
                        .is_some()
                    {
                        return Err(format!("value %{} defined more than once", id.0));
                    }
                }
                None => {
                    if inst.kind.has_result() {
                        return Err(format!(
                            "value-producing instruction without a result in block '{}'",
                            block.label
                        ));
                    }
                }
            }
        }
    }

    let check = |op: &Operand, want: VType, user: (BlockId, usize)| -> Result<(), String> {
        match op {
            Operand::Const(_) => {
                if want != VType::Double {
                    return Err("constant used where a non-double is required".to_string());
                }
            }
            Operand::Arg(i) => {
                if *i as usize >= func.arity() {
                    return Err(format!("parameter index {i} out of range"));
                }
                if want != VType::Double {
                    return Err("parameter used where a non-double is required".to_string());
                }
            }
            Operand::Value(id) => match defs.get(id) {
                None => return Err(format!("use of undefined value %{}", id.0)),
                Some((def_block, def_pos, ty)) => {
                    if *ty != want {
                        return Err(format!(
                            "value %{} has type {:?}, expected {:?}",
                            id.0, ty, want
                        ));
                    }
                    // Within a block the definition must come first.
                    let (use_block, use_pos) = user;
                    if *def_block == use_block && *def_pos >= use_pos {
                        return Err(format!("value %{} used before its definition", id.0));
                    }
                }
            },
        }
        Ok(())
    };

    for block in func.blocks() {
        // Terminators are mandatory and must target appended blocks.
        let term = block
            .terminator
            .as_ref()
            .ok_or_else(|| format!("block '{}' has no terminator", block.label))?;
        for succ in term.successors() {
            if !appended.contains(&succ) {
                return Err(format!(
                    "block '{}' branches to a detached block",
                    block.label
                ));
            }
        }

        let preds: HashSet<BlockId> = func.predecessors(block.id).into_iter().collect();
        let mut seen_store = false;
        let mut past_phis = false;

        for (pos, inst) in block.insts.iter().enumerate() {
            let user = (block.id, pos);
            match &inst.kind {
                InstKind::Alloca { .. } => {
                    past_phis = true;
                    if block.id != entry {
                        return Err(format!("alloca outside the entry block, in '{}'", block.label));
                    }
                    if seen_store {
                        return Err("alloca after a store in the entry block".to_string());
                    }
                }
                InstKind::Load { slot } => {
                    past_phis = true;
                    check(&Operand::Value(*slot), VType::Slot, user)?;
                }
                InstKind::Store { slot, value } => {
                    past_phis = true;
                    seen_store = true;
                    check(&Operand::Value(*slot), VType::Slot, user)?;
                    check(value, VType::Double, user)?;
                }
                InstKind::Arith { lhs, rhs, .. } => {
                    past_phis = true;
                    check(lhs, VType::Double, user)?;
                    check(rhs, VType::Double, user)?;
                }
                InstKind::FNeg { operand } => {
                    past_phis = true;
                    check(operand, VType::Double, user)?;
                }
                InstKind::FCmp { lhs, rhs, .. } => {
                    past_phis = true;
                    check(lhs, VType::Double, user)?;
                    check(rhs, VType::Double, user)?;
                }
                InstKind::UiToFp { operand } => {
                    past_phis = true;
                    check(operand, VType::Bool, user)?;
                }
                InstKind::Call { args, .. } => {
                    past_phis = true;
                    for arg in args {
                        check(arg, VType::Double, user)?;
                    }
                }
                InstKind::Phi { incoming } => {
                    if past_phis {
                        return Err(format!(
                            "phi after a non-phi instruction in block '{}'",
                            block.label
                        ));
                    }
                    if incoming.is_empty() {
                        return Err(format!("phi with no incoming edges in '{}'", block.label));
                    }
                    let incoming_blocks: HashSet<BlockId> =
                        incoming.iter().map(|(_, b)| *b).collect();
                    if incoming_blocks.len() != incoming.len() {
                        return Err(format!(
                            "phi with duplicate incoming blocks in '{}'",
                            block.label
                        ));
                    }
                    if incoming_blocks != preds {
                        return Err(format!(
                            "phi incoming blocks do not match the predecessors of '{}'",
                            block.label
                        ));
                    }
                    // Incoming values flow along edges; only existence and
                    // typing can be checked here.
                    for (value, _) in incoming {
                        match value {
                            Operand::Value(id) => match defs.get(id) {
                                None => {
                                    return Err(format!("use of undefined value %{}", id.0));
                                }
                                Some((_, _, ty)) => {
                                    if *ty != VType::Double {
                                        return Err(format!(
                                            "phi incoming value %{} is not a double",
                                            id.0
                                        ));
                                    }
                                }
                            },
                            Operand::Const(_) => {}
                            Operand::Arg(i) => {
                                if *i as usize >= func.arity() {
                                    return Err(format!("parameter index {i} out of range"));
                                }
                            }
                        }
                    }
                }
            }
        }

        let term_user = (block.id, block.insts.len());
        match term {
            Terminator::Br(_) => {}
            Terminator::CondBr { cond, .. } => check(cond, VType::Bool, term_user)?,
            Terminator::Ret(value) => check(value, VType::Double, term_user)?,
        }
    }

    Ok(())
}
