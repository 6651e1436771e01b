//! An SSA intermediate representation: each function is a control-flow graph
//! of basic blocks over double-typed values, with mutable variables realised
//! as entry-block stack slots accessed through explicit loads and stores.

use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a basic block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

/// Unique identifier for an instruction result within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// Immediate double constant.
    Const(f64),
    /// Formal parameter of the enclosing function, by position.
    Arg(u32),
    /// Result of an instruction.
    Value(ValueId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "fadd",
            ArithOp::Sub => "fsub",
            ArithOp::Mul => "fmul",
            ArithOp::Div => "fdiv",
        };
        write!(f, "{s}")
    }
}

/// Ordered floating-point comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPred {
    Ogt,
    Oge,
    Olt,
    Ole,
    Oeq,
    One,
}

impl fmt::Display for CmpPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpPred::Ogt => "ogt",
            CmpPred::Oge => "oge",
            CmpPred::Olt => "olt",
            CmpPred::Ole => "ole",
            CmpPred::Oeq => "oeq",
            CmpPred::One => "one",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub enum InstKind {
    /// Reserve a double-sized stack slot in the entry block.
    Alloca { name: String },
    /// Read the double stored in a slot.
    Load { slot: ValueId },
    /// Write a double into a slot.
    Store { slot: ValueId, value: Operand },
    Arith {
        op: ArithOp,
        lhs: Operand,
        rhs: Operand,
    },
    FNeg { operand: Operand },
    /// Yields an i1.
    FCmp {
        pred: CmpPred,
        lhs: Operand,
        rhs: Operand,
    },
    /// Widen an i1 truth value to 1.0 / 0.0.
    UiToFp { operand: Operand },
    /// Merge of incoming (value, predecessor block) pairs; double-typed.
    Phi { incoming: Vec<(Operand, BlockId)> },
    Call { callee: String, args: Vec<Operand> },
}

impl InstKind {
    pub fn has_result(&self) -> bool {
        !matches!(self, InstKind::Store { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Inst {
    pub result: Option<ValueId>,
    pub kind: InstKind,
}

#[derive(Debug, Clone)]
pub enum Terminator {
    Br(BlockId),
    CondBr {
        cond: Operand,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Ret(Operand),
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br(target) => vec![*target],
            Terminator::CondBr {
                then_dest,
                else_dest,
                ..
            } => vec![*then_dest, *else_dest],
            Terminator::Ret(_) => vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: String,
    pub insts: Vec<Inst>,
    /// None while the block is still being filled.
    pub terminator: Option<Terminator>,
}

/// A function: a block arena plus the layout order blocks were appended in.
/// A function with an empty layout is a declaration without a body.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    blocks: Vec<BasicBlock>,
    pub layout: Vec<BlockId>,
    next_value: u32,
    names: HashMap<String, u32>,
}

impl Function {
    pub fn new(name: &str, params: Vec<String>) -> Self {
        // Seed the name registry so slot names never collide with parameters.
        let mut names = HashMap::new();
        for p in &params {
            names.insert(p.clone(), 1);
        }
        Self {
            name: name.to_string(),
            params,
            blocks: Vec::new(),
            layout: Vec::new(),
            next_value: 0,
            names,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_declaration(&self) -> bool {
        self.layout.is_empty()
    }

    pub fn fresh_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    /// Return `base` the first time it is requested, `base1`, `base2`, ...
    /// afterwards.
    pub fn uniquify(&mut self, base: &str) -> String {
        let count = self.names.entry(base.to_string()).or_insert(0);
        let label = if *count == 0 {
            base.to_string()
        } else {
            format!("{base}{count}")
        };
        *count += 1;
        label
    }

    /// Create a block detached from the function body. It only becomes part
    /// of the function once `append_block` places it in the layout.
    pub fn create_block(&mut self, name: &str) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        let label = self.uniquify(name);
        self.blocks.push(BasicBlock {
            id,
            label,
            insts: Vec::new(),
            terminator: None,
        });
        id
    }

    pub fn append_block(&mut self, id: BlockId) {
        debug_assert!(!self.layout.contains(&id), "block appended twice");
        self.layout.push(id);
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0 as usize]
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.layout.first().copied()
    }

    /// Appended blocks in layout (print) order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.layout.iter().map(|id| self.block(*id))
    }

    /// Blocks whose terminator targets `target`.
    pub fn predecessors(&self, target: BlockId) -> Vec<BlockId> {
        self.blocks()
            .filter(|b| {
                b.terminator
                    .as_ref()
                    .is_some_and(|t| t.successors().contains(&target))
            })
            .map(|b| b.id)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            functions: Vec::new(),
        }
    }

    pub fn find_function(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn add_function(&mut self, func: Function) -> usize {
        self.functions.push(func);
        self.functions.len() - 1
    }

    pub fn to_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.push(format!("; ModuleID = '{}'", self.name));
        for func in &self.functions {
            out.push(String::new());
            print_function(func, &mut out);
        }
        out
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.to_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

fn print_function(func: &Function, out: &mut Vec<String>) {
    let params = func
        .params
        .iter()
        .map(|p| format!("double %{p}"))
        .collect::<Vec<_>>()
        .join(", ");

    if func.is_declaration() {
        out.push(format!("declare double @{}({})", func.name, params));
        return;
    }

    let slots = slot_names(func);
    out.push(format!("define double @{}({}) {{", func.name, params));
    for (i, block) in func.blocks().enumerate() {
        if i > 0 {
            out.push(String::new());
        }
        out.push(format!("{}:", block.label));
        for inst in &block.insts {
            out.push(inst_line(func, &slots, inst));
        }
        if let Some(term) = &block.terminator {
            out.push(terminator_line(func, &slots, term));
        }
    }
    out.push("}".to_string());
}

/// Display names for slot values; every other value prints numerically.
fn slot_names(func: &Function) -> HashMap<ValueId, String> {
    let mut names = HashMap::new();
    for block in func.blocks() {
        for inst in &block.insts {
            if let (InstKind::Alloca { name }, Some(id)) = (&inst.kind, inst.result) {
                names.insert(id, name.clone());
            }
        }
    }
    names
}

fn value_ref(slots: &HashMap<ValueId, String>, id: ValueId) -> String {
    match slots.get(&id) {
        Some(name) => format!("%{name}"),
        None => format!("%{}", id.0),
    }
}

fn operand_ref(func: &Function, slots: &HashMap<ValueId, String>, op: &Operand) -> String {
    match op {
        Operand::Const(value) => format!("{value:?}"),
        Operand::Arg(i) => format!("%{}", func.params[*i as usize]),
        Operand::Value(id) => value_ref(slots, *id),
    }
}

fn inst_line(func: &Function, slots: &HashMap<ValueId, String>, inst: &Inst) -> String {
    let result = inst.result.map(|id| value_ref(slots, id));
    match &inst.kind {
        InstKind::Alloca { .. } => {
            format!("  {} = alloca double", result.as_deref().expect("instruction has a result"))
        }
        InstKind::Load { slot } => {
            format!(
                "  {} = load double, ptr {}",
                result.as_deref().expect("instruction has a result"),
                value_ref(slots, *slot)
            )
        }
        InstKind::Store { slot, value } => {
            format!(
                "  store double {}, ptr {}",
                operand_ref(func, slots, value),
                value_ref(slots, *slot)
            )
        }
        InstKind::Arith { op, lhs, rhs } => {
            format!(
                "  {} = {} double {}, {}",
                result.as_deref().expect("instruction has a result"),
                op,
                operand_ref(func, slots, lhs),
                operand_ref(func, slots, rhs)
            )
        }
        InstKind::FNeg { operand } => {
            format!(
                "  {} = fneg double {}",
                result.as_deref().expect("instruction has a result"),
                operand_ref(func, slots, operand)
            )
        }
        InstKind::FCmp { pred, lhs, rhs } => {
            format!(
                "  {} = fcmp {} double {}, {}",
                result.as_deref().expect("instruction has a result"),
                pred,
                operand_ref(func, slots, lhs),
                operand_ref(func, slots, rhs)
            )
        }
        InstKind::UiToFp { operand } => {
            format!(
                "  {} = uitofp i1 {} to double",
                result.as_deref().expect("instruction has a result"),
                operand_ref(func, slots, operand)
            )
        }
        InstKind::Phi { incoming } => {
            let edges = incoming
                .iter()
                .map(|(value, block)| {
                    format!(
                        "[ {}, %{} ]",
                        operand_ref(func, slots, value),
                        func.block(*block).label
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("  {} = phi double {}", result.as_deref().expect("instruction has a result"), edges)
        }
        InstKind::Call { callee, args } => {
            let args = args
                .iter()
                .map(|a| format!("double {}", operand_ref(func, slots, a)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("  {} = call double @{}({})", result.as_deref().expect("instruction has a result"), callee, args)
        }
    }
}

fn terminator_line(
    func: &Function,
    slots: &HashMap<ValueId, String>,
    term: &Terminator,
) -> String {
    match term {
        Terminator::Br(target) => format!("  br label %{}", func.block(*target).label),
        Terminator::CondBr {
            cond,
            then_dest,
            else_dest,
        } => format!(
            "  br i1 {}, label %{}, label %{}",
            operand_ref(func, slots, cond),
            func.block(*then_dest).label,
            func.block(*else_dest).label
        ),
        Terminator::Ret(value) => format!("  ret double {}", operand_ref(func, slots, value)),
    }
}
