use kaleido_compiler::compile_to_ir;
use kaleido_compiler::ir::{verify, Function, Inst, InstKind, Module, Operand, Terminator};

fn text_of(module: &Module) -> String {
    module.to_lines().join("\n")
}

// ── Scenario-level structure ─────────────────────────────────────────────

#[test]
fn function_body_reads_parameter_slot() {
    let module = compile_to_ir("def f(x) x + 1;").unwrap();
    let func = module.get_function("f").expect("f should be defined");
    assert_eq!(func.params, vec!["x"]);
    assert!(!func.is_declaration());

    let text = text_of(&module);
    assert!(text.contains("define double @f(double %x)"));
    assert!(text.contains("%x1 = alloca double"));
    assert!(text.contains("store double %x, ptr %x1"));
    assert!(text.contains("load double, ptr %x1"));
    assert!(text.contains("fadd double"));
    assert!(text.contains("ret double"));
}

#[test]
fn top_level_expression_becomes_anonymous_function() {
    let module = compile_to_ir("1 + 2 * 3;").unwrap();
    let func = module
        .get_function("__anon_expr0")
        .expect("the expression should be wrapped into __anon_expr0");
    assert_eq!(func.arity(), 0);

    let text = text_of(&module);
    assert!(text.contains("%0 = fmul double 2.0, 3.0"));
    assert!(text.contains("%1 = fadd double 1.0, %0"));
    assert!(text.contains("ret double %1"));
}

#[test]
fn anonymous_names_are_sequential_within_a_run() {
    let module = compile_to_ir("1; 2;").unwrap();
    assert!(module.get_function("__anon_expr0").is_some());
    assert!(module.get_function("__anon_expr1").is_some());
}

#[test]
fn if_lowers_to_branches_and_phi() {
    let module = compile_to_ir("def cmp(a b) if a < b then 1 else 0;").unwrap();
    let func = module.get_function("cmp").unwrap();

    let labels: Vec<&str> = func.blocks().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, ["entry", "then", "else", "ifexit"]);

    let merge = func.blocks().find(|b| b.label == "ifexit").unwrap();
    let phi = merge
        .insts
        .iter()
        .find_map(|inst| match &inst.kind {
            InstKind::Phi { incoming } => Some(incoming),
            _ => None,
        })
        .expect("merge block should hold the phi");
    assert_eq!(phi.len(), 2);

    let text = text_of(&module);
    assert!(text.contains("fcmp olt double"));
    assert!(text.contains("uitofp i1"));
    assert!(text.contains("phi double [ 1.0, %then ], [ 0.0, %else ]"));
}

#[test]
fn loop_keeps_its_value_in_a_slot() {
    let source = "def sumto(n) var s = 0 in (for i = 1, i <= n, i = i + 1 in s = s + i);";
    let module = compile_to_ir(source).unwrap();
    let func = module.get_function("sumto").unwrap();

    let labels: Vec<&str> = func.blocks().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, ["entry", "header", "body", "exitBlock"]);

    let entry = func.block(func.entry().unwrap());
    let slots: Vec<&str> = entry
        .insts
        .iter()
        .filter_map(|inst| match &inst.kind {
            InstKind::Alloca { name } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(slots.len(), 4, "slots for n, s, i and the loop value");
    for name in ["n", "s", "i", "exitValuePtr"] {
        assert!(slots.contains(&name), "missing slot {name}");
    }

    // User variables flow through memory, not phis.
    let phi_count = func
        .blocks()
        .flat_map(|b| b.insts.iter())
        .filter(|inst| matches!(inst.kind, InstKind::Phi { .. }))
        .count();
    assert_eq!(phi_count, 0);

    let text = text_of(&module);
    assert!(text.contains("fcmp ole double"));
    assert!(text.contains("store double 0.0, ptr %exitValuePtr"));
    assert!(text.contains("load double, ptr %exitValuePtr"));
}

#[test]
fn extern_prototype_prints_as_declaration() {
    let module = compile_to_ir("extern sin(x); def g(a) sin(a);").unwrap();
    let sin = module.get_function("sin").unwrap();
    assert!(sin.is_declaration());

    let text = text_of(&module);
    assert!(text.contains("declare double @sin(double %x)"));
    assert!(text.contains("call double @sin(double"));
}

// ── Quantified properties ────────────────────────────────────────────────

#[test]
fn lowering_is_deterministic() {
    let source = "def f(a b) if a < b then a else b; f(1, 2); 3 * 4;";
    let first = compile_to_ir(source).unwrap().to_lines();
    let second = compile_to_ir(source).unwrap().to_lines();
    assert_eq!(first, second);
}

#[test]
fn comparisons_normalise_to_double() {
    let module = compile_to_ir("def lt(a b) a < b;").unwrap();
    let text = text_of(&module);
    assert!(text.contains("fcmp olt double"));
    assert!(text.contains("uitofp i1"));
    // The normalised value, not the raw i1, is returned.
    let func = module.get_function("lt").unwrap();
    let entry = func.block(func.entry().unwrap());
    match entry.terminator.as_ref().unwrap() {
        Terminator::Ret(Operand::Value(id)) => {
            let ret_inst = entry
                .insts
                .iter()
                .find(|inst| inst.result == Some(*id))
                .unwrap();
            assert!(matches!(ret_inst.kind, InstKind::UiToFp { .. }));
        }
        other => panic!("unexpected terminator: {:?}", other),
    }
}

#[test]
fn allocas_stay_in_the_entry_block_before_stores() {
    let source = "def f(n) var s = 0 in (for i = 1, i <= n, i = i + 1 in \
                  var t = s + i in s = t);";
    let module = compile_to_ir(source).unwrap();
    for func in &module.functions {
        let entry = match func.entry() {
            Some(entry) => entry,
            None => continue,
        };
        for block in func.blocks() {
            let mut seen_store = false;
            for inst in &block.insts {
                match inst.kind {
                    InstKind::Alloca { .. } => {
                        assert_eq!(block.id, entry, "alloca outside the entry block");
                        assert!(!seen_store, "alloca after a store");
                    }
                    InstKind::Store { .. } => seen_store = true,
                    _ => {}
                }
            }
        }
    }
}

#[test]
fn scope_does_not_leak_across_functions() {
    let result = compile_to_ir("def f(x) x; def g() x;");
    assert!(result.is_err(), "x must not be visible inside g");
}

// ── Verifier ─────────────────────────────────────────────────────────────

#[test]
fn verifier_accepts_declarations() {
    let func = Function::new("ext", vec!["a".to_string()]);
    assert!(verify::verify_function(&func).is_ok());
}

#[test]
fn verifier_rejects_unterminated_block() {
    let mut func = Function::new("broken", Vec::new());
    let entry = func.create_block("entry");
    func.append_block(entry);
    let err = verify::verify_function(&func).unwrap_err();
    assert!(err.contains("no terminator"), "got: {err}");
}

#[test]
fn verifier_rejects_alloca_outside_entry() {
    let mut func = Function::new("broken", Vec::new());
    let entry = func.create_block("entry");
    func.append_block(entry);
    let other = func.create_block("other");
    func.append_block(other);

    func.block_mut(entry).terminator = Some(Terminator::Br(other));
    let slot = func.fresh_value();
    func.block_mut(other).insts.push(Inst {
        result: Some(slot),
        kind: InstKind::Alloca {
            name: "x".to_string(),
        },
    });
    func.block_mut(other).terminator = Some(Terminator::Ret(Operand::Const(0.0)));

    let err = verify::verify_function(&func).unwrap_err();
    assert!(err.contains("alloca outside"), "got: {err}");
}

#[test]
fn verifier_rejects_branch_to_detached_block() {
    let mut func = Function::new("broken", Vec::new());
    let entry = func.create_block("entry");
    func.append_block(entry);
    let dangling = func.create_block("dangling");
    func.block_mut(entry).terminator = Some(Terminator::Br(dangling));

    let err = verify::verify_function(&func).unwrap_err();
    assert!(err.contains("detached"), "got: {err}");
}

#[test]
fn verifier_rejects_undefined_value_use() {
    let mut func = Function::new("broken", Vec::new());
    let entry = func.create_block("entry");
    func.append_block(entry);
    let ghost = func.fresh_value();
    func.block_mut(entry).terminator = Some(Terminator::Ret(Operand::Value(ghost)));

    let err = verify::verify_function(&func).unwrap_err();
    assert!(err.contains("undefined value"), "got: {err}");
}
