use kaleido_compiler::{compile_to_ir, CompileError, SemanticErrorKind};

// ── Semantic error detection ─────────────────────────────────────────────
// Each test verifies that an invalid program produces the correct error kind.

#[test]
fn unknown_variable() {
    let result = compile_to_ir("def bad() x;");
    assert_semantic_error(result, SemanticErrorKind::UnknownVariable);
}

#[test]
fn unknown_variable_location() {
    let result = compile_to_ir("def bad() x;");
    match result {
        Err(CompileError::Semantic { line, col, .. }) => {
            assert_eq!(line, 1, "error should be on line 1, got {}", line);
            assert_eq!(col, 11, "error should point at 'x', got column {}", col);
        }
        other => panic!("Expected semantic error, got: {:?}", other.err()),
    }
}

#[test]
fn unknown_variable_multiline_location() {
    let source = "def a(x) x;\ndef b() y;\n";
    let result = compile_to_ir(source);
    match result {
        Err(CompileError::Semantic { kind, line, col, .. }) => {
            assert_eq!(kind, SemanticErrorKind::UnknownVariable);
            assert_eq!(line, 2, "error should be on line 2, got {}", line);
            assert_eq!(col, 9, "error should point at 'y', got column {}", col);
        }
        other => panic!("Expected semantic error, got: {:?}", other.err()),
    }
}

#[test]
fn redefined_variable_in_var() {
    let result = compile_to_ir("def f() var x = 1, x = 2 in x;");
    assert_semantic_error(result, SemanticErrorKind::RedefinedVariable);
}

#[test]
fn redefined_variable_shadowing_parameter() {
    let result = compile_to_ir("def f(x) var x = 1 in x;");
    assert_semantic_error(result, SemanticErrorKind::RedefinedVariable);
}

#[test]
fn duplicate_parameter_names() {
    let result = compile_to_ir("def f(x x) x;");
    assert_semantic_error(result, SemanticErrorKind::RedefinedVariable);
}

#[test]
fn induction_variable_clashes_with_parameter() {
    let result = compile_to_ir("def f(i) for i = 1, i < 2, i = i + 1 in 1;");
    assert_semantic_error(result, SemanticErrorKind::RedefinedVariable);
}

#[test]
fn assignment_to_unbound_name() {
    let result = compile_to_ir("def f() x = 1;");
    assert_semantic_error(result, SemanticErrorKind::UnknownVariable);
}

#[test]
fn unknown_function() {
    let result = compile_to_ir("foo(1);");
    assert_semantic_error(result, SemanticErrorKind::UnknownFunction);
}

#[test]
fn call_before_declaration() {
    // Resolution is strictly in source order; a later definition does not
    // satisfy an earlier call.
    let result = compile_to_ir("def f(n) g(n); def g(n) n;");
    assert_semantic_error(result, SemanticErrorKind::UnknownFunction);
}

#[test]
fn arity_mismatch_too_few() {
    let result = compile_to_ir("def add(a b) a + b; add(1);");
    assert_semantic_error(result, SemanticErrorKind::ArityMismatch);
}

#[test]
fn arity_mismatch_too_many() {
    let result = compile_to_ir("def add(a b) a + b; add(1, 2, 3);");
    assert_semantic_error(result, SemanticErrorKind::ArityMismatch);
}

#[test]
fn redefined_function() {
    let result = compile_to_ir("def f(x) x; def f(x) x + 1;");
    assert_semantic_error(result, SemanticErrorKind::RedefinedFunction);
}

#[test]
fn no_partial_module_on_error() {
    // The first error aborts the compilation; no module is produced.
    let result = compile_to_ir("def ok(x) x; def bad() y;");
    assert!(result.is_err());
}

// ── Parse and scan errors ────────────────────────────────────────────────

#[test]
fn parse_error_on_malformed_prototype() {
    let result = compile_to_ir("def f( x;");
    assert!(
        matches!(result, Err(CompileError::Parse { .. })),
        "expected a parse error, got: {:?}",
        result.err()
    );
}

#[test]
fn parse_error_on_missing_semicolon() {
    let result = compile_to_ir("def f(x) x");
    assert!(matches!(result, Err(CompileError::Parse { .. })));
}

#[test]
fn parse_error_reports_position() {
    let result = compile_to_ir("def f(x) x;\n) ;");
    match result {
        Err(CompileError::Parse { line, .. }) => {
            assert_eq!(line, 2, "parse error should be on line 2, got {}", line);
        }
        other => panic!("Expected parse error, got: {:?}", other.err()),
    }
}

#[test]
fn lexical_error_on_unknown_character() {
    let result = compile_to_ir("1 $ 2;");
    match result {
        Err(CompileError::Lexical(e)) => {
            let message = e.to_string();
            assert!(
                message.contains("Unexpected character '$'"),
                "unexpected message: {}",
                message
            );
        }
        other => panic!("Expected lexical error, got: {:?}", other.err()),
    }
}

// ── Helper ───────────────────────────────────────────────────────────────

fn assert_semantic_error(
    result: Result<kaleido_compiler::ir::Module, CompileError>,
    expected: SemanticErrorKind,
) {
    match result {
        Ok(_) => panic!("Expected {:?} error, but compilation succeeded", expected),
        Err(CompileError::Semantic { kind, .. }) => {
            assert_eq!(kind, expected);
        }
        Err(other) => panic!("Expected {:?} semantic error, got: {:?}", expected, other),
    }
}
