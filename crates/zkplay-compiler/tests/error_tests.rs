//! Tests for error handling and error messages

use zkplay_compiler::{
    compile, execute, CompilerError, Diagnostic, DiagnosticKind, ExecutionError, InputMap, Span,
};

// ============================================================================
// COMPILER ERRORS
// ============================================================================

#[test]
fn test_rejected_error_lists_every_diagnostic() {
    let err = compile("fn main() {\n  let = 1;\n  let = 2;\n}", "main").unwrap_err();

    let diagnostics = err.diagnostics();
    assert!(diagnostics.len() >= 2);
    let message = err.to_string();
    let header = format!("compilation failed with {} error(s)", diagnostics.len());
    assert!(message.starts_with(&header));
    assert!(message.contains("error[syntax] 2:"));
    assert!(message.contains("error[syntax] 3:"));
}

#[test]
fn test_lowering_error_is_single_diagnostic() {
    let source = "fn main(x: u8) -> pub u8 { x / 0 }";
    let err = compile(source, "main").unwrap_err();

    assert_eq!(err.diagnostics().len(), 1);
    assert_eq!(err.diagnostics()[0].kind, DiagnosticKind::Lowering);
    assert!(err.to_string().contains("attempt to divide by zero"));
}

#[test]
fn test_non_diagnostic_errors() {
    let err = CompilerError::DuplicateBuiltin("std::hash::mimc::permute".to_string());
    assert!(err.diagnostics().is_empty());
    assert_eq!(err.to_string(), "Builtin 'std::hash::mimc::permute' is already registered");

    let err = CompilerError::other("boom");
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn test_diagnostic_display() {
    let diagnostic = Diagnostic::type_error(Span::new(4, 9, 4, 12), "mismatched types");
    assert_eq!(diagnostic.to_string(), "error[type] 4:9: mismatched types");

    let warning = Diagnostic::warning(Span::new(1, 1, 1, 2), "unused variable `x`");
    assert!(!warning.is_error());
    assert_eq!(warning.to_string(), "warning[type] 1:1: unused variable `x`");

    let resource = Diagnostic::resource_exceeded(Span::new(2, 3, 2, 4), "too many gates");
    assert_eq!(resource.to_string(), "error[resource] 2:3: too many gates");
}

// ============================================================================
// EXECUTION ERRORS
// ============================================================================

#[test]
fn test_execution_error_messages() {
    let cases = [
        (ExecutionError::MissingInput { name: "x".into() }, "Missing input for parameter 'x'"),
        (
            ExecutionError::UnexpectedInput { name: "z".into() },
            "Unexpected input 'z' (no such parameter)",
        ),
        (
            ExecutionError::TypeMismatch {
                path: "p.x".into(),
                expected: "Field".into(),
                found: "boolean".into(),
            },
            "Type mismatch for 'p.x': expected Field, found boolean",
        ),
        (ExecutionError::DivisionByZero { location: "3:5".into() }, "Division by zero at 3:5"),
        (
            ExecutionError::RangeCheckViolation {
                location: "2:17".into(),
                value: "300".into(),
                ty: "u8".into(),
            },
            "Range check failed at 2:17: 300 does not fit in u8",
        ),
        (
            ExecutionError::AssertionFailed { location: "1:20".into(), message: None },
            "Assertion failed at 1:20",
        ),
        (
            ExecutionError::AssertionFailed {
                location: "1:20".into(),
                message: Some("balance too low".into()),
            },
            "Assertion failed at 1:20: balance too low",
        ),
        (
            ExecutionError::IndexOutOfBounds {
                location: "5:1".into(),
                index: "7".into(),
                length: 4,
            },
            "Index 7 out of bounds for array of length 4 at 5:1",
        ),
        (ExecutionError::internal("shape mismatch"), "Internal error: shape mismatch"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn test_execution_errors_carry_source_location() {
    let source = "fn main(x: Field) -> pub u8 {\n    x as u8\n}";
    let compiled = compile(source, "main").unwrap();
    let inputs: InputMap = serde_json::from_str(r#"{"x": 1000}"#).unwrap();

    match execute(&compiled, &inputs).unwrap_err() {
        ExecutionError::RangeCheckViolation { location, .. } => assert_eq!(location, "2:5"),
        other => panic!("expected a range violation, got {:?}", other),
    }
}
