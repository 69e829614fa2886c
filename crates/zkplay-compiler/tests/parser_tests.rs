//! Tests for the lexer and parser

use zkplay_compiler::ast::{BinaryOp, ExprKind, Item, Pattern, StmtKind, TypeExprKind};
use zkplay_compiler::parser::MAX_NESTING;
use zkplay_compiler::{parse, DiagnosticKind};

// ============================================================================
// ITEMS
// ============================================================================

#[test]
fn test_parse_entry_function() {
    let program = parse("fn main(x: Field, y: pub Field) { assert(x * x == y); }").unwrap();

    assert_eq!(program.items.len(), 1);
    let Item::Function(main) = &program.items[0] else { panic!("expected a function") };
    assert_eq!(main.name.name, "main");
    assert_eq!(main.params.len(), 2);
    assert!(!main.params[0].public);
    assert!(main.params[1].public);
    assert!(main.return_type.is_none());
    assert_eq!(main.body.stmts.len(), 1);
}

#[test]
fn test_parse_all_item_kinds() {
    let source = r#"
        use std::hash::mimc;

        global DEPTH: u32 = 4;

        struct Point {
            x: Field,
            y: Field,
        }

        fn main(p: Point, path: [bool; DEPTH]) -> pub (Field, u8) {
            (p.x, 0)
        }
    "#;
    let program = parse(source).unwrap();

    assert_eq!(program.items.len(), 4);
    assert!(matches!(&program.items[0], Item::Use(decl) if decl.alias().unwrap().name == "mimc"));
    assert!(matches!(&program.items[1], Item::Global(global) if global.name.name == "DEPTH"));
    let Item::Struct(point) = &program.items[2] else { panic!("expected a struct") };
    assert_eq!(point.fields.len(), 2);

    let Item::Function(main) = &program.items[3] else { panic!("expected a function") };
    assert!(matches!(main.params[1].ty.kind, TypeExprKind::Array(..)));
    let ret = main.return_type.as_ref().unwrap();
    assert!(ret.public);
    assert!(matches!(&ret.ty.kind, TypeExprKind::Tuple(fields) if fields.len() == 2));
    assert!(main.body.tail.is_some());
}

#[test]
fn test_parse_integer_types() {
    let program = parse("fn main(a: u8, b: i64, c: u126) {}").unwrap();
    let Item::Function(main) = &program.items[0] else { panic!("expected a function") };

    let kinds: Vec<_> = main.params.iter().map(|p| p.ty.kind.clone()).collect();
    assert_eq!(kinds, [TypeExprKind::UInt(8), TypeExprKind::SInt(64), TypeExprKind::UInt(126)]);
}

// ============================================================================
// STATEMENTS AND EXPRESSIONS
// ============================================================================

#[test]
fn test_parse_statements() {
    let source = r#"
        fn main(arr: [Field; 3]) {
            let mut total = 0;
            let (a, _) = (arr[0], arr[1]);
            for i in 0..3 {
                total += arr[i];
            }
            assert_eq(total, a, "sum mismatch");
            assert(total != 0);
        }
    "#;
    let program = parse(source).unwrap();
    let Item::Function(main) = &program.items[0] else { panic!("expected a function") };
    let stmts = &main.body.stmts;

    assert_eq!(stmts.len(), 5);
    assert!(matches!(
        &stmts[0].kind,
        StmtKind::Let { pattern: Pattern::Binding { mutable: true, .. }, .. }
    ));
    assert!(matches!(
        &stmts[1].kind,
        StmtKind::Let { pattern: Pattern::Tuple(elements, _), .. } if elements.len() == 2
    ));
    let StmtKind::For { body, .. } = &stmts[2].kind else { panic!("expected a loop") };
    assert!(matches!(body.stmts[0].kind, StmtKind::Assign { op: Some(BinaryOp::Add), .. }));
    assert!(matches!(
        &stmts[3].kind,
        StmtKind::AssertEq { message: Some(message), .. } if message == "sum mismatch"
    ));
    assert!(matches!(stmts[4].kind, StmtKind::Assert { message: None, .. }));
}

#[test]
fn test_operator_precedence() {
    let program = parse("fn main(a: u8, b: u8) -> bool { a + b * 2 < 10 || a == b }").unwrap();
    let Item::Function(main) = &program.items[0] else { panic!("expected a function") };
    let tail = main.body.tail.as_ref().unwrap();

    let ExprKind::Binary { op: BinaryOp::Or, lhs, .. } = &tail.kind else {
        panic!("expected `||` at the root, found {:?}", tail.kind)
    };
    let ExprKind::Binary { op: BinaryOp::Lt, lhs: sum, .. } = &lhs.kind else {
        panic!("expected `<` under `||`")
    };
    let ExprKind::Binary { op: BinaryOp::Add, rhs: product, .. } = &sum.kind else {
        panic!("expected `+` under `<`")
    };
    assert!(matches!(product.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn test_cast_binds_tighter_than_arithmetic() {
    let program = parse("fn main(a: u8) -> u16 { a as u16 * 3 }").unwrap();
    let Item::Function(main) = &program.items[0] else { panic!("expected a function") };
    let tail = main.body.tail.as_ref().unwrap();

    let ExprKind::Binary { op: BinaryOp::Mul, lhs, .. } = &tail.kind else {
        panic!("expected `*` at the root")
    };
    assert!(matches!(lhs.kind, ExprKind::Cast { .. }));
}

#[test]
fn test_parse_if_else_chain() {
    let source = r#"
        fn main(x: u8) -> u8 {
            if x < 10 { 1 } else if x < 20 { 2 } else { 3 }
        }
    "#;
    let program = parse(source).unwrap();
    let Item::Function(main) = &program.items[0] else { panic!("expected a function") };
    let tail = main.body.tail.as_ref().unwrap();

    let ExprKind::If { else_branch: Some(else_branch), .. } = &tail.kind else {
        panic!("expected an if expression")
    };
    assert!(matches!(else_branch.kind, ExprKind::If { .. }));
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

#[test]
fn test_syntax_errors_are_collected() {
    let errors = parse("fn main() {\n    let = 1;\n    let y = ;\n}").unwrap_err();

    assert!(errors.len() >= 2, "expected one error per broken statement, got {:?}", errors);
    assert!(errors.iter().all(|d| d.kind == DiagnosticKind::Syntax && d.is_error()));
    assert_eq!(errors[0].span.line, 2);
    assert!(errors.iter().any(|d| d.span.line == 3));
}

#[test]
fn test_syntax_error_position() {
    let errors = parse("fn main(x: Field) {\n  let y = x +;\n}").unwrap_err();

    let first = &errors[0];
    assert_eq!(first.span.line, 2);
    assert_eq!(first.span.column, 14);
}

#[test]
fn test_invalid_character() {
    let errors = parse("fn main() { let x = 1 $ 2; }").unwrap_err();

    assert!(errors.iter().any(|d| d.kind == DiagnosticKind::Syntax && d.message.contains('$')));
}

// ============================================================================
// NESTING LIMIT
// ============================================================================

fn nested_parens(depth: usize) -> String {
    format!("{}x{}", "(".repeat(depth), ")".repeat(depth))
}

#[test]
fn test_moderate_nesting_parses() {
    let source = format!("fn main(x: Field) -> pub Field {{ {} }}", nested_parens(100));
    assert!(parse(&source).is_ok());
}

#[test]
fn test_deep_parentheses_are_a_diagnostic() {
    let source = format!(
        "fn main(x: Field) {{\n    let y = {};\n    let = 1;\n}}",
        nested_parens(20_000)
    );
    let errors = parse(&source).unwrap_err();

    let too_deep: Vec<_> =
        errors.iter().filter(|d| d.kind == DiagnosticKind::ResourceExceeded).collect();
    assert_eq!(too_deep.len(), 1, "{:?}", errors);
    assert_eq!(too_deep[0].span.line, 2);
    assert!(too_deep[0].message.contains(&MAX_NESTING.to_string()));
    // Parsing carries on with the next statement
    assert!(errors.iter().any(|d| d.kind == DiagnosticKind::Syntax && d.span.line == 3));
}

#[test]
fn test_deep_blocks_are_a_diagnostic() {
    let depth = 20_000;
    let source =
        format!("fn main(x: Field) -> pub Field {{ {}x{} }}", "{".repeat(depth), "}".repeat(depth));
    let errors = parse(&source).unwrap_err();

    assert_eq!(errors[0].kind, DiagnosticKind::ResourceExceeded);
    assert!(errors.len() <= 2, "recovery should resynchronize quickly: {:?}", errors);
}

#[test]
fn test_long_operator_chain_is_a_diagnostic() {
    let terms = vec!["x"; 1_000].join(" + ");
    let source = format!("fn main(x: Field) -> pub Field {{ {} }}", terms);
    let errors = parse(&source).unwrap_err();
    assert!(errors.iter().any(|d| d.kind == DiagnosticKind::ResourceExceeded));

    let terms = vec!["x"; 50].join(" + ");
    let source = format!("fn main(x: Field) -> pub Field {{ {} }}", terms);
    assert!(parse(&source).is_ok());
}

#[test]
fn test_deep_nesting_through_compiler() {
    let source = format!("fn main(x: Field) -> pub Field {{ {} }}", nested_parens(20_000));
    let err = zkplay_compiler::Compiler::default().compile(&source).unwrap_err();
    assert!(err.diagnostics().iter().any(|d| d.kind == DiagnosticKind::ResourceExceeded));
}
