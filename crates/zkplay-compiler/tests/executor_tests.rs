//! Tests for witness generation

use zkplay_compiler::{
    check_satisfied, compile, execute, CompiledCircuit, ExecutionError, FieldElement, InputMap,
    InputValue, WitnessAssignment,
};

fn inputs(json: &str) -> InputMap {
    serde_json::from_str(json).unwrap()
}

fn run(compiled: &CompiledCircuit, json: &str) -> Result<WitnessAssignment, ExecutionError> {
    execute(compiled, &inputs(json))
}

/// Executes, checks the witness against the circuit and decodes the return value
fn output(source: &str, json: &str) -> InputValue {
    let compiled = compile(source, "main").unwrap();
    let witness = run(&compiled, json).unwrap();
    check_satisfied(&compiled.constraint_system, &witness).unwrap();
    compiled.abi.decode_return(&witness).unwrap()
}

fn failure(source: &str, json: &str) -> ExecutionError {
    let compiled = compile(source, "main").unwrap();
    run(&compiled, json).unwrap_err()
}

fn field(value: u64) -> InputValue {
    InputValue::field(value)
}

// ============================================================================
// SQUARE ASSERTION
// ============================================================================

const SQUARE: &str = "fn main(x: Field, y: pub Field) { assert(x * x == y); }";

#[test]
fn test_square_accepts_valid_inputs() {
    let compiled = compile(SQUARE, "main").unwrap();
    let witness = run(&compiled, r#"{"x": 3, "y": 9}"#).unwrap();

    assert_eq!(witness.len(), compiled.constraint_system.num_slots());
    assert!(check_satisfied(&compiled.constraint_system, &witness).is_ok());
    assert_eq!(witness.public_values(&compiled.constraint_system), [FieldElement::from_u64(9)]);
}

#[test]
fn test_square_rejects_wrong_square() {
    let err = failure(SQUARE, r#"{"x": 3, "y": 10}"#);
    assert!(matches!(err, ExecutionError::AssertionFailed { .. }), "got {:?}", err);
}

#[test]
fn test_assertion_message_reported() {
    let source = r#"fn main(x: Field) { assert(x != 0, "x must be non-zero"); }"#;
    let err = failure(source, r#"{"x": 0}"#);

    match err {
        ExecutionError::AssertionFailed { location, message } => {
            assert_eq!(location, "1:21");
            assert_eq!(message.as_deref(), Some("x must be non-zero"));
        }
        other => panic!("expected an assertion failure, got {:?}", other),
    }
}

#[test]
fn test_assert_eq_on_arrays() {
    let source = "fn main(a: [Field; 2], b: [Field; 2]) { assert_eq(a, b); }";
    let compiled = compile(source, "main").unwrap();

    assert!(run(&compiled, r#"{"a": [1, 2], "b": [1, 2]}"#).is_ok());
    assert!(matches!(
        run(&compiled, r#"{"a": [1, 2], "b": [1, 3]}"#),
        Err(ExecutionError::AssertionFailed { .. })
    ));
}

// ============================================================================
// INPUT VALIDATION
// ============================================================================

#[test]
fn test_missing_input() {
    let err = failure(SQUARE, r#"{"x": 3}"#);
    assert_eq!(err, ExecutionError::MissingInput { name: "y".to_string() });
}

#[test]
fn test_unexpected_input() {
    let err = failure(SQUARE, r#"{"x": 3, "y": 9, "z": 1}"#);
    assert_eq!(err, ExecutionError::UnexpectedInput { name: "z".to_string() });
}

#[test]
fn test_type_mismatch() {
    let err = failure("fn main(flags: [bool; 2]) {}", r#"{"flags": [true, 7]}"#);
    assert!(
        matches!(err, ExecutionError::TypeMismatch { ref path, .. } if path == "flags[1]"),
        "got {:?}",
        err
    );
}

#[test]
fn test_input_out_of_range() {
    let err = failure("fn main(x: u8) -> pub u8 { x }", r#"{"x": 300}"#);
    assert!(matches!(err, ExecutionError::RangeCheckViolation { .. }), "got {:?}", err);
}

// ============================================================================
// RANGE CHECKS AND ARITHMETIC ERRORS
// ============================================================================

#[test]
fn test_narrowing_cast_violation() {
    let source = r#"
        fn main(x: Field) -> pub u8 {
            let z: u8 = x as u8;
            z
        }
    "#;
    assert_eq!(output(source, r#"{"x": 200}"#), field(200));

    match failure(source, r#"{"x": 300}"#) {
        ExecutionError::RangeCheckViolation { value, ty, .. } => {
            assert_eq!(value, "300");
            assert_eq!(ty, "u8");
        }
        other => panic!("expected a range violation, got {:?}", other),
    }
}

#[test]
fn test_unsigned_overflow() {
    let source = "fn main(a: u8, b: u8) -> pub u8 { a * b }";
    assert_eq!(output(source, r#"{"a": 15, "b": 17}"#), field(255));
    assert!(matches!(
        failure(source, r#"{"a": 16, "b": 16}"#),
        ExecutionError::RangeCheckViolation { .. }
    ));
}

#[test]
fn test_unsigned_underflow() {
    let source = "fn main(a: u32, b: u32) -> pub u32 { a - b }";
    assert_eq!(output(source, r#"{"a": 10, "b": 3}"#), field(7));
    assert!(matches!(
        failure(source, r#"{"a": 3, "b": 10}"#),
        ExecutionError::RangeCheckViolation { .. }
    ));
}

#[test]
fn test_signed_arithmetic() {
    let source = "fn main(a: i8, b: i8) -> pub i8 { a - b }";
    assert_eq!(output(source, r#"{"a": -3, "b": 4}"#), InputValue::signed(-7));
    assert!(matches!(
        failure(source, r#"{"a": -100, "b": 100}"#),
        ExecutionError::RangeCheckViolation { ref value, .. } if value == "-200"
    ));
}

#[test]
fn test_field_division_by_zero() {
    let source = "fn main(x: Field, y: Field) -> pub Field { x / y }";
    assert_eq!(output(source, r#"{"x": 12, "y": 4}"#), field(3));
    assert!(matches!(
        failure(source, r#"{"x": 12, "y": 0}"#),
        ExecutionError::DivisionByZero { .. }
    ));
}

#[test]
fn test_integer_division_and_remainder() {
    let source = "fn main(x: u32, y: u32) -> pub (u32, u32) { (x / y, x % y) }";
    assert_eq!(output(source, r#"{"x": 47, "y": 5}"#), InputValue::Vec(vec![field(9), field(2)]));
    assert!(matches!(
        failure(source, r#"{"x": 47, "y": 0}"#),
        ExecutionError::DivisionByZero { .. }
    ));
}

#[test]
fn test_division_in_untaken_branch() {
    let source = r#"
        fn main(x: Field, y: Field) -> pub Field {
            if y == 0 { 0 } else { x / y }
        }
    "#;
    assert_eq!(output(source, r#"{"x": 12, "y": 0}"#), field(0));
    assert_eq!(output(source, r#"{"x": 12, "y": 3}"#), field(4));
}

#[test]
fn test_assertion_in_untaken_branch() {
    let source = r#"
        fn main(c: bool, x: u8) -> pub u8 {
            let mut y = x;
            if c {
                assert(x > 100, "x too small");
                y = x - 100;
            }
            y
        }
    "#;
    assert_eq!(output(source, r#"{"c": false, "x": 5}"#), field(5));
    assert_eq!(output(source, r#"{"c": true, "x": 150}"#), field(50));
    assert!(matches!(
        failure(source, r#"{"c": true, "x": 5}"#),
        ExecutionError::AssertionFailed { .. }
    ));
}

// ============================================================================
// OPERATORS
// ============================================================================

#[test]
fn test_comparisons() {
    let source = r#"
        fn main(a: u8, b: u8) -> pub (bool, bool, bool, bool, bool) {
            (a < b, a <= b, a > b, a >= b, a == b)
        }
    "#;
    let result = |a: u64, b: u64| -> Vec<bool> {
        let json = format!(r#"{{"a": {}, "b": {}}}"#, a, b);
        match output(source, &json) {
            InputValue::Vec(items) => items
                .into_iter()
                .map(|item| matches!(item, InputValue::Bool(true)))
                .collect(),
            other => panic!("unexpected output {:?}", other),
        }
    };

    assert_eq!(result(3, 7), [true, true, false, false, false]);
    assert_eq!(result(7, 3), [false, false, true, true, false]);
    assert_eq!(result(5, 5), [false, true, false, true, true]);
    assert_eq!(result(0, 255), [true, true, false, false, false]);
}

#[test]
fn test_signed_comparison() {
    let source = "fn main(a: i8, b: i8) -> pub bool { a < b }";
    assert_eq!(output(source, r#"{"a": -5, "b": 3}"#), InputValue::Bool(true));
    assert_eq!(output(source, r#"{"a": 3, "b": -5}"#), InputValue::Bool(false));
    assert_eq!(output(source, r#"{"a": -128, "b": 127}"#), InputValue::Bool(true));
}

#[test]
fn test_bitwise_and_shifts() {
    let source = r#"
        fn main(a: u8, b: u8) -> pub (u8, u8, u8, u8, u8) {
            (a & b, a | b, a ^ b, a << 2, a >> 3)
        }
    "#;
    assert_eq!(
        output(source, r#"{"a": 200, "b": 108}"#),
        InputValue::Vec(vec![field(72), field(236), field(164), field(32), field(25)])
    );
}

#[test]
fn test_boolean_logic() {
    let source = r#"
        fn main(a: bool, b: bool) -> pub (bool, bool, bool) {
            (a && b, a || b, !a)
        }
    "#;
    let expected = [false, true, false].into_iter().map(InputValue::Bool).collect();
    assert_eq!(output(source, r#"{"a": true, "b": false}"#), InputValue::Vec(expected));
}

// ============================================================================
// DATA STRUCTURES AND CONTROL FLOW
// ============================================================================

#[test]
fn test_struct_parameter() {
    let source = r#"
        struct Point { x: Field, y: Field }
        fn main(p: Point, q: Point) -> pub Point {
            Point { x: p.x + q.x, y: p.y * q.y }
        }
    "#;
    let result = output(source, r#"{"p": {"x": 1, "y": 2}, "q": {"x": 3, "y": 4}}"#);

    let InputValue::Struct(fields) = result else { panic!("expected a struct") };
    assert_eq!(fields["x"], field(4));
    assert_eq!(fields["y"], field(8));
}

#[test]
fn test_loop_accumulation() {
    let source = r#"
        global N: u32 = 4;
        fn main(values: [u32; N]) -> pub u32 {
            let mut total: u32 = 0;
            for i in 0..N {
                total += values[i] * (i + 1);
            }
            total
        }
    "#;
    assert_eq!(output(source, r#"{"values": [1, 2, 3, 4]}"#), field(30));
}

#[test]
fn test_dynamic_index_read() {
    let source = "fn main(arr: [Field; 3], i: u32) -> pub Field { arr[i] }";
    assert_eq!(output(source, r#"{"arr": [10, 20, 30], "i": 2}"#), field(30));

    match failure(source, r#"{"arr": [10, 20, 30], "i": 3}"#) {
        ExecutionError::IndexOutOfBounds { index, length, .. } => {
            assert_eq!(index, "3");
            assert_eq!(length, 3);
        }
        other => panic!("expected an index error, got {:?}", other),
    }
}

#[test]
fn test_dynamic_index_write() {
    let source = r#"
        fn main(i: u32, v: Field) -> pub [Field; 3] {
            let mut arr: [Field; 3] = [0; 3];
            arr[i] = v;
            arr
        }
    "#;
    assert_eq!(
        output(source, r#"{"i": 1, "v": 7}"#),
        InputValue::Vec(vec![field(0), field(7), field(0)])
    );
}

#[test]
fn test_nested_branches() {
    let source = r#"
        fn main(x: u8) -> pub u8 {
            if x < 10 { 1 } else if x < 20 { 2 } else { 3 }
        }
    "#;
    assert_eq!(output(source, r#"{"x": 4}"#), field(1));
    assert_eq!(output(source, r#"{"x": 15}"#), field(2));
    assert_eq!(output(source, r#"{"x": 200}"#), field(3));
}

#[test]
fn test_inlined_helpers() {
    let source = r#"
        fn square(v: Field) -> Field { v * v }
        fn sum_of_squares(a: Field, b: Field) -> Field { square(a) + square(b) }
        fn main(a: Field, b: Field) -> pub Field { sum_of_squares(a, b + 1) }
    "#;
    assert_eq!(output(source, r#"{"a": 3, "b": 3}"#), field(25));
}

#[test]
fn test_tuple_destructuring() {
    let source = r#"
        fn split(x: u32) -> (u32, u32) { (x / 10, x % 10) }
        fn main(x: u32) -> pub u32 {
            let (tens, ones) = split(x);
            tens + ones
        }
    "#;
    assert_eq!(output(source, r#"{"x": 47}"#), field(11));
}

#[test]
fn test_both_branches_are_evaluated() {
    let source = r#"
        fn main(c: bool, x: Field) -> pub Field {
            if c { x * x } else { x * x * x }
        }
    "#;
    let compiled = compile(source, "main").unwrap();

    for c in [true, false] {
        let json = format!(r#"{{"c": {}, "x": 3}}"#, c);
        let witness = run(&compiled, &json).unwrap();
        assert_eq!(witness.len(), compiled.constraint_system.num_slots());
        // Temporaries of both arms hold their values whichever arm was taken
        assert!(witness.values().contains(&FieldElement::from_u64(9)));
        assert!(witness.values().contains(&FieldElement::from_u64(27)));
    }
}
