//! Round-trip soundness: every witness produced by execution satisfies the
//! circuit, and tampered witnesses are caught by the checker

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zkplay_compiler::{
    check_satisfied, compile, execute, CheckError, CompiledCircuit, FieldElement, InputMap,
    InputValue, WitnessAssignment,
};
use zkplay_runtime::{GateKind, Slot};

const SEED: u64 = 0x5eed_2024;
const TRIALS: usize = 48;

fn input(pairs: Vec<(&str, InputValue)>) -> InputMap {
    pairs.into_iter().map(|(name, value)| (name.to_string(), value)).collect()
}

/// Executes random inputs and checks every successful witness
///
/// Returns how many executions succeeded so callers can assert the generator
/// actually reaches the interesting paths.
fn round_trip(
    source: &str,
    mut generate: impl FnMut(&mut StdRng) -> InputMap,
) -> (CompiledCircuit, usize) {
    let compiled = compile(source, "main").unwrap();
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut successes = 0;
    for _ in 0..TRIALS {
        let inputs = generate(&mut rng);
        let Ok(witness) = execute(&compiled, &inputs) else { continue };
        assert_eq!(witness.len(), compiled.constraint_system.num_slots());
        if let Err(err) = check_satisfied(&compiled.constraint_system, &witness) {
            panic!("witness for {:?} violates the circuit: {}", inputs, err);
        }
        successes += 1;
    }
    (compiled, successes)
}

// ============================================================================
// ROUND TRIP
// ============================================================================

#[test]
fn test_round_trip_branches_and_comparisons() {
    let source = r#"
        fn main(a: u16, b: u16, c: bool) -> pub u32 {
            let mut acc: u32 = 0;
            if c {
                acc = a as u32 * 3;
            } else {
                acc = b as u32 + 7;
            }
            if a < b { acc += 1; }
            acc
        }
    "#;
    let (_, successes) = round_trip(source, |rng| {
        input(vec![
            ("a", InputValue::field(rng.gen_range(0..=u16::MAX as u64))),
            ("b", InputValue::field(rng.gen_range(0..=u16::MAX as u64))),
            ("c", InputValue::Bool(rng.gen())),
        ])
    });
    assert_eq!(successes, TRIALS);
}

#[test]
fn test_round_trip_dynamic_indexing() {
    let source = r#"
        fn main(arr: [u8; 4], i: u32, j: u32, v: u8) -> pub [u8; 4] {
            let mut out = arr;
            out[j] = arr[i] & v;
            out
        }
    "#;
    let (_, successes) = round_trip(source, |rng| {
        let arr = (0..4).map(|_| InputValue::field(rng.gen_range(0..256))).collect();
        input(vec![
            ("arr", InputValue::Vec(arr)),
            ("i", InputValue::field(rng.gen_range(0..6))),
            ("j", InputValue::field(rng.gen_range(0..6))),
            ("v", InputValue::field(rng.gen_range(0..256))),
        ])
    });
    assert!(successes > 0 && successes < TRIALS);
}

#[test]
fn test_round_trip_division() {
    let source = r#"
        fn main(x: u32, y: u32, f: Field, g: Field) -> pub (u32, u32, Field) {
            let q: u32 = if y == 0 { 0 } else { x / y };
            let h = if g == 0 { f } else { f / g };
            (q, x % (y + 1), h)
        }
    "#;
    let (_, successes) = round_trip(source, |rng| {
        input(vec![
            ("x", InputValue::field(rng.gen_range(0..1_000_000))),
            ("y", InputValue::field(rng.gen_range(0..4))),
            ("f", InputValue::field(rng.gen())),
            ("g", InputValue::field(rng.gen_range(0..3))),
        ])
    });
    assert_eq!(successes, TRIALS);
}

#[test]
fn test_round_trip_signed() {
    let source = r#"
        fn main(a: i8, b: i8) -> pub (i16, bool) {
            let wide = (a as i16) * (b as i16) - 5;
            (wide, a >= b)
        }
    "#;
    let (_, successes) = round_trip(source, |rng| {
        input(vec![
            ("a", InputValue::signed(rng.gen_range(-128..128))),
            ("b", InputValue::signed(rng.gen_range(-128..128))),
        ])
    });
    assert_eq!(successes, TRIALS);
}

#[test]
fn test_round_trip_hash_chain() {
    let source = r#"
        use std::hash::mimc;
        fn main(seed: Field, steps: [bool; 3]) -> pub Field {
            let mut acc = seed;
            for i in 0..3 {
                if steps[i] { acc = mimc::hash_2([acc, i as Field]); }
            }
            acc
        }
    "#;
    let (_, successes) = round_trip(source, |rng| {
        let steps = (0..3).map(|_| InputValue::Bool(rng.gen())).collect();
        input(vec![("seed", InputValue::field(rng.gen())), ("steps", InputValue::Vec(steps))])
    });
    assert_eq!(successes, TRIALS);
}

// ============================================================================
// FAILED ASSERTIONS NEVER PRODUCE A WITNESS
// ============================================================================

#[test]
fn test_false_assertion_always_fails() {
    let compiled = compile("fn main(x: u8) { assert(x > x); }", "main").unwrap();
    let mut rng = StdRng::seed_from_u64(SEED);
    for _ in 0..TRIALS {
        let inputs = input(vec![("x", InputValue::field(rng.gen_range(0..256)))]);
        assert!(execute(&compiled, &inputs).is_err());
    }
}

// ============================================================================
// TAMPERED WITNESSES
// ============================================================================

fn tampered(witness: &WitnessAssignment, slot: Slot, value: u64) -> WitnessAssignment {
    let mut values = witness.values().to_vec();
    values[slot.index()] = FieldElement::from_u64(value);
    WitnessAssignment::new(values)
}

#[test]
fn test_out_of_range_value_violates_range_gate() {
    let compiled = compile("fn main(x: u8) -> pub u8 { x }", "main").unwrap();
    let inputs = input(vec![("x", InputValue::field(44))]);
    let witness = execute(&compiled, &inputs).unwrap();

    // Keep the output copy consistent so only the range check can object
    let x = compiled.abi.param_witnesses["x"][0];
    let out = compiled.abi.return_witnesses[0];
    let forged = tampered(&tampered(&witness, x, 300), out, 300);

    let err = check_satisfied(&compiled.constraint_system, &forged).unwrap_err();
    let CheckError::Unsatisfied(violations) = err else { panic!("expected violations") };
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, GateKind::RangeDecomposition);
    assert!(violations[0].kind.is_range_check());
}

#[test]
fn test_forged_square_violates_assert_gate() {
    let compiled =
        compile("fn main(x: Field, y: pub Field) { assert(x * x == y); }", "main").unwrap();
    let inputs = input(vec![("x", InputValue::field(3)), ("y", InputValue::field(9))]);
    let witness = execute(&compiled, &inputs).unwrap();

    let y = compiled.abi.param_witnesses["y"][0];
    let err = check_satisfied(&compiled.constraint_system, &tampered(&witness, y, 10)).unwrap_err();
    assert_eq!(err.violations().len(), 1);
    assert_eq!(err.violations()[0].kind, GateKind::Assert);
}

#[test]
fn test_forged_output_violates_output_gate() {
    let source = "fn main(a: Field, b: Field) -> pub Field { a * b + 1 }";
    let compiled = compile(source, "main").unwrap();
    let inputs = input(vec![("a", InputValue::field(6)), ("b", InputValue::field(7))]);
    let witness = execute(&compiled, &inputs).unwrap();
    assert_eq!(compiled.abi.decode_return(&witness), Some(InputValue::field(43)));

    let out = compiled.abi.return_witnesses[0];
    let err =
        check_satisfied(&compiled.constraint_system, &tampered(&witness, out, 44)).unwrap_err();
    assert!(err.violations().iter().any(|v| v.kind == GateKind::Output));
}

#[test]
fn test_untaken_branch_cannot_be_forged() {
    let source = r#"
        fn main(c: bool, x: Field) -> pub Field {
            if c { x * 2 } else { x * 3 }
        }
    "#;
    let compiled = compile(source, "main").unwrap();
    let inputs = input(vec![("c", InputValue::Bool(true)), ("x", InputValue::field(5))]);
    let witness = execute(&compiled, &inputs).unwrap();

    // Flipping the condition alone leaves the selection inconsistent
    let c = compiled.abi.param_witnesses["c"][0];
    let err = check_satisfied(&compiled.constraint_system, &tampered(&witness, c, 0)).unwrap_err();
    assert!(!err.violations().is_empty());
}
