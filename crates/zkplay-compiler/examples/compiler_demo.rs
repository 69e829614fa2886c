//! zkplay Compiler Demo
//!
//! Demonstrates the full compiler pipeline:
//! 1. Compile a private transfer circuit
//! 2. Inspect its ABI and gate mix
//! 3. Execute it to obtain a witness
//! 4. Check the witness against the constraint system, then tamper with it

use zkplay_compiler::{check_satisfied, Compiler, FieldElement, InputMap, WitnessAssignment};

fn main() {
    println!("\n=== zkplay Compiler Demo ===\n");

    let source = r#"
        struct Account { balance: u64, nonce: u32 }

        fn main(sender: Account, amount: u64, new_balance: pub u64) -> pub u32 {
            assert(amount > 0, "amount must be positive");
            assert(sender.balance >= amount, "insufficient balance");
            assert_eq(sender.balance - amount, new_balance);
            sender.nonce + 1
        }
    "#;

    println!("STEP 1: Compile");
    println!("───────────────");
    println!("{}", source);
    let compiler = Compiler::default();
    let compiled = compiler.compile(source).expect("Failed to compile circuit");
    let cs = &compiled.constraint_system;
    println!("  Slots: {}", cs.num_slots());
    println!("  Gates: {}", cs.num_gates());
    println!("  Public slots: {}", cs.public_slots().len());
    for warning in &compiled.warnings {
        println!("  {}", warning);
    }
    println!();

    println!("STEP 2: ABI and gate mix");
    println!("────────────────────────");
    for param in &compiled.abi.parameters {
        println!("  {} : {} ({})", param.name, param.ty, param.visibility);
    }
    for (kind, count) in cs.gate_counts() {
        println!("  {:<20} {}", kind.to_string(), count);
    }
    println!();

    println!("STEP 3: Execute");
    println!("───────────────");
    let inputs: InputMap = serde_json::from_str(
        r#"{ "sender": { "balance": 1000, "nonce": 41 }, "amount": 300, "new_balance": 700 }"#,
    )
    .expect("Failed to parse inputs");
    let witness = compiler.execute(&compiled, &inputs).expect("Failed to execute circuit");
    println!("  Witness values: {}", witness.len());
    if let Some(output) = compiled.abi.decode_return(&witness) {
        println!("  Returned: {}", output);
    }
    println!();

    println!("STEP 4: Check");
    println!("─────────────");
    match check_satisfied(cs, &witness) {
        Ok(()) => println!("  ✓ Honest witness satisfies all {} gates", cs.num_gates()),
        Err(e) => println!("  ✗ Unexpected failure: {}", e),
    }

    let slot = compiled.abi.param_witnesses["new_balance"][0];
    let mut values = witness.into_values();
    values[slot.index()] = FieldElement::from_u64(900);
    match check_satisfied(cs, &WitnessAssignment::new(values)) {
        Ok(()) => println!("  ✗ Forged witness was accepted"),
        Err(e) => {
            println!("  ✓ Forged witness rejected: {}", e);
            for violation in e.violations() {
                println!("    - {}", violation);
            }
        }
    }

    println!("\n=== Demo Complete ===\n");
}
