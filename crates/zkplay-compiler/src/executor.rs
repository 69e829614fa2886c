//! Witness generation for compiled circuits

use crate::builtins::BuiltinRegistry;
use crate::error::{ExecutionError, SynthesisError};
use crate::lower::synthesize;
use crate::CompiledCircuit;
use tracing::{debug, warn};
use zkplay_runtime::{check_satisfied, InputMap, WitnessAssignment};

/// Computes the witness of `compiled` for `inputs`
///
/// The lowering walk is replayed in witness mode, so every slot the circuit
/// allocates receives a value, including the temporaries of branches that
/// were not taken. The replayed system must match the compiled one and the
/// resulting assignment must satisfy it; anything else is reported as
/// [`ExecutionError::Internal`].
pub fn execute(
    compiled: &CompiledCircuit,
    registry: &BuiltinRegistry,
    inputs: &InputMap,
) -> Result<WitnessAssignment, ExecutionError> {
    let encoded = compiled.abi.encode_inputs(inputs)?;

    for (name, version) in &compiled.builtins {
        match registry.get(name) {
            Some(builtin) if builtin.version() == *version => {}
            Some(builtin) => {
                return Err(ExecutionError::internal(format!(
                    "builtin `{}` is at version {} but the circuit was compiled against {}",
                    name,
                    builtin.version(),
                    version
                )))
            }
            None => {
                let message = format!("builtin `{}` is not registered", name);
                return Err(ExecutionError::internal(message));
            }
        }
    }

    let synthesis = synthesize(&compiled.program, registry, &compiled.config, Some(&encoded))
        .map_err(|err| match err {
            SynthesisError::Execution(err) => err,
            SynthesisError::Lowering(diagnostic) => ExecutionError::internal(format!(
                "lowering failed while generating the witness: {}",
                diagnostic
            )),
        })?;

    if synthesis.constraint_system != compiled.constraint_system {
        return Err(ExecutionError::internal(
            "witness generation produced a different constraint system",
        ));
    }
    let values = synthesis
        .witness
        .ok_or_else(|| ExecutionError::internal("witness generation produced no values"))?;
    let witness = WitnessAssignment::new(values);

    if let Err(err) = check_satisfied(&compiled.constraint_system, &witness) {
        warn!(error = %err, "generated witness does not satisfy the circuit");
        return Err(ExecutionError::internal(format!("generated witness is invalid: {}", err)));
    }

    debug!(slots = witness.len(), "executed circuit");
    Ok(witness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Compiler;
    use zkplay_runtime::{FieldElement, InputValue};

    fn inputs(pairs: &[(&str, u64)]) -> InputMap {
        pairs.iter().map(|(name, value)| (name.to_string(), InputValue::field(*value))).collect()
    }

    #[test]
    fn test_execute_square() {
        let compiled = Compiler::default()
            .compile("fn main(x: Field, y: pub Field) { assert(x * x == y); }")
            .unwrap();
        let witness =
            execute(&compiled, BuiltinRegistry::standard(), &inputs(&[("x", 3), ("y", 9)]))
                .unwrap();
        assert_eq!(witness.len(), compiled.constraint_system.num_slots());
        assert_eq!(witness.public_values(&compiled.constraint_system), [FieldElement::from_u64(9)]);
    }

    #[test]
    fn test_execute_rejects_missing_builtin() {
        let compiled = Compiler::default()
            .compile(
                "use std::hash::mimc;\n\
                 fn main(a: Field, b: Field) -> pub Field { mimc::hash_2([a, b]) }",
            )
            .unwrap();
        let inputs = inputs(&[("a", 1), ("b", 2)]);
        let err = execute(&compiled, &BuiltinRegistry::new(), &inputs).unwrap_err();
        assert!(matches!(err, ExecutionError::Internal(_)));
    }
}
