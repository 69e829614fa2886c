//! Batch execution of input cases against a compiled circuit

use crate::builtins::BuiltinRegistry;
use crate::executor::execute;
use crate::CompiledCircuit;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zkplay_runtime::{InputMap, InputValue};

/// One set of inputs and whether executing them should succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub description: String,
    pub inputs: InputMap,
    #[serde(default = "default_should_pass")]
    pub should_pass: bool,
}

fn default_should_pass() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    pub description: String,
    /// Whether the outcome matched `should_pass`
    pub passed: bool,
    pub expected_pass: bool,
    /// Execution error, when execution failed
    pub error: Option<String>,
    /// Decoded return value, when execution succeeded and the circuit returns one
    pub output: Option<InputValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    pub results: Vec<CaseResult>,
    pub passed: usize,
    pub failed: usize,
}

impl CaseReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Executes every case and compares the outcome with its expectation
///
/// A case expected to fail only passes when execution is rejected by the
/// circuit's constraints. Missing, unexpected or ill-typed inputs always
/// fail the case.
///
/// A successful execution already implies the witness satisfies the
/// circuit, so no separate check is made here.
pub fn run_cases(
    compiled: &CompiledCircuit,
    registry: &BuiltinRegistry,
    cases: &[TestCase],
) -> CaseReport {
    let mut report = CaseReport::default();
    for case in cases {
        let (passed, error, output) = match execute(compiled, registry, &case.inputs) {
            Ok(witness) => (case.should_pass, None, compiled.abi.decode_return(&witness)),
            Err(err) => {
                let passed = !case.should_pass && err.is_constraint_failure();
                (passed, Some(err.to_string()), None)
            }
        };
        debug!(case = %case.description, passed, "ran case");
        if passed {
            report.passed += 1;
        } else {
            report.failed += 1;
        }
        report.results.push(CaseResult {
            description: case.description.clone(),
            passed,
            expected_pass: case.should_pass,
            error,
            output,
        });
    }
    info!(passed = report.passed, failed = report.failed, "ran test cases");
    report
}
