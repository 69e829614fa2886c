//! zkplay Compiler
//!
//! Compiles programs written in the zkplay circuit language into rank-1
//! constraint systems and computes witnesses for them.
//!
//! The pipeline is parse → type check → lower. Syntax and type errors are
//! collected and returned together; lowering stops at the first error.
//!
//! ```
//! use zkplay_compiler::{check_satisfied, compile, execute, InputMap, InputValue};
//!
//! let compiled = compile("fn main(x: Field, y: pub Field) { assert(x * x == y); }", "main")
//!     .unwrap();
//!
//! let mut inputs = InputMap::new();
//! inputs.insert("x".to_string(), InputValue::field(3));
//! inputs.insert("y".to_string(), InputValue::field(9));
//! let witness = execute(&compiled, &inputs).unwrap();
//! assert!(check_satisfied(&compiled.constraint_system, &witness).is_ok());
//! ```

pub mod ast;
pub mod builtins;
pub mod cache;
pub mod cases;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod typeck;
pub mod types;

pub use builtins::{Builtin, BuiltinContext, BuiltinRegistry};
pub use cache::{CacheStats, CompileCache};
pub use cases::{run_cases, CaseReport, CaseResult, TestCase};
pub use config::CompilerConfig;
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity, Span};
pub use error::{CompilerError, ExecutionError, Result, SynthesisError};
pub use parser::parse;
pub use typeck::TypedProgram;

// Re-export runtime types for convenience
pub use zkplay_runtime::{
    check_satisfied, AbiDescriptor, CheckError, ConstraintSystem, FieldElement, InputMap,
    InputValue, ViolatedGate, WitnessAssignment,
};

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A successfully compiled circuit
#[derive(Debug, Clone)]
pub struct CompiledCircuit {
    pub source: String,
    pub constraint_system: ConstraintSystem,
    pub abi: AbiDescriptor,
    /// Warnings collected while checking the source
    pub warnings: Vec<Diagnostic>,
    /// Versions of the builtins the circuit was lowered against
    pub builtins: BTreeMap<String, u32>,
    pub config: CompilerConfig,
    program: Arc<TypedProgram>,
}

impl CompiledCircuit {
    pub fn entry(&self) -> &str {
        &self.config.entry
    }

    pub fn program(&self) -> &TypedProgram {
        &self.program
    }
}

/// Compiler front end holding the configuration and builtin registry
#[derive(Debug, Clone)]
pub struct Compiler {
    config: CompilerConfig,
    registry: BuiltinRegistry,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl Compiler {
    /// A compiler using the standard builtins
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_registry(config, BuiltinRegistry::standard().clone())
    }

    pub fn with_registry(config: CompilerConfig, registry: BuiltinRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &BuiltinRegistry {
        &self.registry
    }

    pub fn compile(&self, source: &str) -> Result<CompiledCircuit> {
        let program = parser::parse(source).map_err(CompilerError::Rejected)?;
        let typed =
            typeck::check(program, &self.registry, &self.config).map_err(CompilerError::Rejected)?;
        let synthesis =
            lower::synthesize(&typed, &self.registry, &self.config, None).map_err(|err| match err {
                SynthesisError::Lowering(diagnostic) => CompilerError::Rejected(vec![diagnostic]),
                SynthesisError::Execution(err) => CompilerError::other(err.to_string()),
            })?;
        debug!(
            entry = %self.config.entry,
            slots = synthesis.constraint_system.num_slots(),
            gates = synthesis.constraint_system.num_gates(),
            warnings = typed.warnings.len(),
            "compiled circuit"
        );
        Ok(CompiledCircuit {
            source: source.to_string(),
            constraint_system: synthesis.constraint_system,
            abi: synthesis.abi,
            warnings: typed.warnings.clone(),
            builtins: typed.builtins.clone(),
            config: self.config.clone(),
            program: Arc::new(typed),
        })
    }

    pub fn execute(
        &self,
        compiled: &CompiledCircuit,
        inputs: &InputMap,
    ) -> std::result::Result<WitnessAssignment, ExecutionError> {
        executor::execute(compiled, &self.registry, inputs)
    }
}

/// Compiles `source` with default limits, starting at `entry`
pub fn compile(source: &str, entry: &str) -> Result<CompiledCircuit> {
    Compiler::new(CompilerConfig::default().with_entry(entry)).compile(source)
}

/// Computes the witness of `compiled` using the standard builtins
pub fn execute(
    compiled: &CompiledCircuit,
    inputs: &InputMap,
) -> std::result::Result<WitnessAssignment, ExecutionError> {
    executor::execute(compiled, BuiltinRegistry::standard(), inputs)
}
