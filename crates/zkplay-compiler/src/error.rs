//! Compiler error types

use crate::diagnostic::{Diagnostic, Span};
use thiserror::Error;
use zkplay_runtime::InputError;

/// Compilation failure
#[derive(Debug, Clone, Error)]
pub enum CompilerError {
    /// Source was rejected; all collected error diagnostics are attached
    #[error("{}", render_diagnostics(.0))]
    Rejected(Vec<Diagnostic>),

    /// A builtin with the same qualified name is already registered
    #[error("Builtin '{0}' is already registered")]
    DuplicateBuiltin(String),

    #[error("{0}")]
    Other(String),
}

impl CompilerError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// The attached diagnostics, empty for non-diagnostic failures
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompilerError::Rejected(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let lines: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
    format!("compilation failed with {} error(s):\n{}", diagnostics.len(), lines.join("\n"))
}

pub type Result<T> = std::result::Result<T, CompilerError>;

/// Failure to produce a witness for a compiled circuit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Missing input for parameter '{name}'")]
    MissingInput { name: String },

    #[error("Unexpected input '{name}' (no such parameter)")]
    UnexpectedInput { name: String },

    #[error("Type mismatch for '{path}': expected {expected}, found {found}")]
    TypeMismatch { path: String, expected: String, found: String },

    #[error("Division by zero at {location}")]
    DivisionByZero { location: String },

    #[error("Range check failed at {location}: {value} does not fit in {ty}")]
    RangeCheckViolation { location: String, value: String, ty: String },

    #[error("Assertion failed at {location}{}", message_suffix(.message))]
    AssertionFailed { location: String, message: Option<String> },

    #[error("Index {index} out of bounds for array of length {length} at {location}")]
    IndexOutOfBounds { location: String, index: String, length: usize },

    /// Lowering and execution disagree; always a compiler bug
    #[error("Internal error: {0}")]
    Internal(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default()
}

impl ExecutionError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the inputs were well formed but violate the circuit's constraints
    ///
    /// Malformed inputs and internal errors are not.
    pub fn is_constraint_failure(&self) -> bool {
        matches!(
            self,
            ExecutionError::AssertionFailed { .. }
                | ExecutionError::RangeCheckViolation { .. }
                | ExecutionError::DivisionByZero { .. }
                | ExecutionError::IndexOutOfBounds { .. }
        )
    }
}

impl From<InputError> for ExecutionError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::Missing(name) => ExecutionError::MissingInput { name },
            InputError::Unexpected(name) => ExecutionError::UnexpectedInput { name },
            InputError::TypeMismatch { path, expected, found } => {
                ExecutionError::TypeMismatch { path, expected, found }
            }
            InputError::OutOfRange { path, value, ty } => {
                ExecutionError::RangeCheckViolation { location: path, value, ty }
            }
        }
    }
}

/// Error raised while walking the program, in either mode
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// The program cannot be lowered (only raised before any result escapes)
    #[error(transparent)]
    Lowering(Diagnostic),

    /// Concrete values made the walk fail (witness mode only)
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl SynthesisError {
    pub fn lowering(span: Span, message: impl Into<String>) -> Self {
        Self::Lowering(Diagnostic::lowering(span, message))
    }

    pub fn resource(span: Span, message: impl Into<String>) -> Self {
        Self::Lowering(Diagnostic::resource_exceeded(span, message))
    }
}
