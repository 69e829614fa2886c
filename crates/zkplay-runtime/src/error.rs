//! Error types for the zkplay runtime

use thiserror::Error;

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Failures of the field arithmetic layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Inverse or division with a zero divisor
    #[error("Division by zero")]
    DivisionByZero,

    /// An integer or byte string that is not below the field modulus
    #[error("Value {0} is not below the field modulus")]
    OutOfFieldRange(String),

    /// Text that is not a decimal or `0x` hexadecimal integer
    #[error("Invalid field literal '{0}'")]
    InvalidLiteral(String),
}

/// Failures while matching concrete inputs against an ABI
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Missing input for parameter '{0}'")]
    Missing(String),

    #[error("Unexpected input '{0}' (no such parameter)")]
    Unexpected(String),

    #[error("Type mismatch for '{path}': expected {expected}, found {found}")]
    TypeMismatch { path: String, expected: String, found: String },

    #[error("Value {value} for '{path}' does not fit in {ty}")]
    OutOfRange { path: String, value: String, ty: String },
}

/// Main error type for runtime operations
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Input(#[from] InputError),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl RuntimeError {
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
