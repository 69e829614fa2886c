//! Exporter error types

use thiserror::Error;
use zkplay_compiler::CompilerError;
use zkplay_runtime::RuntimeError;

/// Result type alias for export and import operations
pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data does not start with the artifact magic bytes
    #[error("Not a zkplay artifact (bad magic bytes)")]
    BadMagic,

    #[error("Unsupported {format} format version {found} (expected {expected})")]
    UnsupportedVersion { format: &'static str, found: u32, expected: u32 },

    /// The stored constraint system references slots it never allocated
    #[error("Malformed constraint system: {0}")]
    Malformed(#[from] RuntimeError),

    /// The stored source no longer compiles
    #[error("Stored source failed to compile: {0}")]
    Compile(#[from] CompilerError),

    /// Recompiling the stored source produced a different circuit
    #[error("Artifact does not match its source: {0} differs")]
    Mismatch(&'static str),
}

impl ExportError {
    pub(crate) fn version(format: &'static str, found: u32, expected: u32) -> Self {
        Self::UnsupportedVersion { format, found, expected }
    }
}
