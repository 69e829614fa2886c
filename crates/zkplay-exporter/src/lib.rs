//! zkplay Exporter
//!
//! Stable, versioned file formats for compiled circuits, so a circuit
//! compiled once can be stored and later consumed by a proving backend or
//! by the compiler in another process.

pub mod artifact;
pub mod error;
pub mod witness;

pub use artifact::{ArtifactFormat, CircuitArtifact, ARTIFACT_VERSION, MAGIC};
pub use error::{ExportError, Result};
pub use witness::{
    abi_from_json, abi_to_json, load_abi, load_witness, save_abi, save_witness, witness_from_json,
    witness_to_json, WitnessFile, WITNESS_VERSION,
};
