//! Standalone ABI and witness files
//!
//! The ABI file is the [`AbiDescriptor`] as JSON, exactly the shape editors
//! and proving front ends consume. The witness file wraps a
//! [`WitnessAssignment`] with a format version and the public values in
//! slot order.

use crate::artifact::check_version;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;
use zkplay_runtime::{AbiDescriptor, ConstraintSystem, FieldElement, WitnessAssignment};

/// Current witness file format version
pub const WITNESS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessFile {
    pub version: u32,
    /// One decimal value per slot
    pub values: WitnessAssignment,
    /// Values of the public slots, in slot order
    pub public_values: Vec<FieldElement>,
}

impl WitnessFile {
    pub fn new(cs: &ConstraintSystem, witness: &WitnessAssignment) -> Self {
        Self {
            version: WITNESS_VERSION,
            values: witness.clone(),
            public_values: witness.public_values(cs),
        }
    }
}

pub fn abi_to_json(abi: &AbiDescriptor) -> Result<String> {
    Ok(serde_json::to_string_pretty(abi)?)
}

pub fn abi_from_json(json: &str) -> Result<AbiDescriptor> {
    Ok(serde_json::from_str(json)?)
}

pub fn save_abi(abi: &AbiDescriptor, path: &Path) -> Result<()> {
    fs::write(path, abi_to_json(abi)?)?;
    debug!(path = %path.display(), parameters = abi.parameters.len(), "saved ABI");
    Ok(())
}

pub fn load_abi(path: &Path) -> Result<AbiDescriptor> {
    abi_from_json(&fs::read_to_string(path)?)
}

pub fn witness_to_json(cs: &ConstraintSystem, witness: &WitnessAssignment) -> Result<String> {
    Ok(serde_json::to_string_pretty(&WitnessFile::new(cs, witness))?)
}

/// Parses a witness file, rejecting unknown format versions
pub fn witness_from_json(json: &str) -> Result<WitnessAssignment> {
    let file: WitnessFile = serde_json::from_str(json)?;
    check_version("witness", file.version, WITNESS_VERSION)?;
    Ok(file.values)
}

pub fn save_witness(cs: &ConstraintSystem, witness: &WitnessAssignment, path: &Path) -> Result<()> {
    fs::write(path, witness_to_json(cs, witness)?)?;
    debug!(path = %path.display(), slots = witness.len(), "saved witness");
    Ok(())
}

pub fn load_witness(path: &Path) -> Result<WitnessAssignment> {
    witness_from_json(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use zkplay_runtime::{SlotInfo, SlotType};

    fn system() -> ConstraintSystem {
        let mut builder = zkplay_runtime::ConstraintSystemBuilder::new();
        builder.alloc(SlotInfo::private(SlotType::Field, "x"));
        builder.alloc(SlotInfo::public(SlotType::Field, "y"));
        builder.finish()
    }

    #[test]
    fn test_witness_file_lists_public_values() {
        let witness =
            WitnessAssignment::new(vec![FieldElement::from_u64(3), FieldElement::from_u64(9)]);
        let file = WitnessFile::new(&system(), &witness);
        assert_eq!(file.version, 1);
        assert_eq!(file.public_values, vec![FieldElement::from_u64(9)]);
    }

    #[test]
    fn test_witness_json_uses_decimal_strings() {
        let witness = WitnessAssignment::new(vec![FieldElement::from_u64(3), -FieldElement::one()]);
        let json = witness_to_json(&system(), &witness).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["values"][0], "3");
        assert_eq!(
            value["values"][1],
            "21888242871839275222246405745257275088548364400416034343698204186575808495616"
        );
        assert_eq!(witness_from_json(&json).unwrap(), witness);
    }

    #[test]
    fn test_witness_rejects_unknown_version() {
        let json = r#"{ "version": 7, "values": ["1"], "public_values": [] }"#;
        let err = witness_from_json(json).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedVersion { format: "witness", found: 7, .. }));
    }
}
