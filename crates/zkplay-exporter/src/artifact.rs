//! Compiled circuit artifacts
//!
//! A [`CircuitArtifact`] is everything needed to hand a circuit to a proving
//! backend in another process, plus the source and configuration it was
//! compiled from so the compiler can rebuild it for witness generation.
//!
//! Two encodings are supported:
//!
//! - JSON, a self-describing object carrying `"version": 1`
//! - binary, `b"ZKPC"` followed by the format version as a little-endian
//!   `u32` and a bincode body

use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;
use zkplay_compiler::{BuiltinRegistry, CompiledCircuit, Compiler, CompilerConfig};
use zkplay_runtime::{AbiDescriptor, ConstraintSystem};

/// Current artifact format version
pub const ARTIFACT_VERSION: u32 = 1;

/// Leading bytes of a binary artifact
pub const MAGIC: [u8; 4] = *b"ZKPC";

/// Encoding of an artifact on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Binary,
}

impl ArtifactFormat {
    /// Binary for `.zkpc` and `.bin` files, JSON otherwise
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("zkpc") | Some("bin") => ArtifactFormat::Binary,
            _ => ArtifactFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitArtifact {
    pub version: u32,
    pub config: CompilerConfig,
    pub source: String,
    /// Builtin versions the circuit was lowered against
    pub builtins: BTreeMap<String, u32>,
    pub abi: AbiDescriptor,
    pub constraint_system: ConstraintSystem,
}

// The ABI travels as embedded JSON: its tagged type enum needs a
// self-describing format.
#[derive(Serialize)]
struct BinaryBodyRef<'a> {
    config: &'a CompilerConfig,
    source: &'a str,
    builtins: &'a BTreeMap<String, u32>,
    abi: String,
    constraint_system: &'a ConstraintSystem,
}

#[derive(Deserialize)]
struct BinaryBody {
    config: CompilerConfig,
    source: String,
    builtins: BTreeMap<String, u32>,
    abi: String,
    constraint_system: ConstraintSystem,
}

impl CircuitArtifact {
    pub fn from_compiled(compiled: &CompiledCircuit) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            config: compiled.config.clone(),
            source: compiled.source.clone(),
            builtins: compiled.builtins.clone(),
            abi: compiled.abi.clone(),
            constraint_system: compiled.constraint_system.clone(),
        }
    }

    /// Recompiles the stored source and checks it reproduces this artifact
    ///
    /// Fails with [`ExportError::Mismatch`] when the compiler or the builtins
    /// in `registry` have drifted from the ones that produced the artifact.
    pub fn into_compiled(self, registry: &BuiltinRegistry) -> Result<CompiledCircuit> {
        check_version("artifact", self.version, ARTIFACT_VERSION)?;
        let compiler = Compiler::with_registry(self.config.clone(), registry.clone());
        let compiled = compiler.compile(&self.source)?;
        if compiled.builtins != self.builtins {
            return Err(ExportError::Mismatch("builtin set"));
        }
        if compiled.abi != self.abi {
            return Err(ExportError::Mismatch("ABI"));
        }
        if compiled.constraint_system != self.constraint_system {
            return Err(ExportError::Mismatch("constraint system"));
        }
        debug!(entry = %compiled.entry(), "reconstructed compiled circuit from artifact");
        Ok(compiled)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let found = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
        check_version("artifact", u32::try_from(found).unwrap_or(u32::MAX), ARTIFACT_VERSION)?;
        let artifact: Self = serde_json::from_value(value)?;
        artifact.constraint_system.validate()?;
        Ok(artifact)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = BinaryBodyRef {
            config: &self.config,
            source: &self.source,
            builtins: &self.builtins,
            abi: serde_json::to_string(&self.abi)?,
            constraint_system: &self.constraint_system,
        };
        let mut bytes = Vec::with_capacity(1024);
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bincode::serialize_into(&mut bytes, &body)?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let rest = bytes.strip_prefix(&MAGIC[..]).ok_or(ExportError::BadMagic)?;
        if rest.len() < 4 {
            return Err(ExportError::BadMagic);
        }
        let (version, body) = rest.split_at(4);
        let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
        check_version("artifact", version, ARTIFACT_VERSION)?;
        let body: BinaryBody = bincode::deserialize(body)?;
        body.constraint_system.validate()?;
        Ok(Self {
            version,
            config: body.config,
            source: body.source,
            builtins: body.builtins,
            abi: serde_json::from_str(&body.abi)?,
            constraint_system: body.constraint_system,
        })
    }

    /// Writes the artifact in the format implied by the file extension
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = match ArtifactFormat::from_path(path) {
            ArtifactFormat::Json => self.to_json()?.into_bytes(),
            ArtifactFormat::Binary => self.to_bytes()?,
        };
        fs::write(path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved circuit artifact");
        Ok(())
    }

    /// Reads an artifact in either format, detected from its contents
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "loading circuit artifact");
        if bytes.starts_with(&MAGIC) {
            Self::from_bytes(&bytes)
        } else {
            let text = String::from_utf8(bytes).map_err(|_| ExportError::BadMagic)?;
            Self::from_json(&text)
        }
    }
}

pub(crate) fn check_version(format: &'static str, found: u32, expected: u32) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(ExportError::version(format, found, expected))
    }
}
