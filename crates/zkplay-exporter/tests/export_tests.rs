use serde_json::json;
use tempfile::TempDir;
use zkplay_compiler::{
    check_satisfied, compile, execute, Builtin, BuiltinContext, BuiltinRegistry, CompilerConfig,
    Compiler, InputMap, SynthesisError,
};
use zkplay_compiler::types::Type;
use zkplay_exporter::{
    abi_from_json, abi_to_json, load_abi, load_witness, save_abi, save_witness, CircuitArtifact,
    ExportError,
};
use zkplay_runtime::{FieldElement, InputValue, LinearCombination};

const TRANSFER: &str = r#"
struct Note { value: u64, owner: Field }

fn main(note: Note, amount: u64, owner: pub Field, change: pub u64) {
    assert_eq(note.owner, owner);
    assert(note.value >= amount, "insufficient funds");
    assert_eq(note.value - amount, change);
}
"#;

fn transfer_inputs() -> InputMap {
    serde_json::from_value(json!({
        "note": { "value": 100, "owner": "0x2a" },
        "amount": 40,
        "owner": "42",
        "change": 60,
    }))
    .unwrap()
}

// ============================================================================
// Artifact round trips
// ============================================================================

#[test]
fn test_json_artifact_round_trip() {
    let compiled = compile(TRANSFER, "main").unwrap();
    let artifact = CircuitArtifact::from_compiled(&compiled);
    let json = artifact.to_json().unwrap();

    let loaded = CircuitArtifact::from_json(&json).unwrap();
    assert_eq!(loaded, artifact);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["version"], 1);
    assert_eq!(value["config"]["entry"], "main");
    assert!(value["constraint_system"]["gates"].as_array().is_some_and(|gates| !gates.is_empty()));
}

#[test]
fn test_binary_artifact_round_trip() {
    let compiled = compile(TRANSFER, "main").unwrap();
    let artifact = CircuitArtifact::from_compiled(&compiled);
    let bytes = artifact.to_bytes().unwrap();
    assert!(bytes.starts_with(b"ZKPC"));
    assert_eq!(CircuitArtifact::from_bytes(&bytes).unwrap(), artifact);
}

#[test]
fn test_binary_is_smaller_than_json() {
    let compiled = compile(TRANSFER, "main").unwrap();
    let artifact = CircuitArtifact::from_compiled(&compiled);
    assert!(artifact.to_bytes().unwrap().len() < artifact.to_json().unwrap().len());
}

#[test]
fn test_loaded_artifact_executes() {
    let compiled = compile(TRANSFER, "main").unwrap();
    let bytes = CircuitArtifact::from_compiled(&compiled).to_bytes().unwrap();

    let restored = CircuitArtifact::from_bytes(&bytes)
        .unwrap()
        .into_compiled(BuiltinRegistry::standard())
        .unwrap();
    let witness = execute(&restored, &transfer_inputs()).unwrap();
    assert!(check_satisfied(&compiled.constraint_system, &witness).is_ok());
}

#[test]
fn test_artifact_keeps_non_default_config() {
    let config = CompilerConfig::default().with_entry("transfer").with_max_gates(4096);
    let source = TRANSFER.replace("fn main", "fn transfer");
    let compiled = Compiler::new(config.clone()).compile(&source).unwrap();

    let restored = CircuitArtifact::from_json(
        &CircuitArtifact::from_compiled(&compiled).to_json().unwrap(),
    )
    .unwrap()
    .into_compiled(BuiltinRegistry::standard())
    .unwrap();
    assert_eq!(restored.config, config);
    assert_eq!(restored.entry(), "transfer");
}

// ============================================================================
// Rejection of stale or foreign data
// ============================================================================

#[test]
fn test_json_rejects_unknown_version() {
    let compiled = compile(TRANSFER, "main").unwrap();
    let mut value = serde_json::to_value(CircuitArtifact::from_compiled(&compiled)).unwrap();
    value["version"] = json!(99);
    let err = CircuitArtifact::from_json(&value.to_string()).unwrap_err();
    assert_eq!(err.to_string(), "Unsupported artifact format version 99 (expected 1)");
}

#[test]
fn test_edited_source_is_rejected() {
    let compiled = compile(TRANSFER, "main").unwrap();
    let mut artifact = CircuitArtifact::from_compiled(&compiled);
    artifact.source = artifact.source.replace("note.value - amount", "note.value + amount");
    let err = artifact.into_compiled(BuiltinRegistry::standard()).unwrap_err();
    assert!(matches!(err, ExportError::Mismatch("constraint system")));
}

#[test]
fn test_broken_source_is_a_compile_error() {
    let compiled = compile(TRANSFER, "main").unwrap();
    let mut artifact = CircuitArtifact::from_compiled(&compiled);
    artifact.source.push_str("fn broken( {");
    let err = artifact.into_compiled(BuiltinRegistry::standard()).unwrap_err();
    assert!(matches!(err, ExportError::Compile(_)));
}

struct Square;

impl Builtin for Square {
    fn name(&self) -> &str {
        "std::demo::square"
    }

    fn version(&self) -> u32 {
        1
    }

    fn params(&self) -> Vec<Type> {
        vec![Type::Field]
    }

    fn returns(&self) -> Type {
        Type::Field
    }

    fn synthesize(
        &self,
        ctx: &mut dyn BuiltinContext,
        inputs: &[LinearCombination],
    ) -> Result<Vec<LinearCombination>, SynthesisError> {
        let x = &inputs[0];
        let value = ctx.value(x).map(|v| v * v);
        let out = ctx.alloc(value, "square")?;
        ctx.constrain(x.clone(), x.clone(), out.into(), "square")?;
        Ok(vec![out.into()])
    }
}

#[test]
fn test_missing_builtin_is_rejected() {
    let mut registry = BuiltinRegistry::standard().clone();
    registry.register(Square).unwrap();
    let compiler = Compiler::with_registry(CompilerConfig::default(), registry);
    let compiled = compiler
        .compile("use std::demo::square;\nfn main(x: Field) -> pub Field { square(x) }")
        .unwrap();
    let artifact = CircuitArtifact::from_compiled(&compiled);
    assert_eq!(artifact.builtins.get("std::demo::square"), Some(&1));

    let err = artifact.clone().into_compiled(BuiltinRegistry::standard()).unwrap_err();
    assert!(matches!(err, ExportError::Compile(_)));
    assert!(artifact.into_compiled(compiler.registry()).is_ok());
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_save_and_load_detect_format() {
    let dir = TempDir::new().unwrap();
    let compiled = compile(TRANSFER, "main").unwrap();
    let artifact = CircuitArtifact::from_compiled(&compiled);

    let json_path = dir.path().join("transfer.json");
    let binary_path = dir.path().join("transfer.zkpc");
    artifact.save(&json_path).unwrap();
    artifact.save(&binary_path).unwrap();

    assert!(std::fs::read_to_string(&json_path).unwrap().trim_start().starts_with('{'));
    assert!(std::fs::read(&binary_path).unwrap().starts_with(b"ZKPC"));
    assert_eq!(CircuitArtifact::load(&json_path).unwrap(), artifact);
    assert_eq!(CircuitArtifact::load(&binary_path).unwrap(), artifact);
}

#[test]
fn test_load_missing_file() {
    let err = CircuitArtifact::load(std::path::Path::new("/nonexistent/a.zkpc")).unwrap_err();
    assert!(matches!(err, ExportError::Io(_)));
}

#[test]
fn test_abi_file_shape() {
    let dir = TempDir::new().unwrap();
    let compiled = compile(TRANSFER, "main").unwrap();
    let path = dir.path().join("abi.json");
    save_abi(&compiled.abi, &path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let params = value["parameters"].as_array().unwrap();
    let names: Vec<&str> = params.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["note", "amount", "owner", "change"]);
    assert_eq!(params[0]["type"]["kind"], "struct");
    assert_eq!(params[1]["type"]["kind"], "integer");
    assert_eq!(params[1]["visibility"], "private");
    assert_eq!(params[2]["visibility"], "public");
    assert!(value["param_witnesses"]["note"].is_array());

    assert_eq!(load_abi(&path).unwrap(), compiled.abi);
    assert_eq!(abi_from_json(&abi_to_json(&compiled.abi).unwrap()).unwrap(), compiled.abi);
}

#[test]
fn test_witness_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let compiled = compile(TRANSFER, "main").unwrap();
    let witness = execute(&compiled, &transfer_inputs()).unwrap();
    let path = dir.path().join("witness.json");
    save_witness(&compiled.constraint_system, &witness, &path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["public_values"], json!(["42", "60"]));

    let loaded = load_witness(&path).unwrap();
    assert_eq!(loaded, witness);
    assert!(check_satisfied(&compiled.constraint_system, &loaded).is_ok());
    assert_eq!(
        compiled.abi.decode_return(&loaded),
        None::<InputValue>,
        "circuit has no return value"
    );
    let amount = compiled.abi.param_witnesses["amount"][0];
    assert_eq!(loaded.get(amount), Some(FieldElement::from_u64(40)));
}
