//! Subcommand implementations

use crate::CompileOptions;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use zkplay_compiler::{
    check_satisfied, run_cases, BuiltinRegistry, CompiledCircuit, Compiler, CompilerConfig,
    CompilerError, Diagnostic, InputMap, TestCase,
};
use zkplay_exporter::{load_witness, save_abi, save_witness, CircuitArtifact};

/// `severity[kind] file:line:col: message`
pub fn render_diagnostic(file: &Path, diagnostic: &Diagnostic) -> String {
    let severity = if diagnostic.is_error() { "error" } else { "warning" };
    format!(
        "{}[{}] {}:{}: {}",
        severity,
        diagnostic.kind,
        file.display(),
        diagnostic.span,
        diagnostic.message
    )
}

/// Configuration file contents overridden by command-line flags
pub fn load_config(options: &CompileOptions) -> Result<CompilerConfig> {
    let mut config = match &options.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .context(format!("Failed to read config file: {:?}", path))?;
            serde_json::from_str(&content).context("Failed to parse config JSON")?
        }
        None => CompilerConfig::default(),
    };
    if let Some(entry) = &options.entry {
        config.entry = entry.clone();
    }
    if let Some(max_gates) = options.max_gates {
        config.max_gates = max_gates;
    }
    Ok(config)
}

fn is_artifact(path: &Path) -> bool {
    matches!(path.extension().and_then(|ext| ext.to_str()), Some("json" | "zkpc" | "bin"))
}

fn compile_source(path: &Path, options: &CompileOptions) -> Result<CompiledCircuit> {
    let source =
        fs::read_to_string(path).context(format!("Failed to read source file: {:?}", path))?;
    let compiler = Compiler::new(load_config(options)?);
    match compiler.compile(&source) {
        Ok(compiled) => {
            for warning in &compiled.warnings {
                eprintln!("{}", render_diagnostic(path, warning));
            }
            Ok(compiled)
        }
        Err(CompilerError::Rejected(diagnostics)) => {
            for diagnostic in &diagnostics {
                eprintln!("{}", render_diagnostic(path, diagnostic));
            }
            bail!("Compilation of {:?} failed with {} error(s)", path, diagnostics.len())
        }
        Err(err) => Err(err).context(format!("Failed to compile {:?}", path)),
    }
}

/// Compiles a source file, or rebuilds a circuit from a stored artifact
pub fn load_circuit(path: &Path, options: &CompileOptions) -> Result<CompiledCircuit> {
    if !is_artifact(path) {
        return compile_source(path, options);
    }
    debug!(path = %path.display(), "loading circuit artifact");
    let artifact =
        CircuitArtifact::load(path).context(format!("Failed to load artifact: {:?}", path))?;
    artifact
        .into_compiled(BuiltinRegistry::standard())
        .context(format!("Artifact {:?} could not be rebuilt", path))
}

pub fn read_inputs(path: &Path) -> Result<InputMap> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read inputs file: {:?}", path))?;
    serde_json::from_str(&content).context("Failed to parse inputs JSON")
}

pub fn read_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read cases file: {:?}", path))?;
    serde_json::from_str(&content).context("Failed to parse cases JSON")
}

pub fn compile(
    source: &Path,
    output: Option<PathBuf>,
    abi: Option<&Path>,
    options: &CompileOptions,
) -> Result<()> {
    let compiled = compile_source(source, options)?;
    let output = output.unwrap_or_else(|| source.with_extension("json"));
    CircuitArtifact::from_compiled(&compiled)
        .save(&output)
        .context(format!("Failed to write artifact to {:?}", output))?;
    if let Some(abi) = abi {
        save_abi(&compiled.abi, abi).context(format!("Failed to write ABI to {:?}", abi))?;
    }

    let cs = &compiled.constraint_system;
    println!("✅ Compiled {:?}", source);
    println!("   Entry: {}", compiled.entry());
    println!("   Slots: {} ({} public)", cs.num_slots(), cs.public_slots().len());
    println!("   Gates: {}", cs.num_gates());
    println!("   Artifact: {:?}", output);
    if let Some(abi) = abi {
        println!("   ABI: {:?}", abi);
    }
    Ok(())
}

pub fn execute(
    circuit: &Path,
    inputs: &Path,
    output: Option<&Path>,
    options: &CompileOptions,
) -> Result<()> {
    let compiled = load_circuit(circuit, options)?;
    let inputs = read_inputs(inputs)?;
    let witness = zkplay_compiler::execute(&compiled, &inputs).context("Execution failed")?;

    println!("✅ Witness computed ({} slots)", witness.len());
    if let Some(value) = compiled.abi.decode_return(&witness) {
        println!("   Returned: {}", value);
    }
    let public = witness.public_values(&compiled.constraint_system);
    let rendered: Vec<String> = public.iter().map(|v| v.to_string()).collect();
    println!("   Public values: [{}]", rendered.join(", "));
    if let Some(output) = output {
        save_witness(&compiled.constraint_system, &witness, output)
            .context(format!("Failed to write witness to {:?}", output))?;
        println!("   Output: {:?}", output);
    }
    Ok(())
}

pub fn check(circuit: &Path, witness: &Path, options: &CompileOptions) -> Result<()> {
    let compiled = load_circuit(circuit, options)?;
    let witness =
        load_witness(witness).context(format!("Failed to load witness: {:?}", witness))?;
    let cs = &compiled.constraint_system;
    match check_satisfied(cs, &witness) {
        Ok(()) => {
            println!("✅ Witness satisfies all {} gates", cs.num_gates());
            Ok(())
        }
        Err(err) => {
            println!("❌ {}", err);
            for violation in err.violations() {
                println!("   {}", violation);
            }
            bail!("Witness does not satisfy the circuit")
        }
    }
}

pub fn run_test_cases(circuit: &Path, cases: &Path, options: &CompileOptions) -> Result<()> {
    let compiled = load_circuit(circuit, options)?;
    let cases = read_cases(cases)?;
    let report = run_cases(&compiled, BuiltinRegistry::standard(), &cases);

    for result in &report.results {
        let mark = if result.passed { "✅" } else { "❌" };
        let expected = if result.expected_pass { "pass" } else { "fail" };
        println!("{} {} (expected to {})", mark, result.description, expected);
        if let Some(error) = &result.error {
            println!("   {}", error);
        }
        if let Some(output) = &result.output {
            println!("   Returned: {}", output);
        }
    }
    println!();
    println!("{} passed, {} failed, {} total", report.passed, report.failed, report.total());
    if !report.all_passed() {
        bail!("{} of {} cases did not behave as expected", report.failed, report.total());
    }
    Ok(())
}

pub fn info(circuit: &Path, options: &CompileOptions) -> Result<()> {
    let compiled = load_circuit(circuit, options)?;
    let cs = &compiled.constraint_system;

    println!("📋 Circuit: {:?}", circuit);
    println!("   Entry: {}", compiled.entry());
    println!("   Parameters:");
    for param in &compiled.abi.parameters {
        println!("     {}: {} ({})", param.name, param.ty, param.visibility);
    }
    if let Some(ret) = &compiled.abi.return_type {
        println!("   Returns: {} ({})", ret.abi_type, ret.visibility);
    }
    println!("   Slots: {} ({} public)", cs.num_slots(), cs.public_slots().len());
    println!("   Gates: {}", cs.num_gates());
    for (kind, count) in cs.gate_counts() {
        println!("     {:<20} {}", kind.to_string(), count);
    }
    if !compiled.builtins.is_empty() {
        println!("   Builtins:");
        for (name, version) in &compiled.builtins {
            println!("     {} v{}", name, version);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};
    use zkplay_compiler::Span;

    const VOTE: &str = r#"fn main(choice: u8, weight: u32, max: pub u8) -> pub u32 {
    assert(choice < max, "invalid choice");
    weight * 2
}
"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_render_diagnostic() {
        let diagnostic = Diagnostic::type_error(Span::new(3, 9, 3, 12), "unknown variable `z`");
        let rendered = render_diagnostic(Path::new("src/vote.zk"), &diagnostic);
        assert_eq!(rendered, "error[type] src/vote.zk:3:9: unknown variable `z`");

        let warning = Diagnostic::warning(Span::new(1, 5, 1, 6), "unused variable `t`");
        let rendered = render_diagnostic(Path::new("a.zk"), &warning);
        assert_eq!(rendered, "warning[type] a.zk:1:5: unused variable `t`");
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"entry": "tally", "max_unroll": 16}}"#).unwrap();

        let options = CompileOptions {
            config: Some(file.path().to_path_buf()),
            entry: None,
            max_gates: Some(1000),
        };
        let config = load_config(&options).unwrap();
        assert_eq!(config.entry, "tally");
        assert_eq!(config.max_unroll, 16);
        assert_eq!(config.max_gates, 1000);

        let options = CompileOptions { entry: Some("main".to_string()), ..options };
        assert_eq!(load_config(&options).unwrap().entry, "main");
    }

    #[test]
    fn test_load_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"entry": }}"#).unwrap();
        let options =
            CompileOptions { config: Some(file.path().to_path_buf()), ..Default::default() };
        assert!(load_config(&options).is_err());
    }

    #[test]
    fn test_load_circuit_rejects_bad_source() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.zk", "fn main(x: Field) { let y = z; }");
        let err = load_circuit(&path, &CompileOptions::default()).unwrap_err();
        assert!(err.to_string().contains("error(s)"));
    }

    #[test]
    fn test_load_circuit_missing_file() {
        let result = load_circuit(Path::new("/nonexistent/vote.zk"), &CompileOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_compile_then_load_artifact() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "vote.zk", VOTE);
        let abi = dir.path().join("vote.abi.json");
        compile(&source, None, Some(&abi), &CompileOptions::default()).unwrap();

        let artifact = dir.path().join("vote.json");
        assert!(artifact.exists());
        assert!(abi.exists());
        let from_artifact = load_circuit(&artifact, &CompileOptions::default()).unwrap();
        let from_source = load_circuit(&source, &CompileOptions::default()).unwrap();
        assert_eq!(from_artifact.constraint_system, from_source.constraint_system);
    }

    #[test]
    fn test_execute_and_check_witness() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "vote.zk", VOTE);
        let inputs = write(&dir, "inputs.json", r#"{"choice": 1, "weight": 5, "max": 3}"#);
        let witness = dir.path().join("witness.json");
        let options = CompileOptions::default();

        execute(&source, &inputs, Some(&witness), &options).unwrap();
        check(&source, &witness, &options).unwrap();

        let mut edited: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&witness).unwrap()).unwrap();
        edited["values"][1] = serde_json::json!("6");
        fs::write(&witness, edited.to_string()).unwrap();
        assert!(check(&source, &witness, &options).is_err());
    }

    #[test]
    fn test_execute_reports_failed_assertion() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "vote.zk", VOTE);
        let inputs = write(&dir, "inputs.json", r#"{"choice": 4, "weight": 5, "max": 3}"#);
        let err = execute(&source, &inputs, None, &CompileOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid choice"));
    }

    #[test]
    fn test_cases_command() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "vote.zk", VOTE);
        let cases = write(
            &dir,
            "cases.json",
            r#"[
                {"description": "valid vote", "inputs": {"choice": 0, "weight": 1, "max": 2}},
                {"description": "out of range", "inputs": {"choice": 2, "weight": 1, "max": 2},
                 "should_pass": false}
            ]"#,
        );
        run_test_cases(&source, &cases, &CompileOptions::default()).unwrap();

        let wrong = write(
            &dir,
            "wrong.json",
            r#"[{"description": "expects failure", "inputs": {"choice": 0, "weight": 1, "max": 2},
                 "should_pass": false}]"#,
        );
        assert!(run_test_cases(&source, &wrong, &CompileOptions::default()).is_err());
    }

    #[test]
    fn test_info_with_entry_override() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "vote.zk", &VOTE.replace("fn main", "fn tally"));
        assert!(info(&source, &CompileOptions::default()).is_err());

        let options = CompileOptions { entry: Some("tally".to_string()), ..Default::default() };
        info(&source, &options).unwrap();
    }

    #[test]
    fn test_read_inputs_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"invalid": json}}"#).unwrap();
        assert!(read_inputs(file.path()).is_err());
        assert!(read_cases(file.path()).is_err());
    }
}
