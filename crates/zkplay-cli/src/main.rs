//! zkplay command-line interface
//!
//! Compile circuits, generate witnesses and check them locally.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "zkplay")]
#[command(about = "Compile circuits to constraint systems and generate witnesses")]
#[command(long_about = None)]
struct Cli {
    /// Log debug output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that compiles source
#[derive(Args, Debug, Clone, Default)]
pub struct CompileOptions {
    /// Compiler configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Entry function name
    #[arg(short, long)]
    pub entry: Option<String>,

    /// Maximum number of gates
    #[arg(long)]
    pub max_gates: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file into a circuit artifact
    Compile {
        /// Source file
        source: PathBuf,

        /// Artifact output (`.zkpc` or `.bin` for binary, JSON otherwise)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the ABI as JSON
        #[arg(long)]
        abi: Option<PathBuf>,

        #[command(flatten)]
        options: CompileOptions,
    },

    /// Compute a witness for a circuit from JSON inputs
    Execute {
        /// Source file or circuit artifact
        circuit: PathBuf,

        /// Inputs JSON file
        #[arg(short, long)]
        inputs: PathBuf,

        /// Output file for the witness
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: CompileOptions,
    },

    /// Check a witness against a circuit
    Check {
        /// Source file or circuit artifact
        circuit: PathBuf,

        /// Witness JSON file
        #[arg(short, long)]
        witness: PathBuf,

        #[command(flatten)]
        options: CompileOptions,
    },

    /// Run a list of input cases against a circuit
    Test {
        /// Source file or circuit artifact
        circuit: PathBuf,

        /// Cases JSON file
        #[arg(short, long)]
        cases: PathBuf,

        #[command(flatten)]
        options: CompileOptions,
    },

    /// Show information about a circuit
    Info {
        /// Source file or circuit artifact
        circuit: PathBuf,

        #[command(flatten)]
        options: CompileOptions,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile { source, output, abi, options } => {
            commands::compile(&source, output, abi.as_deref(), &options)
        }
        Commands::Execute { circuit, inputs, output, options } => {
            commands::execute(&circuit, &inputs, output.as_deref(), &options)
        }
        Commands::Check { circuit, witness, options } => {
            commands::check(&circuit, &witness, &options)
        }
        Commands::Test { circuit, cases, options } => {
            commands::run_test_cases(&circuit, &cases, &options)
        }
        Commands::Info { circuit, options } => commands::info(&circuit, &options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compile_flags() {
        let cli = Cli::parse_from([
            "zkplay",
            "compile",
            "vote.zk",
            "--entry",
            "tally",
            "--max-gates",
            "500",
            "-o",
            "vote.zkpc",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Compile { source, output, options, .. } => {
                assert_eq!(source, PathBuf::from("vote.zk"));
                assert_eq!(output, Some(PathBuf::from("vote.zkpc")));
                assert_eq!(options.entry.as_deref(), Some("tally"));
                assert_eq!(options.max_gates, Some(500));
            }
            _ => panic!("expected compile"),
        }
    }

    #[test]
    fn test_execute_requires_inputs() {
        assert!(Cli::try_parse_from(["zkplay", "execute", "vote.zk"]).is_err());
    }
}
