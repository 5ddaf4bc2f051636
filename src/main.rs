//! BIP compiler backend
//!
//! Consumes the front end's recorded output (semantic-action stream plus
//! statement tree, as JSON) and produces BIP assembly.

mod ast;
mod codegen;
mod pipeline;
mod sema;
mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use pipeline::{compile, CompileInput, CompileOutput};

/// BIP compiler backend
#[derive(Parser, Debug)]
#[command(name = "bipc")]
#[command(version = "0.1.0")]
#[command(about = "Semantic analysis and BIP code generation for the teaching language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input front-end dump (.json)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output assembly file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a front-end dump to BIP assembly
    Build {
        /// Input front-end dump
        input: PathBuf,

        /// Output assembly file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run semantic analysis only, reporting diagnostics
    Check {
        /// Input front-end dump
        input: PathBuf,
    },
    /// Print version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Build { input, output }) => compile_file(input, output.clone()),
        Some(Commands::Check { input }) => check_file(input),
        Some(Commands::Version) => {
            println!("bipc 0.1.0");
            Ok(())
        }
        None => match &cli.input {
            Some(input) => compile_file(input, cli.output.clone()),
            None => {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: bipc <FILE> or bipc build <FILE>");
                process::exit(1);
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn read_input(path: &Path) -> anyhow::Result<CompileInput> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn report(output: &CompileOutput) {
    for warning in &output.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &output.errors {
        eprintln!("error: {}", error);
    }
}

fn compile_file(input: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    println!("Compiling: {}", input.display());

    let parsed = read_input(input)?;
    let result = compile(&parsed).context("semantic analysis failed")?;
    report(&result);

    let assembly = match result.assembly {
        Some(assembly) => assembly,
        None => {
            eprintln!(
                "Compilation aborted: {} semantic error(s)",
                result.errors.len()
            );
            process::exit(1);
        }
    };

    let asm_path = output.unwrap_or_else(|| input.with_extension("asm"));
    fs::write(&asm_path, &assembly)
        .with_context(|| format!("writing {}", asm_path.display()))?;
    println!("Wrote assembly: {}", asm_path.display());
    Ok(())
}

fn check_file(input: &Path) -> anyhow::Result<()> {
    println!("Checking: {}", input.display());

    let parsed = read_input(input)?;
    let result = compile(&parsed).context("semantic analysis failed")?;
    report(&result);

    if result.assembly.is_none() {
        process::exit(1);
    }
    println!("No errors found ({} symbols)", result.symbols.len());
    Ok(())
}
