//! # smd CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// Schema Markdown toolchain.
///
/// Compiles Schema Markdown sources to type models, validates JSON
/// values against them, and inspects type reference graphs.
#[derive(Parser, Debug)]
#[command(name = "smd", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Compile schema files and report diagnostics.
    Check(smd_cli::check::CheckArgs),
    /// Validate a JSON value against a schema type.
    Validate(smd_cli::validate::ValidateArgs),
    /// Print the reference closure of a type.
    Refs(smd_cli::refs::RefsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => smd_cli::check::run(args),
        Commands::Validate(args) => smd_cli::validate::run(args),
        Commands::Refs(args) => smd_cli::refs::run(args),
    }
}
