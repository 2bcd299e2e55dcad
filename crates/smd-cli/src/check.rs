//! # Check Subcommand
//!
//! Compiles one or more schema files into a single type model and reports
//! every parse and static-validation diagnostic at once.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use smd_parser::SchemaMarkdownParser;

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema Markdown source files, compiled together in order.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Print the compiled type model as pretty JSON on success.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let mut parser = SchemaMarkdownParser::new();
    for file in &args.files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        parser.parse(&text, &file.display().to_string(), false)?;
    }
    parser.finalize()?;

    tracing::info!(types = parser.types().len(), files = args.files.len(), "schema compiled");
    if args.json {
        println!("{}", serde_json::to_string_pretty(parser.types())?);
    }
    Ok(())
}
