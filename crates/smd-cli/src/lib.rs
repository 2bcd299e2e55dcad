//! # smd-cli — Schema Markdown Command-Line Interface
//!
//! ## Subcommands
//!
//! - `check` — Compile schema files and report diagnostics
//! - `validate` — Validate a JSON value against a schema type
//! - `refs` — Print the reference closure of a type
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to domain crates — no validation or
//!   parsing logic lives here.

use std::path::PathBuf;

use anyhow::Context;
use smd_core::Types;
use smd_parser::SchemaMarkdownParser;

pub mod check;
pub mod refs;
pub mod validate;

/// Compile schema files, in order, into one finalized type model.
pub(crate) fn compile_schemas(files: &[PathBuf]) -> anyhow::Result<Types> {
    let mut parser = SchemaMarkdownParser::new();
    for file in files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        parser.parse(&text, &file.display().to_string(), false)?;
    }
    parser.finalize()?;
    Ok(parser.into_types())
}
