//! # Validate Subcommand
//!
//! Validates a JSON value against a named schema type and prints the
//! coerced value.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Args};
use smd_core::Value;
use smd_validate::validate_type;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["value", "value_file"])))]
pub struct ValidateArgs {
    /// Schema Markdown source files, compiled together in order.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// The type to validate against.
    #[arg(long = "type")]
    pub type_name: String,

    /// The JSON value to validate.
    #[arg(long)]
    pub value: Option<String>,

    /// File containing the JSON value to validate.
    #[arg(long)]
    pub value_file: Option<PathBuf>,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let types = crate::compile_schemas(&args.files)?;

    let json_text = match (&args.value, &args.value_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        // clap enforces the input group.
        (None, None) => anyhow::bail!("one of --value or --value-file is required"),
    };
    let json: serde_json::Value = serde_json::from_str(&json_text).context("parsing JSON value")?;

    tracing::debug!(types = types.len(), type_name = %args.type_name, "schema compiled");
    let coerced = validate_type(&types, &args.type_name, &Value::from_json(json))?;
    println!("{}", serde_json::to_string_pretty(&coerced.to_json())?);
    Ok(())
}
