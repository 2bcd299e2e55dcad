//! # Refs Subcommand
//!
//! Prints the reference closure of a type: the named type plus every
//! user type reachable from it, as names or as a subset model.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use smd_core::get_referenced_types;

/// Arguments for the refs subcommand.
#[derive(Args, Debug)]
pub struct RefsArgs {
    /// Schema Markdown source files, compiled together in order.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// The type whose closure to compute.
    #[arg(long = "type")]
    pub type_name: String,

    /// Print the subset type model as JSON instead of type names.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RefsArgs) -> anyhow::Result<()> {
    let types = crate::compile_schemas(&args.files)?;
    if !types.contains_key(&args.type_name) {
        bail!("unknown type '{}'", args.type_name);
    }

    let closure = get_referenced_types(&types, &args.type_name);
    tracing::debug!(root = %args.type_name, reachable = closure.len(), "reference closure computed");
    if args.json {
        println!("{}", serde_json::to_string_pretty(&closure)?);
    } else {
        for name in closure.keys() {
            println!("{name}");
        }
    }
    Ok(())
}
