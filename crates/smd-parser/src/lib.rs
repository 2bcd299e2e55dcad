//! # smd-parser — Schema Markdown Front End
//!
//! A small compiler front end for the Schema Markdown DSL:
//!
//! - `grammar`: regex micro-grammars for attribute lists and typedef-style
//!   type expressions.
//! - `parser`: the line-classification state machine that builds a
//!   [`smd_core::Types`] model, recording source positions and
//!   accumulating diagnostics instead of aborting on the first error.
//! - `check`: the pure static validator that gates a model before use
//!   (name binding, inheritance, attribute applicability, cycles).
//! - `diag`: positioned diagnostics and the aggregated parse error.
//!
//! A schema is compiled with [`parse_schema_markdown`] (single text) or a
//! [`SchemaMarkdownParser`] session (multi-file accumulation followed by
//! `finalize()`). Model problems are startup failures: the caller gets
//! every diagnostic at once, deterministically sorted.

pub mod check;
pub mod diag;
pub mod grammar;
pub mod parser;

pub use check::{validate_types, TypeModelIssue};
pub use diag::{Diagnostic, Diagnostics, ParserError};
pub use parser::{parse_schema_markdown, SchemaMarkdownParser};
