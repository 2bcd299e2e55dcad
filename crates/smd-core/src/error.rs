//! # Error Types
//!
//! Errors raised by the shared graph utilities. Parser diagnostics and
//! runtime validation errors live with their components (`smd-parser`,
//! `smd-validate`); this crate only owns the cycle signal that both of
//! them consume.

use thiserror::Error;

/// A base-inheritance chain re-entered the type being flattened.
///
/// Raised only by the strict flattening entry points; the lenient entry
/// points stop at repeats instead, so call sites outside the static
/// validator never observe this error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("circular base chain re-enters type '{type_name}'")]
pub struct CircularBaseError {
    /// The type whose resolution chain looped back onto itself.
    pub type_name: String,
}
