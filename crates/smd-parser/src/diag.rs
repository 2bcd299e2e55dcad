//! # Diagnostics — Positioned, Aggregated Model Errors
//!
//! Parse-time and static-validation problems are collected, deduplicated
//! by structured key (filename, line, message), sorted, and reported
//! together. These are startup/build-time failures: callers treat them
//! as fatal to initialization, not retryable.

use std::fmt;

use thiserror::Error;

/// A single positioned diagnostic.
///
/// The derived ordering (filename, then line, then message) is the
/// deterministic report order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Diagnostic {
    /// Source filename, empty when the schema was parsed from a string
    /// without a filename tag.
    pub filename: String,
    /// One-based source line.
    pub line: usize,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.filename, self.line, self.message)
    }
}

/// A sorted, deduplicated collection of diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Build from an arbitrary collection: deduplicates structurally and
    /// sorts by (filename, line, message).
    pub fn from_unsorted(diagnostics: Vec<Diagnostic>) -> Self {
        let set: std::collections::BTreeSet<Diagnostic> = diagnostics.into_iter().collect();
        Diagnostics(set.into_iter().collect())
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no diagnostics.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The diagnostics in report order.
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Failure to compile a Schema Markdown model: one or more parse or
/// static-validation diagnostics.
#[derive(Error, Debug, Clone)]
#[error("{diagnostics}")]
pub struct ParserError {
    /// All diagnostics, sorted.
    pub diagnostics: Diagnostics,
}
