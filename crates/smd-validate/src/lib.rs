//! # smd-validate — Runtime Value Validation
//!
//! Validates runtime values against a compiled Schema Markdown type model,
//! coercing string-encoded scalars (query strings, form posts) to their
//! typed forms on the way through:
//!
//! - `validator`: the fail-fast coercing validator, `validate_type`.
//! - `typemodel`: the self-hosting meta schema. The type model of Schema
//!   Markdown is itself written in Schema Markdown, so serialized models
//!   can be validated like any other value.
//!
//! Validation is pure: inputs are borrowed, the coerced value is a new
//! tree, and a shared `&Types` can serve any number of threads.

pub mod typemodel;
pub mod validator;

pub use typemodel::{type_model, types_from_value, types_to_value, validate_type_model};
pub use validator::{validate_type, validate_type_at, ValidationError};
