//! # smd-core — Foundational Types for the Schema Markdown Toolchain
//!
//! This crate is the bedrock of the workspace. It defines the two data
//! models everything else operates on, plus the shared graph utilities:
//!
//! 1. **The value model** (`Value`, `ValueMap`): a neutral, ordered
//!    representation of runtime data. Scalars carry their coerced form
//!    (dates, datetimes, uuids are real types, not strings), and the
//!    single ordered key/value container admits non-string keys so that
//!    coerced map keys round-trip.
//!
//! 2. **The type model** (`Type`, `UserType`, `Types`): closed sum types
//!    describing structs, unions, enums, typedefs, and actions. The model
//!    is plain, inspectable data with a stable serde JSON shape; it is
//!    built by `smd-parser`, frozen after validation, and then read
//!    concurrently by the runtime validator and documentation tooling.
//!
//! 3. **Graph utilities** (`inherit`, `refs`): inheritance flattening with
//!    explicit cycle handling, typedef indirection, and the transitive
//!    closure of referenced types.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `smd-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public model types derive `Debug`, `Clone`, `PartialEq` and
//!   implement `Serialize`/`Deserialize`.

pub mod error;
pub mod inherit;
pub mod model;
pub mod refs;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use error::CircularBaseError;
pub use inherit::{
    effective_type, get_enum_values, get_struct_members, resolve_typedefs,
    try_enum_values_attributed, try_struct_members_attributed,
};
pub use model::{
    render_length_constraint, render_number, render_value_constraint, Action, ActionUrl,
    ArrayType, Attributes, BuiltinType, DictType, Enum, EnumValue, Struct, StructMember, Type,
    Typedef, Types, UserType,
};
pub use refs::get_referenced_types;
pub use value::{Value, ValueMap};
