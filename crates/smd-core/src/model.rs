//! # Type Model — Structs, Unions, Enums, Typedefs, Actions
//!
//! The data model produced by the Schema Markdown parser and consumed by
//! the static validator, the runtime validator, and documentation tooling.
//!
//! ## Design
//!
//! - Every variant set is a closed sum type with exhaustive matching.
//!   There is no "presence-of-key" dispatch anywhere in the workspace.
//! - The serde shape is the interchange contract: a compiled type model
//!   serializes to plain JSON (`{"MyStruct": {"struct": {...}}}`) that the
//!   self-hosting meta schema in `smd-validate` can validate.
//! - `Types` is a `BTreeMap`, so iteration (and therefore every
//!   diagnostic-producing walk) is deterministic.
//!
//! Lifecycle: built incrementally during parsing, checked once by the
//! static validator, then treated as frozen. All read APIs take `&Types`,
//! so concurrent reads after finalize need no locking.

use std::collections::BTreeMap;
use std::ops::Not;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Map of user type name to user type. Keys are globally unique and must
/// match each entry's own `name` field (enforced by the static validator).
pub type Types = BTreeMap<String, UserType>;

/// The fixed set of builtin scalar/terminal types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinType {
    /// A string value.
    String,
    /// An integral number.
    Int,
    /// Any finite number.
    Float,
    /// A boolean.
    Bool,
    /// A calendar date.
    Date,
    /// A point in time.
    Datetime,
    /// An RFC 4122 UUID.
    Uuid,
    /// Any value, passed through unchanged.
    Object,
}

impl BuiltinType {
    /// The name as written in Schema Markdown source.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinType::String => "string",
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::Bool => "bool",
            BuiltinType::Date => "date",
            BuiltinType::Datetime => "datetime",
            BuiltinType::Uuid => "uuid",
            BuiltinType::Object => "object",
        }
    }

    /// Recognize a builtin type name. Any other identifier is a user
    /// type reference.
    pub fn from_name(name: &str) -> Option<BuiltinType> {
        match name {
            "string" => Some(BuiltinType::String),
            "int" => Some(BuiltinType::Int),
            "float" => Some(BuiltinType::Float),
            "bool" => Some(BuiltinType::Bool),
            "date" => Some(BuiltinType::Date),
            "datetime" => Some(BuiltinType::Datetime),
            "uuid" => Some(BuiltinType::Uuid),
            "object" => Some(BuiltinType::Object),
            _ => None,
        }
    }
}

impl std::fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraints attached to a type usage.
///
/// Multiple fields may be set simultaneously; each is checked
/// independently by the runtime validator. Which fields are allowed
/// depends on the effective builtin category of the constrained type:
/// value comparisons for `int`/`float`, length comparisons for `string`,
/// arrays and dicts, `nullable` everywhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    /// Permit `null` (and, for string-sourced values, the literal `"null"`).
    #[serde(default, skip_serializing_if = "Not::not")]
    pub nullable: bool,

    /// Value equals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<f64>,
    /// Value less-than.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    /// Value less-than-or-equal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
    /// Value greater-than.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    /// Value greater-than-or-equal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,

    /// Length equals.
    #[serde(rename = "lenEq", default, skip_serializing_if = "Option::is_none")]
    pub len_eq: Option<u64>,
    /// Length less-than.
    #[serde(rename = "lenLT", default, skip_serializing_if = "Option::is_none")]
    pub len_lt: Option<u64>,
    /// Length less-than-or-equal.
    #[serde(rename = "lenLTE", default, skip_serializing_if = "Option::is_none")]
    pub len_lte: Option<u64>,
    /// Length greater-than.
    #[serde(rename = "lenGT", default, skip_serializing_if = "Option::is_none")]
    pub len_gt: Option<u64>,
    /// Length greater-than-or-equal.
    #[serde(rename = "lenGTE", default, skip_serializing_if = "Option::is_none")]
    pub len_gte: Option<u64>,
}

impl Attributes {
    /// Whether no constraint field is set.
    pub fn is_empty(&self) -> bool {
        *self == Attributes::default()
    }

    /// The value comparisons that are set, as `(operator, operand)` pairs
    /// in canonical order.
    pub fn value_constraints(&self) -> Vec<(&'static str, f64)> {
        [
            ("==", self.eq),
            ("<", self.lt),
            ("<=", self.lte),
            (">", self.gt),
            (">=", self.gte),
        ]
        .into_iter()
        .filter_map(|(op, v)| v.map(|v| (op, v)))
        .collect()
    }

    /// The length comparisons that are set, as `(operator, operand)` pairs
    /// in canonical order.
    pub fn length_constraints(&self) -> Vec<(&'static str, u64)> {
        [
            ("==", self.len_eq),
            ("<", self.len_lt),
            ("<=", self.len_lte),
            (">", self.len_gt),
            (">=", self.len_gte),
        ]
        .into_iter()
        .filter_map(|(op, v)| v.map(|v| (op, v)))
        .collect()
    }
}

/// Render a comparison operand the way it appears in source and in error
/// messages: integral values print without a fractional part.
pub fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Render a value comparison (`>= 5`) for diagnostics.
pub fn render_value_constraint(op: &str, operand: f64) -> String {
    format!("{op} {}", render_number(operand))
}

/// Render a length comparison (`len >= 5`) for diagnostics.
pub fn render_length_constraint(op: &str, operand: u64) -> String {
    format!("len {op} {operand}")
}

/// A type usage: builtin, array, dict, or reference to a user type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    /// A builtin type.
    Builtin(BuiltinType),
    /// An array of values.
    Array(ArrayType),
    /// A keyed container of values.
    Dict(DictType),
    /// A reference to a user type, resolved against the `Types` map.
    User(String),
}

/// An array type: element type plus optional per-element constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayType {
    /// The element type.
    #[serde(rename = "type")]
    pub elem: Box<Type>,
    /// Constraints applied to each element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<Attributes>,
}

/// A dict type: value type, optional key type (defaults to `string`),
/// and optional per-value/per-key constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictType {
    /// The value type.
    #[serde(rename = "type")]
    pub value: Box<Type>,
    /// Constraints applied to each value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<Attributes>,
    /// The key type. Absent means `string`. Must resolve to `string` or
    /// an enum (enforced by the static validator).
    #[serde(rename = "keyType", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Box<Type>>,
    /// Constraints applied to each key.
    #[serde(rename = "keyAttr", default, skip_serializing_if = "Option::is_none")]
    pub key_attr: Option<Attributes>,
}

static STRING_TYPE: LazyLock<Type> = LazyLock::new(|| Type::Builtin(BuiltinType::String));

impl DictType {
    /// The key type, defaulting to builtin `string` when unspecified.
    pub fn key_type(&self) -> &Type {
        match &self.key {
            Some(k) => k,
            None => &STRING_TYPE,
        }
    }
}

/// A named user type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// A struct or union.
    Struct(Struct),
    /// An enumeration of named values.
    Enum(Enum),
    /// A named alias with optional constraints.
    Typedef(Typedef),
    /// A JSON-API operation with URL bindings and section types.
    Action(Action),
}

impl UserType {
    /// The definition's own name.
    pub fn name(&self) -> &str {
        match self {
            UserType::Struct(s) => &s.name,
            UserType::Enum(e) => &e.name,
            UserType::Typedef(t) => &t.name,
            UserType::Action(a) => &a.name,
        }
    }

    /// The documentation lines attached to the definition.
    pub fn doc(&self) -> &[String] {
        match self {
            UserType::Struct(s) => &s.doc,
            UserType::Enum(e) => &e.doc,
            UserType::Typedef(t) => &t.doc,
            UserType::Action(a) => &a.doc,
        }
    }
}

/// A struct (or union) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Struct {
    /// The type name.
    pub name: String,
    /// Documentation lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc: Vec<String>,
    /// Presentational documentation group.
    #[serde(rename = "docGroup", default, skip_serializing_if = "Option::is_none")]
    pub doc_group: Option<String>,
    /// Base type names, flattened bases-first by the inheritance resolver.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    /// Whether this struct is a union (exactly one member set at a time).
    #[serde(default, skip_serializing_if = "Not::not")]
    pub union: bool,
    /// The struct's own members, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<StructMember>,
}

/// A single struct member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructMember {
    /// The member name.
    pub name: String,
    /// Documentation lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc: Vec<String>,
    /// The member type.
    #[serde(rename = "type")]
    pub ty: Type,
    /// Constraints on the member value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<Attributes>,
    /// Whether the member may be absent.
    #[serde(default, skip_serializing_if = "Not::not")]
    pub optional: bool,
}

/// An enum definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    /// The type name.
    pub name: String,
    /// Documentation lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc: Vec<String>,
    /// Presentational documentation group.
    #[serde(rename = "docGroup", default, skip_serializing_if = "Option::is_none")]
    pub doc_group: Option<String>,
    /// Base enum names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    /// The enum's own values, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<EnumValue>,
}

/// A single enum value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    /// The value string.
    pub name: String,
    /// Documentation lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc: Vec<String>,
}

/// A typedef definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typedef {
    /// The type name.
    pub name: String,
    /// Documentation lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc: Vec<String>,
    /// Presentational documentation group.
    #[serde(rename = "docGroup", default, skip_serializing_if = "Option::is_none")]
    pub doc_group: Option<String>,
    /// The aliased type.
    #[serde(rename = "type")]
    pub ty: Type,
    /// Constraints applied after validating against the aliased type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<Attributes>,
}

/// An action definition: an operation with URL bindings and up to five
/// section type names (path, query, input, output, errors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The action name.
    pub name: String,
    /// Documentation lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc: Vec<String>,
    /// Presentational documentation group.
    #[serde(rename = "docGroup", default, skip_serializing_if = "Option::is_none")]
    pub doc_group: Option<String>,
    /// URL bindings. An empty list means the default binding.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<ActionUrl>,
    /// Name of the path-parameters struct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Name of the query-parameters struct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Name of the request-body struct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Name of the response-body struct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Name of the error-code enum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

impl Action {
    /// The section type names that are set, paired with the section label.
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("path", &self.path),
            ("query", &self.query),
            ("input", &self.input),
            ("output", &self.output),
            ("errors", &self.errors),
        ]
        .into_iter()
        .filter_map(|(label, name)| name.as_deref().map(|n| (label, n)))
    }
}

/// A single URL binding: optional HTTP method (absent means any) and
/// optional path (absent means the default `/ActionName` path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionUrl {
    /// HTTP method, uppercase. `None` matches any method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// URL path. `None` means the default path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
