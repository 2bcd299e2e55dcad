//! # Self-Hosting Type-Model Schema
//!
//! The Schema Markdown type model, described in Schema Markdown. A
//! serialized [`Types`] map is itself a value, so it can be validated by
//! the runtime validator against this meta schema. That closes the loop:
//! models arriving as JSON are checked with the same machinery as any
//! other payload before being deserialized.

use std::sync::LazyLock;

use smd_core::{Types, Value};
use smd_parser::parse_schema_markdown;

use crate::validator::{validate_type, ValidationError};

/// The type-model schema source.
pub const TYPE_MODEL_SMD: &str = r#"
group "Type Model"

# Map of user type name to user type definition
typedef UserType{len > 0} Types

# A user type definition
union UserType

    # A struct (or union) definition
    Struct struct

    # An enumeration definition
    Enum enum

    # A typedef definition
    Typedef typedef

    # An action definition
    Action action

# A type usage
union Type

    # A builtin type
    BuiltinType builtin

    # An array type
    ArrayType array

    # A dict type
    DictType dict

    # A user type name
    string user

# The builtin types
enum BuiltinType
    string
    int
    float
    bool
    date
    datetime
    uuid
    object

# An array type
struct ArrayType

    # The element type
    Type type

    # Constraints applied to each element
    optional Attributes attr

# A dict type
struct DictType

    # The value type
    Type type

    # Constraints applied to each value
    optional Attributes attr

    # The key type (string when omitted)
    optional Type keyType

    # Constraints applied to each key
    optional Attributes keyAttr

# Constraints attached to a type usage
struct Attributes

    # Permit null values
    optional bool nullable

    # Value equals
    optional float eq

    # Value less-than
    optional float lt

    # Value less-than-or-equal
    optional float lte

    # Value greater-than
    optional float gt

    # Value greater-than-or-equal
    optional float gte

    # Length equals
    optional int(>= 0) lenEq

    # Length less-than
    optional int(>= 0) lenLT

    # Length less-than-or-equal
    optional int(>= 0) lenLTE

    # Length greater-than
    optional int(>= 0) lenGT

    # Length greater-than-or-equal
    optional int(>= 0) lenGTE

# A struct (or union) definition
struct Struct

    # The type name
    string name

    # Documentation lines
    optional string[] doc

    # Documentation group
    optional string docGroup

    # Base type names
    optional string[] bases

    # Whether this is a union
    optional bool union

    # The members, in declaration order
    optional StructMember[] members

# A struct member
struct StructMember

    # The member name
    string name

    # Documentation lines
    optional string[] doc

    # The member type
    Type type

    # Constraints on the member value
    optional Attributes attr

    # Whether the member may be absent
    optional bool optional

# An enumeration definition
struct Enum

    # The type name
    string name

    # Documentation lines
    optional string[] doc

    # Documentation group
    optional string docGroup

    # Base enum names
    optional string[] bases

    # The values, in declaration order
    optional EnumValue[] values

# An enumeration value
struct EnumValue

    # The value string
    string name

    # Documentation lines
    optional string[] doc

# A typedef definition
struct Typedef

    # The type name
    string name

    # Documentation lines
    optional string[] doc

    # Documentation group
    optional string docGroup

    # The aliased type
    Type type

    # Constraints applied after the aliased type
    optional Attributes attr

# An action definition
struct Action

    # The action name
    string name

    # Documentation lines
    optional string[] doc

    # Documentation group
    optional string docGroup

    # The URL bindings
    optional ActionUrl[] urls

    # The path-parameters struct name
    optional string path

    # The query-parameters struct name
    optional string query

    # The request-body struct name
    optional string input

    # The response-body struct name
    optional string output

    # The error-code enum name
    optional string errors

# An action URL binding
struct ActionUrl

    # The HTTP method (any method when omitted)
    optional string method

    # The URL path (the default path when omitted)
    optional string path
"#;

static TYPE_MODEL: LazyLock<Types> = LazyLock::new(|| {
    parse_schema_markdown(TYPE_MODEL_SMD).expect("type-model schema is valid")
});

/// The compiled meta model.
pub fn type_model() -> &'static Types {
    &TYPE_MODEL
}

/// Validate a value as a serialized type model.
pub fn validate_type_model(value: &Value) -> Result<Value, ValidationError> {
    validate_type(type_model(), "Types", value)
}

/// Serialize a type model to a runtime value.
pub fn types_to_value(types: &Types) -> Result<Value, serde_json::Error> {
    Ok(Value::from_json(serde_json::to_value(types)?))
}

/// Deserialize a type model from a runtime value.
pub fn types_from_value(value: &Value) -> Result<Types, serde_json::Error> {
    serde_json::from_value(value.to_json())
}
