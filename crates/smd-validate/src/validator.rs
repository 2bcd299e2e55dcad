//! # Runtime Value Validator
//!
//! Validates a [`Value`] against a named type in a compiled model,
//! returning the coerced value tree. Coercion normalizes string-encoded
//! input (query strings, form posts) to typed form: `"5"` becomes an
//! integer where an `int` is expected, `"2020-03-09"` becomes a date.
//! Validating an already-coerced value is a no-op, so double validation
//! is harmless.
//!
//! ## Design
//!
//! Fail fast: the first violation is returned as the error, with a
//! dot-joined member path locating it inside the value tree. The
//! validator never mutates its inputs and tolerates invalid models
//! (inheritance resolution is cycle-safe, unknown nested type references
//! pass values through unchanged), so it can run on models that have not
//! been through the static validator.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use thiserror::Error;

use smd_core::{
    get_enum_values, get_struct_members, render_length_constraint, render_value_constraint,
    ArrayType, Attributes, BuiltinType, DictType, Enum, Struct, Type, Types, UserType, Value,
    ValueMap,
};

static RE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date grammar"));
static RE_UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$",
    )
    .expect("uuid grammar")
});

/// Rendered values and member paths in error messages are truncated to
/// this many characters.
const MESSAGE_VALUE_LIMIT: usize = 100;

/// A runtime validation failure. The first violation encountered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A value did not match its expected type or constraints. Carries
    /// the fully rendered message.
    #[error("{0}")]
    InvalidValue(String),
    /// A required struct member was absent.
    #[error("Required member '{0}' missing")]
    RequiredMember(String),
    /// A struct value carried a key no member declares.
    #[error("Unknown member '{0}'")]
    UnknownMember(String),
    /// The requested root type is not in the model.
    #[error("Unknown type '{0}'")]
    UnknownType(String),
}

/// Validate `value` against the named user type, returning the coerced
/// value on success.
pub fn validate_type(
    types: &Types,
    type_name: &str,
    value: &Value,
) -> Result<Value, ValidationError> {
    validate_type_at(types, type_name, value, "")
}

/// Like [`validate_type`], with member paths in error messages rooted at
/// `member_path`. Callers validating a fragment of a larger value (one
/// query parameter, one request section) pass the fragment's location.
pub fn validate_type_at(
    types: &Types,
    type_name: &str,
    value: &Value,
    member_path: &str,
) -> Result<Value, ValidationError> {
    if !types.contains_key(type_name) {
        return Err(ValidationError::UnknownType(type_name.to_string()));
    }
    let root = Type::User(type_name.to_string());
    validate_value(types, &root, None, value, member_path)
}

// ─── Core recursion ──────────────────────────────────────────────────

fn validate_value(
    types: &Types,
    ty: &Type,
    attr: Option<&Attributes>,
    value: &Value,
    path: &str,
) -> Result<Value, ValidationError> {
    if attr.is_some_and(|a| a.nullable) && is_nullish(value) {
        return Ok(Value::Null);
    }

    let coerced = match ty {
        Type::Builtin(builtin) => validate_builtin(*builtin, value, path)?,
        Type::Array(array) => validate_array(types, array, value, path)?,
        Type::Dict(dict) => validate_dict(types, dict, value, path)?,
        Type::User(name) => match types.get(name) {
            Some(UserType::Struct(st)) => validate_struct(types, st, value, path)?,
            Some(UserType::Enum(en)) => validate_enum(types, en, value, path)?,
            Some(UserType::Typedef(td)) => {
                if td.attr.as_ref().is_some_and(|a| a.nullable) && is_nullish(value) {
                    return Ok(Value::Null);
                }
                let inner = validate_value(types, &td.ty, None, value, path)?;
                if let Some(td_attr) = &td.attr {
                    check_constraints(td_attr, &inner, path, name)?;
                }
                inner
            }
            Some(UserType::Action(_)) => return Err(invalid(value, path, name, None)),
            // A reference to a type absent from the model: pass the value
            // through unchanged rather than guessing at semantics.
            None => return Ok(value.clone()),
        },
    };

    if let Some(attr) = attr {
        check_constraints(attr, &coerced, path, type_label(ty))?;
    }
    Ok(coerced)
}

// ─── Builtins ────────────────────────────────────────────────────────

fn validate_builtin(
    builtin: BuiltinType,
    value: &Value,
    path: &str,
) -> Result<Value, ValidationError> {
    let coerced = match builtin {
        BuiltinType::String => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            _ => None,
        },
        BuiltinType::Int => coerce_int(value),
        BuiltinType::Float => coerce_float(value),
        BuiltinType::Bool => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) if s == "true" => Some(Value::Bool(true)),
            Value::String(s) if s == "false" => Some(Value::Bool(false)),
            _ => None,
        },
        BuiltinType::Date => coerce_date(value),
        BuiltinType::Datetime => coerce_datetime(value),
        BuiltinType::Uuid => coerce_uuid(value),
        BuiltinType::Object => match value {
            Value::Null => None,
            other => Some(other.clone()),
        },
    };
    coerced.ok_or_else(|| invalid(value, path, builtin.as_str(), None))
}

fn coerce_int(value: &Value) -> Option<Value> {
    match value {
        Value::Int(i) => Some(Value::Int(*i)),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(Value::Int(*f as i64)),
        Value::String(s) => match s.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(Value::Int(f as i64)),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<Value> {
    match value {
        Value::Int(i) => Some(Value::Float(*i as f64)),
        Value::Float(f) if f.is_finite() => Some(Value::Float(*f)),
        Value::String(s) => match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Some(Value::Float(f)),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_date(value: &Value) -> Option<Value> {
    match value {
        Value::Date(d) => Some(Value::Date(*d)),
        Value::Datetime(dt) => Some(Value::Date(truncate_datetime(dt))),
        Value::String(s) => {
            if RE_DATE.is_match(s) {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Value::Date)
            } else {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| Value::Date(truncate_datetime(&dt.with_timezone(&Utc))))
            }
        }
        _ => None,
    }
}

fn coerce_datetime(value: &Value) -> Option<Value> {
    match value {
        Value::Datetime(dt) => Some(Value::Datetime(*dt)),
        Value::Date(d) => Some(Value::Datetime(midnight_utc(*d))),
        Value::String(s) => {
            if RE_DATE.is_match(s) {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .map(|d| Value::Datetime(midnight_utc(d)))
            } else {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| Value::Datetime(dt.with_timezone(&Utc)))
            }
        }
        _ => None,
    }
}

fn coerce_uuid(value: &Value) -> Option<Value> {
    match value {
        Value::Uuid(u) => Some(Value::Uuid(*u)),
        Value::String(s) if RE_UUID.is_match(s) => {
            uuid::Uuid::parse_str(s).ok().map(Value::Uuid)
        }
        _ => None,
    }
}

fn midnight_utc(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN))
}

/// Truncate a datetime to a date the way the reference toolchain does:
/// local-zone year and month combined with the UTC day of month. For
/// combinations the local calendar does not have, falls back to the
/// plain UTC date.
fn truncate_datetime(dt: &DateTime<Utc>) -> NaiveDate {
    let local = dt.with_timezone(&Local);
    NaiveDate::from_ymd_opt(local.year(), local.month(), dt.day())
        .unwrap_or_else(|| dt.date_naive())
}

// ─── Containers ──────────────────────────────────────────────────────

fn validate_array(
    types: &Types,
    array: &ArrayType,
    value: &Value,
    path: &str,
) -> Result<Value, ValidationError> {
    let items: &[Value] = match value {
        Value::Array(items) => items,
        Value::String(s) if s.is_empty() => &[],
        _ => return Err(invalid(value, path, "array", None)),
    };
    let mut out = Vec::with_capacity(items.len());
    for (ix, item) in items.iter().enumerate() {
        let child = join_path(path, &ix.to_string());
        out.push(validate_value(
            types,
            &array.elem,
            array.attr.as_ref(),
            item,
            &child,
        )?);
    }
    Ok(Value::Array(out))
}

fn validate_dict(
    types: &Types,
    dict: &DictType,
    value: &Value,
    path: &str,
) -> Result<Value, ValidationError> {
    let empty = ValueMap::new();
    let map = match value {
        Value::Object(map) => map,
        Value::String(s) if s.is_empty() => &empty,
        _ => return Err(invalid(value, path, "dict", None)),
    };
    let key_type = dict.key_type();
    let mut out = ValueMap::with_capacity(map.len());
    for (key, item) in map.iter() {
        let coerced_key = validate_value(types, key_type, dict.key_attr.as_ref(), key, path)?;
        let child = join_path(path, &key_segment(key));
        let coerced_item = validate_value(types, &dict.value, dict.attr.as_ref(), item, &child)?;
        out.insert(coerced_key, coerced_item);
    }
    Ok(Value::Object(out))
}

// ─── User types ──────────────────────────────────────────────────────

fn validate_struct(
    types: &Types,
    st: &Struct,
    value: &Value,
    path: &str,
) -> Result<Value, ValidationError> {
    let empty = ValueMap::new();
    let map = match value {
        Value::Object(map) => map,
        Value::String(s) if s.is_empty() => &empty,
        _ => return Err(invalid(value, path, &st.name, None)),
    };
    if st.union && map.len() != 1 {
        return Err(invalid(value, path, &st.name, None));
    }

    let members = get_struct_members(types, st);
    let mut out = ValueMap::with_capacity(map.len());
    let mut matched = 0usize;
    for member in &members {
        let child = join_path(path, &member.name);
        match map.get_str(&member.name) {
            Some(item) => {
                matched += 1;
                let coerced =
                    validate_value(types, &member.ty, member.attr.as_ref(), item, &child)?;
                out.insert(Value::String(member.name.clone()), coerced);
            }
            None => {
                if !member.optional && !st.union {
                    return Err(ValidationError::RequiredMember(child));
                }
            }
        }
    }

    // More input keys than declared members matched: locate the first
    // undeclared key in input order.
    if map.len() > matched {
        let declared: HashSet<&str> = members.iter().map(|m| m.name.as_str()).collect();
        for (key, _) in map.iter() {
            let undeclared = match key.as_str() {
                Some(s) => !declared.contains(s),
                None => true,
            };
            if undeclared {
                let full = join_path(path, &key_segment(key));
                return Err(ValidationError::UnknownMember(truncate(
                    full,
                    MESSAGE_VALUE_LIMIT,
                )));
            }
        }
    }
    Ok(Value::Object(out))
}

fn validate_enum(
    types: &Types,
    en: &Enum,
    value: &Value,
    path: &str,
) -> Result<Value, ValidationError> {
    if let Value::String(s) = value {
        if get_enum_values(types, en).iter().any(|v| v.name == *s) {
            return Ok(Value::String(s.clone()));
        }
    }
    Err(invalid(value, path, &en.name, None))
}

// ─── Constraints ─────────────────────────────────────────────────────

/// Check value/length constraints against a coerced, non-null value.
/// Value comparisons apply to numbers, length comparisons to strings,
/// arrays, and objects; constraint kinds a value has no measure for are
/// skipped (the static validator reports those model problems).
fn check_constraints(
    attr: &Attributes,
    coerced: &Value,
    path: &str,
    expected: &str,
) -> Result<(), ValidationError> {
    let number = match coerced {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    };
    if let Some(n) = number {
        for (op, operand) in attr.value_constraints() {
            if !compare(n, op, operand) {
                return Err(invalid(
                    coerced,
                    path,
                    expected,
                    Some(render_value_constraint(op, operand)),
                ));
            }
        }
    }

    let length = match coerced {
        Value::String(s) => Some(s.chars().count() as u64),
        Value::Array(items) => Some(items.len() as u64),
        Value::Object(map) => Some(map.len() as u64),
        _ => None,
    };
    if let Some(len) = length {
        for (op, operand) in attr.length_constraints() {
            if !compare(len as f64, op, operand as f64) {
                return Err(invalid(
                    coerced,
                    path,
                    expected,
                    Some(render_length_constraint(op, operand)),
                ));
            }
        }
    }
    Ok(())
}

fn compare(left: f64, op: &str, right: f64) -> bool {
    match op {
        "==" => left == right,
        "<" => left < right,
        "<=" => left <= right,
        ">" => left > right,
        ">=" => left >= right,
        _ => true,
    }
}

// ─── Rendering ───────────────────────────────────────────────────────

fn is_nullish(value: &Value) -> bool {
    value.is_null() || value.as_str() == Some("null")
}

fn type_label(ty: &Type) -> &str {
    match ty {
        Type::Builtin(builtin) => builtin.as_str(),
        Type::Array(_) => "array",
        Type::Dict(_) => "dict",
        Type::User(name) => name,
    }
}

fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

fn key_segment(key: &Value) -> String {
    match key.as_str() {
        Some(s) => s.to_string(),
        None => match key.to_json() {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        },
    }
}

fn truncate(text: String, limit: usize) -> String {
    if text.chars().count() <= limit {
        text
    } else {
        text.chars().take(limit).collect()
    }
}

fn invalid(
    value: &Value,
    path: &str,
    expected: &str,
    constraint: Option<String>,
) -> ValidationError {
    let rendered = truncate(value.to_json().to_string(), MESSAGE_VALUE_LIMIT);
    let mut message = format!("Invalid value {rendered} (type '{}')", value.kind());
    if !path.is_empty() {
        message.push_str(&format!(" for member '{path}'"));
    }
    message.push_str(&format!(", expected type '{expected}'"));
    if let Some(constraint) = constraint {
        message.push_str(&format!(" [{constraint}]"));
    }
    ValidationError::InvalidValue(message)
}
