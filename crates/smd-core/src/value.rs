//! # Value Model — Ordered Runtime Value Tree
//!
//! Defines `Value`, the neutral representation of runtime data flowing
//! through the validator, and `ValueMap`, the single ordered key/value
//! container used for both structs and dicts.
//!
//! ## Design
//!
//! - Scalars carry their canonical coerced form: a validated `date` is a
//!   `Value::Date`, not a string. Re-validating a coerced value is a no-op
//!   (idempotence).
//! - `ValueMap` preserves insertion order and allows non-string keys, so a
//!   dict keyed by dates survives coercion without lossy stringification.
//!   Both plain and ordered associative inputs reduce to this one container.
//! - JSON interchange goes through `from_json`/`to_json`; coerced scalars
//!   render as their string forms on the way out (ISO dates, hyphenated
//!   uuids), which is also how they are shown in error messages.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

/// A runtime value under validation.
///
/// Integers and floats are distinct variants but share the `number`
/// runtime kind; the validator normalizes between them per builtin type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integral number.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    String(String),
    /// A calendar date (coerced form of the `date` builtin).
    Date(NaiveDate),
    /// A UTC instant (coerced form of the `datetime` builtin).
    Datetime(DateTime<Utc>),
    /// A UUID (coerced form of the `uuid` builtin).
    Uuid(Uuid),
    /// An ordered sequence of values.
    Array(Vec<Value>),
    /// An ordered key/value container.
    Object(ValueMap),
}

impl Value {
    /// The runtime kind name used in validation error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Datetime(_) => "datetime",
            Value::Uuid(_) => "uuid",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The string content, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert a `serde_json::Value` into a runtime value.
    ///
    /// Whole-valued JSON numbers become `Int`; everything else becomes
    /// `Float`. Object key order is preserved as encountered.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut out = ValueMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(Value::String(k), Value::from_json(v));
                }
                Value::Object(out)
            }
        }
    }

    /// Render as a `serde_json::Value`.
    ///
    /// Dates render as `YYYY-MM-DD`, datetimes as RFC 3339 with a `Z`
    /// suffix, uuids in hyphenated lowercase. Non-string object keys are
    /// rendered through the same scalar rules and then stringified.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Value::Datetime(dt) => {
                serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Uuid(u) => serde_json::Value::String(u.hyphenated().to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map.iter() {
                    out.insert(k.key_string(), v.to_json());
                }
                serde_json::Value::Object(out)
            }
        }
    }

    /// Render this value as an object key string.
    fn key_string(&self) -> String {
        match self.to_json() {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

/// An insertion-ordered key/value container.
///
/// Keys are full `Value`s, compared by structural equality. Lookup is
/// linear, which is appropriate for the small objects this system handles
/// (struct instances, query strings).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap(Vec<(Value, Value)>);

impl ValueMap {
    /// Create an empty map.
    pub fn new() -> Self {
        ValueMap(Vec::new())
    }

    /// Create an empty map with a capacity hint.
    pub fn with_capacity(n: usize) -> Self {
        ValueMap(Vec::with_capacity(n))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a value by key equality.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a value by string key.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// Whether a string key is present.
    pub fn contains_str(&self, key: &str) -> bool {
        self.get_str(key).is_some()
    }

    /// Insert an entry, replacing the value of an existing equal key
    /// in place (insertion position is preserved).
    pub fn insert(&mut self, key: Value, value: Value) {
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.0.iter()
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(k, _)| k)
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
