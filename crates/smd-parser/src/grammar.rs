//! # Micro-Grammars — Attribute Lists and Type Expressions
//!
//! Regex-driven grammars for the two sub-languages embedded in Schema
//! Markdown lines:
//!
//! - Attribute lists: `nullable`, value comparisons (`> 0`, `== 10`) and
//!   length comparisons (`len > 0`, `len <= 100`), comma-separated.
//! - Typedef-style type expressions: a plain named type `T(attrs)`, the
//!   array form `T(attrs)[arrayAttrs]`, and the dict forms
//!   `T(attrs){dictAttrs}` / `K(keyAttrs) : T(attrs){dictAttrs}`.
//!
//! Paren attrs attach to the element/value/key type they follow; the
//! bracket/brace attrs become the member (or typedef) attribute. Builtin
//! type names come from the fixed set; any other identifier is a user
//! type reference resolved later by the static validator.

use std::sync::LazyLock;

use regex::Regex;
use smd_core::{ArrayType, Attributes, BuiltinType, DictType, Type};

/// Identifier fragment shared by the line grammar.
pub const RE_ID: &str = "[A-Za-z][A-Za-z0-9_]*";

static RE_TYPE_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?x)^
          (?: (?P<key>{id}) \s* (?: \( \s* (?P<key_attrs>[^)]+?) \s* \) )? \s* : \s* )?
          (?P<type>{id}) \s* (?: \( \s* (?P<attrs>[^)]+?) \s* \) )?
          (?:
              (?P<array> \[ \s* (?P<array_attrs>[^\]]*?) \s* \] )
            | (?P<dict>  \{{ \s* (?P<dict_attrs>[^}}]*?) \s* \}} )
          )?
        $",
        id = RE_ID
    ))
    .expect("type expression grammar")
});

static RE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^(?:
            (?P<nullable>nullable)
          | (?P<op>==|<=|<|>=|>) \s* (?P<num>-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)
          | len \s* (?P<len_op>==|<=|<|>=|>) \s* (?P<len_num>\d+)
        )$",
    )
    .expect("attribute grammar")
});

/// Parse a comma-separated attribute list. Returns `None` on any
/// malformed item (the caller reports a syntax error at the line level).
pub fn parse_attributes(text: &str) -> Option<Attributes> {
    let mut attr = Attributes::default();
    for item in text.split(',') {
        let caps = RE_ATTR.captures(item.trim())?;
        if caps.name("nullable").is_some() {
            attr.nullable = true;
        } else if let (Some(op), Some(num)) = (caps.name("op"), caps.name("num")) {
            let operand: f64 = num.as_str().parse().ok()?;
            match op.as_str() {
                "==" => attr.eq = Some(operand),
                "<" => attr.lt = Some(operand),
                "<=" => attr.lte = Some(operand),
                ">" => attr.gt = Some(operand),
                ">=" => attr.gte = Some(operand),
                _ => return None,
            }
        } else if let (Some(op), Some(num)) = (caps.name("len_op"), caps.name("len_num")) {
            let operand: u64 = num.as_str().parse().ok()?;
            match op.as_str() {
                "==" => attr.len_eq = Some(operand),
                "<" => attr.len_lt = Some(operand),
                "<=" => attr.len_lte = Some(operand),
                ">" => attr.len_gt = Some(operand),
                ">=" => attr.len_gte = Some(operand),
                _ => return None,
            }
        }
    }
    Some(attr)
}

/// A named type: builtin when the name is in the fixed set, otherwise a
/// user type reference.
pub fn named_type(name: &str) -> Type {
    match BuiltinType::from_name(name) {
        Some(builtin) => Type::Builtin(builtin),
        None => Type::User(name.to_string()),
    }
}

/// Parse a typedef-style type expression.
///
/// Returns the type plus the outer attribute set that attaches to the
/// member or typedef using the expression: for a plain type that is the
/// paren attrs, for arrays the bracket attrs, for dicts the brace attrs.
/// Returns `None` on malformed input.
pub fn parse_type_expression(text: &str) -> Option<(Type, Option<Attributes>)> {
    let caps = RE_TYPE_EXPR.captures(text.trim())?;

    let value_type = named_type(&caps["type"]);
    let inner_attrs = match caps.name("attrs") {
        Some(m) => Some(parse_attributes(m.as_str())?),
        None => None,
    };

    if caps.name("array").is_some() {
        if caps.name("key").is_some() {
            return None;
        }
        let outer = parse_optional_attrs(caps.name("array_attrs").map(|m| m.as_str()))?;
        return Some((
            Type::Array(ArrayType {
                elem: Box::new(value_type),
                attr: inner_attrs,
            }),
            outer,
        ));
    }

    if caps.name("dict").is_some() {
        let key = caps.name("key").map(|m| Box::new(named_type(m.as_str())));
        let key_attr = match caps.name("key_attrs") {
            Some(m) => Some(parse_attributes(m.as_str())?),
            None => None,
        };
        let outer = parse_optional_attrs(caps.name("dict_attrs").map(|m| m.as_str()))?;
        return Some((
            Type::Dict(DictType {
                value: Box::new(value_type),
                attr: inner_attrs,
                key,
                key_attr,
            }),
            outer,
        ));
    }

    // Plain type: a key prefix without dict braces is malformed.
    if caps.name("key").is_some() {
        return None;
    }
    Some((value_type, inner_attrs))
}

/// Attrs captured inside brackets/braces: an empty capture means a plain
/// container with no constraints.
fn parse_optional_attrs(text: Option<&str>) -> Option<Option<Attributes>> {
    match text {
        None | Some("") => Some(None),
        Some(t) => Some(Some(parse_attributes(t)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- attribute lists ----

    #[test]
    fn test_parse_attributes_comparisons() {
        let attr = parse_attributes("> 0, <= 100").unwrap();
        assert_eq!(attr.gt, Some(0.0));
        assert_eq!(attr.lte, Some(100.0));
        assert!(!attr.nullable);
    }

    #[test]
    fn test_parse_attributes_nullable_and_len() {
        let attr = parse_attributes("nullable, len > 0, len <= 50").unwrap();
        assert!(attr.nullable);
        assert_eq!(attr.len_gt, Some(0));
        assert_eq!(attr.len_lte, Some(50));
    }

    #[test]
    fn test_parse_attributes_float_and_exponent() {
        let attr = parse_attributes(">= -2.5, < 1e3").unwrap();
        assert_eq!(attr.gte, Some(-2.5));
        assert_eq!(attr.lt, Some(1000.0));
    }

    #[test]
    fn test_parse_attributes_rejects_garbage() {
        assert!(parse_attributes("wibble").is_none());
        assert!(parse_attributes("> x").is_none());
        assert!(parse_attributes("len > -1").is_none());
        assert!(parse_attributes("").is_none());
    }

    // ---- type expressions ----

    #[test]
    fn test_plain_builtin() {
        let (ty, attr) = parse_type_expression("int").unwrap();
        assert_eq!(ty, Type::Builtin(BuiltinType::Int));
        assert!(attr.is_none());
    }

    #[test]
    fn test_plain_with_attrs() {
        let (ty, attr) = parse_type_expression("int(>= 5)").unwrap();
        assert_eq!(ty, Type::Builtin(BuiltinType::Int));
        assert_eq!(attr.unwrap().gte, Some(5.0));
    }

    #[test]
    fn test_user_type_reference() {
        let (ty, _) = parse_type_expression("MyStruct").unwrap();
        assert_eq!(ty, Type::User("MyStruct".into()));
    }

    #[test]
    fn test_array_with_element_and_array_attrs() {
        let (ty, attr) = parse_type_expression("int(> 0)[len > 0]").unwrap();
        let Type::Array(array) = ty else {
            panic!("expected array");
        };
        assert_eq!(*array.elem, Type::Builtin(BuiltinType::Int));
        assert_eq!(array.attr.unwrap().gt, Some(0.0));
        assert_eq!(attr.unwrap().len_gt, Some(0));
    }

    #[test]
    fn test_plain_array() {
        let (ty, attr) = parse_type_expression("string[]").unwrap();
        let Type::Array(array) = ty else {
            panic!("expected array");
        };
        assert_eq!(*array.elem, Type::Builtin(BuiltinType::String));
        assert!(array.attr.is_none());
        assert!(attr.is_none());
    }

    #[test]
    fn test_dict_implicit_string_key() {
        let (ty, attr) = parse_type_expression("int{len > 0}").unwrap();
        let Type::Dict(dict) = ty else {
            panic!("expected dict");
        };
        assert_eq!(*dict.value, Type::Builtin(BuiltinType::Int));
        assert!(dict.key.is_none());
        assert_eq!(dict.key_type(), &Type::Builtin(BuiltinType::String));
        assert_eq!(attr.unwrap().len_gt, Some(0));
    }

    #[test]
    fn test_dict_explicit_key_type() {
        let (ty, attr) = parse_type_expression("MyEnum : int(> 0){}").unwrap();
        let Type::Dict(dict) = ty else {
            panic!("expected dict");
        };
        assert_eq!(*dict.key.unwrap(), Type::User("MyEnum".into()));
        assert_eq!(*dict.value, Type::Builtin(BuiltinType::Int));
        assert_eq!(dict.attr.unwrap().gt, Some(0.0));
        assert!(attr.is_none());
    }

    #[test]
    fn test_dict_key_attrs() {
        let (ty, _) = parse_type_expression("string(len > 2) : int{}").unwrap();
        let Type::Dict(dict) = ty else {
            panic!("expected dict");
        };
        assert_eq!(dict.key_attr.unwrap().len_gt, Some(2));
    }

    #[test]
    fn test_malformed_expressions_rejected() {
        assert!(parse_type_expression("int()").is_none());
        assert!(parse_type_expression("string : int").is_none());
        assert!(parse_type_expression("int[").is_none());
        assert!(parse_type_expression("int(> )").is_none());
        assert!(parse_type_expression("3rd").is_none());
        assert!(parse_type_expression("typedef int").is_none());
    }
}
