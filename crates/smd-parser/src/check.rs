//! # Static Type-Model Validator
//!
//! Structural validation of a compiled [`Types`] model, independent of any
//! source text: name binding, base-type categories, inheritance cycles,
//! duplicate members, dictionary key types, and attribute applicability.
//! Runs over models from any origin (parsed source or deserialized JSON).
//!
//! ## Design
//!
//! Pure and total: [`validate_types`] never panics and never mutates the
//! model. Issues collect into a `BTreeSet`, so the result is sorted by
//! (type, member, message) and structurally deduplicated. The parser's
//! `finalize()` maps each issue back to a source position; JSON-model
//! callers consume the issues directly.

use std::collections::{BTreeSet, HashSet};

use smd_core::{
    effective_type, get_struct_members, render_length_constraint, render_value_constraint,
    resolve_typedefs, try_enum_values_attributed, try_struct_members_attributed, Action,
    Attributes, BuiltinType, Enum, Struct, Type, Types, UserType,
};

/// A single model problem, attributed to a type and optionally to one of
/// its members or values.
///
/// The derived ordering (type, member, message) is the report order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeModelIssue {
    /// The user type the issue is attributed to.
    pub type_name: String,
    /// The member or enum value, when the issue concerns one.
    pub member: Option<String>,
    /// Human-readable message.
    pub message: String,
}

/// Validate a type model, returning every issue found, sorted and
/// deduplicated. An empty result means the model is valid.
pub fn validate_types(types: &Types) -> Vec<TypeModelIssue> {
    let mut issues = BTreeSet::new();
    for (key, user_type) in types {
        if key != user_type.name() {
            issues.insert(TypeModelIssue {
                type_name: key.clone(),
                member: None,
                message: format!(
                    "Inconsistent type name '{}' for type '{key}'",
                    user_type.name()
                ),
            });
        }
        match user_type {
            UserType::Struct(st) => check_struct(types, st, &mut issues),
            UserType::Enum(en) => check_enum(types, en, &mut issues),
            UserType::Typedef(td) => {
                check_type_usage(types, &td.ty, td.attr.as_ref(), &td.name, None, &mut issues);
            }
            UserType::Action(action) => check_action(types, action, &mut issues),
        }
    }
    issues.into_iter().collect()
}

// ─── Structs and enums ───────────────────────────────────────────────

fn check_struct(types: &Types, st: &Struct, issues: &mut BTreeSet<TypeModelIssue>) {
    for base in &st.bases {
        let valid = matches!(
            resolve_typedefs(types, base),
            Some(UserType::Struct(b)) if b.union == st.union
        );
        if !valid {
            issues.insert(TypeModelIssue {
                type_name: st.name.clone(),
                member: None,
                message: format!("Invalid struct base type '{base}'"),
            });
        }
    }

    match try_struct_members_attributed(types, st) {
        Err(_) => {
            issues.insert(TypeModelIssue {
                type_name: st.name.clone(),
                member: None,
                message: "Circular base type detected".to_string(),
            });
        }
        Ok(flattened) => {
            let mut seen = HashSet::new();
            for (member, defined_by) in flattened {
                if !seen.insert(member.name.as_str()) {
                    issues.insert(TypeModelIssue {
                        type_name: defined_by.to_string(),
                        member: Some(member.name.clone()),
                        message: format!("Redefinition of member '{}'", member.name),
                    });
                }
            }
        }
    }

    for member in &st.members {
        check_type_usage(
            types,
            &member.ty,
            member.attr.as_ref(),
            &st.name,
            Some(&member.name),
            issues,
        );
    }
}

fn check_enum(types: &Types, en: &Enum, issues: &mut BTreeSet<TypeModelIssue>) {
    for base in &en.bases {
        if !matches!(resolve_typedefs(types, base), Some(UserType::Enum(_))) {
            issues.insert(TypeModelIssue {
                type_name: en.name.clone(),
                member: None,
                message: format!("Invalid enum base type '{base}'"),
            });
        }
    }

    match try_enum_values_attributed(types, en) {
        Err(_) => {
            issues.insert(TypeModelIssue {
                type_name: en.name.clone(),
                member: None,
                message: "Circular base type detected".to_string(),
            });
        }
        Ok(flattened) => {
            let mut seen = HashSet::new();
            for (value, defined_by) in flattened {
                if !seen.insert(value.name.as_str()) {
                    issues.insert(TypeModelIssue {
                        type_name: defined_by.to_string(),
                        member: Some(value.name.clone()),
                        message: format!("Redefinition of enum value '{}'", value.name),
                    });
                }
            }
        }
    }
}

// ─── Type usages ─────────────────────────────────────────────────────

/// Recursively check one type usage (member, typedef, element, value, or
/// key position) plus the attribute set attached at that position.
fn check_type_usage(
    types: &Types,
    ty: &Type,
    attr: Option<&Attributes>,
    type_name: &str,
    member: Option<&str>,
    issues: &mut BTreeSet<TypeModelIssue>,
) {
    match ty {
        Type::Builtin(_) => {}
        Type::User(name) => {
            if !types.contains_key(name) {
                issues.insert(issue(type_name, member, format!("Unknown type '{name}'")));
            } else if matches!(resolve_typedefs(types, name), Some(UserType::Action(_))) {
                issues.insert(issue(
                    type_name,
                    member,
                    format!("Invalid reference to action '{name}'"),
                ));
            }
        }
        Type::Array(array) => {
            check_type_usage(types, &array.elem, array.attr.as_ref(), type_name, member, issues);
        }
        Type::Dict(dict) => {
            check_dict_key(types, dict.key_type(), type_name, member, issues);
            check_type_usage(types, &dict.value, dict.attr.as_ref(), type_name, member, issues);
            check_type_usage(
                types,
                dict.key_type(),
                dict.key_attr.as_ref(),
                type_name,
                member,
                issues,
            );
            // Keys are never null, so `nullable` is meaningless there.
            if dict.key_attr.as_ref().is_some_and(|a| a.nullable) {
                issues.insert(issue(
                    type_name,
                    member,
                    "Invalid attribute 'nullable'".to_string(),
                ));
            }
        }
    }

    if let Some(attr) = attr {
        check_attr_applicability(types, ty, attr, type_name, member, issues);
    }
}

/// A dict key must be a string or resolve to an enum.
fn check_dict_key(
    types: &Types,
    key_type: &Type,
    type_name: &str,
    member: Option<&str>,
    issues: &mut BTreeSet<TypeModelIssue>,
) {
    let valid = match effective_type(types, key_type) {
        // Unknown key types are reported by the usage check.
        None => true,
        Some(Type::Builtin(BuiltinType::String)) => true,
        Some(Type::User(name)) => matches!(types.get(name), Some(UserType::Enum(_))),
        Some(_) => false,
    };
    if !valid {
        issues.insert(issue(
            type_name,
            member,
            "Invalid dictionary key type".to_string(),
        ));
    }
}

/// Check constraints against the effective (post-typedef) category of the
/// constrained type: value comparisons for `int`/`float`, length
/// comparisons for `string`/array/dict, `nullable` anywhere.
fn check_attr_applicability(
    types: &Types,
    ty: &Type,
    attr: &Attributes,
    type_name: &str,
    member: Option<&str>,
    issues: &mut BTreeSet<TypeModelIssue>,
) {
    let Some(effective) = effective_type(types, ty) else {
        return;
    };
    let (value_ok, len_ok) = match effective {
        Type::Builtin(BuiltinType::Int) | Type::Builtin(BuiltinType::Float) => (true, false),
        Type::Builtin(BuiltinType::String) | Type::Array(_) | Type::Dict(_) => (false, true),
        _ => (false, false),
    };
    if !value_ok {
        for (op, operand) in attr.value_constraints() {
            issues.insert(issue(
                type_name,
                member,
                format!("Invalid attribute '{}'", render_value_constraint(op, operand)),
            ));
        }
    }
    if !len_ok {
        for (op, operand) in attr.length_constraints() {
            issues.insert(issue(
                type_name,
                member,
                format!(
                    "Invalid attribute '{}'",
                    render_length_constraint(op, operand)
                ),
            ));
        }
    }
}

// ─── Actions ─────────────────────────────────────────────────────────

fn check_action(types: &Types, action: &Action, issues: &mut BTreeSet<TypeModelIssue>) {
    for (_, section_type) in action.sections() {
        if !types.contains_key(section_type) {
            issues.insert(TypeModelIssue {
                type_name: action.name.clone(),
                member: None,
                message: format!("Unknown type '{section_type}'"),
            });
        } else if matches!(
            resolve_typedefs(types, section_type),
            Some(UserType::Action(_))
        ) {
            issues.insert(TypeModelIssue {
                type_name: action.name.clone(),
                member: None,
                message: format!("Invalid reference to action '{section_type}'"),
            });
        }
    }

    // Path, query, and input members share one flat parameter namespace.
    let mut seen: HashSet<&str> = HashSet::new();
    for (section, section_type) in action.sections() {
        if section == "output" || section == "errors" {
            continue;
        }
        if let Some(UserType::Struct(st)) = resolve_typedefs(types, section_type) {
            for member in get_struct_members(types, st) {
                if !seen.insert(member.name.as_str()) {
                    issues.insert(TypeModelIssue {
                        type_name: action.name.clone(),
                        member: Some(member.name.clone()),
                        message: format!(
                            "Redefinition of '{section}' member '{}'",
                            member.name
                        ),
                    });
                }
            }
        }
    }
}

fn issue(type_name: &str, member: Option<&str>, message: String) -> TypeModelIssue {
    TypeModelIssue {
        type_name: type_name.to_string(),
        member: member.map(str::to_string),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smd_core::{ActionUrl, ArrayType, DictType, EnumValue, StructMember, Typedef};

    fn member(name: &str, ty: Type, attr: Option<Attributes>) -> StructMember {
        StructMember {
            name: name.into(),
            doc: vec![],
            ty,
            attr,
            optional: false,
        }
    }

    fn strukt(name: &str, bases: &[&str], members: Vec<StructMember>) -> UserType {
        UserType::Struct(Struct {
            name: name.into(),
            doc: vec![],
            doc_group: None,
            bases: bases.iter().map(|s| s.to_string()).collect(),
            union: false,
            members,
        })
    }

    fn enumeration(name: &str, bases: &[&str], values: &[&str]) -> UserType {
        UserType::Enum(Enum {
            name: name.into(),
            doc: vec![],
            doc_group: None,
            bases: bases.iter().map(|s| s.to_string()).collect(),
            values: values
                .iter()
                .map(|v| EnumValue {
                    name: v.to_string(),
                    doc: vec![],
                })
                .collect(),
        })
    }

    fn types_of(entries: Vec<UserType>) -> Types {
        entries
            .into_iter()
            .map(|ut| (ut.name().to_string(), ut))
            .collect()
    }

    fn messages(types: &Types) -> Vec<String> {
        validate_types(types).into_iter().map(|i| i.message).collect()
    }

    fn attr_gte(v: f64) -> Attributes {
        Attributes {
            gte: Some(v),
            ..Default::default()
        }
    }

    // ---- name binding ----

    #[test]
    fn test_valid_model_has_no_issues() {
        let types = types_of(vec![
            strukt(
                "P",
                &[],
                vec![
                    member("a", Type::Builtin(BuiltinType::Int), Some(attr_gte(0.0))),
                    member("b", Type::User("Color".into()), None),
                ],
            ),
            enumeration("Color", &[], &["red", "green"]),
        ]);
        assert!(validate_types(&types).is_empty());
    }

    #[test]
    fn test_inconsistent_map_key() {
        let mut types = Types::new();
        types.insert("Wrong".into(), strukt("Right", &[], vec![]));
        assert_eq!(
            messages(&types),
            vec!["Inconsistent type name 'Right' for type 'Wrong'"]
        );
    }

    #[test]
    fn test_unknown_member_type() {
        let types = types_of(vec![strukt(
            "S",
            &[],
            vec![member("x", Type::User("Missing".into()), None)],
        )]);
        let issues = validate_types(&types);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].type_name, "S");
        assert_eq!(issues[0].member.as_deref(), Some("x"));
        assert_eq!(issues[0].message, "Unknown type 'Missing'");
    }

    #[test]
    fn test_action_referenced_as_type() {
        let types = types_of(vec![
            UserType::Action(Action {
                name: "DoIt".into(),
                doc: vec![],
                doc_group: None,
                urls: vec![],
                path: None,
                query: None,
                input: None,
                output: None,
                errors: None,
            }),
            strukt("S", &[], vec![member("x", Type::User("DoIt".into()), None)]),
        ]);
        assert_eq!(messages(&types), vec!["Invalid reference to action 'DoIt'"]);
    }

    #[test]
    fn test_unknown_type_inside_array_and_dict() {
        let types = types_of(vec![strukt(
            "S",
            &[],
            vec![member(
                "x",
                Type::Array(ArrayType {
                    elem: Box::new(Type::Dict(DictType {
                        value: Box::new(Type::User("Missing".into())),
                        attr: None,
                        key: None,
                        key_attr: None,
                    })),
                    attr: None,
                }),
                None,
            )],
        )]);
        assert_eq!(messages(&types), vec!["Unknown type 'Missing'"]);
    }

    // ---- bases ----

    #[test]
    fn test_invalid_struct_base() {
        let types = types_of(vec![
            enumeration("E", &[], &["a"]),
            strukt("S", &["E"], vec![]),
            strukt("T", &["Nowhere"], vec![]),
        ]);
        assert_eq!(
            messages(&types),
            vec!["Invalid struct base type 'E'", "Invalid struct base type 'Nowhere'"]
        );
    }

    #[test]
    fn test_union_base_category_must_match() {
        let union = UserType::Struct(Struct {
            name: "U".into(),
            doc: vec![],
            doc_group: None,
            bases: vec!["S".into()],
            union: true,
            members: vec![],
        });
        let types = types_of(vec![strukt("S", &[], vec![]), union]);
        assert_eq!(messages(&types), vec!["Invalid struct base type 'S'"]);
    }

    #[test]
    fn test_invalid_enum_base() {
        let types = types_of(vec![
            strukt("S", &[], vec![]),
            enumeration("E", &["S"], &["a"]),
        ]);
        assert_eq!(messages(&types), vec!["Invalid enum base type 'S'"]);
    }

    #[test]
    fn test_base_through_typedef_is_valid() {
        let types = types_of(vec![
            strukt("Base", &[], vec![member("a", Type::Builtin(BuiltinType::Int), None)]),
            UserType::Typedef(Typedef {
                name: "Alias".into(),
                doc: vec![],
                doc_group: None,
                ty: Type::User("Base".into()),
                attr: None,
            }),
            strukt("S", &["Alias"], vec![]),
        ]);
        assert!(validate_types(&types).is_empty());
    }

    // ---- cycles ----

    #[test]
    fn test_enum_base_cycle_reported_per_participant() {
        let types = types_of(vec![
            enumeration("A", &["B"], &["x"]),
            enumeration("B", &["A"], &["y"]),
        ]);
        let issues = validate_types(&types);
        let circular: Vec<_> = issues
            .iter()
            .filter(|i| i.message == "Circular base type detected")
            .map(|i| i.type_name.as_str())
            .collect();
        assert_eq!(circular, vec!["A", "B"]);
    }

    #[test]
    fn test_inheritor_of_cycle_not_blamed() {
        let types = types_of(vec![
            strukt("A", &["B"], vec![]),
            strukt("B", &["A"], vec![]),
            strukt("C", &["A"], vec![]),
        ]);
        let circular: Vec<_> = validate_types(&types)
            .into_iter()
            .filter(|i| i.message == "Circular base type detected")
            .map(|i| i.type_name)
            .collect();
        assert_eq!(circular, vec!["A", "B"]);
    }

    // ---- duplicates ----

    #[test]
    fn test_duplicate_member_attributed_to_defining_type() {
        let types = types_of(vec![
            strukt("Base", &[], vec![member("x", Type::Builtin(BuiltinType::Int), None)]),
            strukt(
                "Derived",
                &["Base"],
                vec![member("x", Type::Builtin(BuiltinType::String), None)],
            ),
        ]);
        let issues = validate_types(&types);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].type_name, "Derived");
        assert_eq!(issues[0].message, "Redefinition of member 'x'");
    }

    #[test]
    fn test_duplicate_enum_value() {
        let types = types_of(vec![enumeration("E", &[], &["a", "b", "a"])]);
        let issues = validate_types(&types);
        assert_eq!(issues[0].message, "Redefinition of enum value 'a'");
        assert_eq!(issues[0].member.as_deref(), Some("a"));
    }

    // ---- dict keys ----

    #[test]
    fn test_dict_key_must_be_string_or_enum() {
        let dict = |key: Type| {
            Type::Dict(DictType {
                value: Box::new(Type::Builtin(BuiltinType::Int)),
                attr: None,
                key: Some(Box::new(key)),
                key_attr: None,
            })
        };
        let types = types_of(vec![
            enumeration("Key", &[], &["a"]),
            strukt("NotAKey", &[], vec![]),
            strukt(
                "S",
                &[],
                vec![
                    member("good_enum", dict(Type::User("Key".into())), None),
                    member("good_string", dict(Type::Builtin(BuiltinType::String)), None),
                    member("bad_int", dict(Type::Builtin(BuiltinType::Int)), None),
                    member("bad_struct", dict(Type::User("NotAKey".into())), None),
                ],
            ),
        ]);
        let issues = validate_types(&types);
        let offenders: Vec<_> = issues
            .iter()
            .filter(|i| i.message == "Invalid dictionary key type")
            .filter_map(|i| i.member.as_deref())
            .collect();
        assert_eq!(offenders, vec!["bad_int", "bad_struct"]);
    }

    #[test]
    fn test_nullable_dict_key_rejected() {
        let types = types_of(vec![strukt(
            "S",
            &[],
            vec![member(
                "m",
                Type::Dict(DictType {
                    value: Box::new(Type::Builtin(BuiltinType::Int)),
                    attr: None,
                    key: None,
                    key_attr: Some(Attributes {
                        nullable: true,
                        ..Default::default()
                    }),
                }),
                None,
            )],
        )]);
        assert_eq!(messages(&types), vec!["Invalid attribute 'nullable'"]);
    }

    // ---- attribute applicability ----

    #[test]
    fn test_len_attr_on_int_rejected() {
        let types = types_of(vec![strukt(
            "S",
            &[],
            vec![member(
                "x",
                Type::Builtin(BuiltinType::Int),
                Some(Attributes {
                    len_eq: Some(3),
                    ..Default::default()
                }),
            )],
        )]);
        assert_eq!(messages(&types), vec!["Invalid attribute 'len == 3'"]);
    }

    #[test]
    fn test_value_attr_on_string_rejected() {
        let types = types_of(vec![strukt(
            "S",
            &[],
            vec![member(
                "x",
                Type::Builtin(BuiltinType::String),
                Some(attr_gte(5.0)),
            )],
        )]);
        assert_eq!(messages(&types), vec!["Invalid attribute '>= 5'"]);
    }

    #[test]
    fn test_value_attr_on_user_struct_rejected_nullable_allowed() {
        let types = types_of(vec![
            strukt("Inner", &[], vec![]),
            strukt(
                "S",
                &[],
                vec![member(
                    "x",
                    Type::User("Inner".into()),
                    Some(Attributes {
                        nullable: true,
                        gt: Some(1.0),
                        ..Default::default()
                    }),
                )],
            ),
        ]);
        assert_eq!(messages(&types), vec!["Invalid attribute '> 1'"]);
    }

    #[test]
    fn test_attr_checked_against_post_typedef_category() {
        let types = types_of(vec![
            UserType::Typedef(Typedef {
                name: "Count".into(),
                doc: vec![],
                doc_group: None,
                ty: Type::Builtin(BuiltinType::Int),
                attr: None,
            }),
            strukt(
                "Good",
                &[],
                vec![member("x", Type::User("Count".into()), Some(attr_gte(0.0)))],
            ),
            strukt(
                "Bad",
                &[],
                vec![member(
                    "x",
                    Type::User("Count".into()),
                    Some(Attributes {
                        len_gt: Some(0),
                        ..Default::default()
                    }),
                )],
            ),
        ]);
        let issues = validate_types(&types);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].type_name, "Bad");
        assert_eq!(issues[0].message, "Invalid attribute 'len > 0'");
    }

    #[test]
    fn test_typedef_own_attr_checked() {
        let types = types_of(vec![UserType::Typedef(Typedef {
            name: "T".into(),
            doc: vec![],
            doc_group: None,
            ty: Type::Builtin(BuiltinType::Bool),
            attr: Some(attr_gte(1.0)),
        })]);
        assert_eq!(messages(&types), vec!["Invalid attribute '>= 1'"]);
    }

    #[test]
    fn test_array_element_attr_checked() {
        let types = types_of(vec![strukt(
            "S",
            &[],
            vec![member(
                "x",
                Type::Array(ArrayType {
                    elem: Box::new(Type::Builtin(BuiltinType::String)),
                    attr: Some(attr_gte(5.0)),
                }),
                None,
            )],
        )]);
        assert_eq!(messages(&types), vec!["Invalid attribute '>= 5'"]);
    }

    // ---- actions ----

    fn action(name: &str, sections: &[(&str, &str)]) -> UserType {
        let mut a = Action {
            name: name.into(),
            doc: vec![],
            doc_group: None,
            urls: vec![ActionUrl {
                method: Some("POST".into()),
                path: None,
            }],
            path: None,
            query: None,
            input: None,
            output: None,
            errors: None,
        };
        for (section, ty) in sections {
            match *section {
                "path" => a.path = Some(ty.to_string()),
                "query" => a.query = Some(ty.to_string()),
                "input" => a.input = Some(ty.to_string()),
                "output" => a.output = Some(ty.to_string()),
                _ => a.errors = Some(ty.to_string()),
            }
        }
        UserType::Action(a)
    }

    #[test]
    fn test_action_unknown_section_type() {
        let types = types_of(vec![action("A", &[("input", "Missing")])]);
        let issues = validate_types(&types);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].type_name, "A");
        assert_eq!(issues[0].message, "Unknown type 'Missing'");
    }

    #[test]
    fn test_action_parameter_namespace_disjoint() {
        let types = types_of(vec![
            strukt("A_path", &[], vec![member("id", Type::Builtin(BuiltinType::String), None)]),
            strukt(
                "A_query",
                &[],
                vec![
                    member("id", Type::Builtin(BuiltinType::Int), None),
                    member("verbose", Type::Builtin(BuiltinType::Bool), None),
                ],
            ),
            action("A", &[("path", "A_path"), ("query", "A_query")]),
        ]);
        let issues = validate_types(&types);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].type_name, "A");
        assert_eq!(issues[0].member.as_deref(), Some("id"));
        assert_eq!(issues[0].message, "Redefinition of 'query' member 'id'");
    }

    #[test]
    fn test_action_output_namespace_independent() {
        let types = types_of(vec![
            strukt("A_query", &[], vec![member("id", Type::Builtin(BuiltinType::String), None)]),
            strukt("A_output", &[], vec![member("id", Type::Builtin(BuiltinType::String), None)]),
            action("A", &[("query", "A_query"), ("output", "A_output")]),
        ]);
        assert!(validate_types(&types).is_empty());
    }

    // ---- determinism ----

    #[test]
    fn test_issues_sorted_and_deduplicated() {
        let types = types_of(vec![
            strukt("Z", &[], vec![member("x", Type::User("Missing".into()), None)]),
            strukt("A", &[], vec![member("x", Type::User("Missing".into()), None)]),
        ]);
        let issues = validate_types(&types);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].type_name, "A");
        assert_eq!(issues[1].type_name, "Z");
    }
}
