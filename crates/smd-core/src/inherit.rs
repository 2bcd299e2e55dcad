//! # Inheritance Resolver — Flattened Members and Values
//!
//! Computes a struct's (or enum's) effective member (value) list: bases
//! first, recursively in base-list order through typedef indirection,
//! followed by the type's own items.
//!
//! ## Cycle Handling
//!
//! Each resolution tracks a visited set of type names. The strict entry
//! points (`try_*`) return [`CircularBaseError`] when the chain re-enters
//! the type being flattened, which is how the static validator reports
//! `Circular base type detected` exactly once per participating type.
//! The lenient entry points (`get_*`) simply stop at repeats, so the
//! runtime validator and reference walker terminate on any model,
//! including invalid ones. Resolution is bounded by the number of types.

use std::collections::HashSet;

use crate::error::CircularBaseError;
use crate::model::{Enum, EnumValue, Struct, StructMember, Type, Types, UserType};

/// Follow typedef indirection from a user type name to the terminal
/// user type.
///
/// Returns the first non-typedef definition reached, or the final typedef
/// itself when it aliases a non-user type (builtin, array, dict) or a
/// name absent from the map. Returns `None` for unknown names and for
/// typedef chains that loop.
pub fn resolve_typedefs<'a>(types: &'a Types, name: &str) -> Option<&'a UserType> {
    let mut seen: HashSet<&str> = HashSet::new();
    let (mut cur_name, mut cur) = types.get_key_value(name)?;
    loop {
        if !seen.insert(cur_name) {
            return None;
        }
        match cur {
            UserType::Typedef(td) => match &td.ty {
                Type::User(next) => match types.get_key_value(next.as_str()) {
                    Some((k, v)) => {
                        cur_name = k;
                        cur = v;
                    }
                    None => return Some(cur),
                },
                _ => return Some(cur),
            },
            _ => return Some(cur),
        }
    }
}

/// Resolve a type usage to its effective (post-typedef) form.
///
/// The result is a `Builtin`, `Array`, or `Dict` type, or a `User` type
/// naming a struct, enum, or action. Returns `None` when the chain hits
/// an unknown name or a typedef loop; callers treat that as "no effective
/// category" and skip category-dependent checks.
pub fn effective_type<'a>(types: &'a Types, ty: &'a Type) -> Option<&'a Type> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut cur = ty;
    loop {
        match cur {
            Type::User(name) => {
                if !seen.insert(name.as_str()) {
                    return None;
                }
                match types.get(name.as_str()) {
                    Some(UserType::Typedef(td)) => cur = &td.ty,
                    Some(_) => return Some(cur),
                    None => return None,
                }
            }
            _ => return Some(cur),
        }
    }
}

/// Flattened struct members, cycle-safe. Bases first (recursively, in
/// base-list order), then the struct's own members. Unresolvable or
/// wrong-category bases are skipped; the static validator reports those
/// separately.
pub fn get_struct_members<'a>(types: &'a Types, st: &'a Struct) -> Vec<&'a StructMember> {
    try_struct_members_attributed_inner(types, st, false)
        .map(|pairs| pairs.into_iter().map(|(m, _)| m).collect())
        .unwrap_or_default()
}

/// Flattened enum values, cycle-safe. Bases first, then own values.
pub fn get_enum_values<'a>(types: &'a Types, en: &'a Enum) -> Vec<&'a EnumValue> {
    try_enum_values_attributed_inner(types, en, false)
        .map(|pairs| pairs.into_iter().map(|(v, _)| v).collect())
        .unwrap_or_default()
}

/// Strict flattening for the static validator: each member is paired with
/// the name of the type that defines it (for duplicate attribution), and
/// a chain that re-enters `st` itself is an error.
pub fn try_struct_members_attributed<'a>(
    types: &'a Types,
    st: &'a Struct,
) -> Result<Vec<(&'a StructMember, &'a str)>, CircularBaseError> {
    try_struct_members_attributed_inner(types, st, true)
}

/// Strict flattening of enum values with defining-type attribution.
pub fn try_enum_values_attributed<'a>(
    types: &'a Types,
    en: &'a Enum,
) -> Result<Vec<(&'a EnumValue, &'a str)>, CircularBaseError> {
    try_enum_values_attributed_inner(types, en, true)
}

fn try_struct_members_attributed_inner<'a>(
    types: &'a Types,
    st: &'a Struct,
    strict: bool,
) -> Result<Vec<(&'a StructMember, &'a str)>, CircularBaseError> {
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    collect_struct(types, &st.name, st, &mut visited, strict, &mut out)?;
    Ok(out)
}

fn collect_struct<'a>(
    types: &'a Types,
    root: &str,
    st: &'a Struct,
    visited: &mut HashSet<&'a str>,
    strict: bool,
    out: &mut Vec<(&'a StructMember, &'a str)>,
) -> Result<(), CircularBaseError> {
    visited.insert(st.name.as_str());
    for base in &st.bases {
        if let Some(UserType::Struct(base_st)) = resolve_typedefs(types, base) {
            if visited.contains(base_st.name.as_str()) {
                if strict && base_st.name == root {
                    return Err(CircularBaseError {
                        type_name: root.to_string(),
                    });
                }
                continue;
            }
            collect_struct(types, root, base_st, visited, strict, out)?;
        }
    }
    for member in &st.members {
        out.push((member, st.name.as_str()));
    }
    Ok(())
}

fn try_enum_values_attributed_inner<'a>(
    types: &'a Types,
    en: &'a Enum,
    strict: bool,
) -> Result<Vec<(&'a EnumValue, &'a str)>, CircularBaseError> {
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    collect_enum(types, &en.name, en, &mut visited, strict, &mut out)?;
    Ok(out)
}

fn collect_enum<'a>(
    types: &'a Types,
    root: &str,
    en: &'a Enum,
    visited: &mut HashSet<&'a str>,
    strict: bool,
    out: &mut Vec<(&'a EnumValue, &'a str)>,
) -> Result<(), CircularBaseError> {
    visited.insert(en.name.as_str());
    for base in &en.bases {
        if let Some(UserType::Enum(base_en)) = resolve_typedefs(types, base) {
            if visited.contains(base_en.name.as_str()) {
                if strict && base_en.name == root {
                    return Err(CircularBaseError {
                        type_name: root.to_string(),
                    });
                }
                continue;
            }
            collect_enum(types, root, base_en, visited, strict, out)?;
        }
    }
    for value in &en.values {
        out.push((value, en.name.as_str()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attributes, BuiltinType, Typedef};

    fn member(name: &str) -> StructMember {
        StructMember {
            name: name.into(),
            doc: vec![],
            ty: Type::Builtin(BuiltinType::Int),
            attr: None,
            optional: false,
        }
    }

    fn strukt(name: &str, bases: &[&str], members: &[&str]) -> Struct {
        Struct {
            name: name.into(),
            doc: vec![],
            doc_group: None,
            bases: bases.iter().map(|s| s.to_string()).collect(),
            union: false,
            members: members.iter().map(|m| member(m)).collect(),
        }
    }

    fn enumeration(name: &str, bases: &[&str], values: &[&str]) -> Enum {
        Enum {
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
        }
    }

    fn types_of(entries: Vec<UserType>) -> Types {
        entries
            .into_iter()
            .map(|ut| (ut.name().to_string(), ut))
            .collect()
    }

    // ---- flattening order ----

    #[test]
    fn test_members_bases_first_in_base_list_order() {
        let types = types_of(vec![
            UserType::Struct(strukt("A", &[], &["a"])),
            UserType::Struct(strukt("B", &[], &["b"])),
            UserType::Struct(strukt("C", &["A", "B"], &["c"])),
        ]);
        let Some(UserType::Struct(c)) = types.get("C") else {
            panic!("C missing");
        };
        let names: Vec<_> = get_struct_members(&types, c)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_members_recursive_bases() {
        let types = types_of(vec![
            UserType::Struct(strukt("A", &[], &["a"])),
            UserType::Struct(strukt("B", &["A"], &["b"])),
            UserType::Struct(strukt("C", &["B"], &["c"])),
        ]);
        let Some(UserType::Struct(c)) = types.get("C") else {
            panic!("C missing");
        };
        let names: Vec<_> = get_struct_members(&types, c)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_base_through_typedef_indirection() {
        let types = types_of(vec![
            UserType::Struct(strukt("Base", &[], &["a"])),
            UserType::Typedef(Typedef {
                name: "BaseAlias".into(),
                doc: vec![],
                doc_group: None,
                ty: Type::User("Base".into()),
                attr: None,
            }),
            UserType::Struct(strukt("C", &["BaseAlias"], &["c"])),
        ]);
        let Some(UserType::Struct(c)) = types.get("C") else {
            panic!("C missing");
        };
        let names: Vec<_> = get_struct_members(&types, c)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_diamond_base_included_once() {
        let types = types_of(vec![
            UserType::Struct(strukt("D", &[], &["d"])),
            UserType::Struct(strukt("A", &["D"], &["a"])),
            UserType::Struct(strukt("B", &["D"], &["b"])),
            UserType::Struct(strukt("C", &["A", "B"], &["c"])),
        ]);
        let Some(UserType::Struct(c)) = types.get("C") else {
            panic!("C missing");
        };
        let names: Vec<_> = get_struct_members(&types, c)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["d", "a", "b", "c"]);
    }

    // ---- cycles ----

    #[test]
    fn test_strict_cycle_detected_per_participant() {
        let types = types_of(vec![
            UserType::Enum(enumeration("A", &["B"], &["x"])),
            UserType::Enum(enumeration("B", &["A"], &["y"])),
        ]);
        let Some(UserType::Enum(a)) = types.get("A") else {
            panic!("A missing");
        };
        let Some(UserType::Enum(b)) = types.get("B") else {
            panic!("B missing");
        };
        assert_eq!(
            try_enum_values_attributed(&types, a).unwrap_err().type_name,
            "A"
        );
        assert_eq!(
            try_enum_values_attributed(&types, b).unwrap_err().type_name,
            "B"
        );
    }

    #[test]
    fn test_strict_self_base_detected() {
        let types = types_of(vec![UserType::Struct(strukt("A", &["A"], &["a"]))]);
        let Some(UserType::Struct(a)) = types.get("A") else {
            panic!("A missing");
        };
        assert!(try_struct_members_attributed(&types, a).is_err());
    }

    #[test]
    fn test_lenient_cycle_terminates_with_members() {
        let types = types_of(vec![
            UserType::Struct(strukt("A", &["B"], &["a"])),
            UserType::Struct(strukt("B", &["A"], &["b"])),
        ]);
        let Some(UserType::Struct(a)) = types.get("A") else {
            panic!("A missing");
        };
        let names: Vec<_> = get_struct_members(&types, a)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_inheritor_of_cyclic_pair_is_not_blamed() {
        let types = types_of(vec![
            UserType::Struct(strukt("A", &["B"], &["a"])),
            UserType::Struct(strukt("B", &["A"], &["b"])),
            UserType::Struct(strukt("C", &["A"], &["c"])),
        ]);
        let Some(UserType::Struct(c)) = types.get("C") else {
            panic!("C missing");
        };
        let flattened = try_struct_members_attributed(&types, c).unwrap();
        let names: Vec<_> = flattened.iter().map(|(m, _)| m.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    // ---- typedef resolution ----

    #[test]
    fn test_resolve_typedefs_terminal_builtin_returns_typedef() {
        let types = types_of(vec![UserType::Typedef(Typedef {
            name: "T".into(),
            doc: vec![],
            doc_group: None,
            ty: Type::Builtin(BuiltinType::Int),
            attr: Some(Attributes {
                gte: Some(5.0),
                ..Default::default()
            }),
        })]);
        let resolved = resolve_typedefs(&types, "T").unwrap();
        assert!(matches!(resolved, UserType::Typedef(_)));
    }

    #[test]
    fn test_resolve_typedefs_loop_is_none() {
        let types = types_of(vec![
            UserType::Typedef(Typedef {
                name: "A".into(),
                doc: vec![],
                doc_group: None,
                ty: Type::User("B".into()),
                attr: None,
            }),
            UserType::Typedef(Typedef {
                name: "B".into(),
                doc: vec![],
                doc_group: None,
                ty: Type::User("A".into()),
                attr: None,
            }),
        ]);
        assert!(resolve_typedefs(&types, "A").is_none());
    }

    #[test]
    fn test_effective_type_through_typedef_chain() {
        let types = types_of(vec![
            UserType::Typedef(Typedef {
                name: "A".into(),
                doc: vec![],
                doc_group: None,
                ty: Type::User("B".into()),
                attr: None,
            }),
            UserType::Typedef(Typedef {
                name: "B".into(),
                doc: vec![],
                doc_group: None,
                ty: Type::Builtin(BuiltinType::Float),
                attr: None,
            }),
        ]);
        let ty = Type::User("A".into());
        assert_eq!(
            effective_type(&types, &ty),
            Some(&Type::Builtin(BuiltinType::Float))
        );
    }
}
