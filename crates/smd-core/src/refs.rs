//! # Reference-Graph Walker
//!
//! Computes the transitive closure of user types reachable from a root
//! type name: array element types, dict key/value types, struct bases and
//! member types, enum bases, typedef targets, and an action's section
//! types. Used by documentation tooling to render only the types an
//! operation actually touches.

use std::collections::HashSet;

use crate::model::{Type, Types, UserType};

/// The subset of `types` containing `root` and every user type
/// transitively referenced by it. Cycle-safe via a visited set keyed by
/// type name; unknown names are skipped.
pub fn get_referenced_types(types: &Types, root: &str) -> Types {
    let mut out = Types::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![root];

    while let Some(name) = stack.pop() {
        if !visited.insert(name) {
            continue;
        }
        let Some(user_type) = types.get(name) else {
            continue;
        };
        out.insert(name.to_string(), user_type.clone());
        match user_type {
            UserType::Struct(st) => {
                for base in &st.bases {
                    stack.push(base);
                }
                for member in &st.members {
                    push_type_refs(&member.ty, &mut stack);
                }
            }
            UserType::Enum(en) => {
                for base in &en.bases {
                    stack.push(base);
                }
            }
            UserType::Typedef(td) => push_type_refs(&td.ty, &mut stack),
            UserType::Action(action) => {
                for (_, section) in action.sections() {
                    stack.push(section);
                }
            }
        }
    }
    out
}

fn push_type_refs<'a>(ty: &'a Type, stack: &mut Vec<&'a str>) {
    match ty {
        Type::Builtin(_) => {}
        Type::Array(array) => push_type_refs(&array.elem, stack),
        Type::Dict(dict) => {
            push_type_refs(&dict.value, stack);
            if let Some(key) = &dict.key {
                push_type_refs(key, stack);
            }
        }
        Type::User(name) => stack.push(name),
    }
}
