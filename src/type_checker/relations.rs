//! The subtyping relation and the lowest-common-ancestor operation.
//!
//! Both are pure functions over [`Type`] values plus the child-to-parent
//! class map built while checking class declarations. The lattice:
//!
//! - every type is a subtype of itself
//! - `bool <= int` (booleans are 0/1 integers), never the converse
//! - a class reference is a subtype of every ancestor's reference
//! - the empty type is a subtype of every class reference
//! - arrow types are contravariant in their parameters and covariant in
//!   their return type, with equal arity

use std::collections::HashMap;
use std::mem;

use crate::ast::types::Type;

/// Whether `a` may be used wherever a `b` is expected.
pub fn is_subtype(a: &Type, b: &Type, supers: &HashMap<String, String>) -> bool {
    match (a, b) {
        (Type::Ref(a_id), Type::Ref(b_id)) => {
            let mut current = a_id.as_str();
            loop {
                if current == b_id {
                    return true;
                }
                match supers.get(current) {
                    Some(parent) => current = parent,
                    None => return false,
                }
            }
        }
        (Type::Arrow(a), Type::Arrow(b)) => {
            a.params.len() == b.params.len()
                && is_subtype(&a.ret, &b.ret, supers)
                && a.params
                    .iter()
                    .zip(&b.params)
                    .all(|(ap, bp)| is_subtype(bp, ap, supers))
        }
        (Type::Bool, Type::Int) => true,
        (Type::Empty, Type::Ref(_)) => true,
        _ => mem::discriminant(a) == mem::discriminant(b),
    }
}

/// Nearest common supertype of `a` and `b`, used to unify the branches of a
/// conditional. `None` when the two types live in unrelated hierarchies.
pub fn lowest_common_ancestor(a: &Type, b: &Type, supers: &HashMap<String, String>) -> Option<Type> {
    match (a, b) {
        (Type::Empty, _) => Some(b.clone()),
        (_, Type::Empty) => Some(a.clone()),
        (Type::Ref(a_id), Type::Ref(_)) => {
            // walk a's ancestor chain upward until b fits under one of them
            let mut current = a_id.as_str();
            loop {
                let ancestor = Type::Ref(current.to_string());
                if is_subtype(b, &ancestor, supers) {
                    return Some(ancestor);
                }
                current = supers.get(current)?;
            }
        }
        (Type::Int | Type::Bool, Type::Int | Type::Bool) => {
            if matches!(a, Type::Int) || matches!(b, Type::Int) {
                Some(Type::Int)
            } else {
                Some(Type::Bool)
            }
        }
        _ => None,
    }
}
