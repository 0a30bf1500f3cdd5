//! Type system definitions for the AST.
//!
//! This module defines the type nodes of the language:
//!
//! - Primitive types (integer, boolean)
//! - Function types (ordered parameter types and a return type)
//! - Class-reference types (an object reference, named nominally)
//! - Structural class types (the full field/method layout of a class)
//! - The empty/bottom type of the null literal
//!
//! The subtyping relation and the lowest-common-ancestor operation over these
//! variants live in `type_checker::relations`.

use std::fmt::Display;

/// Function type: `(params) -> ret`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

impl ArrowType {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        ArrowType {
            params,
            ret: Box::new(ret),
        }
    }
}

/// Structural type of a class: the complete field and method layout,
/// inherited members included, indexed by layout offset.
///
/// The field at offset `o` (fields have negative offsets starting at -1)
/// lives at position `-o - 1` of `all_fields`; the method at offset `o`
/// (methods have non-negative offsets) lives at position `o` of
/// `all_methods`. Method slots are optional so that a sparse offset, which
/// the allocation discipline never produces, still has a representation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassType {
    pub all_fields: Vec<Type>,
    pub all_methods: Vec<Option<ArrowType>>,
}

/// Type nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Bool,
    /// Function type; identifiers of this type denote callable names, not
    /// first-class values.
    Arrow(ArrowType),
    /// Reference to an object of the named class.
    Ref(String),
    /// Structural class type; the type of a class name itself.
    Class(ClassType),
    /// Bottom type of the null literal, subtype of every class reference.
    Empty,
}

impl Type {
    pub fn arrow(params: Vec<Type>, ret: Type) -> Self {
        Type::Arrow(ArrowType::new(params, ret))
    }

    pub fn as_arrow(&self) -> Option<&ArrowType> {
        match self {
            Type::Arrow(at) => Some(at),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Type::Class(ct) => Some(ct),
            _ => None,
        }
    }

    pub fn as_ref_name(&self) -> Option<&str> {
        match self {
            Type::Ref(name) => Some(name),
            _ => None,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Arrow(at) => {
                write!(f, "(")?;
                for (i, par) in at.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", par)?;
                }
                write!(f, ")->{}", at.ret)
            }
            Type::Ref(id) => write!(f, "{}", id),
            Type::Class(_) => write!(f, "class"),
            Type::Empty => write!(f, "empty"),
        }
    }
}
