//! Type checking module.
//!
//! This module performs the second semantic pass over the AST. It:
//!
//! - Assigns a type to every expression node
//! - Enforces subtyping at every type-sensitive construct (initializers,
//!   returns, conditions, arguments, constructor fields)
//! - Validates override compatibility against the superclass layout
//! - Builds the child-to-parent class map driving the subtyping relation
//!
//! Expression errors propagate as `Result`s and are absorbed at declaration
//! boundaries so sibling declarations are still checked. An error on the
//! top-level body has no enclosing boundary and is fatal.

pub mod relations;
pub mod type_checker;
