//! Scope and identifier resolution module.
//!
//! This module performs the first semantic pass over the AST. It:
//!
//! - Builds the nested lexical scope stack and the global class table
//! - Assigns every declaration a frame offset and every class member a
//!   layout offset (fields negative, virtual-method slots non-negative)
//! - Resolves every use of a name to its declaring symbol-table entry
//! - Seeds subclass layouts from their superclass and detects overrides
//!
//! Resolution errors are accumulated and never abort the traversal, so a
//! single bad declaration does not hide the others in the same block. The
//! pass produces a [`resolver::Resolution`] consumed by the type checker and
//! the code generator.
pub mod resolver;
