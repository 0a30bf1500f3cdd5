//! Code generation module.
//!
//! This module performs the final pass over the resolved, type-checked AST.
//! It:
//!
//! - Lowers every expression to stack-machine instructions
//! - Emits activation-record push/pop sequences for functions and methods
//! - Builds per-class dispatch tables and per-object heap layouts
//! - Flattens all function and method bodies into one shared code area
//!   appended after the `halt` of the main program
//!
//! Code generation is infallible; the pipeline only invokes it after both
//! earlier passes finished with zero errors.

pub mod compiler;
pub mod expr;
pub mod instruction;
