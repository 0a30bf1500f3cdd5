//! Error types and error handling for the compiler.
//!
//! This module defines the error values produced by the resolution and
//! type-checking passes. It includes:
//!
//! - An error structure carrying the source line of the offending node
//! - Specific error variants for every diagnostic situation
//! - Error formatting and display functionality
//!
//! Errors are plain values: the resolver accumulates them while traversal
//! continues, the type checker propagates them as `Result`s and absorbs them
//! at declaration boundaries. Nothing in the compiler panics on bad input.

pub mod errors;

#[cfg(test)]
mod tests;
