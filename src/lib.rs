#![allow(clippy::module_inception)]

//! Semantic core of a compiler for a small expression-oriented language:
//! `let`-in programs with nested lexical scoping, functions and
//! single-inheritance classes with virtual dispatch.
//!
//! The crate takes an already-built AST (lexing and parsing are the external
//! front end's job) and runs three passes over it:
//!
//! 1. [`resolver`] — scope resolution, class layouts, frame offsets
//! 2. [`type_checker`] — expression typing, subtyping, override checks
//! 3. [`compiler`] — lowering to stack-machine instructions
//!
//! [`compile`] wires the passes together and refuses to generate code for a
//! program with any resolution or type error.

use crate::{
    ast::ast::{Ast, Program},
    compiler::{compiler::generate, instruction::Instruction},
    errors::errors::Error,
    resolver::resolver::resolve,
    type_checker::type_checker::type_check,
};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod resolver;
pub mod type_checker;

/// Runs the full pipeline on one compilation unit.
///
/// # Returns
///
/// The flat instruction sequence of the program, or every error the two
/// semantic passes produced, in pass order. Code generation never runs on a
/// program with errors.
pub fn compile(ast: &Ast, program: &Program) -> Result<Vec<Instruction>, Vec<Error>> {
    let res = resolve(ast, program);
    let (outcome, fatal) = type_check(ast, program, &res);

    let mut errors = res.errors.clone();
    errors.extend(outcome.errors);
    errors.extend(fatal);
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(generate(ast, program, &res))
}
