//! Unit tests for error handling.
//!
//! This module contains tests for error values and their rendering.

use crate::errors::errors::{Error, ErrorCategory, ErrorKind};

#[test]
fn test_error_line() {
    let error = Error::new(
        ErrorKind::VarRedeclared {
            id: "x".to_string(),
        },
        42,
    );

    assert_eq!(error.line(), 42);
}

#[test]
fn test_redeclaration_display() {
    let error = Error::new(
        ErrorKind::FunRedeclared {
            id: "f".to_string(),
        },
        3,
    );

    assert_eq!(error.to_string(), "Fun id f already declared at line 3");
    assert_eq!(error.category(), ErrorCategory::Redeclaration);
}

#[test]
fn test_unresolved_reference_display() {
    let error = Error::new(
        ErrorKind::IdentifierNotDeclared {
            id: "y".to_string(),
        },
        7,
    );

    assert_eq!(error.to_string(), "Var or Par id y not declared at line 7");
    assert_eq!(error.category(), ErrorCategory::UnresolvedReference);
}

#[test]
fn test_variable_init_mismatch_message() {
    let error = Error::new(
        ErrorKind::IncompatibleVariableInit {
            id: "x".to_string(),
        },
        1,
    );

    assert_eq!(
        error.kind().to_string(),
        "Incompatible value for variable x"
    );
    assert_eq!(error.category(), ErrorCategory::TypeMismatch);
}

#[test]
fn test_argument_position_is_one_based() {
    let error = Error::new(
        ErrorKind::WrongArgumentType {
            position: 1,
            id: "f".to_string(),
        },
        5,
    );

    assert_eq!(
        error.kind().to_string(),
        "Wrong type for parameter 1 in the invocation of f"
    );
}

#[test]
fn test_arity_mismatch_category() {
    let error = Error::new(
        ErrorKind::WrongArgumentCount {
            id: "f".to_string(),
        },
        5,
    );

    assert_eq!(error.category(), ErrorCategory::ArityMismatch);
}

#[test]
fn test_override_conflict_category() {
    let error = Error::new(
        ErrorKind::FieldOverriddenByMethod {
            id: "size".to_string(),
        },
        9,
    );

    assert_eq!(error.category(), ErrorCategory::OverrideConflict);
    assert_eq!(
        error.kind().to_string(),
        "Cannot override field id size with a method"
    );
}

#[test]
fn test_incomplete_marker_is_internal() {
    let error = Error::new(ErrorKind::Incomplete, 0);

    assert!(error.is_incomplete());
    assert_eq!(error.category(), ErrorCategory::Incomplete);
}

#[test]
fn test_method_not_declared_names_the_class() {
    let error = Error::new(
        ErrorKind::MethodNotDeclared {
            method: "speak".to_string(),
            class: "Animal".to_string(),
        },
        12,
    );

    assert_eq!(
        error.kind().to_string(),
        "Method id speak not declared in class Animal"
    );
}
