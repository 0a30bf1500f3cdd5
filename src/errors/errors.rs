use std::fmt::Display;

use thiserror::Error;

/// A compilation error: a specific diagnostic plus the 1-based source line
/// of the node it was raised on.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    line: usize,
}

impl Error {
    pub fn new(kind: ErrorKind, line: usize) -> Self {
        Error { kind, line }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the broad category of the error.
    pub fn category(&self) -> ErrorCategory {
        match &self.kind {
            ErrorKind::VarRedeclared { .. }
            | ErrorKind::FunRedeclared { .. }
            | ErrorKind::ParRedeclared { .. }
            | ErrorKind::ClassRedeclared { .. }
            | ErrorKind::FieldRedeclared { .. }
            | ErrorKind::MethodRedeclared { .. } => ErrorCategory::Redeclaration,
            ErrorKind::IdentifierNotDeclared { .. }
            | ErrorKind::FunNotDeclared { .. }
            | ErrorKind::ClassNotDeclared { .. }
            | ErrorKind::SuperclassNotDeclared { .. }
            | ErrorKind::ObjectNotDeclared { .. }
            | ErrorKind::NotAClassReference { .. }
            | ErrorKind::MethodNotDeclared { .. } => ErrorCategory::UnresolvedReference,
            ErrorKind::FieldOverriddenByMethod { .. }
            | ErrorKind::MethodOverriddenByField { .. } => ErrorCategory::OverrideConflict,
            ErrorKind::WrongArgumentCount { .. } | ErrorKind::WrongFieldCount { .. } => {
                ErrorCategory::ArityMismatch
            }
            ErrorKind::Incomplete => ErrorCategory::Incomplete,
            _ => ErrorCategory::TypeMismatch,
        }
    }

    /// Whether this is the internal incomplete-type marker, raised while
    /// deriving a type for a node an earlier pass failed on. It is absorbed
    /// silently at declaration boundaries and never shown to the user.
    pub fn is_incomplete(&self) -> bool {
        matches!(self.kind, ErrorKind::Incomplete)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at line {}", self.kind, self.line)
    }
}

/// Broad error categories, used for reporting and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Redeclaration,
    UnresolvedReference,
    OverrideConflict,
    TypeMismatch,
    ArityMismatch,
    Incomplete,
}

/// All diagnostics the resolver and the type checker can produce.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // resolution errors
    #[error("Var id {id} already declared")]
    VarRedeclared { id: String },
    #[error("Fun id {id} already declared")]
    FunRedeclared { id: String },
    #[error("Par id {id} already declared")]
    ParRedeclared { id: String },
    #[error("Class id {id} already declared")]
    ClassRedeclared { id: String },
    #[error("Field id {id} already declared in class")]
    FieldRedeclared { id: String },
    #[error("Method id {id} already declared in class")]
    MethodRedeclared { id: String },
    #[error("Extending class id {id} not declared")]
    SuperclassNotDeclared { id: String },
    #[error("Class id {id} not declared")]
    ClassNotDeclared { id: String },
    #[error("Var or Par id {id} not declared")]
    IdentifierNotDeclared { id: String },
    #[error("Fun id {id} not declared")]
    FunNotDeclared { id: String },
    #[error("Object id {id} not declared")]
    ObjectNotDeclared { id: String },
    #[error("Object id {id} is not a class reference")]
    NotAClassReference { id: String },
    #[error("Method id {method} not declared in class {class}")]
    MethodNotDeclared { method: String, class: String },
    #[error("Cannot override field id {id} with a method")]
    FieldOverriddenByMethod { id: String },
    #[error("Cannot override method id {id} with a field")]
    MethodOverriddenByField { id: String },

    // type errors
    #[error("Incompatible value for variable {id}")]
    IncompatibleVariableInit { id: String },
    #[error("Wrong return type for function {id}")]
    WrongFunctionReturn { id: String },
    #[error("Wrong return type for method {id}")]
    WrongMethodReturn { id: String },
    #[error("Non boolean condition in if")]
    NonBooleanCondition,
    #[error("Non boolean operand in not")]
    NonBooleanNot,
    #[error("Incompatible types in then-else branches")]
    IncompatibleBranches,
    #[error("Incompatible types in {op}")]
    IncompatibleOperands { op: &'static str },
    #[error("Non integers in {op}")]
    NonIntegerOperands { op: &'static str },
    #[error("Invocation of a non-function {id}")]
    NotAFunction { id: String },
    #[error("Invocation of a non-method {id}")]
    NotAMethod { id: String },
    #[error("Invocation of new on a non-class {id}")]
    NotAClass { id: String },
    #[error("Wrong number of parameters in the invocation of {id}")]
    WrongArgumentCount { id: String },
    #[error("Wrong type for parameter {position} in the invocation of {id}")]
    WrongArgumentType { position: usize, id: String },
    #[error("Wrong number of fields in new {id}")]
    WrongFieldCount { id: String },
    #[error("Wrong type for field {position} in new {id}")]
    WrongFieldType { position: usize, id: String },
    #[error("Wrong type for field {id}")]
    IncompatibleFieldOverride { id: String },
    #[error("Wrong type for method {id}")]
    IncompatibleMethodOverride { id: String },
    #[error("Wrong usage of function identifier {id}")]
    FunctionIdUsedAsValue { id: String },
    #[error("Wrong usage of class identifier {id}")]
    ClassIdUsedAsValue { id: String },

    /// Internal marker for a derivation cut short by an earlier resolution
    /// error; absorbed silently, never reported.
    #[error("incomplete type derivation")]
    Incomplete,
}
