//! Core AST definitions.
//!
//! The tree is produced by an external parser/tree-reducer and is immutable
//! once built. Nodes live in an arena owned by [`Ast`] and are addressed by
//! [`ExprId`] and [`DeclId`] indices; later passes never mutate the nodes and
//! instead record their annotations (resolved bindings, offsets, inferred
//! types) in side tables keyed by these ids.

use super::types::Type;

/// Index of an expression node in the [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// Index of a declaration node in the [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub u32);

/// Binary operators.
///
/// Arithmetic operators produce integers; comparison and boolean operators
/// produce the canonical 0/1 boolean encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    LessEq,
    GreaterEq,
    And,
    Or,
}

impl BinOp {
    /// Human-readable operator name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            BinOp::Add => "sum",
            BinOp::Sub => "subtraction",
            BinOp::Mul => "multiplication",
            BinOp::Div => "division",
            BinOp::Eq => "equal",
            BinOp::LessEq => "less equal",
            BinOp::GreaterEq => "greater equal",
            BinOp::And => "AND",
            BinOp::Or => "OR",
        }
    }

    /// Whether both operands must be integers (as opposed to the comparison
    /// and boolean operators, which accept any pair of related types).
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }
}

/// Expression nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal.
    Int(i64),
    /// Boolean literal.
    Bool(bool),
    /// The null literal; its type is the bottom type.
    Empty,
    /// Use of an identifier (variable or parameter).
    Id(String),
    /// Boolean negation.
    Not(ExprId),
    /// Binary operation.
    Binary { op: BinOp, lhs: ExprId, rhs: ExprId },
    /// If-then-else; the result type is the lowest common ancestor of the
    /// branch types.
    If {
        cond: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    },
    /// Print the value of the inner expression; evaluates to that value.
    Print(ExprId),
    /// Call of a function (or of a method of the enclosing class).
    Call { id: String, args: Vec<ExprId> },
    /// Method call on an object: `obj.method(args)`.
    MethodCall {
        obj: String,
        method: String,
        args: Vec<ExprId>,
    },
    /// Object construction: `new Class(args)`, one argument per field
    /// (inherited fields included, in layout order).
    New { class: String, args: Vec<ExprId> },
}

/// Formal parameter of a function or method.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: String,
    pub ty: Type,
}

/// Declaration nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// Variable with declared type and initializer.
    Var { id: String, ty: Type, init: ExprId },
    /// Function with parameters, local declarations and a body expression.
    Fun {
        id: String,
        ret: Type,
        params: Vec<Param>,
        locals: Vec<DeclId>,
        body: ExprId,
    },
    /// Class with an optional superclass, fields and methods.
    Class {
        id: String,
        super_id: Option<String>,
        fields: Vec<DeclId>,
        methods: Vec<DeclId>,
    },
    /// Field of a class.
    Field { id: String, ty: Type },
    /// Method of a class.
    Method {
        id: String,
        ret: Type,
        params: Vec<Param>,
        locals: Vec<DeclId>,
        body: ExprId,
    },
}

impl Decl {
    pub fn id(&self) -> &str {
        match self {
            Decl::Var { id, .. }
            | Decl::Fun { id, .. }
            | Decl::Class { id, .. }
            | Decl::Field { id, .. }
            | Decl::Method { id, .. } => id,
        }
    }
}

/// An expression node together with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub expr: Expr,
    pub line: usize,
}

/// A declaration node together with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclNode {
    pub decl: Decl,
    pub line: usize,
}

/// Root of a compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Program {
    /// `let declarations in body`
    LetIn { decls: Vec<DeclId>, body: ExprId },
    /// A bare body expression with no declarations.
    Body(ExprId),
}

/// Arena holding every node of one compilation unit.
///
/// The external tree-reducer allocates nodes through [`Ast::expr`] and
/// [`Ast::decl`]; compiler passes only ever read from the arena.
#[derive(Debug, Default, Clone)]
pub struct Ast {
    exprs: Vec<ExprNode>,
    decls: Vec<DeclNode>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    /// Allocates an expression node and returns its id.
    pub fn expr(&mut self, expr: Expr, line: usize) -> ExprId {
        self.exprs.push(ExprNode { expr, line });
        ExprId(self.exprs.len() as u32 - 1)
    }

    /// Allocates a declaration node and returns its id.
    pub fn decl(&mut self, decl: Decl, line: usize) -> DeclId {
        self.decls.push(DeclNode { decl, line });
        DeclId(self.decls.len() as u32 - 1)
    }

    pub fn expr_node(&self, id: ExprId) -> &ExprNode {
        &self.exprs[id.0 as usize]
    }

    pub fn decl_node(&self, id: DeclId) -> &DeclNode {
        &self.decls[id.0 as usize]
    }

    pub fn expr_line(&self, id: ExprId) -> usize {
        self.exprs[id.0 as usize].line
    }

    pub fn decl_line(&self, id: DeclId) -> usize {
        self.decls[id.0 as usize].line
    }
}
