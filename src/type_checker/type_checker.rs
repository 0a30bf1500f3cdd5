use std::collections::HashMap;

use crate::{
    ast::{
        ast::{Ast, Decl, DeclId, Expr, ExprId, Program},
        types::Type,
    },
    errors::errors::{Error, ErrorKind},
    resolver::resolver::Resolution,
    type_checker::relations::{is_subtype, lowest_common_ancestor},
};

/// Output of the type-checking pass: the errors recovered at declaration
/// boundaries and the child-to-parent class map that later consumers of the
/// subtyping relation need.
#[derive(Debug, Default)]
pub struct TypeOutcome {
    pub supertypes: HashMap<String, String>,
    pub errors: Vec<Error>,
}

/// Type-checks `program` using the annotations in `res`.
///
/// Declaration-level errors are recovered and collected in the returned
/// [`TypeOutcome`]; an error on the top-level body expression has no
/// declaration boundary to absorb it and is returned separately as fatal.
pub fn type_check(ast: &Ast, program: &Program, res: &Resolution) -> (TypeOutcome, Option<Error>) {
    let mut checker = TypeChecker {
        ast,
        res,
        out: TypeOutcome::default(),
    };

    let fatal = match program {
        Program::LetIn { decls, body } => {
            for &decl in decls {
                checker.check_boundary(decl);
            }
            checker.check_expr(*body).err()
        }
        Program::Body(body) => checker.check_expr(*body).err(),
    };

    // an incomplete derivation means the resolver already reported the cause
    let fatal = fatal.filter(|e| !e.is_incomplete());
    (checker.out, fatal)
}

struct TypeChecker<'a> {
    ast: &'a Ast,
    res: &'a Resolution,
    out: TypeOutcome,
}

impl<'a> TypeChecker<'a> {
    /// Checks one declaration, absorbing its error so the siblings are still
    /// checked. The internal incomplete marker is dropped silently.
    fn check_boundary(&mut self, decl: DeclId) {
        if let Err(error) = self.check_decl(decl) {
            if !error.is_incomplete() {
                self.out.errors.push(error);
            }
        }
    }

    fn check_decl(&mut self, decl: DeclId) -> Result<(), Error> {
        let node = self.ast.decl_node(decl);
        let line = node.line;
        match &node.decl {
            Decl::Var { id, ty, init } => {
                let init_ty = self.check_expr(*init)?;
                if !self.subtype(&init_ty, ty) {
                    return Err(Error::new(
                        ErrorKind::IncompatibleVariableInit { id: id.clone() },
                        line,
                    ));
                }
                Ok(())
            }
            Decl::Fun {
                id,
                ret,
                locals,
                body,
                ..
            } => {
                for &local in locals {
                    self.check_boundary(local);
                }
                let body_ty = self.check_expr(*body)?;
                if !self.subtype(&body_ty, ret) {
                    return Err(Error::new(
                        ErrorKind::WrongFunctionReturn { id: id.clone() },
                        line,
                    ));
                }
                Ok(())
            }
            Decl::Class { .. } => {
                self.check_class(decl);
                Ok(())
            }
            Decl::Field { .. } => Ok(()),
            Decl::Method {
                id,
                ret,
                locals,
                body,
                ..
            } => {
                for &local in locals {
                    self.check_boundary(local);
                }
                let body_ty = self.check_expr(*body)?;
                if !self.subtype(&body_ty, ret) {
                    return Err(Error::new(
                        ErrorKind::WrongMethodReturn { id: id.clone() },
                        line,
                    ));
                }
                Ok(())
            }
        }
    }

    /// Checks a class declaration: registers the inheritance edge, verifies
    /// every overriding member against the parent's slot type and checks all
    /// method bodies. Everything here is recoverable, so errors are recorded
    /// rather than propagated.
    fn check_class(&mut self, decl: DeclId) {
        let node = self.ast.decl_node(decl);
        let Decl::Class {
            id,
            super_id,
            fields,
            methods,
        } = &node.decl
        else {
            return;
        };

        // the edge must exist before any subtype test involving this class
        if let Some(super_id) = super_id {
            self.out
                .supertypes
                .insert(id.clone(), super_id.clone());
        }

        if let Some(super_ct) = self
            .res
            .super_entries
            .get(&decl)
            .and_then(|entry| entry.ty.as_class())
        {
            for &field in fields {
                let field_node = self.ast.decl_node(field);
                let Decl::Field { id, ty } = &field_node.decl else {
                    continue;
                };
                let Some(&offset) = self.res.member_offsets.get(&field) else {
                    continue;
                };
                let pos = (-offset - 1) as usize;
                if pos < super_ct.all_fields.len()
                    && !self.subtype(ty, &super_ct.all_fields[pos])
                {
                    self.out.errors.push(Error::new(
                        ErrorKind::IncompatibleFieldOverride { id: id.clone() },
                        field_node.line,
                    ));
                }
            }
            for &method in methods {
                let method_node = self.ast.decl_node(method);
                let Decl::Method { id, ret, params, .. } = &method_node.decl else {
                    continue;
                };
                let Some(&offset) = self.res.member_offsets.get(&method) else {
                    continue;
                };
                let pos = offset as usize;
                if let Some(Some(super_arrow)) = super_ct.all_methods.get(pos) {
                    let par_types: Vec<Type> =
                        params.iter().map(|par| par.ty.clone()).collect();
                    let arrow = Type::arrow(par_types, ret.clone());
                    if !self.subtype(&arrow, &Type::Arrow(super_arrow.clone())) {
                        self.out.errors.push(Error::new(
                            ErrorKind::IncompatibleMethodOverride { id: id.clone() },
                            method_node.line,
                        ));
                    }
                }
            }
        }

        for &method in methods {
            self.check_boundary(method);
        }
    }

    fn check_expr(&mut self, expr: ExprId) -> Result<Type, Error> {
        let node = self.ast.expr_node(expr);
        let line = node.line;
        match &node.expr {
            Expr::Int(_) => Ok(Type::Int),
            Expr::Bool(_) => Ok(Type::Bool),
            Expr::Empty => Ok(Type::Empty),
            Expr::Id(id) => {
                let binding = self.binding(expr)?;
                match &binding {
                    Type::Arrow(_) => Err(Error::new(
                        ErrorKind::FunctionIdUsedAsValue { id: id.clone() },
                        line,
                    )),
                    Type::Class(_) => Err(Error::new(
                        ErrorKind::ClassIdUsedAsValue { id: id.clone() },
                        line,
                    )),
                    _ => Ok(binding),
                }
            }
            Expr::Not(inner) => {
                let inner_ty = self.check_expr(*inner)?;
                if !self.subtype(&inner_ty, &Type::Bool) {
                    return Err(Error::new(ErrorKind::NonBooleanNot, line));
                }
                Ok(Type::Bool)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs_ty = self.check_expr(*lhs)?;
                let rhs_ty = self.check_expr(*rhs)?;
                if op.is_arithmetic() {
                    if !self.subtype(&lhs_ty, &Type::Int) || !self.subtype(&rhs_ty, &Type::Int) {
                        return Err(Error::new(
                            ErrorKind::NonIntegerOperands { op: op.describe() },
                            line,
                        ));
                    }
                    Ok(Type::Int)
                } else {
                    // comparison and boolean ops admit any pair of types
                    // related by subtyping in either direction
                    if !self.subtype(&lhs_ty, &rhs_ty) && !self.subtype(&rhs_ty, &lhs_ty) {
                        return Err(Error::new(
                            ErrorKind::IncompatibleOperands { op: op.describe() },
                            line,
                        ));
                    }
                    Ok(Type::Bool)
                }
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.check_expr(*cond)?;
                if !self.subtype(&cond_ty, &Type::Bool) {
                    return Err(Error::new(ErrorKind::NonBooleanCondition, line));
                }
                let then_ty = self.check_expr(*then_branch)?;
                let else_ty = self.check_expr(*else_branch)?;
                lowest_common_ancestor(&then_ty, &else_ty, &self.out.supertypes)
                    .ok_or_else(|| Error::new(ErrorKind::IncompatibleBranches, line))
            }
            Expr::Print(inner) => self.check_expr(*inner),
            Expr::Call { id, args } => {
                let fun_ty = self.binding(expr)?;
                let Type::Arrow(arrow) = fun_ty else {
                    return Err(Error::new(
                        ErrorKind::NotAFunction { id: id.clone() },
                        line,
                    ));
                };
                self.check_args(id, args, &arrow.params, line)?;
                Ok((*arrow.ret).clone())
            }
            Expr::MethodCall { method, args, .. } => {
                let entry = self
                    .res
                    .method_bindings
                    .get(&expr)
                    .ok_or_else(|| Error::new(ErrorKind::Incomplete, line))?;
                let Type::Arrow(arrow) = entry.ty.clone() else {
                    return Err(Error::new(
                        ErrorKind::NotAMethod { id: method.clone() },
                        line,
                    ));
                };
                self.check_args(method, args, &arrow.params, line)?;
                Ok((*arrow.ret).clone())
            }
            Expr::New { class, args } => {
                let class_ty = self.binding(expr)?;
                let Type::Class(ct) = class_ty else {
                    return Err(Error::new(ErrorKind::NotAClass { id: class.clone() }, line));
                };
                if args.len() != ct.all_fields.len() {
                    return Err(Error::new(
                        ErrorKind::WrongFieldCount { id: class.clone() },
                        line,
                    ));
                }
                for (i, (&arg, field_ty)) in args.iter().zip(&ct.all_fields).enumerate() {
                    let arg_ty = self.check_expr(arg)?;
                    if !self.subtype(&arg_ty, field_ty) {
                        return Err(Error::new(
                            ErrorKind::WrongFieldType {
                                position: i + 1,
                                id: class.clone(),
                            },
                            line,
                        ));
                    }
                }
                Ok(Type::Ref(class.clone()))
            }
        }
    }

    /// Checks arity and argument types of a call-like node, left-to-right,
    /// first mismatch reported with its 1-based position.
    fn check_args(
        &mut self,
        id: &str,
        args: &[ExprId],
        params: &[Type],
        line: usize,
    ) -> Result<(), Error> {
        if args.len() != params.len() {
            return Err(Error::new(
                ErrorKind::WrongArgumentCount { id: id.to_string() },
                line,
            ));
        }
        for (i, (&arg, par_ty)) in args.iter().zip(params).enumerate() {
            let arg_ty = self.check_expr(arg)?;
            if !self.subtype(&arg_ty, par_ty) {
                return Err(Error::new(
                    ErrorKind::WrongArgumentType {
                        position: i + 1,
                        id: id.to_string(),
                    },
                    line,
                ));
            }
        }
        Ok(())
    }

    /// Type of the resolved entry of a call-like or identifier node. A node
    /// the resolver could not bind yields the silent incomplete marker.
    fn binding(&self, expr: ExprId) -> Result<Type, Error> {
        self.res
            .bindings
            .get(&expr)
            .map(|binding| binding.entry.ty.clone())
            .ok_or_else(|| Error::new(ErrorKind::Incomplete, self.ast.expr_line(expr)))
    }

    fn subtype(&self, a: &Type, b: &Type) -> bool {
        is_subtype(a, b, &self.out.supertypes)
    }
}
