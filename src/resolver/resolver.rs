use std::collections::{HashMap, HashSet};

use crate::{
    ast::{
        ast::{Ast, Decl, DeclId, Expr, ExprId, Param, Program},
        types::{ArrowType, ClassType, Type},
    },
    errors::errors::{Error, ErrorKind},
};

/// Offset of the first local declaration in an activation record. Slots -1
/// (and 0 upward) are taken by the frame bookkeeping and the parameters.
const FIRST_LOCAL_OFFSET: i32 = -2;

/// A symbol-table entry: where a name was declared, its declared type and
/// its offset within the enclosing frame or object/class layout.
///
/// Non-negative offsets index parameters (from 1) and virtual-method slots
/// (from 0); negative offsets index locals (from -2) and fields (from -1).
/// The code generator relies on the sign alone to pick the access direction
/// relative to the frame pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub nl: usize,
    pub ty: Type,
    pub offset: i32,
}

/// A resolved use of a name: the entry it refers to and the nesting level of
/// the use site. Their difference is the number of access-link hops the code
/// generator emits to reach the declaring frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub entry: SymbolEntry,
    pub nl: usize,
}

/// Per-class virtual-member table: every field and method visible on the
/// class, inherited and overridden members included, keyed by member name.
pub type VirtualTable = HashMap<String, SymbolEntry>;

/// Output of the resolution pass: side tables keyed by node id, the global
/// class table and the accumulated errors.
///
/// The AST itself is never mutated; each later pass reads the annotations it
/// needs from here.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Resolved entry + use-site nesting level for identifier uses, calls,
    /// method-call receivers and `new` class names.
    pub bindings: HashMap<ExprId, Binding>,
    /// Resolved method entry for method-call nodes.
    pub method_bindings: HashMap<ExprId, SymbolEntry>,
    /// Layout offset assigned to each field and method declaration.
    pub member_offsets: HashMap<DeclId, i32>,
    /// Full structural type built for each class declaration.
    pub class_types: HashMap<DeclId, ClassType>,
    /// Superclass entry for each class declaration that extends one.
    pub super_entries: HashMap<DeclId, SymbolEntry>,
    /// Class name -> virtual-member table.
    pub class_table: HashMap<String, VirtualTable>,
    /// All resolution errors, in traversal order.
    pub errors: Vec<Error>,
}

impl Resolution {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Resolves every name in `program` and assigns all frame and layout
/// offsets. Always returns a [`Resolution`]; callers must check
/// [`Resolution::error_count`] before trusting the bindings.
pub fn resolve(ast: &Ast, program: &Program) -> Resolution {
    let mut resolver = Resolver {
        ast,
        sym_table: Vec::new(),
        nesting_level: 0,
        dec_offset: FIRST_LOCAL_OFFSET,
        class_scope: None,
        res: Resolution::default(),
    };

    match program {
        Program::LetIn { decls, body } => {
            resolver.sym_table.push(HashMap::new());

            // Classes may only appear at the outermost level and are bound
            // before every other global declaration, so their offsets are
            // the contiguous run -2, -3, ... that the dispatch-table side
            // list of the code generator indexes into.
            for &decl in decls {
                if matches!(resolver.ast.decl_node(decl).decl, Decl::Class { .. }) {
                    resolver.resolve_class(decl);
                }
            }
            for &decl in decls {
                if !matches!(resolver.ast.decl_node(decl).decl, Decl::Class { .. }) {
                    resolver.resolve_decl(decl);
                }
            }

            resolver.visit_expr(*body);
            resolver.sym_table.pop();
        }
        Program::Body(body) => resolver.visit_expr(*body),
    }

    resolver.res
}

struct Resolver<'a> {
    ast: &'a Ast,
    sym_table: Vec<HashMap<String, SymbolEntry>>,
    nesting_level: usize,
    dec_offset: i32,
    /// Scope-stack index of the virtual-member table of the class currently
    /// being resolved, if any. A call binding to a method slot found there
    /// must dispatch through the object's table, not through a frame slot.
    class_scope: Option<usize>,
    res: Resolution,
}

impl<'a> Resolver<'a> {
    /// Looks a name up from the innermost scope outward, returning the first
    /// match (shadowing).
    fn lookup(&self, id: &str) -> Option<SymbolEntry> {
        self.lookup_with_level(id).map(|(entry, _)| entry)
    }

    /// Like [`Resolver::lookup`], also reporting the scope-stack index the
    /// name was found at.
    fn lookup_with_level(&self, id: &str) -> Option<(SymbolEntry, usize)> {
        self.sym_table
            .iter()
            .enumerate()
            .rev()
            .find_map(|(level, scope)| scope.get(id).map(|entry| (entry.clone(), level)))
    }

    fn error(&mut self, kind: ErrorKind, line: usize) {
        self.res.errors.push(Error::new(kind, line));
    }

    /// Checks that every class-reference inside a declared type names a
    /// class already recorded in the class table.
    fn check_type(&mut self, ty: &Type, line: usize) {
        match ty {
            Type::Ref(name) => {
                if !self.res.class_table.contains_key(name) {
                    self.error(
                        ErrorKind::ClassNotDeclared {
                            id: name.clone(),
                        },
                        line,
                    );
                }
            }
            Type::Arrow(at) => {
                for par in &at.params {
                    self.check_type(par, line);
                }
                self.check_type(&at.ret, line);
            }
            _ => {}
        }
    }

    fn resolve_decl(&mut self, decl: DeclId) {
        match &self.ast.decl_node(decl).decl {
            Decl::Var { .. } => self.resolve_var(decl),
            Decl::Fun { .. } => self.resolve_fun(decl),
            Decl::Class { .. } => self.resolve_class(decl),
            // bound while resolving the enclosing class
            Decl::Field { .. } | Decl::Method { .. } => {}
        }
    }

    fn resolve_var(&mut self, decl: DeclId) {
        let node = self.ast.decl_node(decl);
        let Decl::Var { id, ty, init } = &node.decl else {
            return;
        };
        let line = node.line;

        // the initializer is visited first, so a variable's own name is not
        // visible inside it
        self.visit_expr(*init);
        self.check_type(ty, line);

        let entry = SymbolEntry {
            nl: self.nesting_level,
            ty: ty.clone(),
            offset: self.dec_offset,
        };
        self.dec_offset -= 1;

        let scope = &mut self.sym_table[self.nesting_level];
        if scope.insert(id.clone(), entry).is_some() {
            self.error(ErrorKind::VarRedeclared { id: id.clone() }, line);
        }
    }

    fn resolve_fun(&mut self, decl: DeclId) {
        let node = self.ast.decl_node(decl);
        let Decl::Fun {
            id,
            ret,
            params,
            locals,
            body,
        } = &node.decl
        else {
            return;
        };
        let line = node.line;

        let par_types: Vec<Type> = params.iter().map(|par| par.ty.clone()).collect();
        let entry = SymbolEntry {
            nl: self.nesting_level,
            ty: Type::Arrow(ArrowType::new(par_types, ret.clone())),
            offset: self.dec_offset,
        };
        self.dec_offset -= 1;

        let scope = &mut self.sym_table[self.nesting_level];
        if scope.insert(id.clone(), entry).is_some() {
            self.error(ErrorKind::FunRedeclared { id: id.clone() }, line);
        }
        self.check_type(ret, line);

        self.nesting_level += 1;
        self.sym_table.push(HashMap::new());
        let prev_dec_offset = self.dec_offset;
        self.dec_offset = FIRST_LOCAL_OFFSET;

        self.bind_params(params, line);
        for &local in locals {
            self.resolve_decl(local);
        }
        self.visit_expr(*body);

        self.sym_table.pop();
        self.nesting_level -= 1;
        self.dec_offset = prev_dec_offset;
    }

    /// Binds the formal parameters of a function or method at ascending
    /// positive offsets starting at 1.
    fn bind_params(&mut self, params: &[Param], line: usize) {
        let mut par_offset = 1;
        for par in params {
            self.check_type(&par.ty, line);
            let entry = SymbolEntry {
                nl: self.nesting_level,
                ty: par.ty.clone(),
                offset: par_offset,
            };
            par_offset += 1;
            let scope = &mut self.sym_table[self.nesting_level];
            if scope.insert(par.id.clone(), entry).is_some() {
                self.error(ErrorKind::ParRedeclared { id: par.id.clone() }, line);
            }
        }
    }

    fn resolve_class(&mut self, decl: DeclId) {
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
        let line = node.line;

        // Seed the layout and the virtual-member table from the superclass,
        // which must have been declared earlier in the same block.
        let mut ct = ClassType::default();
        let mut vt = VirtualTable::new();
        let mut super_entry = None;

        if let Some(super_id) = super_id {
            match self.res.class_table.get(super_id) {
                None => self.error(
                    ErrorKind::SuperclassNotDeclared {
                        id: super_id.clone(),
                    },
                    line,
                ),
                Some(super_vt) => {
                    vt = super_vt.clone();
                    if let Some(entry) = self.sym_table[0].get(super_id).cloned() {
                        if let Type::Class(super_ct) = &entry.ty {
                            ct = super_ct.clone();
                        }
                        super_entry = Some(entry);
                    }
                }
            }
        }

        let class_offset = self.dec_offset;
        self.dec_offset -= 1;
        let entry = SymbolEntry {
            nl: 0,
            ty: Type::Class(ct.clone()),
            offset: class_offset,
        };
        if self.sym_table[0].insert(id.clone(), entry).is_some() {
            self.error(ErrorKind::ClassRedeclared { id: id.clone() }, line);
        }

        // The partial table is visible immediately so member types may refer
        // to the class itself.
        self.res.class_table.insert(id.clone(), vt.clone());

        self.nesting_level += 1;
        self.sym_table.push(vt);
        self.class_scope = Some(self.nesting_level);

        let mut field_offset = -(ct.all_fields.len() as i32) - 1;
        let mut seen_in_class = HashSet::new();

        for &field in fields {
            self.bind_field(field, &mut ct, &mut field_offset, &mut seen_in_class);
        }

        let prev_dec_offset = self.dec_offset;
        self.dec_offset = ct.all_methods.len() as i32;

        // Member signatures are all bound before any method body is visited,
        // so sibling methods may call each other regardless of order.
        for &method in methods {
            self.bind_method(method, &mut ct, &mut seen_in_class);
        }

        let final_entry = SymbolEntry {
            nl: 0,
            ty: Type::Class(ct.clone()),
            offset: class_offset,
        };
        self.sym_table[0].insert(id.clone(), final_entry);
        self.res
            .class_table
            .insert(id.clone(), self.sym_table[self.nesting_level].clone());
        self.res.class_types.insert(decl, ct);
        if let Some(entry) = super_entry {
            self.res.super_entries.insert(decl, entry);
        }

        for &method in methods {
            self.resolve_method_body(method);
        }

        self.dec_offset = prev_dec_offset;
        self.class_scope = None;
        self.sym_table.pop();
        self.nesting_level -= 1;
    }

    fn bind_field(
        &mut self,
        decl: DeclId,
        ct: &mut ClassType,
        field_offset: &mut i32,
        seen_in_class: &mut HashSet<String>,
    ) {
        let node = self.ast.decl_node(decl);
        let Decl::Field { id, ty } = &node.decl else {
            return;
        };
        let line = node.line;

        if !seen_in_class.insert(id.clone()) {
            self.error(ErrorKind::FieldRedeclared { id: id.clone() }, line);
        }
        self.check_type(ty, line);

        let overridden = self.sym_table[self.nesting_level].get(id).cloned();
        let entry = match &overridden {
            Some(inherited) if inherited.offset < 0 => {
                // override: same slot, new type
                let entry = SymbolEntry {
                    nl: self.nesting_level,
                    ty: ty.clone(),
                    offset: inherited.offset,
                };
                ct.all_fields[(-entry.offset - 1) as usize] = ty.clone();
                entry
            }
            _ => {
                let entry = SymbolEntry {
                    nl: self.nesting_level,
                    ty: ty.clone(),
                    offset: *field_offset,
                };
                *field_offset -= 1;
                ct.all_fields.push(ty.clone());
                if overridden.is_some() {
                    self.error(ErrorKind::MethodOverriddenByField { id: id.clone() }, line);
                }
                entry
            }
        };

        self.res.member_offsets.insert(decl, entry.offset);
        self.sym_table[self.nesting_level].insert(id.clone(), entry);
    }

    /// Binds a method's name and arrow type into the class's virtual table,
    /// reusing the inherited slot on override. The body is resolved later by
    /// [`Resolver::resolve_method_body`].
    fn bind_method(&mut self, decl: DeclId, ct: &mut ClassType, seen_in_class: &mut HashSet<String>) {
        let node = self.ast.decl_node(decl);
        let Decl::Method {
            id, ret, params, ..
        } = &node.decl
        else {
            return;
        };
        let line = node.line;

        if !seen_in_class.insert(id.clone()) {
            self.error(ErrorKind::MethodRedeclared { id: id.clone() }, line);
        }
        self.check_type(ret, line);

        let par_types: Vec<Type> = params.iter().map(|par| par.ty.clone()).collect();
        let arrow = ArrowType::new(par_types, ret.clone());

        let overridden = self.sym_table[self.nesting_level].get(id).cloned();
        let entry = match &overridden {
            Some(inherited) if inherited.offset >= 0 => SymbolEntry {
                nl: self.nesting_level,
                ty: Type::Arrow(arrow.clone()),
                offset: inherited.offset,
            },
            _ => {
                let entry = SymbolEntry {
                    nl: self.nesting_level,
                    ty: Type::Arrow(arrow.clone()),
                    offset: self.dec_offset,
                };
                self.dec_offset += 1;
                if overridden.is_some() {
                    self.error(ErrorKind::FieldOverriddenByMethod { id: id.clone() }, line);
                }
                entry
            }
        };

        let pos = entry.offset as usize;
        if pos < ct.all_methods.len() {
            ct.all_methods[pos] = Some(arrow);
        } else {
            while ct.all_methods.len() < pos {
                ct.all_methods.push(None);
            }
            ct.all_methods.push(Some(arrow));
        }

        self.res.member_offsets.insert(decl, entry.offset);
        self.sym_table[self.nesting_level].insert(id.clone(), entry);
    }

    fn resolve_method_body(&mut self, decl: DeclId) {
        let node = self.ast.decl_node(decl);
        let Decl::Method {
            params,
            locals,
            body,
            ..
        } = &node.decl
        else {
            return;
        };
        let line = node.line;

        self.nesting_level += 1;
        self.sym_table.push(HashMap::new());
        let prev_dec_offset = self.dec_offset;
        self.dec_offset = FIRST_LOCAL_OFFSET;

        self.bind_params(params, line);
        for &local in locals {
            self.resolve_decl(local);
        }
        self.visit_expr(*body);

        self.sym_table.pop();
        self.nesting_level -= 1;
        self.dec_offset = prev_dec_offset;
    }

    fn visit_expr(&mut self, expr: ExprId) {
        let node = self.ast.expr_node(expr);
        let line = node.line;
        match &node.expr {
            Expr::Int(_) | Expr::Bool(_) | Expr::Empty => {}
            Expr::Not(inner) | Expr::Print(inner) => self.visit_expr(*inner),
            Expr::Binary { lhs, rhs, .. } => {
                self.visit_expr(*lhs);
                self.visit_expr(*rhs);
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(*cond);
                self.visit_expr(*then_branch);
                self.visit_expr(*else_branch);
            }
            Expr::Id(id) => match self.lookup(id) {
                None => self.error(ErrorKind::IdentifierNotDeclared { id: id.clone() }, line),
                Some(entry) => {
                    self.res.bindings.insert(
                        expr,
                        Binding {
                            entry,
                            nl: self.nesting_level,
                        },
                    );
                }
            },
            Expr::Call { id, args } => {
                match self.lookup_with_level(id) {
                    None => self.error(ErrorKind::FunNotDeclared { id: id.clone() }, line),
                    Some((entry, level)) => {
                        // a call that binds to a method slot of the enclosing
                        // class goes through the dispatch table
                        if Some(level) == self.class_scope
                            && entry.offset >= 0
                            && matches!(entry.ty, Type::Arrow(_))
                        {
                            self.res.method_bindings.insert(expr, entry.clone());
                        }
                        self.res.bindings.insert(
                            expr,
                            Binding {
                                entry,
                                nl: self.nesting_level,
                            },
                        );
                    }
                }
                for &arg in args {
                    self.visit_expr(arg);
                }
            }
            Expr::MethodCall { obj, method, args } => {
                self.resolve_method_call(expr, obj, method, line);
                for &arg in args {
                    self.visit_expr(arg);
                }
            }
            Expr::New { class, args } => {
                // classes only live in the outermost scope
                match self
                    .sym_table
                    .first()
                    .and_then(|scope| scope.get(class))
                    .cloned()
                {
                    None => self.error(ErrorKind::ClassNotDeclared { id: class.clone() }, line),
                    Some(entry) => {
                        self.res.bindings.insert(
                            expr,
                            Binding {
                                entry,
                                nl: self.nesting_level,
                            },
                        );
                    }
                }
                for &arg in args {
                    self.visit_expr(arg);
                }
            }
        }
    }

    /// Resolves the receiver and the method of `obj.method(...)`. Either may
    /// fail independently; argument subtrees are visited by the caller in
    /// every case.
    fn resolve_method_call(&mut self, expr: ExprId, obj: &str, method: &str, line: usize) {
        let Some(obj_entry) = self.lookup(obj) else {
            self.error(
                ErrorKind::ObjectNotDeclared {
                    id: obj.to_string(),
                },
                line,
            );
            return;
        };

        let Type::Ref(class_id) = obj_entry.ty.clone() else {
            self.error(
                ErrorKind::NotAClassReference {
                    id: obj.to_string(),
                },
                line,
            );
            return;
        };

        self.res.bindings.insert(
            expr,
            Binding {
                entry: obj_entry,
                nl: self.nesting_level,
            },
        );

        let Some(vt) = self.res.class_table.get(&class_id) else {
            self.error(
                ErrorKind::ClassNotDeclared {
                    id: class_id.clone(),
                },
                line,
            );
            return;
        };

        match vt.get(method) {
            Some(entry) if entry.offset >= 0 && matches!(entry.ty, Type::Arrow(_)) => {
                let entry = entry.clone();
                self.res.method_bindings.insert(expr, entry);
            }
            _ => self.error(
                ErrorKind::MethodNotDeclared {
                    method: method.to_string(),
                    class: class_id,
                },
                line,
            ),
        }
    }
}
