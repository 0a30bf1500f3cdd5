use std::mem;

use crate::{
    ast::ast::{Ast, Decl, DeclId, ExprId, Program},
    compiler::instruction::Instruction,
    resolver::resolver::Resolution,
};

/// Size of the target machine's memory. The stack pointer starts here and
/// grows downward; the cell at `MEMSIZE + offset` is the global slot at
/// `offset`, which is how generated code reaches a class's dispatch-table
/// address without a frame-pointer walk.
pub const MEMSIZE: i64 = 10_000;

/// Lowers `program` to a flat instruction sequence: the main body, `halt`,
/// then every function and method body.
///
/// Code generation is infallible by contract: it must only run on a program
/// that resolved and type-checked with zero errors, so every annotation it
/// reads is present.
pub fn generate(ast: &Ast, program: &Program, res: &Resolution) -> Vec<Instruction> {
    let mut gen = CodeGenerator {
        ast,
        res,
        code: Vec::new(),
        functions: Vec::new(),
        dispatch_tables: Vec::new(),
        label_count: 0,
        fun_label_count: 0,
    };

    match program {
        Program::LetIn { decls, body } => {
            gen.emit(Instruction::Push(0));
            // classes first, matching the order their global offsets were
            // assigned in
            for &decl in decls {
                if matches!(ast.decl_node(decl).decl, Decl::Class { .. }) {
                    gen.gen_decl(decl);
                }
            }
            for &decl in decls {
                if !matches!(ast.decl_node(decl).decl, Decl::Class { .. }) {
                    gen.gen_decl(decl);
                }
            }
            gen.gen_expr(*body);
            gen.emit(Instruction::Halt);
            let functions = mem::take(&mut gen.functions);
            gen.code.extend(functions);
        }
        Program::Body(body) => {
            gen.gen_expr(*body);
            gen.emit(Instruction::Halt);
        }
    }

    gen.code
}

pub(super) struct CodeGenerator<'a> {
    pub(super) ast: &'a Ast,
    pub(super) res: &'a Resolution,
    /// Current output stream; swapped out while a routine body is generated.
    pub(super) code: Vec<Instruction>,
    /// Finished function and method bodies, appended after `halt`.
    functions: Vec<Instruction>,
    /// Dispatch tables of the classes generated so far, in declaration
    /// order, so a subclass can start from its superclass's table.
    dispatch_tables: Vec<Vec<String>>,
    label_count: usize,
    fun_label_count: usize,
}

impl<'a> CodeGenerator<'a> {
    pub(super) fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    pub(super) fn fresh_label(&mut self) -> String {
        let label = format!("label{}", self.label_count);
        self.label_count += 1;
        label
    }

    fn fresh_fun_label(&mut self) -> String {
        let label = format!("function{}", self.fun_label_count);
        self.fun_label_count += 1;
        label
    }

    /// Emits the code of one declaration; every declaration leaves exactly
    /// one value on the stack, its global or local frame slot.
    fn gen_decl(&mut self, decl: DeclId) {
        match &self.ast.decl_node(decl).decl {
            Decl::Var { init, .. } => self.gen_expr(*init),
            Decl::Fun {
                params,
                locals,
                body,
                ..
            } => {
                let label = self.fresh_fun_label();
                self.gen_routine(&label, params.len(), locals, *body);
                self.emit(Instruction::PushLabel(label));
            }
            Decl::Class { .. } => self.gen_class(decl),
            // fields have no code; methods are generated by gen_class
            Decl::Field { .. } | Decl::Method { .. } => {}
        }
    }

    /// Generates the body block of a function or method into the side code
    /// area: prologue, locals, body, epilogue unwinding locals, access link
    /// and parameters before jumping back to the caller.
    fn gen_routine(&mut self, label: &str, n_params: usize, locals: &[DeclId], body: ExprId) {
        let outer = mem::take(&mut self.code);

        self.emit(Instruction::Label(label.to_string()));
        self.emit(Instruction::CopyFp);
        self.emit(Instruction::LoadRa);
        for &local in locals {
            self.gen_decl(local);
        }
        self.gen_expr(body);
        self.emit(Instruction::StoreTm);
        for _ in locals {
            self.emit(Instruction::Pop);
        }
        self.emit(Instruction::StoreRa);
        self.emit(Instruction::Pop); // access link
        for _ in 0..n_params {
            self.emit(Instruction::Pop);
        }
        self.emit(Instruction::StoreFp);
        self.emit(Instruction::LoadTm);
        self.emit(Instruction::LoadRa);
        self.emit(Instruction::JumpSave);

        let routine = mem::replace(&mut self.code, outer);
        self.functions.extend(routine);
    }

    /// Generates a class declaration: every method body goes to the side
    /// code area, the dispatch table is serialized onto the heap and its
    /// address is left on the stack as the class's global slot value.
    fn gen_class(&mut self, decl: DeclId) {
        let Decl::Class { methods, .. } = &self.ast.decl_node(decl).decl else {
            return;
        };

        let mut table = match self.res.super_entries.get(&decl) {
            Some(entry) => self.dispatch_tables[(-entry.offset - 2) as usize].clone(),
            None => Vec::new(),
        };

        for &method in methods {
            let Decl::Method {
                params,
                locals,
                body,
                ..
            } = &self.ast.decl_node(method).decl
            else {
                continue;
            };
            let offset = self.res.member_offsets[&method] as usize;
            let label = self.fresh_fun_label();
            self.gen_routine(&label, params.len(), locals, *body);
            if offset < table.len() {
                table[offset] = label;
            } else {
                table.resize(offset, String::new());
                table.push(label);
            }
        }

        self.emit(Instruction::LoadHp);
        for label in &table {
            self.emit(Instruction::PushLabel(label.clone()));
            self.emit(Instruction::LoadHp);
            self.emit(Instruction::StoreWord);
            self.emit(Instruction::LoadHp);
            self.emit(Instruction::Push(1));
            self.emit(Instruction::Add);
            self.emit(Instruction::StoreHp);
        }
        self.dispatch_tables.push(table);
    }
}
