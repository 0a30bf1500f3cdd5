//! Expression lowering.
//!
//! Every expression compiles to a sequence leaving exactly one value on the
//! stack. Booleans use the canonical 0/1 encoding; the null literal is the
//! address -1, which no heap object can occupy.

use crate::{
    ast::ast::{BinOp, Expr, ExprId},
    compiler::{
        compiler::{CodeGenerator, MEMSIZE},
        instruction::Instruction,
    },
    resolver::resolver::Binding,
};

impl<'a> CodeGenerator<'a> {
    pub(super) fn gen_expr(&mut self, expr: ExprId) {
        match &self.ast.expr_node(expr).expr {
            Expr::Int(n) => self.emit(Instruction::Push(*n)),
            Expr::Bool(b) => self.emit(Instruction::Push(i64::from(*b))),
            Expr::Empty => self.emit(Instruction::Push(-1)),
            Expr::Print(inner) => {
                self.gen_expr(*inner);
                self.emit(Instruction::Print);
            }
            Expr::Not(inner) => {
                // canonical encoding makes negation a subtraction from 1
                self.emit(Instruction::Push(1));
                self.gen_expr(*inner);
                self.emit(Instruction::Sub);
            }
            Expr::Id(_) => {
                let binding = &self.res.bindings[&expr];
                self.gen_frame_slot(binding);
                self.emit(Instruction::LoadWord);
            }
            Expr::Binary { op, lhs, rhs } => self.gen_binary(*op, *lhs, *rhs),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let then_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.gen_expr(*cond);
                self.emit(Instruction::Push(1));
                self.emit(Instruction::BranchEq(then_label.clone()));
                self.gen_expr(*else_branch);
                self.emit(Instruction::Branch(end_label.clone()));
                self.emit(Instruction::Label(then_label));
                self.gen_expr(*then_branch);
                self.emit(Instruction::Label(end_label));
            }
            Expr::Call { args, .. } => self.gen_call(expr, args),
            Expr::MethodCall { args, .. } => self.gen_method_call(expr, args),
            Expr::New { args, .. } => self.gen_new(expr, args),
        }
    }

    /// Pushes the address of the frame slot a binding refers to: the frame
    /// pointer, one indirect load per access-link hop, plus the offset.
    fn gen_frame_slot(&mut self, binding: &Binding) {
        self.emit(Instruction::LoadFp);
        for _ in 0..(binding.nl - binding.entry.nl) {
            self.emit(Instruction::LoadWord);
        }
        self.emit(Instruction::Push(binding.entry.offset as i64));
        self.emit(Instruction::Add);
    }

    fn gen_binary(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId) {
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                self.gen_expr(lhs);
                self.gen_expr(rhs);
                self.emit(match op {
                    BinOp::Add => Instruction::Add,
                    BinOp::Sub => Instruction::Sub,
                    BinOp::Mul => Instruction::Mult,
                    _ => Instruction::Div,
                });
            }
            BinOp::Eq | BinOp::LessEq => {
                let true_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.gen_expr(lhs);
                self.gen_expr(rhs);
                self.emit(match op {
                    BinOp::Eq => Instruction::BranchEq(true_label.clone()),
                    _ => Instruction::BranchLessEq(true_label.clone()),
                });
                self.emit(Instruction::Push(0));
                self.emit(Instruction::Branch(end_label.clone()));
                self.emit(Instruction::Label(true_label));
                self.emit(Instruction::Push(1));
                self.emit(Instruction::Label(end_label));
            }
            BinOp::GreaterEq => {
                // l >= r rewritten as r - l <= 0, sparing a dedicated
                // greater-or-equal primitive
                let true_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.gen_expr(rhs);
                self.gen_expr(lhs);
                self.emit(Instruction::Sub);
                self.emit(Instruction::Push(0));
                self.emit(Instruction::BranchLessEq(true_label.clone()));
                self.emit(Instruction::Push(0));
                self.emit(Instruction::Branch(end_label.clone()));
                self.emit(Instruction::Label(true_label));
                self.emit(Instruction::Push(1));
                self.emit(Instruction::Label(end_label));
            }
            BinOp::And => {
                let false_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.gen_expr(lhs);
                self.emit(Instruction::Push(0));
                self.emit(Instruction::BranchEq(false_label.clone()));
                self.gen_expr(rhs);
                self.emit(Instruction::Push(0));
                self.emit(Instruction::BranchEq(false_label.clone()));
                self.emit(Instruction::Push(1));
                self.emit(Instruction::Branch(end_label.clone()));
                self.emit(Instruction::Label(false_label));
                self.emit(Instruction::Push(0));
                self.emit(Instruction::Label(end_label));
            }
            BinOp::Or => {
                let true_label = self.fresh_label();
                let end_label = self.fresh_label();
                self.gen_expr(lhs);
                self.emit(Instruction::Push(1));
                self.emit(Instruction::BranchEq(true_label.clone()));
                self.gen_expr(rhs);
                self.emit(Instruction::Push(1));
                self.emit(Instruction::BranchEq(true_label.clone()));
                self.emit(Instruction::Push(0));
                self.emit(Instruction::Branch(end_label.clone()));
                self.emit(Instruction::Label(true_label));
                self.emit(Instruction::Push(1));
                self.emit(Instruction::Label(end_label));
            }
        }
    }

    /// Call of a declared function, or of a method of the enclosing class
    /// through the object's dispatch table. In both cases the access-link
    /// walk reaches the frame (or object) the callee's slot lives in.
    fn gen_call(&mut self, expr: ExprId, args: &[ExprId]) {
        let binding = &self.res.bindings[&expr];
        let hops = binding.nl - binding.entry.nl;
        let offset = binding.entry.offset as i64;
        let dispatch = self.res.method_bindings.contains_key(&expr);

        self.emit(Instruction::LoadFp); // control link
        for &arg in args.iter().rev() {
            self.gen_expr(arg);
        }
        self.emit(Instruction::LoadFp);
        for _ in 0..hops {
            self.emit(Instruction::LoadWord);
        }
        // duplicate: one copy stays as the callee's access link
        self.emit(Instruction::StoreTm);
        self.emit(Instruction::LoadTm);
        self.emit(Instruction::LoadTm);
        if dispatch {
            self.emit(Instruction::LoadWord); // dispatch-table address
        }
        self.emit(Instruction::Push(offset));
        self.emit(Instruction::Add);
        self.emit(Instruction::LoadWord); // code address
        self.emit(Instruction::JumpSave);
    }

    /// `obj.method(args)`: the object pointer itself becomes the callee's
    /// access link, so the method body reads fields like an enclosing scope.
    fn gen_method_call(&mut self, expr: ExprId, args: &[ExprId]) {
        let binding = &self.res.bindings[&expr];
        let method_offset = self.res.method_bindings[&expr].offset as i64;

        self.emit(Instruction::LoadFp); // control link
        for &arg in args.iter().rev() {
            self.gen_expr(arg);
        }
        self.gen_frame_slot(binding);
        self.emit(Instruction::LoadWord); // object pointer
        self.emit(Instruction::StoreTm);
        self.emit(Instruction::LoadTm);
        self.emit(Instruction::LoadTm);
        self.emit(Instruction::LoadWord); // dispatch-table address
        self.emit(Instruction::Push(method_offset));
        self.emit(Instruction::Add);
        self.emit(Instruction::LoadWord); // method code address
        self.emit(Instruction::JumpSave);
    }

    /// `new Class(args)`: field values move from the stack to fresh heap
    /// cells, then one more cell stores the class's dispatch-table address.
    /// Its address is the object pointer and the node's value.
    fn gen_new(&mut self, expr: ExprId, args: &[ExprId]) {
        let class_offset = self.res.bindings[&expr].entry.offset as i64;

        for &arg in args {
            self.gen_expr(arg);
        }
        for _ in args {
            self.emit(Instruction::LoadHp);
            self.emit(Instruction::StoreWord);
            self.emit(Instruction::LoadHp);
            self.emit(Instruction::Push(1));
            self.emit(Instruction::Add);
            self.emit(Instruction::StoreHp);
        }
        // the class's global slot sits at a fixed address above the stack
        self.emit(Instruction::Push(MEMSIZE + class_offset));
        self.emit(Instruction::LoadWord);
        self.emit(Instruction::LoadHp);
        self.emit(Instruction::StoreWord);
        self.emit(Instruction::LoadHp); // object pointer
        self.emit(Instruction::LoadHp);
        self.emit(Instruction::Push(1));
        self.emit(Instruction::Add);
        self.emit(Instruction::StoreHp);
    }
}
