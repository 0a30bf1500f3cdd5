//! Integration tests for end-to-end compilation.
//!
//! These tests drive the complete pipeline from an AST through resolution,
//! type checking and code generation, then execute the generated
//! instructions on a small reference interpreter of the target machine and
//! assert on the printed output. The interpreter is test scaffolding; the
//! production machine is an external collaborator.

use oolc::{
    ast::{
        ast::{Ast, BinOp, Decl, DeclId, Expr, ExprId, Param, Program},
        types::Type,
    },
    compile,
    compiler::compiler::MEMSIZE,
    compiler::instruction::Instruction,
};

/// Reference interpreter for the generated code: a downward-growing stack, an
/// upward-growing heap and the fp/ra/tm/hp registers.
mod vm {
    use std::collections::HashMap;

    use oolc::compiler::{compiler::MEMSIZE, instruction::Instruction};

    /// Executes `code` from the first instruction until `halt`, returning
    /// everything printed along the way.
    pub fn run(code: &[Instruction]) -> Vec<i64> {
        let labels: HashMap<&str, usize> = code
            .iter()
            .enumerate()
            .filter_map(|(i, instruction)| match instruction {
                Instruction::Label(l) => Some((l.as_str(), i)),
                _ => None,
            })
            .collect();

        let mut mem = vec![0i64; MEMSIZE as usize];
        let mut sp = MEMSIZE;
        let mut fp = MEMSIZE;
        let mut ra = 0i64;
        let mut tm = 0i64;
        let mut hp = 0i64;
        let mut pc = 0usize;
        let mut output = Vec::new();

        macro_rules! push {
            ($v:expr) => {{
                sp -= 1;
                mem[sp as usize] = $v;
            }};
        }
        macro_rules! pop {
            () => {{
                let v = mem[sp as usize];
                sp += 1;
                v
            }};
        }

        loop {
            let instruction = &code[pc];
            pc += 1;
            match instruction {
                Instruction::Push(n) => push!(*n),
                Instruction::PushLabel(l) => push!(labels[l.as_str()] as i64),
                Instruction::Pop => {
                    pop!();
                }
                Instruction::Add => {
                    let v1 = pop!();
                    let v2 = pop!();
                    push!(v2.wrapping_add(v1));
                }
                Instruction::Sub => {
                    let v1 = pop!();
                    let v2 = pop!();
                    push!(v2.wrapping_sub(v1));
                }
                Instruction::Mult => {
                    let v1 = pop!();
                    let v2 = pop!();
                    push!(v2.wrapping_mul(v1));
                }
                Instruction::Div => {
                    let v1 = pop!();
                    let v2 = pop!();
                    push!(v2 / v1);
                }
                Instruction::Branch(l) => pc = labels[l.as_str()],
                Instruction::BranchEq(l) => {
                    let v1 = pop!();
                    let v2 = pop!();
                    if v2 == v1 {
                        pc = labels[l.as_str()];
                    }
                }
                Instruction::BranchLessEq(l) => {
                    let v1 = pop!();
                    let v2 = pop!();
                    if v2 <= v1 {
                        pc = labels[l.as_str()];
                    }
                }
                Instruction::JumpSave => {
                    let address = pop!();
                    ra = pc as i64;
                    pc = address as usize;
                }
                Instruction::LoadWord => {
                    let address = pop!();
                    push!(mem[address as usize]);
                }
                Instruction::StoreWord => {
                    let address = pop!();
                    let value = pop!();
                    mem[address as usize] = value;
                }
                Instruction::LoadFp => push!(fp),
                Instruction::StoreFp => fp = pop!(),
                Instruction::CopyFp => fp = sp,
                Instruction::LoadRa => push!(ra),
                Instruction::StoreRa => ra = pop!(),
                Instruction::LoadTm => push!(tm),
                Instruction::StoreTm => tm = pop!(),
                Instruction::LoadHp => push!(hp),
                Instruction::StoreHp => hp = pop!(),
                Instruction::Print => output.push(mem[sp as usize]),
                Instruction::Halt => break,
                Instruction::Label(_) => {}
            }
        }

        output
    }
}

fn run(ast: &Ast, program: &Program) -> Vec<i64> {
    let code = compile(ast, program).expect("program must compile cleanly");
    vm::run(&code)
}

fn int(ast: &mut Ast, n: i64) -> ExprId {
    ast.expr(Expr::Int(n), 1)
}

fn id(ast: &mut Ast, name: &str) -> ExprId {
    ast.expr(Expr::Id(name.to_string()), 1)
}

fn binary(ast: &mut Ast, op: BinOp, lhs: ExprId, rhs: ExprId) -> ExprId {
    ast.expr(Expr::Binary { op, lhs, rhs }, 1)
}

fn print(ast: &mut Ast, inner: ExprId) -> ExprId {
    ast.expr(Expr::Print(inner), 1)
}

fn var(ast: &mut Ast, name: &str, ty: Type, init: ExprId) -> DeclId {
    ast.decl(
        Decl::Var {
            id: name.to_string(),
            ty,
            init,
        },
        1,
    )
}

fn call(ast: &mut Ast, name: &str, args: Vec<ExprId>) -> ExprId {
    ast.expr(
        Expr::Call {
            id: name.to_string(),
            args,
        },
        1,
    )
}

#[test]
fn test_print_of_arithmetic_on_a_global() {
    // let var x:int = 5 in print(x+2)
    let mut ast = Ast::new();
    let five = int(&mut ast, 5);
    let x = var(&mut ast, "x", Type::Int, five);
    let use_x = id(&mut ast, "x");
    let two = int(&mut ast, 2);
    let sum = binary(&mut ast, BinOp::Add, use_x, two);
    let body = print(&mut ast, sum);
    let program = Program::LetIn {
        decls: vec![x],
        body,
    };

    assert_eq!(run(&ast, &program), vec![7]);
}

#[test]
fn test_function_call_with_parameter() {
    // let fun f(n:int):int = n*2 in print(f(10))
    let mut ast = Ast::new();
    let use_n = id(&mut ast, "n");
    let two = int(&mut ast, 2);
    let prod = binary(&mut ast, BinOp::Mul, use_n, two);
    let f = ast.decl(
        Decl::Fun {
            id: "f".to_string(),
            ret: Type::Int,
            params: vec![Param {
                id: "n".to_string(),
                ty: Type::Int,
            }],
            locals: Vec::new(),
            body: prod,
        },
        1,
    );
    let ten = int(&mut ast, 10);
    let invocation = call(&mut ast, "f", vec![ten]);
    let body = print(&mut ast, invocation);
    let program = Program::LetIn {
        decls: vec![f],
        body,
    };

    assert_eq!(run(&ast, &program), vec![20]);
}

#[test]
fn test_non_local_read_through_access_link() {
    // let var x:int = 1  fun f():int = x+2 in print(f())
    let mut ast = Ast::new();
    let one = int(&mut ast, 1);
    let x = var(&mut ast, "x", Type::Int, one);
    let use_x = id(&mut ast, "x");
    let two = int(&mut ast, 2);
    let sum = binary(&mut ast, BinOp::Add, use_x, two);
    let f = ast.decl(
        Decl::Fun {
            id: "f".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: Vec::new(),
            body: sum,
        },
        1,
    );
    let invocation = call(&mut ast, "f", vec![]);
    let body = print(&mut ast, invocation);
    let program = Program::LetIn {
        decls: vec![x, f],
        body,
    };

    assert_eq!(run(&ast, &program), vec![3]);
}

#[test]
fn test_function_locals_are_framed_and_unwound() {
    // let fun f():int = (let var y:int = 3 in y*2) in print(f() + f())
    let mut ast = Ast::new();
    let three = int(&mut ast, 3);
    let y = var(&mut ast, "y", Type::Int, three);
    let use_y = id(&mut ast, "y");
    let two = int(&mut ast, 2);
    let prod = binary(&mut ast, BinOp::Mul, use_y, two);
    let f = ast.decl(
        Decl::Fun {
            id: "f".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: vec![y],
            body: prod,
        },
        1,
    );
    let first = call(&mut ast, "f", vec![]);
    let second = call(&mut ast, "f", vec![]);
    let sum = binary(&mut ast, BinOp::Add, first, second);
    let body = print(&mut ast, sum);
    let program = Program::LetIn {
        decls: vec![f],
        body,
    };

    assert_eq!(run(&ast, &program), vec![12]);
}

#[test]
fn test_if_selects_the_right_branch() {
    // print(if 5 <= 3 then 10 else 20)
    let mut ast = Ast::new();
    let five = int(&mut ast, 5);
    let three = int(&mut ast, 3);
    let cond = binary(&mut ast, BinOp::LessEq, five, three);
    let ten = int(&mut ast, 10);
    let twenty = int(&mut ast, 20);
    let cond_expr = ast.expr(
        Expr::If {
            cond,
            then_branch: ten,
            else_branch: twenty,
        },
        1,
    );
    let body = print(&mut ast, cond_expr);
    let program = Program::Body(body);

    assert_eq!(run(&ast, &program), vec![20]);
}

#[test]
fn test_boolean_encodings() {
    // print(true and false); print(false or true); print(not true);
    // print(5 >= 3); print(3 >= 5); print(4 = 4)
    let mut ast = Ast::new();
    let mut prints = Vec::new();
    {
        let t = ast.expr(Expr::Bool(true), 1);
        let f = ast.expr(Expr::Bool(false), 1);
        let and = binary(&mut ast, BinOp::And, t, f);
        prints.push(print(&mut ast, and));
    }
    {
        let f = ast.expr(Expr::Bool(false), 1);
        let t = ast.expr(Expr::Bool(true), 1);
        let or = binary(&mut ast, BinOp::Or, f, t);
        prints.push(print(&mut ast, or));
    }
    {
        let t = ast.expr(Expr::Bool(true), 1);
        let not = ast.expr(Expr::Not(t), 1);
        prints.push(print(&mut ast, not));
    }
    {
        let five = int(&mut ast, 5);
        let three = int(&mut ast, 3);
        let ge = binary(&mut ast, BinOp::GreaterEq, five, three);
        prints.push(print(&mut ast, ge));
    }
    {
        let three = int(&mut ast, 3);
        let five = int(&mut ast, 5);
        let ge = binary(&mut ast, BinOp::GreaterEq, three, five);
        prints.push(print(&mut ast, ge));
    }
    {
        let a = int(&mut ast, 4);
        let b = int(&mut ast, 4);
        let eq = binary(&mut ast, BinOp::Eq, a, b);
        prints.push(print(&mut ast, eq));
    }

    // chain the prints into one expression with additions; every print
    // evaluates to its operand, so the sum is well-typed
    let mut body = prints[0];
    for &next in &prints[1..] {
        body = binary(&mut ast, BinOp::Add, body, next);
    }
    let program = Program::Body(body);

    assert_eq!(run(&ast, &program), vec![0, 1, 0, 1, 0, 1]);
}

#[test]
fn test_method_reads_object_field() {
    // let class Counter(value:int) { get():int = value }
    //     var c:Counter = new Counter(7)
    // in print(c.get())
    let mut ast = Ast::new();
    let value_field = ast.decl(
        Decl::Field {
            id: "value".to_string(),
            ty: Type::Int,
        },
        1,
    );
    let use_value = id(&mut ast, "value");
    let get = ast.decl(
        Decl::Method {
            id: "get".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: Vec::new(),
            body: use_value,
        },
        1,
    );
    let counter = ast.decl(
        Decl::Class {
            id: "Counter".to_string(),
            super_id: None,
            fields: vec![value_field],
            methods: vec![get],
        },
        1,
    );
    let seven = int(&mut ast, 7);
    let new_counter = ast.expr(
        Expr::New {
            class: "Counter".to_string(),
            args: vec![seven],
        },
        1,
    );
    let c = var(&mut ast, "c", Type::Ref("Counter".to_string()), new_counter);
    let method_call = ast.expr(
        Expr::MethodCall {
            obj: "c".to_string(),
            method: "get".to_string(),
            args: vec![],
        },
        1,
    );
    let body = print(&mut ast, method_call);
    let program = Program::LetIn {
        decls: vec![counter, c],
        body,
    };

    assert_eq!(run(&ast, &program), vec![7]);
}

#[test]
fn test_virtual_dispatch_uses_the_dynamic_class() {
    // let class Animal(speak:int) { sound():int = speak }
    //     class Dog extends Animal { sound():int = speak+1 }
    //     var a:Animal = new Dog(5)
    // in print(a.sound())
    let mut ast = Ast::new();
    let speak = ast.decl(
        Decl::Field {
            id: "speak".to_string(),
            ty: Type::Int,
        },
        1,
    );
    let use_speak = id(&mut ast, "speak");
    let animal_sound = ast.decl(
        Decl::Method {
            id: "sound".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: Vec::new(),
            body: use_speak,
        },
        1,
    );
    let animal = ast.decl(
        Decl::Class {
            id: "Animal".to_string(),
            super_id: None,
            fields: vec![speak],
            methods: vec![animal_sound],
        },
        1,
    );
    let use_speak_dog = id(&mut ast, "speak");
    let one = int(&mut ast, 1);
    let louder = binary(&mut ast, BinOp::Add, use_speak_dog, one);
    let dog_sound = ast.decl(
        Decl::Method {
            id: "sound".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: Vec::new(),
            body: louder,
        },
        2,
    );
    let dog = ast.decl(
        Decl::Class {
            id: "Dog".to_string(),
            super_id: Some("Animal".to_string()),
            fields: vec![],
            methods: vec![dog_sound],
        },
        2,
    );
    let five = int(&mut ast, 5);
    let new_dog = ast.expr(
        Expr::New {
            class: "Dog".to_string(),
            args: vec![five],
        },
        3,
    );
    // statically an Animal, dynamically a Dog
    let a = var(&mut ast, "a", Type::Ref("Animal".to_string()), new_dog);
    let method_call = ast.expr(
        Expr::MethodCall {
            obj: "a".to_string(),
            method: "sound".to_string(),
            args: vec![],
        },
        3,
    );
    let body = print(&mut ast, method_call);
    let program = Program::LetIn {
        decls: vec![animal, dog, a],
        body,
    };

    assert_eq!(run(&ast, &program), vec![6]);
}

#[test]
fn test_inherited_method_runs_on_subclass_object() {
    // Dog declares no methods; Animal's sound() is dispatched
    let mut ast = Ast::new();
    let speak = ast.decl(
        Decl::Field {
            id: "speak".to_string(),
            ty: Type::Int,
        },
        1,
    );
    let use_speak = id(&mut ast, "speak");
    let sound = ast.decl(
        Decl::Method {
            id: "sound".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: Vec::new(),
            body: use_speak,
        },
        1,
    );
    let animal = ast.decl(
        Decl::Class {
            id: "Animal".to_string(),
            super_id: None,
            fields: vec![speak],
            methods: vec![sound],
        },
        1,
    );
    let dog = ast.decl(
        Decl::Class {
            id: "Dog".to_string(),
            super_id: Some("Animal".to_string()),
            fields: vec![],
            methods: vec![],
        },
        2,
    );
    let nine = int(&mut ast, 9);
    let new_dog = ast.expr(
        Expr::New {
            class: "Dog".to_string(),
            args: vec![nine],
        },
        3,
    );
    let d = var(&mut ast, "d", Type::Ref("Dog".to_string()), new_dog);
    let method_call = ast.expr(
        Expr::MethodCall {
            obj: "d".to_string(),
            method: "sound".to_string(),
            args: vec![],
        },
        3,
    );
    let body = print(&mut ast, method_call);
    let program = Program::LetIn {
        decls: vec![animal, dog, d],
        body,
    };

    assert_eq!(run(&ast, &program), vec![9]);
}

#[test]
fn test_method_calls_sibling_method() {
    // let class C() { base():int = 5  total():int = base()+2 }
    //     var c:C = new C()
    // in print(c.total())
    let mut ast = Ast::new();
    let five = int(&mut ast, 5);
    let base = ast.decl(
        Decl::Method {
            id: "base".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: Vec::new(),
            body: five,
        },
        1,
    );
    let base_call = call(&mut ast, "base", vec![]);
    let two = int(&mut ast, 2);
    let sum = binary(&mut ast, BinOp::Add, base_call, two);
    let total = ast.decl(
        Decl::Method {
            id: "total".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: Vec::new(),
            body: sum,
        },
        1,
    );
    let class = ast.decl(
        Decl::Class {
            id: "C".to_string(),
            super_id: None,
            fields: vec![],
            methods: vec![base, total],
        },
        1,
    );
    let new_c = ast.expr(
        Expr::New {
            class: "C".to_string(),
            args: vec![],
        },
        2,
    );
    let c = var(&mut ast, "c", Type::Ref("C".to_string()), new_c);
    let method_call = ast.expr(
        Expr::MethodCall {
            obj: "c".to_string(),
            method: "total".to_string(),
            args: vec![],
        },
        2,
    );
    let body = print(&mut ast, method_call);
    let program = Program::LetIn {
        decls: vec![class, c],
        body,
    };

    assert_eq!(run(&ast, &program), vec![7]);
}

#[test]
fn test_null_reference_compares_equal_to_null() {
    // let class A() var a:A = null in print(if a = null then 1 else 0)
    let mut ast = Ast::new();
    let class = ast.decl(
        Decl::Class {
            id: "A".to_string(),
            super_id: None,
            fields: vec![],
            methods: vec![],
        },
        1,
    );
    let null_init = ast.expr(Expr::Empty, 1);
    let a = var(&mut ast, "a", Type::Ref("A".to_string()), null_init);
    let use_a = id(&mut ast, "a");
    let null_cmp = ast.expr(Expr::Empty, 1);
    let cond = binary(&mut ast, BinOp::Eq, use_a, null_cmp);
    let one = int(&mut ast, 1);
    let zero = int(&mut ast, 0);
    let choice = ast.expr(
        Expr::If {
            cond,
            then_branch: one,
            else_branch: zero,
        },
        1,
    );
    let body = print(&mut ast, choice);
    let program = Program::LetIn {
        decls: vec![class, a],
        body,
    };

    assert_eq!(run(&ast, &program), vec![1]);
}

#[test]
fn test_compile_refuses_programs_with_errors() {
    // let var x:bool = 3 in x
    let mut ast = Ast::new();
    let three = int(&mut ast, 3);
    let x = var(&mut ast, "x", Type::Bool, three);
    let body = id(&mut ast, "x");
    let program = Program::LetIn {
        decls: vec![x],
        body,
    };

    let errors = compile(&ast, &program).unwrap_err();

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "Incompatible value for variable x at line 1"
    );
}

#[test]
fn test_globals_live_above_the_stack_limit() {
    // the generated code addresses a class's slot as MEMSIZE + offset; make
    // sure an object built from a second class picks the right table
    let mut ast = Ast::new();
    let one = int(&mut ast, 1);
    let m_a = ast.decl(
        Decl::Method {
            id: "m".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: Vec::new(),
            body: one,
        },
        1,
    );
    let class_a = ast.decl(
        Decl::Class {
            id: "A".to_string(),
            super_id: None,
            fields: vec![],
            methods: vec![m_a],
        },
        1,
    );
    let two = int(&mut ast, 2);
    let m_b = ast.decl(
        Decl::Method {
            id: "m".to_string(),
            ret: Type::Int,
            params: Vec::new(),
            locals: Vec::new(),
            body: two,
        },
        2,
    );
    let class_b = ast.decl(
        Decl::Class {
            id: "B".to_string(),
            super_id: None,
            fields: vec![],
            methods: vec![m_b],
        },
        2,
    );
    let new_b = ast.expr(
        Expr::New {
            class: "B".to_string(),
            args: vec![],
        },
        3,
    );
    let b = var(&mut ast, "b", Type::Ref("B".to_string()), new_b);
    let method_call = ast.expr(
        Expr::MethodCall {
            obj: "b".to_string(),
            method: "m".to_string(),
            args: vec![],
        },
        3,
    );
    let body = print(&mut ast, method_call);
    let program = Program::LetIn {
        decls: vec![class_a, class_b, b],
        body,
    };

    let code = compile(&ast, &program).expect("program must compile cleanly");
    // B is the second class, so its slot is the second global
    assert!(code.contains(&Instruction::Push(MEMSIZE - 3)));
    assert_eq!(vm::run(&code), vec![2]);
}
