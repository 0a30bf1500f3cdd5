//! The instruction set of the target stack machine.
//!
//! The machine keeps a stack growing downward from the top of memory and a
//! heap growing upward from address 0, with four registers: the frame
//! pointer `fp`, the return address `ra`, a temporary `tm` and the heap
//! pointer `hp`. Every instruction pops its operands off the stack and
//! pushes its result back, except the register moves and `print`.

use std::fmt::Display;

/// One target-machine instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Push an integer constant.
    Push(i64),
    /// Push the address of a code label.
    PushLabel(String),
    /// Discard the top of the stack.
    Pop,
    /// Pop two values and push their sum.
    Add,
    /// Pop the subtrahend, then the minuend, push the difference.
    Sub,
    /// Pop two values and push their product.
    Mult,
    /// Pop the divisor, then the dividend, push the quotient.
    Div,
    /// Unconditional jump.
    Branch(String),
    /// Pop two values, jump if the second-popped equals the first-popped.
    BranchEq(String),
    /// Pop two values, jump if the second-popped is <= the first-popped.
    BranchLessEq(String),
    /// Jump to the popped address, saving the next instruction in `ra`.
    JumpSave,
    /// Pop an address and push the memory word it points to.
    LoadWord,
    /// Pop an address, pop a value, store the value at the address.
    StoreWord,
    /// Push `fp`.
    LoadFp,
    /// Pop into `fp`.
    StoreFp,
    /// Copy `sp` into `fp`.
    CopyFp,
    /// Push `ra`.
    LoadRa,
    /// Pop into `ra`.
    StoreRa,
    /// Push `tm`.
    LoadTm,
    /// Pop into `tm`.
    StoreTm,
    /// Push `hp`.
    LoadHp,
    /// Pop into `hp`.
    StoreHp,
    /// Print the top of the stack without popping it.
    Print,
    /// Stop execution.
    Halt,
    /// A jump target; executes as a no-op.
    Label(String),
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Push(n) => write!(f, "push {}", n),
            Instruction::PushLabel(l) => write!(f, "push {}", l),
            Instruction::Pop => write!(f, "pop"),
            Instruction::Add => write!(f, "add"),
            Instruction::Sub => write!(f, "sub"),
            Instruction::Mult => write!(f, "mult"),
            Instruction::Div => write!(f, "div"),
            Instruction::Branch(l) => write!(f, "b {}", l),
            Instruction::BranchEq(l) => write!(f, "beq {}", l),
            Instruction::BranchLessEq(l) => write!(f, "bleq {}", l),
            Instruction::JumpSave => write!(f, "js"),
            Instruction::LoadWord => write!(f, "lw"),
            Instruction::StoreWord => write!(f, "sw"),
            Instruction::LoadFp => write!(f, "lfp"),
            Instruction::StoreFp => write!(f, "sfp"),
            Instruction::CopyFp => write!(f, "cfp"),
            Instruction::LoadRa => write!(f, "lra"),
            Instruction::StoreRa => write!(f, "sra"),
            Instruction::LoadTm => write!(f, "ltm"),
            Instruction::StoreTm => write!(f, "stm"),
            Instruction::LoadHp => write!(f, "lhp"),
            Instruction::StoreHp => write!(f, "shp"),
            Instruction::Print => write!(f, "print"),
            Instruction::Halt => write!(f, "halt"),
            Instruction::Label(l) => write!(f, "{}:", l),
        }
    }
}

/// Renders an instruction sequence as the textual assembly consumed by the
/// external machine interpreter, one instruction per line.
pub fn to_assembly(code: &[Instruction]) -> String {
    code.iter()
        .map(Instruction::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
