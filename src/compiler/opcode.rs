//! The OpCodes for the Luigi VM.

use std::fmt;

use compact_str::CompactString;

use super::code::ConstValue;

/// The jump target, an absolute instruction index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct JumpTarget(pub usize);

impl fmt::Display for JumpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// The operation code.
///
/// TOS is the top-of-stack item, TOS1 the one below it.
#[derive(Debug, Clone, PartialEq)]
pub enum OpCode {
    /// Pushes a literal onto the stack.
    Push(ConstValue),
    /// Removes the `count` topmost items.
    Pop(usize),

    /// Pushes the global `name` onto the stack.
    LoadGlobal(CompactString),
    /// Pushes the local `name` onto the stack.
    LoadLocal(CompactString),
    /// Pops TOS into the global `name`.
    StoreGlobal(CompactString),
    /// Pops TOS into the local `name`.
    StoreLocal(CompactString),
    /// Marks TOS as immutable.
    Freeze,

    /// Pushes a new empty list.
    ListNew,
    /// Pops TOS and appends it to the list now on top.
    ListAppend,
    /// Implements `TOS2[TOS1] = TOS`.
    ListSet,
    /// Implements `TOS = TOS1[TOS]`.
    ListGet,

    /// Pushes a new empty object.
    ObjNew,
    /// Pops TOS and adds it as member `name` of the object now on top.
    ObjAppend(CompactString),
    /// Implements `TOS1.name = TOS`.
    ObjSet(CompactString),
    /// Implements `TOS = TOS.name`.
    ObjGet(CompactString),

    /// Implements `TOS = TOS1 + TOS`.
    Add,
    /// Implements `TOS = TOS1 - TOS`.
    Subtract,
    /// Implements `TOS = TOS1 * TOS`.
    Multiply,
    /// Implements `TOS = TOS1 / TOS`.
    Divide,
    /// Implements `TOS = TOS1 % TOS`.
    Modulo,
    /// Implements `TOS = -TOS`.
    Negate,

    /// Implements `TOS = TOS1 = TOS`.
    Equal,
    /// Implements `TOS = TOS1 != TOS`.
    NotEqual,
    /// Implements `TOS = TOS1 < TOS`.
    Less,
    /// Implements `TOS = TOS1 <= TOS`.
    LessOrEqual,
    /// Implements `TOS = TOS1 > TOS`.
    Greater,
    /// Implements `TOS = TOS1 >= TOS`.
    GreaterOrEqual,
    /// Implements `TOS = TOS1 or TOS`.
    Or,
    /// Implements `TOS = TOS1 and TOS`.
    And,
    /// Implements `TOS = not TOS`.
    Not,

    /// Sets the bytecode counter to target.
    Jump(JumpTarget),
    /// Pops TOS, and if it is falsy, sets the bytecode counter to target.
    Branch(JumpTarget),
    /// If TOS is truthy, sets the bytecode counter to target. TOS is kept.
    SkipOr(JumpTarget),
    /// If TOS is falsy, sets the bytecode counter to target. TOS is kept.
    SkipAnd(JumpTarget),

    /// Advances a `[counter, bound, step]` range loop, binding `var` or
    /// dropping the three cells and exiting to `exit`.
    StepRange {
        var: CompactString,
        global: bool,
        exit: JumpTarget,
    },
    /// Advances a `[list, cursor, step]` list loop, binding `var` or
    /// dropping the three cells and exiting to `exit`.
    StepList {
        var: CompactString,
        global: bool,
        exit: JumpTarget,
    },

    /// Pops the arguments of function `name` and calls it.
    Call(CompactString),
    /// Pops `count` arguments, then a callable value, and calls it.
    CallIndirect(usize),
    /// Returns with TOS to the caller of the function.
    Return,
}

impl OpCode {
    /// Rewrites the jump target of a jumping opcode, returns `false` for other opcodes.
    pub fn set_jump_target(&mut self, new_target: JumpTarget) -> bool {
        match self {
            OpCode::Jump(target)
            | OpCode::Branch(target)
            | OpCode::SkipOr(target)
            | OpCode::SkipAnd(target)
            | OpCode::StepRange { exit: target, .. }
            | OpCode::StepList { exit: target, .. } => {
                *target = new_target;
                true
            }
            _ => false,
        }
    }

    /// The opcode name as shown in disassembly and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Push(_) => "PUSH",
            OpCode::Pop(_) => "POP",
            OpCode::LoadGlobal(_) => "LOAD_GLOBAL",
            OpCode::LoadLocal(_) => "LOAD_LOCAL",
            OpCode::StoreGlobal(_) => "STORE_GLOBAL",
            OpCode::StoreLocal(_) => "STORE_LOCAL",
            OpCode::Freeze => "FREEZE",
            OpCode::ListNew => "LIST_NEW",
            OpCode::ListAppend => "LIST_APPEND",
            OpCode::ListSet => "LIST_SET",
            OpCode::ListGet => "LIST_GET",
            OpCode::ObjNew => "OBJ_NEW",
            OpCode::ObjAppend(_) => "OBJ_APPEND",
            OpCode::ObjSet(_) => "OBJ_SET",
            OpCode::ObjGet(_) => "OBJ_GET",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUBTRACT",
            OpCode::Multiply => "MULTIPLY",
            OpCode::Divide => "DIVIDE",
            OpCode::Modulo => "MODULO",
            OpCode::Negate => "NEGATE",
            OpCode::Equal => "EQUAL",
            OpCode::NotEqual => "NOT_EQUAL",
            OpCode::Less => "LESS",
            OpCode::LessOrEqual => "LESS_OR_EQUAL",
            OpCode::Greater => "GREATER",
            OpCode::GreaterOrEqual => "GREATER_OR_EQUAL",
            OpCode::Or => "OR",
            OpCode::And => "AND",
            OpCode::Not => "NOT",
            OpCode::Jump(_) => "JUMP",
            OpCode::Branch(_) => "BRANCH",
            OpCode::SkipOr(_) => "SKIP_OR",
            OpCode::SkipAnd(_) => "SKIP_AND",
            OpCode::StepRange { .. } => "STEP_RANGE",
            OpCode::StepList { .. } => "STEP_LIST",
            OpCode::Call(_) => "CALL",
            OpCode::CallIndirect(_) => "CALL_INDIRECT",
            OpCode::Return => "RETURN",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = 20;
        let name = self.name();
        match self {
            Self::Push(value) => write!(f, "{name:width$}{value}"),
            Self::Pop(count) | Self::CallIndirect(count) => write!(f, "{name:width$}{count}"),
            Self::LoadGlobal(v)
            | Self::LoadLocal(v)
            | Self::StoreGlobal(v)
            | Self::StoreLocal(v)
            | Self::ObjAppend(v)
            | Self::ObjSet(v)
            | Self::ObjGet(v)
            | Self::Call(v) => write!(f, "{name:width$}{v}"),
            Self::Jump(target)
            | Self::Branch(target)
            | Self::SkipOr(target)
            | Self::SkipAnd(target) => write!(f, "{name:width$}{target}"),
            Self::StepRange { var, global, exit } | Self::StepList { var, global, exit } => {
                let scope = if *global { "global" } else { "local" };
                write!(f, "{name:width$}{var} ({scope}) {exit}")
            }
            _ => f.write_str(name),
        }
    }
}

/// An opcode tagged with the source line it was compiled from.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub line: u32,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6}{}", self.line, self.opcode)
    }
}
