//! Compiled bytecode bodies.

use std::{fmt, rc::Rc};

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::utils::escape_str;

use super::opcode::{Instruction, JumpTarget, OpCode};

/// The literal operand of a `PUSH`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// "null"
    Null,
    /// "true", "false"
    Bool(bool),
    /// "12", "3.5"
    Number(f64),
    /// ""abc""
    Str(Rc<str>),
    /// A function reference, resolved by name at run time.
    Function(CompactString),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Null => f.write_str("null"),
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Number(v) => write!(f, "{v}"),
            ConstValue::Str(v) => write!(f, "\"{}\"", escape_str(v)),
            ConstValue::Function(name) => write!(f, "<func {name}>"),
        }
    }
}

/// A named binding known to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: CompactString,
    pub global: bool,
    /// Frozen at first assignment, see [`is_constant_name`].
    pub constant: bool,
}

/// Names starting with an uppercase letter are constants.
pub fn is_constant_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
}

/// A bytecode function body.
///
/// Instructions are addressed by index, so a jump emitted before its target
/// is known gets rewritten in place once the target is reached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Code {
    pub instructions: Vec<Instruction>,
    /// Parameters and variables, in declaration order.
    pub variables: IndexMap<CompactString, Variable>,
}

impl Code {
    pub fn new() -> Self {
        Code::default()
    }

    /// The index the next emitted instruction will get.
    pub fn next_target(&self) -> JumpTarget {
        JumpTarget(self.instructions.len())
    }

    /// Appends an instruction and returns its index.
    pub fn emit(&mut self, opcode: OpCode, line: u32) -> usize {
        self.instructions.push(Instruction { opcode, line });
        self.instructions.len() - 1
    }

    /// Points the jump at `index` to the next instruction to be emitted.
    pub fn patch(&mut self, index: usize) {
        let target = self.next_target();
        let patched = self.instructions[index].opcode.set_jump_target(target);
        debug_assert!(patched, "patched a non-jump instruction");
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{i:>6}  {instruction}")?;
        }
        Ok(())
    }
}
