use std::{fmt, rc::Rc};

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::{
    compiler::code::Code,
    errors::{Error, ErrorKind, TracebackFrame},
    objects::{Function, Value},
    utils::Join,
};

/// A running bytecode function.
#[derive(Debug, Clone)]
pub struct Frame {
    pub function: Rc<Function>,
    pub code: Rc<Code>,
    pub pc: usize,
    pub stack: Vec<Value>,
    pub locals: FxHashMap<CompactString, Value>,
    /// The call arguments as passed, for tracebacks.
    pub args: Vec<Value>,
    pub is_entry: bool,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function: {}", self.function.name)?;
        writeln!(f, "pc: {}", self.pc)?;
        writeln!(
            f,
            "locals: [{}]",
            self.locals
                .iter()
                .map(|(name, value)| format!("{name}: {}", value.repr()))
                .join(", ")
        )?;
        write!(f, "stack: [{}]", self.stack.iter().map(Value::repr).join(", "))
    }
}

impl Frame {
    /// Creates a frame with the parameters bound to `args`, which must match
    /// the function arity.
    pub(crate) fn new(function: Rc<Function>, code: Rc<Code>, args: Vec<Value>) -> Self {
        let locals = function
            .params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        Frame {
            function,
            code,
            pc: 0,
            stack: Vec::new(),
            locals,
            args,
            is_entry: false,
        }
    }

    pub(crate) fn pop(&mut self) -> Result<Value, Error> {
        self.stack.pop().ok_or_else(|| ErrorKind::Stack.into())
    }

    pub(crate) fn peek(&self) -> Result<&Value, Error> {
        self.stack.last().ok_or_else(|| ErrorKind::Stack.into())
    }

    /// Pops the `count` topmost values, keeping their order.
    pub(crate) fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, Error> {
        let len = self.stack.len();
        if count > len {
            return Err(ErrorKind::Stack.into());
        }
        Ok(self.stack.split_off(len - count))
    }

    /// The three cells of the innermost `for` loop.
    pub(crate) fn loop_cells(&mut self) -> Result<&mut [Value], Error> {
        let len = self.stack.len();
        if len < 3 {
            return Err(ErrorKind::Stack.into());
        }
        Ok(&mut self.stack[len - 3..])
    }

    /// Describes where this frame was when an error went through it.
    pub(crate) fn traceback_frame(&self) -> TracebackFrame {
        TracebackFrame {
            function: self.function.name.clone(),
            line: self
                .code
                .instructions
                .get(self.pc.saturating_sub(1))
                .map(|instruction| instruction.line),
            args: (!self.is_entry).then(|| self.args.clone()),
        }
    }
}
