//! The bytecode virtual machine.
//!
//! Script calls push a [`Frame`] instead of recursing, so deep script
//! recursion is bounded by [`VmOptions::max_call_depth`] and never by the
//! host stack. Natives run as plain Rust calls and may call back into the
//! VM through [`Vm::call_value`].

use std::rc::Rc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::{
    compiler::{
        code::{Code, ConstValue},
        opcode::OpCode,
        Program, ENTRY_NAME,
    },
    errors::{Error, ErrorKind, TracebackFrame, TypeError},
    frame::Frame,
    objects::{Function, FunctionBody, NativeFn, Value, ValueType},
    operator_error, unexpected_type_error,
};

/// Global variables, by name.
pub type Globals = FxHashMap<CompactString, Value>;

/// Runtime limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// Deepest allowed nesting of function calls, natives included.
    pub max_call_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        VmOptions {
            max_call_depth: 1024,
        }
    }
}

enum Flow {
    Continue,
    Return(Value),
}

/// Executes a compiled [`Program`] against a set of globals.
pub struct Vm {
    program: Program,
    globals: Globals,
    options: VmOptions,
    frames: Vec<Frame>,
    depth: usize,
}

impl Vm {
    pub fn new(program: Program, globals: Globals, options: VmOptions) -> Self {
        Vm {
            program,
            globals,
            options,
            frames: Vec::new(),
            depth: 0,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut Globals {
        &mut self.globals
    }

    pub fn into_globals(self) -> Globals {
        self.globals
    }

    /// Current call nesting.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Runs the entry function to completion.
    pub fn execute(&mut self) -> Result<Value, Error> {
        let entry = self
            .program
            .entry()
            .cloned()
            .ok_or_else(|| ErrorKind::UnknownFunction(ENTRY_NAME.into()))?;
        let Some(code) = entry.code().cloned() else {
            return Err(ErrorKind::UnknownFunction(ENTRY_NAME.into()).into());
        };
        log::debug!("executing entry ({} instructions)", code.len());
        let base = self.frames.len();
        self.push_frame(entry, code, Vec::new(), true)?;
        let result = self.run(base);
        log::debug!("entry finished: {}", if result.is_ok() { "ok" } else { "error" });
        result
    }

    /// Calls a function value, running it to completion. Natives use this to
    /// call back into scripts.
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, Error> {
        match callee {
            Value::Function(function) => self.call_function(function, args),
            _ => Err(TypeError::NotCallable(callee.value_type()).into()),
        }
    }

    pub fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
    ) -> Result<Value, Error> {
        check_arity(function, &args)?;
        match &function.body {
            FunctionBody::Native(native) => self.call_native(function, native, args),
            FunctionBody::Code(code) => {
                let base = self.frames.len();
                self.push_frame(function.clone(), code.clone(), args, false)?;
                self.run(base)
            }
        }
    }

    fn enter(&mut self) -> Result<(), Error> {
        if self.depth >= self.options.max_call_depth {
            return Err(ErrorKind::StackOverflow {
                limit: self.options.max_call_depth,
            }
            .into());
        }
        self.depth += 1;
        Ok(())
    }

    fn push_frame(
        &mut self,
        function: Rc<Function>,
        code: Rc<Code>,
        args: Vec<Value>,
        is_entry: bool,
    ) -> Result<(), Error> {
        self.enter()?;
        let mut frame = Frame::new(function, code, args);
        frame.is_entry = is_entry;
        self.frames.push(frame);
        Ok(())
    }

    fn pop_frame(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        self.depth -= 1;
        Some(frame)
    }

    fn call_native(
        &mut self,
        function: &Rc<Function>,
        native: &Rc<NativeFn>,
        args: Vec<Value>,
    ) -> Result<Value, Error> {
        self.enter()?;
        let native = native.clone();
        let result = (*native)(self, args.clone());
        self.depth -= 1;
        result.map_err(|mut error| {
            error.push_frame(TracebackFrame {
                function: function.name.clone(),
                line: None,
                args: Some(args),
            });
            error
        })
    }

    /// Runs frames until the one at index `base` returns.
    fn run(&mut self, base: usize) -> Result<Value, Error> {
        loop {
            match self.dispatch() {
                Ok(Flow::Continue) => (),
                Ok(Flow::Return(value)) => {
                    self.pop_frame();
                    if self.frames.len() <= base {
                        return Ok(value);
                    }
                    self.top_frame()?.stack.push(value);
                }
                Err(mut error) => {
                    while self.frames.len() > base {
                        if let Some(frame) = self.pop_frame() {
                            error.push_frame(frame.traceback_frame());
                        }
                    }
                    return Err(error);
                }
            }
        }
    }

    fn top_frame(&mut self) -> Result<&mut Frame, Error> {
        self.frames.last_mut().ok_or_else(|| ErrorKind::Stack.into())
    }

    /// Calls `function` from the running frame.
    fn invoke(&mut self, function: Rc<Function>, args: Vec<Value>) -> Result<Flow, Error> {
        check_arity(&function, &args)?;
        match &function.body {
            FunctionBody::Code(code) => {
                let code = code.clone();
                self.push_frame(function, code, args, false)?;
            }
            FunctionBody::Native(native) => {
                let value = self.call_native(&function, native, args)?;
                self.top_frame()?.stack.push(value);
            }
        }
        Ok(Flow::Continue)
    }

    /// Executes one instruction of the top frame.
    fn dispatch(&mut self) -> Result<Flow, Error> {
        let depth = self.depth;
        let Some(frame) = self.frames.last_mut() else {
            return Err(ErrorKind::Stack.into());
        };
        let code = frame.code.clone();
        let Some(instruction) = code.instructions.get(frame.pc) else {
            return Ok(Flow::Return(Value::Null));
        };
        log::trace!("[{depth}] {:>5} {}", frame.pc, instruction.opcode);
        frame.pc += 1;

        macro_rules! bin_op {
            ($opcode:expr, ($lhs:ident, $rhs:ident) => $result:expr) => {{
                let rhs = frame.pop()?;
                let lhs = frame.pop()?;
                let value = match (&lhs, &rhs) {
                    (Value::Number($lhs), Value::Number($rhs)) => Value::Number($result),
                    _ => return Err(operator_error!($opcode, lhs, rhs)),
                };
                frame.stack.push(value);
            }};
        }
        macro_rules! compare {
            ($opcode:expr, $op:tt) => {{
                let rhs = frame.pop()?;
                let lhs = frame.pop()?;
                let value = match (&lhs, &rhs) {
                    (Value::Number(l), Value::Number(r)) => l $op r,
                    (Value::Str(l), Value::Str(r)) => l $op r,
                    _ => return Err(operator_error!($opcode, lhs, rhs)),
                };
                frame.stack.push(Value::Bool(value));
            }};
        }
        macro_rules! logic_op {
            ($op:tt) => {{
                let rhs = frame.pop()?;
                let lhs = frame.pop()?;
                frame.stack.push(Value::Bool(lhs.is_truthy() $op rhs.is_truthy()));
            }};
        }
        macro_rules! bind {
            ($var:expr, $global:expr, $value:expr) => {
                if $global {
                    self.globals.insert($var.clone(), $value);
                } else {
                    frame.locals.insert($var.clone(), $value);
                }
            };
        }

        let opcode = &instruction.opcode;
        match opcode {
            OpCode::Push(value) => {
                let value = match value {
                    ConstValue::Null => Value::Null,
                    ConstValue::Bool(v) => Value::Bool(*v),
                    ConstValue::Number(v) => Value::Number(*v),
                    ConstValue::Str(v) => Value::Str(v.clone()),
                    ConstValue::Function(name) => self
                        .program
                        .get(name)
                        .cloned()
                        .map(Value::Function)
                        .ok_or_else(|| ErrorKind::UnknownFunction(name.clone()))?,
                };
                frame.stack.push(value);
            }
            OpCode::Pop(count) => {
                frame.pop_n(*count)?;
            }

            OpCode::LoadGlobal(name) => {
                let value = self.globals.get(name).cloned().unwrap_or_default();
                frame.stack.push(value);
            }
            OpCode::LoadLocal(name) => {
                let value = frame.locals.get(name).cloned().unwrap_or_default();
                frame.stack.push(value);
            }
            OpCode::StoreGlobal(name) => {
                let value = frame.pop()?;
                self.globals.insert(name.clone(), value);
            }
            OpCode::StoreLocal(name) => {
                let value = frame.pop()?;
                frame.locals.insert(name.clone(), value);
            }
            OpCode::Freeze => frame.peek()?.freeze(),

            OpCode::ListNew => frame.stack.push(Value::new_list(Vec::new())),
            OpCode::ListAppend => {
                let value = frame.pop()?;
                match frame.peek()? {
                    Value::List(list) => list.push(value)?,
                    other => return Err(unexpected_type_error!(ValueType::List, other)),
                }
            }
            OpCode::ListSet => {
                let value = frame.pop()?;
                let index = frame.pop()?;
                let target = frame.pop()?;
                let Value::List(list) = &target else {
                    return Err(unexpected_type_error!(ValueType::List, target));
                };
                let Value::Number(index) = index else {
                    return Err(unexpected_type_error!(ValueType::Number, index));
                };
                list.set(index, value)?;
            }
            OpCode::ListGet => {
                let index = frame.pop()?;
                let target = frame.pop()?;
                let Value::List(list) = &target else {
                    return Err(unexpected_type_error!(ValueType::List, target));
                };
                let Value::Number(index) = index else {
                    return Err(unexpected_type_error!(ValueType::Number, index));
                };
                frame.stack.push(list.get(index)?);
            }

            OpCode::ObjNew => frame.stack.push(Value::Object(Default::default())),
            OpCode::ObjAppend(name) => {
                let value = frame.pop()?;
                match frame.peek()? {
                    Value::Object(object) => object.append(name.clone(), value)?,
                    other => return Err(unexpected_type_error!(ValueType::Object, other)),
                }
            }
            OpCode::ObjSet(name) => {
                let value = frame.pop()?;
                let target = frame.pop()?;
                let Value::Object(object) = &target else {
                    return Err(unexpected_type_error!(ValueType::Object, target));
                };
                object.set(name, value)?;
            }
            OpCode::ObjGet(name) => {
                let target = frame.pop()?;
                let Value::Object(object) = &target else {
                    return Err(unexpected_type_error!(ValueType::Object, target));
                };
                frame.stack.push(object.get(name)?);
            }

            OpCode::Add => {
                let rhs = frame.pop()?;
                let lhs = frame.pop()?;
                let value = match (&lhs, &rhs) {
                    (Value::Number(l), Value::Number(r)) => Value::Number(l + r),
                    (Value::Str(_), _) | (_, Value::Str(_)) => Value::from(format!("{lhs}{rhs}")),
                    _ => return Err(operator_error!(opcode, lhs, rhs)),
                };
                frame.stack.push(value);
            }
            OpCode::Subtract => bin_op!(opcode, (l, r) => l - r),
            OpCode::Multiply => bin_op!(opcode, (l, r) => l * r),
            OpCode::Divide => bin_op!(opcode, (l, r) => l / r),
            OpCode::Modulo => bin_op!(opcode, (l, r) => l % r),
            OpCode::Negate => {
                let value = frame.pop()?;
                let Value::Number(v) = value else {
                    return Err(operator_error!(opcode, value));
                };
                frame.stack.push(Value::Number(-v));
            }

            OpCode::Equal => {
                let rhs = frame.pop()?;
                let lhs = frame.pop()?;
                frame.stack.push(Value::Bool(lhs == rhs));
            }
            OpCode::NotEqual => {
                let rhs = frame.pop()?;
                let lhs = frame.pop()?;
                frame.stack.push(Value::Bool(lhs != rhs));
            }
            OpCode::Less => compare!(opcode, <),
            OpCode::LessOrEqual => compare!(opcode, <=),
            OpCode::Greater => compare!(opcode, >),
            OpCode::GreaterOrEqual => compare!(opcode, >=),
            OpCode::Or => logic_op!(||),
            OpCode::And => logic_op!(&&),
            OpCode::Not => {
                let value = frame.pop()?;
                frame.stack.push(Value::Bool(!value.is_truthy()));
            }

            OpCode::Jump(target) => frame.pc = target.0,
            OpCode::Branch(target) => {
                if !frame.pop()?.is_truthy() {
                    frame.pc = target.0;
                }
            }
            OpCode::SkipOr(target) => {
                if frame.peek()?.is_truthy() {
                    frame.pc = target.0;
                }
            }
            OpCode::SkipAnd(target) => {
                if !frame.peek()?.is_truthy() {
                    frame.pc = target.0;
                }
            }

            OpCode::StepRange { var, global, exit } => {
                let cells = frame.loop_cells()?;
                let (counter, bound, step) = match cells {
                    [Value::Number(c), Value::Number(b), Value::Number(s)] => (*c, *b, *s),
                    [Value::Number(_), bound, _] => {
                        return Err(unexpected_type_error!(ValueType::Number, bound))
                    }
                    [counter, ..] => return Err(unexpected_type_error!(ValueType::Number, counter)),
                    [] => return Err(ErrorKind::Stack.into()),
                };
                if counter < bound {
                    cells[0] = Value::Number(counter + step);
                    bind!(var, *global, Value::Number(counter));
                } else {
                    frame.pop_n(3)?;
                    frame.pc = exit.0;
                }
            }
            OpCode::StepList { var, global, exit } => {
                let cells = frame.loop_cells()?;
                let (item, step) = match cells {
                    [Value::List(list), Value::Number(cursor), Value::Number(step)] => {
                        (list.get_at(*cursor as usize), *step)
                    }
                    [Value::List(_), ..] => return Err(ErrorKind::Stack.into()),
                    [target, ..] => return Err(unexpected_type_error!(ValueType::List, target)),
                    [] => return Err(ErrorKind::Stack.into()),
                };
                match item {
                    Some(item) => {
                        if let Value::Number(cursor) = &mut cells[1] {
                            *cursor += step;
                        }
                        bind!(var, *global, item);
                    }
                    None => {
                        frame.pop_n(3)?;
                        frame.pc = exit.0;
                    }
                }
            }

            OpCode::Call(name) => {
                let function = self
                    .program
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ErrorKind::UnknownFunction(name.clone()))?;
                let args = frame.pop_n(function.arity())?;
                return self.invoke(function, args);
            }
            OpCode::CallIndirect(count) => {
                let args = frame.pop_n(*count)?;
                let callee = frame.pop()?;
                let Value::Function(function) = callee else {
                    return Err(TypeError::NotCallable(callee.value_type()).into());
                };
                return self.invoke(function, args);
            }
            OpCode::Return => return Ok(Flow::Return(frame.pop()?)),
        }
        Ok(Flow::Continue)
    }
}

fn check_arity(function: &Function, args: &[Value]) -> Result<(), Error> {
    if function.arity() == args.len() {
        Ok(())
    } else {
        Err(ErrorKind::CallArguments {
            name: function.name.clone(),
            required: function.arity(),
            given: args.len(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::compile, libs::basic_lib};

    /// Steps through the entry function alone and returns what its stack
    /// holds once it falls off the end.
    fn leftover_stack(input: &str) -> Vec<Value> {
        let program = compile(input, &basic_lib()).unwrap();
        let entry = program.entry().cloned().unwrap();
        let code = entry.code().cloned().unwrap();
        let mut vm = Vm::new(program, Globals::default(), VmOptions::default());
        vm.push_frame(entry, code.clone(), Vec::new(), true).unwrap();
        while vm.frames[0].pc < code.len() {
            assert!(matches!(vm.dispatch().unwrap(), Flow::Continue));
            assert_eq!(vm.frames.len(), 1);
        }
        vm.frames.pop().unwrap().stack
    }

    #[test]
    fn test_loops_leave_stack_balanced() {
        assert!(leftover_stack("for i in 0 to 5\nx = i\nend\n").is_empty());
        assert!(leftover_stack("for i in 0 to 5\nif i = 2 then break\nend\n").is_empty());
        assert!(leftover_stack("for x in [1, 2, 3]\nif x = 2 then break\nend\n").is_empty());
        assert!(leftover_stack("for x in [1, 2, 3]\nif x = 2 then continue\nend\n").is_empty());
        assert!(leftover_stack(
            "for a in 0 to 3\nfor b in [1, 2]\nif b = 2 then break\nend\nif a = 1 then break\nend\n"
        )
        .is_empty());
        assert!(leftover_stack("i = 0\nwhile true\ni = i + 1\nif i > 3 then break\nend\n").is_empty());
    }

    #[test]
    fn test_expression_statements_are_discarded() {
        assert!(leftover_stack("1 + 2\nlength([1, 2])\n[1][0]\n").is_empty());
    }

    #[test]
    fn test_depth() {
        let program = compile("func f()\nreturn f()\nend\nf()\n", &basic_lib()).unwrap();
        let options = VmOptions { max_call_depth: 8 };
        let mut vm = Vm::new(program, Globals::default(), options);
        let error = vm.execute().unwrap_err();
        assert_eq!(error.kind, ErrorKind::StackOverflow { limit: 8 });
        assert_eq!(error.traceback.len(), 8);
        assert_eq!(vm.depth(), 0);
        assert!(vm.frames.is_empty());
    }
}
