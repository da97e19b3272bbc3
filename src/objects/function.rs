use std::{fmt, rc::Rc};

use compact_str::CompactString;

use crate::{compiler::code::Code, errors::Error, objects::Value, utils::Join, vm::Vm};

/// The signature of a host function. Arguments arrive in parameter order,
/// already checked against the declared arity.
pub type NativeFn = dyn Fn(&mut Vm, Vec<Value>) -> Result<Value, Error>;

/// A named function with a bytecode or a native body.
pub struct Function {
    pub name: CompactString,
    pub params: Vec<CompactString>,
    pub body: FunctionBody,
}

pub enum FunctionBody {
    Code(Rc<Code>),
    Native(Rc<NativeFn>),
}

impl Function {
    pub fn new(name: CompactString, params: Vec<CompactString>, code: Code) -> Self {
        Function {
            name,
            params,
            body: FunctionBody::Code(Rc::new(code)),
        }
    }

    /// Wraps a host closure.
    pub fn native<F>(name: &str, params: &[&str], f: F) -> Self
    where
        F: Fn(&mut Vm, Vec<Value>) -> Result<Value, Error> + 'static,
    {
        Function {
            name: name.into(),
            params: params.iter().map(|&p| p.into()).collect(),
            body: FunctionBody::Native(Rc::new(f)),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn code(&self) -> Option<&Rc<Code>> {
        match &self.body {
            FunctionBody::Code(code) => Some(code),
            FunctionBody::Native(_) => None,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            FunctionBody::Code(code) => format!("{} instructions", code.len()),
            FunctionBody::Native(_) => "native".to_owned(),
        };
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("body", &body)
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func {}({})", self.name, self.params.iter().join(", "))
    }
}
