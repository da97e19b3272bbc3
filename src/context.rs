use std::rc::Rc;

use thiserror::Error;

use crate::{
    compiler::{self, error::CompilerError, Program},
    errors::{Error, ErrorKind},
    libs::{self, Library},
    objects::{Function, Value},
    vm::{Globals, Vm, VmOptions},
};

/// Any failure of [`Luigi::run_code`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LuigiError {
    #[error(transparent)]
    Compile(#[from] CompilerError),
    #[error(transparent)]
    Runtime(#[from] Error),
}

/// An embedding context: registered natives, the globals shared by every
/// run, and the last executed program.
pub struct Luigi {
    natives: Library,
    globals: Globals,
    options: VmOptions,
    program: Program,
}

impl Default for Luigi {
    fn default() -> Self {
        Self::new()
    }
}

impl Luigi {
    /// A context with the basic library loaded.
    pub fn new() -> Luigi {
        Luigi::with_options(VmOptions::default())
    }

    pub fn with_options(options: VmOptions) -> Luigi {
        let mut luigi = Luigi::empty(options);
        luigi.register(libs::basic_lib());
        luigi
    }

    /// A context without any native.
    pub fn empty(options: VmOptions) -> Luigi {
        Luigi {
            natives: Library::new(),
            globals: Globals::default(),
            options,
            program: Program::default(),
        }
    }

    /// Merges a library into the natives. A later registration of a name
    /// replaces the earlier one.
    pub fn register(&mut self, lib: Library) {
        log::debug!("registering {} natives", lib.len());
        self.natives.extend(lib);
    }

    /// Registers a single native.
    pub fn register_function(&mut self, function: Function) {
        self.natives.insert(function.name.clone(), Rc::new(function));
    }

    pub fn natives(&self) -> &Library {
        &self.natives
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut Globals {
        &mut self.globals
    }

    pub fn options(&self) -> VmOptions {
        self.options
    }

    /// Compiles a script against the registered natives and the existing globals.
    pub fn compile(&self, input: &str) -> Result<Program, CompilerError> {
        let globals = self.globals.keys().map(|name| name.as_str());
        compiler::compile_with_globals(input, &self.natives, globals)
    }

    /// Executes a compiled program, keeping it for later [`Luigi::call`]s.
    pub fn execute(&mut self, program: Program) -> Result<Value, Error> {
        self.program = program;
        self.with_vm(Vm::execute)
    }

    /// Compiles and executes a script.
    pub fn run_code(&mut self, input: &str) -> Result<Value, LuigiError> {
        let program = self.compile(input)?;
        Ok(self.execute(program)?)
    }

    /// Calls a function value, typically a callback handed over by a script.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, Error> {
        self.with_vm(|vm| vm.call_value(callee, args))
    }

    /// Calls a function of the last executed program by name.
    pub fn call_by_name(&mut self, name: &str, args: Vec<Value>) -> Result<Value, Error> {
        let Some(function) = self.program.get(name).or_else(|| self.natives.get(name)).cloned()
        else {
            return Err(ErrorKind::UnknownFunction(name.into()).into());
        };
        self.with_vm(|vm| vm.call_function(&function, args))
    }

    fn with_vm<T>(&mut self, f: impl FnOnce(&mut Vm) -> T) -> T {
        let globals = std::mem::take(&mut self.globals);
        let mut vm = Vm::new(self.program.clone(), globals, self.options);
        let result = f(&mut vm);
        self.globals = vm.into_globals();
        result
    }
}
