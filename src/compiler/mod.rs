//! The Luigi lang compiler.

use std::{fmt, rc::Rc};

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::{libs::Library, objects::Function};

pub mod code;
pub mod error;
pub mod lexer;
pub mod opcode;
pub mod parser;
pub mod token;

/// The name of the function holding the top-level statements.
pub const ENTRY_NAME: &str = ".";

/// A compiled script: the natives it was compiled against, its functions
/// and the entry function, by name.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub functions: IndexMap<CompactString, Rc<Function>>,
}

impl Program {
    pub fn entry(&self) -> Option<&Rc<Function>> {
        self.functions.get(ENTRY_NAME)
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Function>> {
        self.functions.get(name)
    }
}

/// Disassembly of every bytecode function, entry first.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.entry().into_iter();
        let others = self
            .functions
            .values()
            .filter(|function| function.name != ENTRY_NAME);
        for function in entry.chain(others) {
            if let Some(code) = function.code() {
                if function.name == ENTRY_NAME {
                    writeln!(f, "<script>:")?;
                } else {
                    writeln!(f, "{function}:")?;
                }
                write!(f, "{code}")?;
            }
        }
        Ok(())
    }
}

/// Compile the input source code into a Luigi program.
pub fn compile(input: &str, natives: &Library) -> Result<Program, error::CompilerError> {
    compile_with_globals(input, natives, [])
}

/// Compile the input source code, with `globals` already declared.
pub fn compile_with_globals<'a>(
    input: &str,
    natives: &Library,
    globals: impl IntoIterator<Item = &'a str>,
) -> Result<Program, error::CompilerError> {
    let tokens = lexer::tokenize(input)?;
    Ok(parser::parse(tokens, natives, globals)?)
}
