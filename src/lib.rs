//! Luigi Language Compiler and VM.
//!
//! ```txt
//!        +-------+             +--------+                +-----------------------+
//! str -> | lexer | - Tokens -> | parser | - Functions -> | Luigi Virtual Machine |
//!        +-------+             +--------+                +-----------------------+
//!                                  ^                          |            ^
//!                                  |                          v            |
//!                                  +------------------- natives -----------+
//! ```
//!
//! The parser emits bytecode directly, there is no syntax tree. Natives are
//! registered before compiling so that calls to them are checked like calls
//! to script functions.
//!
//! # Examples
//!
//! ```rust
//! use luigi_lang::Luigi;
//! let input = r#"
//! func add(a, b)
//!     return a + b
//! end
//! log(add(2, 3))
//! "#;
//! let mut luigi = Luigi::new();
//! let program = luigi.compile(input).unwrap();
//! luigi.execute(program).unwrap();
//! ```

// Pedantic warnings
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines, clippy::must_use_candidate)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::float_cmp,
    clippy::module_name_repetitions
)]

pub mod compiler;
pub mod context;
pub mod errors;
pub mod frame;
pub mod libs;
pub mod objects;
pub mod utils;
pub mod vm;

pub use context::*;
pub use errors::{Error, ErrorKind};
pub use objects::{Function, Value};
pub use vm::{Vm, VmOptions};
