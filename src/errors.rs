//! The runtime error type.

use std::fmt;

use compact_str::CompactString;
use thiserror::Error;

use crate::{
    objects::{Value, ValueType},
    utils::Join,
};

/// An error raised while executing bytecode, along with the frames it went
/// through, innermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub traceback: Vec<TracebackFrame>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind,
            traceback: Vec::new(),
        }
    }

    /// Shorthand for a failure reported by a native function.
    pub fn native<T: fmt::Display>(message: T) -> Self {
        Error::new(ErrorKind::Native(message.to_string()))
    }

    /// Appends one frame to the traceback.
    pub(crate) fn push_frame(&mut self, frame: TracebackFrame) {
        self.traceback.push(frame);
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl From<TypeError> for Error {
    fn from(error: TypeError) -> Self {
        Error::new(ErrorKind::Type(error))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.traceback.is_empty() {
            write!(f, "\n\nStack trace:")?;
            for frame in &self.traceback {
                write!(f, "\n    {frame}")?;
            }
        }
        Ok(())
    }
}

/// One line of a traceback.
#[derive(Debug, Clone, PartialEq)]
pub struct TracebackFrame {
    pub function: CompactString,
    /// `None` for native functions.
    pub line: Option<u32>,
    /// `None` for the entry function.
    pub args: Option<Vec<Value>>,
}

impl fmt::Display for TracebackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.args {
            Some(_) => format!("{}()", self.function),
            None => "<script>".to_owned(),
        };
        let location = match self.line {
            Some(line) => format!("Line {line}"),
            None => "<native>".to_owned(),
        };
        match &self.args {
            Some(args) => write!(
                f,
                "{name:<24} {location:<11} [{}]",
                args.iter().map(Value::repr).join(", ")
            ),
            None => write!(f, "{name:<24} {location}"),
        }
    }
}

/// Kind of runtime Error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("{0}")]
    Type(#[from] TypeError),
    #[error("Index {index} is out of bounds (length {len})")]
    IndexOutOfBounds { index: f64, len: usize },
    #[error("Object does not have a member called \"{0}\"")]
    NoSuchMember(CompactString),
    #[error("Cannot modify frozen {0} value")]
    Frozen(ValueType),
    #[error("Function \"{name}\" expects {required} arguments, not {given}")]
    CallArguments {
        name: CompactString,
        required: usize,
        given: usize,
    },
    #[error("Excessive call stack depth (limit {limit})")]
    StackOverflow { limit: usize },
    #[error("{0}")]
    Native(String),
    #[error("Function \"{0}\" does not exist")]
    UnknownFunction(CompactString),
    #[error("stack error")]
    Stack,
}

/// Kind of TypeError.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("Unexpected type {found}, expected {expected}")]
    UnexpectedType {
        expected: ValueType,
        found: ValueType,
    },
    #[error("Unsupported operand type for {operator}: {operand}")]
    UnOperator {
        operator: &'static str,
        operand: ValueType,
    },
    #[error("Unsupported operand types for {operator}: {} and {}", .operand.0, .operand.1)]
    BinOperator {
        operator: &'static str,
        operand: (ValueType, ValueType),
    },
    #[error("Cannot call non-function value ({0})")]
    NotCallable(ValueType),
}

impl ErrorKind {
    /// True for the kinds raised on a wrong operand kind.
    pub fn is_type_error(&self) -> bool {
        matches!(self, ErrorKind::Type(_))
    }
}

#[macro_export]
macro_rules! unexpected_type_error {
    ($expected:expr, $value:expr) => {
        $crate::errors::Error::from($crate::errors::TypeError::UnexpectedType {
            expected: $expected,
            found: $value.value_type(),
        })
    };
}

#[macro_export]
macro_rules! operator_error {
    ($operator:expr, $arg1:expr) => {
        $crate::errors::Error::from($crate::errors::TypeError::UnOperator {
            operator: $operator.name(),
            operand: $arg1.value_type(),
        })
    };
    ($operator:expr, $arg1:expr, $arg2:expr) => {
        $crate::errors::Error::from($crate::errors::TypeError::BinOperator {
            operator: $operator.name(),
            operand: ($arg1.value_type(), $arg2.value_type()),
        })
    };
}
