//! The compiler error type.

use compact_str::CompactString;
use thiserror::Error;

use super::token::TokenKind;

/// The compiler error type. Compilation stops at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilerError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl CompilerError {
    /// The 1-based source line the error points at.
    pub fn line(&self) -> u32 {
        match self {
            CompilerError::Lex(e) => e.line,
            CompilerError::Parse(e) => e.line,
        }
    }
}

/// An error raised while scanning source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Line {line}: {kind}")]
pub struct LexError {
    pub line: u32,
    pub kind: LexErrorKind,
}

/// Kind of LexError.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("Unsupported character \"{0}\"")]
    UnsupportedCharacter(char),
    #[error("Unsupported character \"!\" (did you mean \"!=\"?)")]
    LoneBang,
    #[error("Unfinished string literal")]
    UnfinishedString,
    #[error("Invalid escape sequence")]
    InvalidEscape,
    #[error("Malformed number literal \"{0}\"")]
    MalformedNumber(CompactString),
    #[error("Identifiers starting with \"__\" are not allowed")]
    ReservedIdentifier,
}

/// An error raised while compiling tokens to bytecode.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Line {line}: {kind}")]
pub struct ParseError {
    pub line: u32,
    pub kind: ParseErrorKind,
}

/// Kind of ParseError.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("Unexpected token \"{found}\", expected {expected}")]
    UnexpectedToken {
        found: TokenKind,
        expected: &'static str,
    },
    #[error("Nested functions are not allowed")]
    NestedFunction,
    #[error("Function \"{0}\" already defined")]
    FunctionRedefinition(CompactString),
    #[error("Parameter name \"{0}\" is already used")]
    DuplicateParameter(CompactString),
    #[error("Member \"{0}\" is defined twice")]
    DuplicateMember(CompactString),
    #[error("Variable \"{0}\" is not declared")]
    UndeclaredVariable(CompactString),
    #[error("Function \"{0}\" does not exist")]
    UnknownFunction(CompactString),
    #[error("Function \"{name}\" expects {required} arguments, not {given}")]
    CallArguments {
        name: CompactString,
        required: usize,
        given: usize,
    },
    #[error("Cannot reassign or modify constant \"{0}\"")]
    ConstantReassignment(CompactString),
    #[error("Break outside of loop")]
    BreakOutsideLoop,
    #[error("Continue outside of loop")]
    ContinueOutsideLoop,
}
