//! The token.

use std::fmt;

use compact_str::CompactString;

/// Enum representing lexeme types.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// End of line (`\n`)
    Eol,

    // Literals:
    /// "null"
    Null,
    /// "true", "false"
    Bool(bool),
    /// "12", "3.5", ".5"
    Number(f64),
    /// ""abc"", "'abc'"
    Str(CompactString),

    // Operators and punctuation:
    /// "="
    Equal,
    /// "!="
    NotEqual,
    /// "<"
    Less,
    /// "<="
    LessOrEqual,
    /// ">"
    Greater,
    /// ">="
    GreaterOrEqual,
    /// "or"
    Or,
    /// "and"
    And,
    /// "not"
    Not,
    /// "+"
    Plus,
    /// "-"
    Minus,
    /// "*"
    Multiply,
    /// "/"
    Divide,
    /// "%"
    Modulo,
    /// "("
    OpenParen,
    /// ")"
    CloseParen,
    /// "["
    OpenBracket,
    /// "]"
    CloseBracket,
    /// "{"
    OpenBrace,
    /// "}"
    CloseBrace,
    /// "."
    Dot,
    /// ","
    Comma,

    // Keywords:
    /// "func"
    Func,
    /// "if"
    If,
    /// "then"
    Then,
    /// "elif"
    Elif,
    /// "else"
    Else,
    /// "while"
    While,
    /// "for"
    For,
    /// "in"
    In,
    /// "to"
    To,
    /// "break"
    Break,
    /// "continue"
    Continue,
    /// "return"
    Return,
    /// "end"
    End,

    /// Ident
    Ident(CompactString),

    /// Past the last token, never produced by the lexer.
    Eof,
}

impl TokenKind {
    /// Returns the keyword token for `ident`, if it is reserved.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        Some(match ident {
            "null" => TokenKind::Null,
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "or" => TokenKind::Or,
            "and" => TokenKind::And,
            "not" => TokenKind::Not,
            "func" => TokenKind::Func,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "to" => TokenKind::To,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "end" => TokenKind::End,
            _ => return None,
        })
    }

    /// The fixed spelling of the token, or a category name for literals.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Eol => "end of line",
            TokenKind::Null => "null",
            TokenKind::Bool(_) => "boolean",
            TokenKind::Number(_) => "number",
            TokenKind::Str(_) => "string",
            TokenKind::Equal => "=",
            TokenKind::NotEqual => "!=",
            TokenKind::Less => "<",
            TokenKind::LessOrEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterOrEqual => ">=",
            TokenKind::Or => "or",
            TokenKind::And => "and",
            TokenKind::Not => "not",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Multiply => "*",
            TokenKind::Divide => "/",
            TokenKind::Modulo => "%",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::OpenBrace => "{",
            TokenKind::CloseBrace => "}",
            TokenKind::Dot => ".",
            TokenKind::Comma => ",",
            TokenKind::Func => "func",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::To => "to",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::End => "end",
            TokenKind::Ident(_) => "identifier",
            TokenKind::Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed token.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// 1-based source line.
    pub line: u32,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(line: u32, kind: TokenKind) -> Self {
        Token { line, kind }
    }
}
