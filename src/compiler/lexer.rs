//! The lexer.

use std::str::Chars;

use compact_str::CompactString;

use super::{
    error::{LexError, LexErrorKind},
    token::{
        Token,
        TokenKind::{self, *},
    },
};

/// Peekable iterator over a char sequence.
///
/// Next characters can be peeked via `first` method,
/// and position can be shifted forward via `bump` method.
struct Cursor<'a> {
    /// The input string.
    input: &'a str,
    /// Iterator over chars. Slightly faster than a &str.
    chars: Chars<'a>,
    /// Current 1-based line.
    line: u32,
}

const EOF_CHAR: char = '\0';

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            input,
            chars: input.chars(),
            line: 1,
        }
    }

    /// Peeks the next symbol from the input stream without consuming it.
    /// If requested position doesn't exist, `EOF_CHAR` is returned.
    /// However, getting `EOF_CHAR` doesn't always mean actual end of file,
    /// it should be checked with `is_eof` method.
    fn first(&self) -> char {
        // `.next()` optimizes better than `.nth(0)`
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    /// Peeks the second symbol from the input stream without consuming it.
    fn second(&self) -> char {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().unwrap_or(EOF_CHAR)
    }

    /// Checks if there is nothing more to consume.
    fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Returns the byte offset of the cursor.
    fn pos(&self) -> usize {
        self.input.len() - self.chars.as_str().len()
    }

    /// Moves to the next character.
    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Eats `c` if it matches.
    fn eat(&mut self, c: char) -> bool {
        if self.first() == c && !self.is_eof() {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Eats symbols while predicate returns true or until the end of file is reached.
    fn eat_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    fn error(&self, kind: LexErrorKind) -> LexError {
        LexError {
            line: self.line,
            kind,
        }
    }
}

/// Scans the whole input into tokens, stopping at the first error.
///
/// The result always ends with an `Eol` token, whether or not the input
/// ends with a newline.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut cursor = Cursor::new(input);
    let mut tokens: Vec<Token> = Vec::new();
    while let Some(token) = cursor.advance_token()? {
        tokens.push(token);
    }
    if tokens.last().is_none_or(|token| token.kind != Eol) {
        tokens.push(Token::new(cursor.line, Eol));
    }
    log::debug!("scanned {} tokens over {} lines", tokens.len(), cursor.line);
    Ok(tokens)
}

/// True if `c` is valid as a first character of an identifier.
pub fn is_id_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// True if `c` is valid as a non-first character of an identifier.
pub fn is_id_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

impl Cursor<'_> {
    /// Parses the next token, skipping whitespace and comments.
    /// Returns `None` at the end of input.
    fn advance_token(&mut self) -> Result<Option<Token>, LexError> {
        loop {
            let start = self.pos();
            let line = self.line;
            let Some(first_char) = self.bump() else {
                return Ok(None);
            };
            let token_kind = match first_char {
                // Whitespace.
                ' ' | '\t' | '\r' => continue,

                // Comment.
                '#' => {
                    self.eat_while(|c| c != '\n');
                    continue;
                }

                '\n' => {
                    self.line += 1;
                    Eol
                }

                // Dot or a decimal number like `.5`.
                '.' if self.first().is_ascii_digit() => self.number(start)?,
                '.' => Dot,

                // Numeric literal.
                '0'..='9' => self.number(start)?,

                // String literal.
                c @ ('"' | '\'') => self.string(c)?,

                // Two-char tokens.
                '<' if self.eat('=') => LessOrEqual,
                '>' if self.eat('=') => GreaterOrEqual,
                '!' if self.eat('=') => NotEqual,
                '!' => return Err(self.error(LexErrorKind::LoneBang)),

                // One-symbol tokens.
                '=' => Equal,
                '<' => Less,
                '>' => Greater,
                '+' => Plus,
                '-' => Minus,
                '*' => Multiply,
                '/' => Divide,
                '%' => Modulo,
                '[' => OpenBracket,
                ']' => CloseBracket,
                '(' => OpenParen,
                ')' => CloseParen,
                '{' => OpenBrace,
                '}' => CloseBrace,
                ',' => Comma,

                // Identifier or keyword.
                c if is_id_start(c) => self.ident_or_keyword(start)?,

                // Unknown character.
                c => return Err(self.error(LexErrorKind::UnsupportedCharacter(c))),
            };
            return Ok(Some(Token::new(line, token_kind)));
        }
    }

    fn ident_or_keyword(&mut self, start: usize) -> Result<TokenKind, LexError> {
        self.eat_while(is_id_continue);
        let ident = &self.input[start..self.pos()];
        if let Some(keyword) = TokenKind::keyword(ident) {
            return Ok(keyword);
        }
        if ident.starts_with("__") {
            return Err(self.error(LexErrorKind::ReservedIdentifier));
        }
        Ok(Ident(CompactString::from(ident)))
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, LexError> {
        self.eat_while(|c| c.is_ascii_digit());
        // Don't be greedy if this is actually a member access (`list.len`).
        if self.first() == '.' && self.second().is_ascii_digit() {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
        let literal = &self.input[start..self.pos()];
        literal.parse::<f64>().map(Number).map_err(|_| {
            self.error(LexErrorKind::MalformedNumber(CompactString::from(literal)))
        })
    }

    fn string(&mut self, quoted: char) -> Result<TokenKind, LexError> {
        let mut value = CompactString::default();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error(LexErrorKind::UnfinishedString)),
                Some(c) if c == quoted => return Ok(Str(value)),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('r') => '\r',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('\\') => '\\',
                        None | Some('\n') => {
                            return Err(self.error(LexErrorKind::UnfinishedString))
                        }
                        Some(_) => return Err(self.error(LexErrorKind::InvalidEscape)),
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    macro_rules! check_first_token {
        ($input:expr, $value:expr $(,)?) => {
            assert_eq!(tokenize($input).unwrap()[0].kind, $value)
        };
    }

    macro_rules! check_error {
        ($input:expr, $line:expr, $kind:expr $(,)?) => {
            assert_eq!(
                tokenize($input).unwrap_err(),
                LexError {
                    line: $line,
                    kind: $kind
                }
            )
        };
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("x = 1\n"),
            vec![Ident("x".into()), Equal, Number(1.0), Eol]
        );
        assert_eq!(
            kinds("x = 1"),
            vec![Ident("x".into()), Equal, Number(1.0), Eol]
        );
    }

    #[test]
    fn test_trailing_eol() {
        assert_eq!(kinds(""), vec![Eol]);
        let tokens = tokenize("a\nb").unwrap();
        assert_eq!(tokens.last().unwrap(), &Token::new(2, Eol));
        assert_eq!(kinds("a\n\n").len(), 3);
    }

    #[test]
    fn test_string_escape() {
        check_first_token!(r#" "\"" "#, Str("\"".into()));
        check_first_token!(r#" "\n" "#, Str("\n".into()));
        check_first_token!(r#" "\r" "#, Str("\r".into()));
        check_first_token!(r#" "\t" "#, Str("\t".into()));
        check_first_token!(r#" "\\" "#, Str("\\".into()));
        check_first_token!(r#" '\'' "#, Str("'".into()));
        check_first_token!(r#" 'a"b' "#, Str("a\"b".into()));
    }

    #[test]
    fn test_unfinished_string() {
        check_error!("x = \"abc", 1, LexErrorKind::UnfinishedString);
        check_error!("\nx = 'abc\n'", 2, LexErrorKind::UnfinishedString);
        check_error!(r#""\q""#, 1, LexErrorKind::InvalidEscape);
    }

    #[test]
    fn test_number() {
        check_first_token!("0", Number(0.0));
        check_first_token!("42", Number(42.0));
        check_first_token!("3.25", Number(3.25));
        check_first_token!(".5", Number(0.5));
        assert_eq!(kinds("1.x"), vec![Number(1.0), Dot, Ident("x".into()), Eol]);
        assert_eq!(kinds("-2"), vec![Minus, Number(2.0), Eol]);
    }

    #[test]
    fn test_dot_member() {
        assert_eq!(
            kinds("o.a"),
            vec![Ident("o".into()), Dot, Ident("a".into()), Eol]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("<= >= != < > = % ,"),
            vec![
                LessOrEqual,
                GreaterOrEqual,
                NotEqual,
                Less,
                Greater,
                Equal,
                Modulo,
                Comma,
                Eol
            ]
        );
        check_error!("a ! b", 1, LexErrorKind::LoneBang);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("if then elif else end true false null not"),
            vec![If, Then, Elif, Else, End, Bool(true), Bool(false), Null, Not, Eol]
        );
        assert_eq!(kinds("for_each"), vec![Ident("for_each".into()), Eol]);
        check_error!("__hidden = 1", 1, LexErrorKind::ReservedIdentifier);
    }

    #[test]
    fn test_comment_and_lines() {
        let tokens = tokenize("# comment\nx # trailing\n\ny").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(1, Eol),
                Token::new(2, Ident("x".into())),
                Token::new(2, Eol),
                Token::new(3, Eol),
                Token::new(4, Ident("y".into())),
                Token::new(4, Eol),
            ]
        );
    }

    #[test]
    fn test_unsupported_character() {
        check_error!("a\n@", 2, LexErrorKind::UnsupportedCharacter('@'));
        check_error!("é", 1, LexErrorKind::UnsupportedCharacter('é'));
    }
}
