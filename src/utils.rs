//! Utilities for luigi-lang.

use std::fmt::{Display, Write};

pub(crate) trait Join<Item: Display>: Iterator<Item = Item> {
    fn join(&mut self, sep: &str) -> String {
        let mut result = String::new();
        if let Some(first) = self.next() {
            let _ = write!(&mut result, "{first}");
            self.for_each(|i| {
                result.push_str(sep);
                let _ = write!(&mut result, "{i}");
            });
        }
        result
    }
}

impl<T: ?Sized, Item: Display> Join<Item> for T where T: Iterator<Item = Item> {}

/// Escape a string so that it reads back as the same double-quoted literal.
///
/// Only the escapes the lexer understands are produced: `\t`, `\r`, `\n`,
/// `\\` and `\"`. Every other character is kept as is.
pub fn escape_str(value: &str) -> String {
    let mut ans = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\t' => ans.push_str("\\t"),
            '\r' => ans.push_str("\\r"),
            '\n' => ans.push_str("\\n"),
            '\\' => ans.push_str("\\\\"),
            '"' => ans.push_str("\\\""),
            _ => ans.push(c),
        }
    }
    ans
}
