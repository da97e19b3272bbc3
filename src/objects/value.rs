use std::{fmt, rc::Rc};

use crate::{
    objects::{Function, List, ListInner, Object, ObjectInner},
    utils::escape_str,
};

/// Containers nested deeper than this are displayed as `...`, which also
/// keeps self-referencing containers printable.
const MAX_DISPLAY_DEPTH: usize = 32;

/// Enum of all luigi values.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// `null` - A null value.
    #[default]
    Null,
    /// `bool` - A `true` / `false` value.
    Bool(bool),
    /// `number` - A 64-bit floating point number.
    Number(f64),
    /// `string` - An immutable UTF-8 string.
    Str(Rc<str>),
    /// `list` - An ordered, shared, growable sequence.
    List(List),
    /// `object` - A shared record whose members are fixed at construction.
    Object(Object),
    /// `function` - A bytecode or native function.
    Function(Rc<Function>),
}

impl Value {
    pub fn new_list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(ListInner::new(items)))
    }

    pub fn new_object<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<compact_str::CompactString>,
    {
        Value::Object(Rc::new(ObjectInner::from_members(members)))
    }

    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Bool,
            Self::Number(_) => ValueType::Number,
            Self::Str(_) => ValueType::Str,
            Self::List(_) => ValueType::List,
            Self::Object(_) => ValueType::Object,
            Self::Function(_) => ValueType::Function,
        }
    }

    /// Only `false`, `0` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(v) => *v,
            Self::Number(v) => *v != 0.0,
            _ => true,
        }
    }

    /// Marks a list or an object as frozen. Other values are immutable anyway.
    pub fn freeze(&self) {
        match self {
            Self::List(v) => v.freeze(),
            Self::Object(v) => v.freeze(),
            _ => (),
        }
    }

    pub fn is_frozen(&self) -> bool {
        match self {
            Self::List(v) => v.is_frozen(),
            Self::Object(v) => v.is_frozen(),
            _ => true,
        }
    }

    /// The display form, except that strings are quoted.
    pub fn repr(&self) -> String {
        if let Self::Str(s) = self {
            format!("\"{}\"", escape_str(s))
        } else {
            self.to_string()
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Self::Str(v) if depth > 0 => write!(f, "\"{}\"", escape_str(v)),
            Self::List(_) | Self::Object(_) if depth >= MAX_DISPLAY_DEPTH => f.write_str("..."),
            Self::List(list) => {
                f.write_str("[")?;
                for (i, item) in list.items().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f, depth + 1)?;
                }
                f.write_str("]")
            }
            Self::Object(object) => {
                f.write_str("{")?;
                for (i, (name, value)) in object.members().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name} = ")?;
                    value.fmt_nested(f, depth + 1)?;
                }
                f.write_str("}")
            }
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Number(v) => fmt_number(f, *v),
            Self::Str(v) => f.write_str(v),
            Self::Function(v) => write!(f, "{v}"),
        }
    }
}

/// Drops container values without recursing on the host stack: children
/// that would die with their parent are emptied into the worklist first.
pub(crate) fn drop_nested(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::List(list) if Rc::strong_count(&list) == 1 => {
                pending.extend(list.take_items());
            }
            Value::Object(object) if Rc::strong_count(&object) == 1 => {
                pending.extend(object.take_values());
            }
            _ => (),
        }
    }
}

/// Shortest round-trip form. Negative zero prints as `0`, and magnitudes
/// from `1e21` up or below `1e-6` use exponent notation (`1e+21`, `1e-7`).
fn fmt_number(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v == 0.0 {
        return f.write_str("0");
    }
    let abs = v.abs();
    if abs.is_finite() && !(1e-6..1e21).contains(&abs) {
        let s = format!("{v:e}");
        return match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{mantissa}e+{exp}"),
            _ => f.write_str(&s),
        };
    }
    write!(f, "{v}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, 0)
    }
}

/// Strict equality: containers and functions compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(l0), Self::Bool(r0)) => l0 == r0,
            (Self::Number(l0), Self::Number(r0)) => l0 == r0,
            (Self::Str(l0), Self::Str(r0)) => l0 == r0,
            (Self::List(l0), Self::List(r0)) => Rc::ptr_eq(l0, r0),
            (Self::Object(l0), Self::Object(r0)) => Rc::ptr_eq(l0, r0),
            (Self::Function(l0), Self::Function(r0)) => Rc::ptr_eq(l0, r0),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<Rc<Function>> for Value {
    fn from(value: Rc<Function>) -> Self {
        Value::Function(value)
    }
}

/// The type of Value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Bool,
    Number,
    Str,
    List,
    Object,
    Function,
}

impl ValueType {
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "boolean",
            ValueType::Number => "number",
            ValueType::Str => "string",
            ValueType::List => "list",
            ValueType::Object => "object",
            ValueType::Function => "function",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::new_list(Vec::new()).is_truthy());
        assert!(Value::new_object(Vec::<(&str, Value)>::new()).is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(5.0).to_string(), "5");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(1e21).to_string(), "1e+21");
        assert_eq!(Value::Number(-2.5e22).to_string(), "-2.5e+22");
        assert_eq!(Value::Number(1e-7).to_string(), "1e-7");
        assert_eq!(Value::Number(123456789.0).to_string(), "123456789");
        assert_eq!(Value::Number(0.000001).to_string(), "0.000001");
        assert_eq!(Value::from("a\"b").to_string(), "a\"b");
        assert_eq!(Value::from("a\"b").repr(), r#""a\"b""#);
        let list = Value::new_list(vec![1.0.into(), "x".into(), Value::Null]);
        assert_eq!(list.to_string(), r#"[1, "x", null]"#);
        let object = Value::new_object([("a", Value::from(1.0)), ("b", list)]);
        assert_eq!(object.to_string(), r#"{a = 1, b = [1, "x", null]}"#);
    }

    #[test]
    fn test_self_reference_display() {
        let list = Value::new_list(Vec::new());
        if let Value::List(inner) = &list {
            inner.push(list.clone()).unwrap();
        }
        assert!(list.to_string().contains("..."));
    }

    #[test]
    fn test_strict_equality() {
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_ne!(Value::Number(1.0), Value::from("1"));
        assert_ne!(Value::Null, Value::Bool(false));
        let a = Value::new_list(vec![1.0.into()]);
        let b = Value::new_list(vec![1.0.into()]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_freeze_is_shared() {
        let a = Value::new_list(Vec::new());
        let alias = a.clone();
        assert!(!alias.is_frozen());
        a.freeze();
        assert!(alias.is_frozen());
    }
}
