use std::{
    cell::{Cell, Ref, RefCell},
    rc::Rc,
};

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::{
    errors::{Error, ErrorKind},
    objects::{value::drop_nested, Value, ValueType},
};

pub type Object = Rc<ObjectInner>;

/// A reference-shared record. Members are only introduced while the object
/// is built, afterwards only their values can change.
#[derive(Debug, Default)]
pub struct ObjectInner {
    members: RefCell<IndexMap<CompactString, Value>>,
    frozen: Cell<bool>,
}

impl ObjectInner {
    pub fn new() -> Self {
        ObjectInner::default()
    }

    pub fn from_members<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<CompactString>,
    {
        ObjectInner {
            members: RefCell::new(members.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            frozen: Cell::new(false),
        }
    }

    pub fn members(&self) -> Ref<'_, IndexMap<CompactString, Value>> {
        self.members.borrow()
    }

    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn freeze(&self) {
        self.frozen.set(true);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    /// Introduces a member during construction.
    pub fn append(&self, name: CompactString, value: Value) -> Result<(), Error> {
        self.check_mutable()?;
        self.members.borrow_mut().insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Value, Error> {
        self.members
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ErrorKind::NoSuchMember(name.into()).into())
    }

    /// Replaces the value of an existing member.
    pub fn set(&self, name: &str, value: Value) -> Result<(), Error> {
        self.check_mutable()?;
        match self.members.borrow_mut().get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ErrorKind::NoSuchMember(name.into()).into()),
        }
    }

    /// Empties the object regardless of freezing, returning the member values.
    pub(crate) fn take_values(&self) -> Vec<Value> {
        self.members.borrow_mut().drain(..).map(|(_, value)| value).collect()
    }

    fn check_mutable(&self) -> Result<(), Error> {
        if self.is_frozen() {
            Err(ErrorKind::Frozen(ValueType::Object).into())
        } else {
            Ok(())
        }
    }
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        let values = self.members.get_mut().drain(..).map(|(_, value)| value).collect();
        drop_nested(values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_are_fixed() {
        let object = ObjectInner::from_members([("a", Value::Number(1.0))]);
        assert_eq!(
            object.set("b", Value::Number(2.0)).unwrap_err().kind,
            ErrorKind::NoSuchMember("b".into())
        );
        object.set("a", Value::Number(2.0)).unwrap();
        assert_eq!(object.get("a").unwrap(), Value::Number(2.0));
        assert!(object.get("b").is_err());
    }

    #[test]
    fn test_frozen() {
        let object = ObjectInner::new();
        object.append("a".into(), Value::Null).unwrap();
        object.freeze();
        assert_eq!(
            object.set("a", Value::Bool(true)).unwrap_err().kind,
            ErrorKind::Frozen(ValueType::Object)
        );
        assert_eq!(object.get("a").unwrap(), Value::Null);
    }

    #[test]
    fn test_drop_deep_nesting() {
        let mut value = Value::Null;
        for i in 0..100_000 {
            value = if i % 2 == 0 {
                Value::new_object([("next", value)])
            } else {
                Value::new_list(vec![value])
            };
        }
        drop(value);
    }
}
