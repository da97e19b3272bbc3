use std::{
    cell::{Cell, Ref, RefCell},
    rc::Rc,
};

use crate::{
    errors::{Error, ErrorKind},
    objects::{value::drop_nested, Value, ValueType},
};

pub type List = Rc<ListInner>;

/// A reference-shared list. Freezing is shallow: the items themselves stay
/// as mutable as they were.
#[derive(Debug, Default)]
pub struct ListInner {
    items: RefCell<Vec<Value>>,
    frozen: Cell<bool>,
}

impl ListInner {
    pub fn new(items: Vec<Value>) -> Self {
        ListInner {
            items: RefCell::new(items),
            frozen: Cell::new(false),
        }
    }

    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
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

    /// The item at `index`, if any.
    pub fn get_at(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// Index with a script number, which must be integral and in range.
    pub fn get(&self, index: f64) -> Result<Value, Error> {
        let items = self.items.borrow();
        let i = checked_index(index, items.len())?;
        Ok(items[i].clone())
    }

    pub fn set(&self, index: f64, value: Value) -> Result<(), Error> {
        self.check_mutable()?;
        let mut items = self.items.borrow_mut();
        let i = checked_index(index, items.len())?;
        items[i] = value;
        Ok(())
    }

    pub fn push(&self, value: Value) -> Result<(), Error> {
        self.check_mutable()?;
        self.items.borrow_mut().push(value);
        Ok(())
    }

    /// Shortens the list to `len` items.
    pub fn truncate(&self, len: usize) -> Result<(), Error> {
        self.check_mutable()?;
        self.items.borrow_mut().truncate(len);
        Ok(())
    }

    /// Empties the list regardless of freezing.
    pub(crate) fn take_items(&self) -> Vec<Value> {
        std::mem::take(&mut *self.items.borrow_mut())
    }

    fn check_mutable(&self) -> Result<(), Error> {
        if self.is_frozen() {
            Err(ErrorKind::Frozen(ValueType::List).into())
        } else {
            Ok(())
        }
    }
}

impl Drop for ListInner {
    fn drop(&mut self) {
        drop_nested(std::mem::take(self.items.get_mut()));
    }
}

fn checked_index(index: f64, len: usize) -> Result<usize, Error> {
    if index >= 0.0 && index.fract() == 0.0 && index < len as f64 {
        Ok(index as usize)
    } else {
        Err(ErrorKind::IndexOutOfBounds { index, len }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let list = ListInner::new(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(list.get(1.0).unwrap(), Value::Number(2.0));
        for index in [-1.0, 2.0, 0.5, f64::NAN] {
            assert!(matches!(
                list.get(index).unwrap_err().kind,
                ErrorKind::IndexOutOfBounds { len: 2, .. }
            ));
        }
        list.set(0.0, Value::Null).unwrap();
        assert_eq!(list.get_at(0), Some(Value::Null));
    }

    #[test]
    fn test_frozen() {
        let list = ListInner::new(vec![Value::Number(1.0)]);
        list.freeze();
        assert_eq!(
            list.push(Value::Null).unwrap_err().kind,
            ErrorKind::Frozen(ValueType::List)
        );
        assert!(list.set(0.0, Value::Null).is_err());
        assert!(list.truncate(0).is_err());
        assert_eq!(list.get(0.0).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_drop_deep_nesting() {
        let mut value = Value::new_list(Vec::new());
        for _ in 0..100_000 {
            value = Value::new_list(vec![value]);
        }
        let shared = Value::new_list(vec![Value::Number(1.0)]);
        let outer = Value::new_list(vec![value, shared.clone()]);
        drop(outer);
        assert_eq!(shared.to_string(), "[1]");
    }
}
