//! The Luigi Standard Library.

use std::rc::Rc;

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::{errors::Error, objects::Function, objects::Value, vm::Vm};

mod basic;

pub use basic::basic_lib;

/// Natives by name, in registration order.
pub type Library = IndexMap<CompactString, Rc<Function>>;

/// Adds a native to `lib`.
pub fn register<F>(lib: &mut Library, name: &str, params: &[&str], f: F)
where
    F: Fn(&mut Vm, Vec<Value>) -> Result<Value, Error> + 'static,
{
    lib.insert(name.into(), Rc::new(Function::native(name, params, f)));
}

/// Extracts typed native arguments, failing with a type error on the first
/// argument of the wrong type.
///
/// ```ignore
/// let (list, count) = check_args!(args, List, Number);
/// ```
#[macro_export]
macro_rules! check_args {
    (@AS_VALUE_TYPE $value:ident, Value) => {{
        $value
    }};
    (@AS_VALUE_TYPE $value:ident, $ty:ident) => {{
        match $value {
            $crate::objects::Value::$ty(v) => v,
            other => {
                return Err($crate::unexpected_type_error!(
                    $crate::objects::ValueType::$ty,
                    other
                ))
            }
        }
    }};

    ($args:ident, $($ty:ident),+ $(,)?) => {{
        let mut args_iter = $args.iter();
        ($(
            match args_iter.next() {
                Some(value) => $crate::check_args!(@AS_VALUE_TYPE value, $ty),
                None => return Err($crate::errors::Error::native("Missing argument")),
            },
        )+)
    }};
}
