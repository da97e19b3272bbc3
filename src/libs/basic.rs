use std::rc::Rc;

use rand::Rng;

use crate::{
    check_args,
    errors::Error,
    libs::{register, Library},
    objects::Value,
};

pub fn basic_lib() -> Library {
    let mut lib = Library::new();

    // General
    register(&mut lib, "log", &["value"], |_, args| {
        let (value,) = check_args!(args, Value);
        println!("{value}");
        Ok(Value::Null)
    });
    register(&mut lib, "length", &["value"], |_, args| {
        let (value,) = check_args!(args, Value);
        match value {
            Value::Str(s) => Ok(s.chars().count().into()),
            Value::List(list) => Ok(list.len().into()),
            other => Err(Error::native(format!(
                "Unexpected type {} for value, expected string or list",
                other.value_type()
            ))),
        }
    });

    // Strings
    register(&mut lib, "upper", &["str"], |_, args| {
        let (s,) = check_args!(args, Str);
        Ok(s.to_uppercase().into())
    });
    register(&mut lib, "lower", &["str"], |_, args| {
        let (s,) = check_args!(args, Str);
        Ok(s.to_lowercase().into())
    });

    // Lists
    register(&mut lib, "append", &["list", "value"], |_, args| {
        let (list, value) = check_args!(args, List, Value);
        list.push(value.clone())?;
        Ok(Value::Null)
    });
    register(&mut lib, "truncate", &["list", "count"], |_, args| {
        let (list, count) = check_args!(args, List, Number);
        let count = integer(*count)?;
        if count < 0 {
            return Err(Error::native("Cannot truncate negative number of elements"));
        }
        let len = list.len();
        if count as usize >= len {
            return Err(Error::native(
                "Cannot truncate more elements than list length",
            ));
        }
        list.truncate(len - count as usize)?;
        Ok(Value::Null)
    });

    // Objects
    register(&mut lib, "members", &["obj"], |_, args| {
        let (object,) = check_args!(args, Object);
        let names = object
            .members()
            .keys()
            .map(|name| Value::from(name.as_str()))
            .collect();
        let names = Value::new_list(names);
        names.freeze();
        Ok(names)
    });
    register(&mut lib, "get", &["obj", "member"], |_, args| {
        let (object, member) = check_args!(args, Object, Str);
        check_member_name(member)?;
        object.get(member)
    });
    register(&mut lib, "set", &["obj", "member", "value"], |_, args| {
        let (object, member, value) = check_args!(args, Object, Str, Value);
        check_member_name(member)?;
        object.set(member, value.clone())?;
        Ok(Value::Null)
    });

    // Math
    math1(&mut lib, "is_nan", |x| Value::Bool(x.is_nan()));
    math1(&mut lib, "floor", |x| x.floor().into());
    math1(&mut lib, "ceil", |x| x.ceil().into());
    math1(&mut lib, "round", |x| round(x).into());
    math1(&mut lib, "abs", |x| x.abs().into());
    math1(&mut lib, "exp", |x| x.exp().into());
    math1(&mut lib, "ln", |x| x.ln().into());
    math1(&mut lib, "log2", |x| x.log2().into());
    math1(&mut lib, "log10", |x| x.log10().into());
    math1(&mut lib, "sqrt", |x| x.sqrt().into());
    math1(&mut lib, "cbrt", |x| x.cbrt().into());
    math1(&mut lib, "cos", |x| x.cos().into());
    math1(&mut lib, "sin", |x| x.sin().into());
    math1(&mut lib, "tan", |x| x.tan().into());
    math1(&mut lib, "acos", |x| x.acos().into());
    math1(&mut lib, "asin", |x| x.asin().into());
    math1(&mut lib, "atan", |x| x.atan().into());
    math2(&mut lib, "min", ["x", "y"], |x, y| nan_or(x, y, x.min(y)));
    math2(&mut lib, "max", ["x", "y"], |x, y| nan_or(x, y, x.max(y)));
    math2(&mut lib, "pow", ["x", "exponent"], f64::powf);
    math2(&mut lib, "atan2", ["x", "y"], f64::atan2);
    register(&mut lib, "clamp", &["x", "min", "max"], |_, args| {
        let (x, min, max) = check_args!(args, Number, Number, Number);
        Ok(nan_or(*x, *min, x.max(*min)).min(*max).into())
    });

    // Functions
    register(&mut lib, "params", &["func"], |_, args| {
        let (function,) = check_args!(args, Function);
        let params = function
            .params
            .iter()
            .map(|param| Value::from(param.as_str()))
            .collect();
        let params = Value::new_list(params);
        params.freeze();
        Ok(params)
    });

    // Random
    register(&mut lib, "random", &[], |_, _| {
        Ok(rand::random::<f64>().into())
    });
    register(&mut lib, "random_float", &["min", "max"], |_, args| {
        let (min, max) = check_args!(args, Number, Number);
        check_range(*min, *max)?;
        Ok(rand::thread_rng().gen_range(*min..*max).into())
    });
    register(&mut lib, "random_int", &["min", "max"], |_, args| {
        let (min, max) = check_args!(args, Number, Number);
        let (min, max) = (integer(*min)?, integer(*max)?);
        check_range(min as f64, max as f64)?;
        Ok(Value::Number(rand::thread_rng().gen_range(min..max) as f64))
    });

    lib
}

fn math1(lib: &mut Library, name: &str, f: fn(f64) -> Value) {
    register(lib, name, &["x"], move |_, args| {
        let (x,) = check_args!(args, Number);
        Ok(f(*x))
    });
}

fn math2(lib: &mut Library, name: &str, params: [&str; 2], f: fn(f64, f64) -> f64) {
    register(lib, name, &params, move |_, args| {
        let (x, y) = check_args!(args, Number, Number);
        Ok(f(*x, *y).into())
    });
}

/// `value`, unless `x` or `y` is NaN.
fn nan_or(x: f64, y: f64, value: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        value
    }
}

/// Rounds half-way cases towards positive infinity.
fn round(x: f64) -> f64 {
    if x - x.floor() == 0.5 {
        x.ceil()
    } else {
        x.round()
    }
}

fn integer(value: f64) -> Result<i64, Error> {
    if value.fract() == 0.0 && value.is_finite() {
        Ok(value as i64)
    } else {
        Err(Error::native(format!(
            "Unexpected value {value}, expected integer"
        )))
    }
}

fn check_range(min: f64, max: f64) -> Result<(), Error> {
    if min < max {
        Ok(())
    } else {
        Err(Error::native("min must be smaller than max"))
    }
}

fn check_member_name(member: &Rc<str>) -> Result<(), Error> {
    if member.starts_with("__") {
        Err(Error::native(format!("Invalid member name \"{member}\"")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::Program,
        errors::{ErrorKind, TypeError},
        objects::ValueType,
        vm::{Vm, VmOptions},
    };

    fn call(name: &str, args: Vec<Value>) -> Result<Value, Error> {
        let lib = basic_lib();
        let mut vm = Vm::new(Program::default(), Default::default(), VmOptions::default());
        vm.call_function(&lib[name], args)
    }

    macro_rules! check_call {
        ($name:expr, [$($arg:expr),* $(,)?], $value:expr $(,)?) => {
            assert_eq!(call($name, vec![$(Value::from($arg)),*]).unwrap(), $value)
        };
    }

    #[test]
    fn test_general() {
        check_call!("length", ["héllo"], Value::Number(5.0));
        let list = Value::new_list(vec![Value::Null, Value::Null]);
        assert_eq!(call("length", vec![list]).unwrap(), Value::Number(2.0));
        assert!(call("length", vec![Value::Number(1.0)]).is_err());
        check_call!("upper", ["abc"], Value::from("ABC"));
        check_call!("lower", ["ABC"], Value::from("abc"));
    }

    #[test]
    fn test_lists() {
        let list = Value::new_list(vec![1.0.into(), 2.0.into(), 3.0.into()]);
        call("append", vec![list.clone(), 4.0.into()]).unwrap();
        call("truncate", vec![list.clone(), 3.0.into()]).unwrap();
        assert_eq!(list.to_string(), "[1]");
        assert!(call("truncate", vec![list.clone(), 1.0.into()]).is_err());
        assert!(call("truncate", vec![list.clone(), (-1.0).into()]).is_err());
        assert!(call("truncate", vec![list.clone(), 0.5.into()]).is_err());
        list.freeze();
        assert_eq!(
            call("append", vec![list, Value::Null]).unwrap_err().kind,
            ErrorKind::Frozen(ValueType::List)
        );
    }

    #[test]
    fn test_objects() {
        let object = Value::new_object([("a", Value::from(1.0)), ("b", Value::Null)]);
        let members = call("members", vec![object.clone()]).unwrap();
        assert_eq!(members.to_string(), r#"["a", "b"]"#);
        assert!(members.is_frozen());
        call("set", vec![object.clone(), "b".into(), 2.0.into()]).unwrap();
        assert_eq!(
            call("get", vec![object.clone(), "b".into()]).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            call("get", vec![object.clone(), "c".into()]).unwrap_err().kind,
            ErrorKind::NoSuchMember("c".into())
        );
        assert!(call("get", vec![object, "__proto".into()]).is_err());
    }

    #[test]
    fn test_math() {
        check_call!("floor", [2.7], Value::Number(2.0));
        check_call!("round", [2.5], Value::Number(3.0));
        check_call!("round", [-2.5], Value::Number(-2.0));
        check_call!("round", [-2.6], Value::Number(-3.0));
        check_call!("min", [1.0, 2.0], Value::Number(1.0));
        check_call!("max", [1.0, 2.0], Value::Number(2.0));
        check_call!("clamp", [5.0, 0.0, 3.0], Value::Number(3.0));
        check_call!("pow", [2.0, 10.0], Value::Number(1024.0));
        check_call!("is_nan", [f64::NAN], Value::Bool(true));
        assert_eq!(
            call("sqrt", vec!["4".into()]).unwrap_err().kind,
            ErrorKind::Type(TypeError::UnexpectedType {
                expected: ValueType::Number,
                found: ValueType::Str,
            })
        );
    }

    #[test]
    fn test_random() {
        for _ in 0..100 {
            let Value::Number(v) = call("random_int", vec![1.0.into(), 3.0.into()]).unwrap() else {
                panic!("random_int returned a non-number");
            };
            assert!(v == 1.0 || v == 2.0);
            let Value::Number(v) = call("random_float", vec![1.0.into(), 2.0.into()]).unwrap()
            else {
                panic!("random_float returned a non-number");
            };
            assert!((1.0..2.0).contains(&v));
        }
        assert!(call("random_int", vec![3.0.into(), 3.0.into()]).is_err());
    }
}
