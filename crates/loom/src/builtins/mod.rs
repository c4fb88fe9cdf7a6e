//! Minimal builtin namespace (§10.2): exactly what the end-to-end scenarios
//! in §8 need, not a general-purpose standard library. Populated once at
//! startup into a plain map handed to [`crate::runtime::vm::Vm::new`].

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::runtime::class::ClassValue;
use crate::runtime::function::NativeFunction;
use crate::runtime::value::Value;

#[must_use]
pub fn builtins() -> IndexMap<String, Value> {
    let mut env = IndexMap::new();
    native(&mut env, "print", print);
    native(&mut env, "range", range);
    native(&mut env, "len", len);
    native(&mut env, "str", str_);

    let exception = exception_class("Exception", &[]);
    register_class(&mut env, &exception);
    for name in ["ValueError", "TypeError", "NameError", "AssertionError"] {
        register_class(&mut env, &exception_class(name, &[exception.clone()]));
    }
    env
}

fn native(env: &mut IndexMap<String, Value>, name: &'static str, func: crate::runtime::function::NativeFn) {
    env.insert(name.to_owned(), Value::Native(Rc::new(NativeFunction { name, func })));
}

fn register_class(env: &mut IndexMap<String, Value>, class: &Rc<ClassValue>) {
    env.insert(class.name.clone(), Value::Class(class.clone()));
}

fn exception_class(name: &str, bases: &[Rc<ClassValue>]) -> Rc<ClassValue> {
    Rc::new(ClassValue {
        name: name.to_owned(),
        bases: bases.to_vec(),
        namespace: RefCell::new(IndexMap::new()),
    })
}

fn print(args: &[Value]) -> Result<Value, RuntimeError> {
    let line = args.iter().map(Value::py_str).collect::<Vec<_>>().join(" ");
    println!("{line}");
    Ok(Value::None)
}

fn range(args: &[Value]) -> Result<Value, RuntimeError> {
    let ints = args
        .iter()
        .map(|v| match v {
            Value::Int(i) => Ok(*i),
            other => Err(RuntimeError::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                other.type_name()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => return Err(RuntimeError::type_error("range expected 1 to 3 arguments")),
    };
    if step == 0 {
        return Err(RuntimeError::new("ValueError", "range() arg 3 must not be zero"));
    }
    Ok(Value::Range(start, stop, step))
}

fn len(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(RuntimeError::type_error("len() takes exactly one argument"));
    };
    let n = match value {
        Value::Str(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(l) => l.borrow().len(),
        Value::Tuple(t) => t.len(),
        Value::Dict(d) => d.borrow().len(),
        other => {
            return Err(RuntimeError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(n as i64))
}

fn str_(args: &[Value]) -> Result<Value, RuntimeError> {
    let [value] = args else {
        return Err(RuntimeError::type_error("str() takes exactly one argument"));
    };
    Ok(Value::Str(Rc::from(value.py_str().as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_with_single_arg_starts_at_zero() {
        let result = range(&[Value::Int(5)]).unwrap();
        assert!(matches!(result, Value::Range(0, 5, 1)));
    }

    #[test]
    fn len_reports_codepoint_count_for_str() {
        let result = len(&[Value::Str(Rc::from("hello"))]).unwrap();
        assert!(matches!(result, Value::Int(5)));
    }

    #[test]
    fn value_error_is_registered_as_a_subclass_of_exception() {
        let env = builtins();
        let Some(Value::Class(value_error)) = env.get("ValueError") else {
            panic!("ValueError missing");
        };
        let Some(Value::Class(exception)) = env.get("Exception") else {
            panic!("Exception missing");
        };
        assert!(value_error.is_subclass_of(exception));
    }
}
