//! Comparison operator table indexed by the `COMPARE_OP` argument (§4.5):
//! `< <= == != > >= in not-in is is-not`. Exception-match (index 9 in some
//! hosts) is not reachable since `try`/`except` is out of scope (§1).

use std::rc::Rc;

use crate::ast::CmpOp;
use crate::error::RuntimeError;
use crate::runtime::value::Value;

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::None, Value::None) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bytes(a), Value::Bytes(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        _ => {
            if let (Some(a), Some(b)) = (numeric(l), numeric(r)) {
                (a - b).abs() == 0.0
            } else {
                false
            }
        }
    }
}

fn ordering(l: &Value, r: &Value) -> Result<std::cmp::Ordering, RuntimeError> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => {
            if let (Some(a), Some(b)) = (numeric(l), numeric(r)) {
                a.partial_cmp(&b).ok_or_else(|| {
                    RuntimeError::type_error("comparison between NaN values is undefined")
                })
            } else {
                Err(RuntimeError::type_error(format!(
                    "'<' not supported between instances of '{}' and '{}'",
                    l.type_name(),
                    r.type_name()
                )))
            }
        }
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, RuntimeError> {
    match container {
        Value::List(l) => Ok(l.borrow().iter().any(|v| values_equal(v, item))),
        Value::Tuple(t) => Ok(t.iter().any(|v| values_equal(v, item))),
        Value::Str(s) => {
            if let Value::Str(needle) = item {
                Ok(s.contains(needle.as_ref()))
            } else {
                Err(RuntimeError::type_error("'in <string>' requires string as left operand"))
            }
        }
        Value::Dict(d) => Ok(crate::runtime::value::DictKey::from_value(item)
            .is_some_and(|k| d.borrow().contains_key(&k))),
        other => Err(RuntimeError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn is_same(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
        (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
        (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

pub fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
    let result = match op {
        CmpOp::Lt => ordering(l, r)?.is_lt(),
        CmpOp::Le => ordering(l, r)?.is_le(),
        CmpOp::Gt => ordering(l, r)?.is_gt(),
        CmpOp::Ge => ordering(l, r)?.is_ge(),
        CmpOp::Eq => values_equal(l, r),
        CmpOp::Ne => !values_equal(l, r),
        CmpOp::In => contains(r, l)?,
        CmpOp::NotIn => !contains(r, l)?,
        CmpOp::Is => is_same(l, r),
        CmpOp::IsNot => !is_same(l, r),
    };
    Ok(Value::Bool(result))
}
