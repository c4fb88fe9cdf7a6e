//! Host arithmetic dispatch (§4.5 "Arithmetic uses host arithmetic
//! dispatch"): binary/unary operators route here by opcode.

use std::rc::Rc;

use crate::bytecode::opcode::Opcode;
use crate::error::RuntimeError;
use crate::runtime::value::Value;

fn type_error(op: &str, l: &Value, r: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        l.type_name(),
        r.type_name()
    ))
}

pub fn binary_op(op: Opcode, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
    use Opcode::{
        BinaryAdd, BinaryAnd, BinaryFloorDivide, BinaryLshift, BinaryModulo, BinaryMultiply,
        BinaryOr, BinaryPower, BinaryRshift, BinarySubtract, BinaryTrueDivide, BinaryXor,
    };
    match (op, l, r) {
        (BinaryAdd, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (BinaryAdd, Value::Str(a), Value::Str(b)) => {
            Ok(Value::Str(Rc::from(format!("{a}{b}").as_str())))
        }
        (BinaryAdd, Value::List(a), Value::List(b)) => {
            let mut out = a.borrow().clone();
            out.extend(b.borrow().iter().cloned());
            Ok(Value::List(Rc::new(std::cell::RefCell::new(out))))
        }
        (BinaryAdd, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::Tuple(Rc::from([a.as_ref(), b.as_ref()].concat())))
        }
        (BinarySubtract, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
        (BinaryMultiply, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
        (BinaryMultiply, Value::Str(a), Value::Int(b)) => {
            Ok(Value::Str(Rc::from(a.repeat((*b).max(0) as usize).as_str())))
        }
        (BinaryTrueDivide, _, _) => {
            let (a, b) = (as_f64(l)?, as_f64(r)?);
            if b == 0.0 {
                return Err(RuntimeError::new("ZeroDivisionError", "division by zero"));
            }
            Ok(Value::Float(a / b))
        }
        (BinaryFloorDivide, Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(RuntimeError::new("ZeroDivisionError", "integer division or modulo by zero"));
            }
            Ok(Value::Int(a.div_euclid(*b)))
        }
        (BinaryModulo, Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(RuntimeError::new("ZeroDivisionError", "integer division or modulo by zero"));
            }
            Ok(Value::Int(a.rem_euclid(*b)))
        }
        (BinaryPower, Value::Int(a), Value::Int(b)) if *b >= 0 => {
            Ok(Value::Int(a.pow(u32::try_from(*b).unwrap_or(0))))
        }
        (BinaryLshift, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a << b)),
        (BinaryRshift, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a >> b)),
        (BinaryOr, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a | b)),
        (BinaryXor, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a ^ b)),
        (BinaryAnd, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a & b)),
        _ if is_numeric(l) && is_numeric(r) => {
            let (a, b) = (as_f64(l)?, as_f64(r)?);
            let result = match op {
                BinaryAdd => a + b,
                BinarySubtract => a - b,
                BinaryMultiply => a * b,
                BinaryPower => a.powf(b),
                _ => return Err(type_error(op_symbol(op), l, r)),
            };
            Ok(Value::Float(result))
        }
        _ => Err(type_error(op_symbol(op), l, r)),
    }
}

pub fn unary_op(op: Opcode, v: &Value) -> Result<Value, RuntimeError> {
    match (op, v) {
        (Opcode::UnaryNot, _) => Ok(Value::Bool(!v.truthy())),
        (Opcode::UnaryNegative, Value::Int(i)) => Ok(Value::Int(-i)),
        (Opcode::UnaryNegative, Value::Float(f)) => Ok(Value::Float(-f)),
        (Opcode::UnaryPositive, Value::Int(i)) => Ok(Value::Int(*i)),
        (Opcode::UnaryPositive, Value::Float(f)) => Ok(Value::Float(*f)),
        (Opcode::UnaryInvert, Value::Int(i)) => Ok(Value::Int(!i)),
        _ => Err(RuntimeError::type_error(format!(
            "bad operand type for unary operator: '{}'",
            v.type_name()
        ))),
    }
}

fn is_numeric(v: &Value) -> bool {
    matches!(v, Value::Int(_) | Value::Float(_) | Value::Bool(_))
}

fn as_f64(v: &Value) -> Result<f64, RuntimeError> {
    match v {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(RuntimeError::type_error(format!(
            "expected a number, got '{}'",
            other.type_name()
        ))),
    }
}

fn op_symbol(op: Opcode) -> &'static str {
    match op {
        Opcode::BinaryAdd => "+",
        Opcode::BinarySubtract => "-",
        Opcode::BinaryMultiply => "*",
        Opcode::BinaryTrueDivide => "/",
        Opcode::BinaryFloorDivide => "//",
        Opcode::BinaryModulo => "%",
        Opcode::BinaryPower => "**",
        Opcode::BinaryLshift => "<<",
        Opcode::BinaryRshift => ">>",
        Opcode::BinaryOr => "|",
        Opcode::BinaryXor => "^",
        Opcode::BinaryAnd => "&",
        _ => "?",
    }
}
