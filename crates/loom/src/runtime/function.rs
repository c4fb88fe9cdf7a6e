//! `Function`/`Method` runtime values and the argument-binding convention
//! of §4.5: positional, then defaults, then keywords, then `*args`/`**kws`
//! collection, with comprehension functions bypassing binding entirely.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::bytecode::code::{CodeObject, CO_VARARGS, CO_VARKEYWORDS};
use crate::error::RuntimeError;
use crate::runtime::cell::Cell;
use crate::runtime::value::Value;

#[derive(Debug)]
pub struct FunctionValue {
    pub name: String,
    pub code: Rc<CodeObject>,
    pub defaults: Vec<Value>,
    pub globals: Rc<std::cell::RefCell<IndexMap<String, Value>>>,
    pub closure: Vec<Cell>,
    pub doc: Option<String>,
}

#[derive(Debug)]
pub struct MethodValue {
    pub receiver: Value,
    pub function: Rc<FunctionValue>,
}

pub type NativeFn = fn(&[Value]) -> Result<Value, RuntimeError>;

#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
}

fn is_comprehension_name(name: &str) -> bool {
    matches!(name, "<listcomp>" | "<setcomp>" | "<dictcomp>" | "<genexpr>")
}

/// Binds `(args, kwargs)` to `code`'s declared parameters, returning the
/// values for each `varnames` slot in order (§4.5 call protocol).
pub fn bind_arguments(
    func_name: &str,
    code: &CodeObject,
    defaults: &[Value],
    args: &[Value],
    kwargs: &[(String, Value)],
) -> Result<Vec<Value>, RuntimeError> {
    if is_comprehension_name(func_name) {
        let mut slots = vec![Value::None; code.nlocals as usize];
        if let Some(first) = args.first() {
            slots[0] = first.clone();
        }
        return Ok(slots);
    }

    let argcount = code.argcount as usize;
    let has_varargs = code.flags & CO_VARARGS != 0;
    let has_varkwargs = code.flags & CO_VARKEYWORDS != 0;
    let positional_names = &code.varnames[..argcount];

    let mut slots: Vec<Option<Value>> = vec![None; code.nlocals as usize];

    let npos_bound = args.len().min(argcount);
    for (slot, value) in slots.iter_mut().zip(args.iter()).take(npos_bound) {
        *slot = Some(value.clone());
    }

    let extra_positional = &args[npos_bound..];
    if !extra_positional.is_empty() && !has_varargs {
        return Err(RuntimeError::type_error(format!(
            "{func_name}() takes {argcount} positional argument(s) but {} were given",
            args.len()
        )));
    }

    let default_start = argcount.saturating_sub(defaults.len());
    for (i, default) in defaults.iter().enumerate() {
        let idx = default_start + i;
        if idx < argcount && slots[idx].is_none() {
            slots[idx] = Some(default.clone());
        }
    }

    for (name, value) in kwargs {
        if let Some(pos) = positional_names.iter().position(|n| n == name) {
            if slots[pos].is_some() {
                return Err(RuntimeError::type_error(format!(
                    "{func_name}() got multiple values for argument '{name}'"
                )));
            }
            slots[pos] = Some(value.clone());
        } else if has_varkwargs {
            // Collected below once the **kws slot index is known.
        } else {
            return Err(RuntimeError::type_error(format!(
                "{func_name}() got an unexpected keyword argument '{name}'"
            )));
        }
    }

    let mut next_extra_slot = argcount;
    if has_varargs {
        slots[next_extra_slot] = Some(Value::Tuple(Rc::from(extra_positional.to_vec())));
        next_extra_slot += 1;
    }
    if has_varkwargs {
        let map: IndexMap<crate::runtime::value::DictKey, (Value, Value)> = kwargs
            .iter()
            .filter(|(name, _)| !positional_names.iter().any(|n| n == name))
            .map(|(name, value)| {
                let key = Value::Str(Rc::from(name.as_str()));
                (
                    crate::runtime::value::DictKey::Str(Rc::from(name.as_str())),
                    (key, value.clone()),
                )
            })
            .collect();
        slots[next_extra_slot] = Some(Value::Dict(Rc::new(std::cell::RefCell::new(map))));
    }

    let missing: Vec<&str> = positional_names
        .iter()
        .zip(slots.iter())
        .filter(|(_, slot)| slot.is_none())
        .map(|(name, _)| name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(RuntimeError::type_error(format!(
            "{func_name}() missing required argument(s): {}",
            missing.join(", ")
        )));
    }

    Ok(slots.into_iter().map(|s| s.unwrap_or(Value::None)).collect())
}
