//! `Cell`: a mutable single-slot container shared via closure (§3, §9).
//!
//! Cells are shared via `Rc<RefCell<..>>` and have their own ownership
//! independent of any frame, so a closure outlives the frame that created
//! it. Reference cycles through cells (e.g. a function capturing its own
//! global namespace) are possible and left for the host's GC per §1.

use std::cell::RefCell;
use std::rc::Rc;

use super::value::Value;

#[derive(Debug, Clone)]
pub struct Cell(Rc<RefCell<Value>>);

impl Cell {
    #[must_use]
    pub fn new(initial: Value) -> Self {
        Self(Rc::new(RefCell::new(initial)))
    }

    #[must_use]
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
