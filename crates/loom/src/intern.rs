//! Insertion-ordered interning tables (§3, design note on the two-tier name
//! table): each table assigns successive indices on first sight and returns
//! the stable index on repeat lookups.

use indexmap::IndexSet;

use crate::ast::{NameConstant, Num};

/// A constant key distinguishes `1` (int) from `1.0` (float) even though
/// they would otherwise compare equal.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstKey {
    None,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
    Bytes(Vec<u8>),
    Code(usize),
}

impl Eq for ConstKey {}

impl std::hash::Hash for ConstKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::None => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(bits) => bits.hash(state),
            Self::Str(s) => s.hash(state),
            Self::Bytes(b) => b.hash(state),
            Self::Code(id) => id.hash(state),
        }
    }
}

impl From<&NameConstant> for ConstKey {
    fn from(nc: &NameConstant) -> Self {
        match nc {
            NameConstant::None => Self::None,
            NameConstant::True => Self::Bool(true),
            NameConstant::False => Self::Bool(false),
        }
    }
}

impl From<&Num> for ConstKey {
    fn from(n: &Num) -> Self {
        match n {
            Num::Int(i) => Self::Int(*i),
            Num::Float(f) => Self::Float(f.to_bits()),
        }
    }
}

/// Insertion-ordered `key -> index` table; `intern` inserts-if-absent and
/// returns the stable index.
#[derive(Debug, Default, Clone)]
pub struct Interner<K: std::hash::Hash + Eq + Clone> {
    order: IndexSet<K>,
}

impl<K: std::hash::Hash + Eq + Clone> Interner<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: IndexSet::new(),
        }
    }

    pub fn intern(&mut self, key: K) -> u32 {
        let (idx, _) = self.order.insert_full(key);
        u32::try_from(idx).expect("interning table index overflow")
    }

    #[must_use]
    pub fn get_index(&self, key: &K) -> Option<u32> {
        self.order
            .get_index_of(key)
            .map(|idx| u32::try_from(idx).expect("interning table index overflow"))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn into_items(self) -> Vec<K> {
        self.order.into_iter().collect()
    }

    #[must_use]
    pub fn items(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }
}

/// Three tables per code object: `constants`, `names`, `varnames`.
#[derive(Debug, Default)]
pub struct InternTables {
    pub constants: Interner<ConstKey>,
    pub names: Interner<String>,
    pub varnames: Interner<String>,
}

impl InternTables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_varname(&mut self, name: &str) -> u32 {
        self.varnames.intern(name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_float_one_are_distinct_constants() {
        let mut table: Interner<ConstKey> = Interner::new();
        let a = table.intern(ConstKey::Int(1));
        let b = table.intern(ConstKey::Float(1.0f64.to_bits()));
        assert_ne!(a, b);
    }

    #[test]
    fn repeat_intern_returns_same_index_and_preserves_first_use_order() {
        let mut table: Interner<String> = Interner::new();
        let a = table.intern("x".to_owned());
        let b = table.intern("y".to_owned());
        let a2 = table.intern("x".to_owned());
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(table.into_items(), vec!["x".to_owned(), "y".to_owned()]);
    }
}
