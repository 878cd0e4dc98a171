//! Interned identifiers for the model IR.
//!
//! All ids are `u32` newtypes. They implement `Ord` so that collections keyed
//! by them can be iterated in a stable, deterministic order.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// A unique identifier for a constant domain (type).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DomainId(pub u32);

/// A unique identifier for a predicate.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredId(pub u32);

/// A clause-template variable, scoped to its template.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarId(pub u32);

/// An interned constant symbol.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constant(pub u32);

/// An argument tuple of a ground atom. Most predicates have low arity, so the
/// tuple is inlined.
pub type Args = SmallVec<[Constant; 4]>;

/// Interning table mapping constant names to [`Constant`] ids and back.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolTable {
    names: Vec<String>,
    index: FxHashMap<String, Constant>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a constant name, returning its id. Idempotent.
    pub fn intern(&mut self, name: &str) -> Constant {
        if let Some(&c) = self.index.get(name) {
            return c;
        }
        let c = Constant(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), c);
        c
    }

    /// Looks up an already-interned constant.
    pub fn get(&self, name: &str) -> Option<Constant> {
        self.index.get(name).copied()
    }

    /// Renders a constant back to its name.
    pub fn name(&self, c: Constant) -> &str {
        &self.names[c.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut t = SymbolTable::new();
        let a = t.intern("alice");
        let b = t.intern("bob");
        assert_ne!(a, b);
        assert_eq!(t.intern("alice"), a);
        assert_eq!(t.name(a), "alice");
        assert_eq!(t.len(), 2);
    }
}
