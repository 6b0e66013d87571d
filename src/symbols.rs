//! Symbol interning and the global table.
//!
//! Each distinct name is interned exactly once as a leaked, 16-byte-aligned
//! `SymbolObj` that carries both the print name and the symbol's global
//! value slot. Symbol identity is therefore word equality, and the global
//! slot address is stable for the process lifetime, so generated code can
//! bake it in as an immediate and still observe later redefinition.

use rustc_hash::FxHashMap;

use crate::value::{SymbolObj, Value};

/// Symbol interning table.
#[derive(Default)]
pub struct SymbolTable {
    map: FxHashMap<Box<str>, Value>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            map: FxHashMap::default(),
        }
    }

    /// Intern a name, returning its symbol value. Interning the same name
    /// twice returns the identical word.
    pub fn intern(&mut self, name: &str) -> Value {
        if let Some(&v) = self.map.get(name) {
            return v;
        }
        let v = SymbolObj::new(name).as_value();
        self.map.insert(name.into(), v);
        v
    }

    /// Look up a name without interning it.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.map.get(name).copied()
    }

    /// Number of interned symbols.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_identity() {
        let mut table = SymbolTable::new();
        let a = table.intern("foo");
        let b = table.intern("foo");
        let c = table.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_symbol());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_symbol_name() {
        let mut table = SymbolTable::new();
        let sym = table.intern("lambda");
        assert_eq!(sym.as_symbol().unwrap().name(), "lambda");
    }

    #[test]
    fn test_global_slot_redefinition() {
        let mut table = SymbolTable::new();
        let sym = table.intern("g");
        let obj = sym.as_symbol().unwrap();
        assert!(obj.global().is_unbound());
        let addr = obj.global_slot_addr();
        obj.set_global(Value::fixnum(1));
        obj.set_global(Value::fixnum(2));
        // Same slot address observes the redefinition
        assert_eq!(addr, obj.global_slot_addr());
        assert_eq!(obj.global(), Value::fixnum(2));
    }
}
