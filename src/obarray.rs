//! The interned symbol table ("obarray" in the original spec's vocabulary).
//!
//! The source hashes print-names into a fixed-size bucket array with a
//! hand-rolled `(hash * 17) XOR byte` fold. That fold is an implementation
//! detail of a fixed-capacity C array, not an observable property (I3 only
//! requires *at most one* symbol cell per print-name); a `HashMap` gives
//! the same interning contract with an idiomatic, growable table.

use std::collections::HashMap;

use crate::cell::CellPtr;

#[derive(Default)]
pub struct Obarray {
    table: HashMap<Box<str>, CellPtr>,
}

impl Obarray {
    pub fn new() -> Obarray {
        Obarray {
            table: HashMap::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<CellPtr> {
        self.table.get(name).copied()
    }

    pub fn insert(&mut self, name: Box<str>, ptr: CellPtr) {
        self.table.insert(name, ptr);
    }

    /// Every interned symbol cell, for the GC's permanent-root scan.
    pub fn roots(&self) -> impl Iterator<Item = CellPtr> + '_ {
        self.table.values().copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
