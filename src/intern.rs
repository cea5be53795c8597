//! # Symbol interning
//!
//! A bidirectional mapping between textual names and compact integer ids,
//! plus the ground-set table backing the `in/2` built-in. The symbol table is
//! the sole source of ids: interned names count upwards from zero, while the
//! freshening counter (also owned here) counts downwards, keeping constants
//! and freshened variables in disjoint ranges.

use std::collections::HashMap;

/// The narrow interface external relations see of the database.
///
/// Relations are responsible for interning the atoms they return and for
/// looking up the atoms they receive; this trait is all they get.
pub trait Interner {
    /// Intern a name. Repeated calls with the same name return the same id.
    fn intern(&self, name: &str) -> i64;

    /// Look up an interned name. Unknown ids yield the sentinel
    /// `Unknown:<id>`.
    fn lookup(&self, id: i64) -> String;

    /// Store a ground set and return its handle. Unlike string interning,
    /// identical sets may receive distinct handles.
    fn store_set(&self, items: Vec<i64>) -> i64;

    /// Fetch a stored ground set.
    ///
    /// # Panics
    ///
    /// Panics on an unknown handle. The surface syntax only produces handles
    /// it just stored, so this is a programming error.
    fn get_set(&self, id: i64) -> GroundSet;
}

/// A sorted sequence of constant ids, the second argument of `in/2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundSet {
    items: Vec<i64>,
}

impl GroundSet {
    /// Build a set from member ids; sorts them, keeping duplicates.
    pub fn new(mut items: Vec<i64>) -> GroundSet {
        items.sort_unstable();
        GroundSet { items }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.items.binary_search(&id).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.items.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The in-memory intern state. Lives behind the database's symbol lock.
#[derive(Debug, Default)]
pub(crate) struct SymbolTable {
    names: HashMap<String, i64>,
    strings: HashMap<i64, String>,
    sets: HashMap<i64, GroundSet>,
    /// Next id for interned names and set handles, counting up.
    next_id: i64,
    /// Next freshened variable id, counting down.
    pub(crate) fresh_var: i64,
}

impl SymbolTable {
    pub(crate) fn intern(&mut self, name: &str) -> i64 {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.names.insert(name.to_owned(), id);
        self.strings.insert(id, name.to_owned());
        id
    }

    pub(crate) fn lookup(&self, id: i64) -> Option<&str> {
        self.strings.get(&id).map(|s| s.as_str())
    }

    pub(crate) fn store_set(&mut self, set: GroundSet) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.sets.insert(id, set);
        id
    }

    pub(crate) fn get_set(&self, id: i64) -> Option<&GroundSet> {
        self.sets.get(&id)
    }
}
