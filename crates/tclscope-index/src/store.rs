//! Append-only entity tables.
//!
//! Each table assigns 1-based monotonic IDs, maintains an ordered multimap
//! from leaf name to IDs (insertion order within a name, so candidate lists
//! are deterministic), and records [`Reference`]s against its rows. Rows are
//! never removed; a rebuild allocates a fresh table set.

use std::collections::BTreeMap;

use tclscope_syntax::SourceLocation;

use crate::entities::{Namespace, Proc, Reference, ReferenceKind, Variable};

/// A row that a [`Table`] can store: it has an assignable ID and a leaf name.
pub trait Entity {
    fn id(&self) -> u64;
    fn assign_id(&mut self, id: u64);
    fn name(&self) -> &str;
}

impl Entity for Namespace {
    fn id(&self) -> u64 {
        self.id
    }
    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Proc {
    fn id(&self) -> u64 {
        self.id
    }
    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Variable {
    fn id(&self) -> u64 {
        self.id
    }
    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Append-only storage for one entity kind plus its references.
#[derive(Debug)]
pub struct Table<T> {
    rows: Vec<T>,
    by_name: BTreeMap<String, Vec<u64>>,
    references: Vec<Reference>,
    refs_by_target: BTreeMap<u64, Vec<usize>>,
}

impl<T: Entity> Table<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            by_name: BTreeMap::new(),
            references: Vec::new(),
            refs_by_target: BTreeMap::new(),
        }
    }

    /// Store a row, assigning the next ID and indexing its name.
    pub fn insert(&mut self, mut row: T) -> u64 {
        let id = self.rows.len() as u64 + 1;
        row.assign_id(id);
        self.by_name.entry(row.name().to_string()).or_default().push(id);
        self.rows.push(row);
        id
    }

    /// Fetch a row by ID.
    ///
    /// # Panics
    ///
    /// Panics on an unknown ID: IDs never recycle, so an out-of-range ID is a
    /// corrupted index, not a recoverable condition.
    pub fn get(&self, id: u64) -> &T {
        assert!(id >= 1 && id <= self.rows.len() as u64, "invalid entity id {id}");
        &self.rows[(id - 1) as usize]
    }

    /// Mutable counterpart of [`Table::get`], with the same panic contract.
    pub fn get_mut(&mut self, id: u64) -> &mut T {
        assert!(id >= 1 && id <= self.rows.len() as u64, "invalid entity id {id}");
        &mut self.rows[(id - 1) as usize]
    }

    /// All IDs sharing a leaf name, in insertion order.
    pub fn ids_by_name(&self, name: &str) -> &[u64] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_reference(&mut self, target: u64, location: SourceLocation, kind: ReferenceKind) {
        let index = self.references.len();
        self.references.push(Reference { target, location, kind });
        self.refs_by_target.entry(target).or_default().push(index);
    }

    /// Every reference recorded against this table, in emission order.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// References whose target is `id`.
    pub fn references_to(&self, id: u64) -> impl Iterator<Item = &Reference> + '_ {
        self.refs_by_target
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&index| &self.references[index])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.iter()
    }
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tclscope_syntax::SourceFile;

    fn variable(name: &str) -> Variable {
        Variable { id: 0, name: name.to_string() }
    }

    fn location() -> SourceLocation {
        let file = SourceFile::new("test.tcl", "x\n");
        SourceLocation::new(&file, 0)
    }

    #[test]
    fn test_insert_assigns_one_based_ids() {
        let mut table = Table::new();
        assert_eq!(table.insert(variable("a")), 1);
        assert_eq!(table.insert(variable("b")), 2);
        assert_eq!(table.get(1).name, "a");
        assert_eq!(table.get(2).name, "b");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_name_index_keeps_insertion_order() {
        let mut table = Table::new();
        table.insert(variable("x"));
        table.insert(variable("dup"));
        table.insert(variable("dup"));
        assert_eq!(table.ids_by_name("dup"), &[2, 3]);
        assert!(table.ids_by_name("missing").is_empty());
    }

    #[test]
    #[should_panic(expected = "invalid entity id")]
    fn test_get_unknown_id_panics() {
        let table: Table<Variable> = Table::new();
        table.get(1);
    }

    #[test]
    #[should_panic(expected = "invalid entity id")]
    fn test_get_zero_id_panics() {
        let mut table = Table::new();
        table.insert(variable("a"));
        table.get(0);
    }

    #[test]
    fn test_references_by_target() {
        let mut table = Table::new();
        let a = table.insert(variable("a"));
        let b = table.insert(variable("b"));
        table.add_reference(a, location(), ReferenceKind::Definition);
        table.add_reference(b, location(), ReferenceKind::Usage);
        table.add_reference(a, location(), ReferenceKind::Usage);

        let kinds: Vec<ReferenceKind> = table.references_to(a).map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ReferenceKind::Definition, ReferenceKind::Usage]);
        assert_eq!(table.references().len(), 3);
        assert_eq!(table.references_to(b).count(), 1);
    }
}
