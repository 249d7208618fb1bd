//! The index proper: entity tables rooted at a global namespace.

use tclscope_syntax::{path_segments, QualifiedName, DELIMITER};

use crate::entities::{Namespace, NamespaceId, Proc, Variable};
use crate::store::Table;

/// One generation of the semantic index. A rebuild constructs a fresh
/// `Index` and swaps it in wholesale; IDs are not stable across generations.
#[derive(Debug)]
pub struct Index {
    pub namespaces: Table<Namespace>,
    pub procs: Table<Proc>,
    pub variables: Table<Variable>,
    pub global_namespace: NamespaceId,
}

impl Index {
    /// An empty index containing only the global namespace.
    pub fn new() -> Self {
        let mut namespaces = Table::new();
        let global_namespace = namespaces.insert(Namespace::new("", None));
        Self { namespaces, procs: Table::new(), variables: Table::new(), global_namespace }
    }

    /// The child of `parent` with the given segment name, if it exists.
    pub fn find_child(&self, parent: NamespaceId, name: &str) -> Option<NamespaceId> {
        self.namespaces
            .get(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.namespaces.get(child).name == name)
    }

    /// Walk the qualified name's namespace part from `from` (or the root for
    /// absolute names), creating and linking missing namespaces on the way.
    pub fn resolve_namespace(&mut self, qn: &QualifiedName, from: NamespaceId) -> NamespaceId {
        let mut current = if qn.is_absolute() { self.global_namespace } else { from };
        for segment in qn.namespace_segments() {
            current = match self.find_child(current, segment) {
                Some(child) => child,
                None => {
                    let child = self.namespaces.insert(Namespace::new(segment, Some(current)));
                    self.namespaces.get_mut(current).children.push(child);
                    child
                }
            };
        }
        current
    }

    /// Walk-only lookup of an absolute namespace path; `""` is the root.
    pub fn find_namespace(&self, path: &str) -> Option<NamespaceId> {
        let mut current = self.global_namespace;
        for segment in path_segments(path) {
            current = self.find_child(current, segment)?;
        }
        Some(current)
    }

    /// The absolute path of a namespace (`""` for the root, `::A::B` below).
    pub fn namespace_path(&self, id: NamespaceId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(ns_id) = current {
            let ns = self.namespaces.get(ns_id);
            parts.push(ns.name.clone());
            current = ns.parent;
        }
        parts.reverse();
        parts.join(DELIMITER)
    }

    /// A procedure's fully qualified display name.
    pub fn proc_path(&self, proc: &Proc) -> String {
        format!("{}{DELIMITER}{}", self.namespace_path(proc.parent_namespace), proc.name)
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_index_has_global_namespace() {
        let index = Index::new();
        let global = index.namespaces.get(index.global_namespace);
        assert_eq!(global.name, "");
        assert!(global.parent.is_none());
        assert_eq!(index.namespace_path(index.global_namespace), "");
    }

    #[test]
    fn test_resolve_creates_chain() {
        let mut index = Index::new();
        let qn = QualifiedName::split("::A::B::leaf");
        let id = index.resolve_namespace(&qn, index.global_namespace);
        assert_eq!(index.namespace_path(id), "::A::B");

        let a = index.find_namespace("::A").unwrap();
        assert_eq!(index.namespaces.get(a).children.len(), 1);
        assert_eq!(index.namespaces.get(id).parent, Some(a));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut index = Index::new();
        let qn = QualifiedName::split("A::leaf");
        let first = index.resolve_namespace(&qn, index.global_namespace);
        let second = index.resolve_namespace(&qn, index.global_namespace);
        assert_eq!(first, second);
        assert_eq!(index.namespaces.len(), 2);
    }

    #[test]
    fn test_relative_resolution_starts_at_from() {
        let mut index = Index::new();
        let outer = index.resolve_namespace(&QualifiedName::split("X::_"), index.global_namespace);
        let inner = index.resolve_namespace(&QualifiedName::split("Y::_"), outer);
        assert_eq!(index.namespace_path(inner), "::X::Y");
    }

    #[test]
    fn test_find_namespace_does_not_create() {
        let index = Index::new();
        assert!(index.find_namespace("::nowhere").is_none());
        assert_eq!(index.find_namespace(""), Some(index.global_namespace));
    }
}
