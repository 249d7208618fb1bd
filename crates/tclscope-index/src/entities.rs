//! Index entities and references.
//!
//! Entities refer to each other by 1-based integer IDs into the append-only
//! tables in [`crate::store`]; there is no cyclic ownership and IDs stay
//! valid for the lifetime of one index generation.

use tclscope_syntax::SourceLocation;

/// Unique identifier for a namespace (monotonic, 1-based).
pub type NamespaceId = u64;

/// Unique identifier for a procedure (monotonic, 1-based).
pub type ProcId = u64;

/// Unique identifier for a variable (monotonic, 1-based).
pub type VariableId = u64;

/// What a recorded reference means at its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// The site that defines the entity (a `proc` name word).
    Definition,
    /// A declaration without a body (procedure argument names).
    Declaration,
    /// A resolved use (a call site).
    Usage,
}

/// A (target, location, kind) record produced by the indexer.
#[derive(Debug, Clone)]
pub struct Reference {
    pub target: u64,
    pub location: SourceLocation,
    pub kind: ReferenceKind,
}

/// IDs declared directly inside a namespace.
#[derive(Debug, Default)]
pub struct Scope {
    pub procs: Vec<ProcId>,
    pub variables: Vec<VariableId>,
}

/// A node in the namespace tree. `name` is a single path segment; the root
/// namespace has an empty name and no parent.
#[derive(Debug)]
pub struct Namespace {
    pub id: NamespaceId,
    pub name: String,
    pub parent: Option<NamespaceId>,
    pub children: Vec<NamespaceId>,
    pub scope: Scope,
}

impl Namespace {
    pub fn new(name: impl Into<String>, parent: Option<NamespaceId>) -> Self {
        Self { id: 0, name: name.into(), parent, children: Vec::new(), scope: Scope::default() }
    }
}

/// A user-defined command introduced by `proc`.
///
/// `required_args + optional_args + (is_variadic as usize)` always equals
/// `arguments.len()`: a trailing argument literally named `args` is variadic
/// and counted by neither bucket, `{name default}` pairs are optional,
/// everything else is required.
#[derive(Debug)]
pub struct Proc {
    pub id: ProcId,
    pub name: String,
    pub parent_namespace: NamespaceId,
    /// Argument variables in source order.
    pub arguments: Vec<VariableId>,
    pub required_args: usize,
    pub optional_args: usize,
    pub is_variadic: bool,
    /// Comment block immediately preceding the definition.
    pub doc: Option<String>,
}

/// A variable. Usage resolution is future work; arguments are recorded so
/// procedures can name their parameters.
#[derive(Debug)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
}
