//! # tclscope-index
//!
//! The semantic index of tclscope: append-only entity tables over the syntax
//! trees produced by `tclscope-syntax`.
//!
//! Indexing is two passes over the same [`Script`]:
//!
//! 1. **Scan** ([`scan::scan_script`]) discovers namespaces, procedure
//!    definitions and their argument variables, emitting definition and
//!    declaration references.
//! 2. **Resolve** ([`resolve::index_script`]) resolves command invocations to
//!    procedures via namespace-walking lookup ([`resolve::find_procs`]) and
//!    arity-based overload selection ([`resolve::best_fit`]), emitting usage
//!    references.
//!
//! [`build`] runs both. A rebuild always starts from [`Index::new`]; entity
//! IDs are stable within one generation only.

#![deny(unsafe_code)]

use tclscope_syntax::Script;

pub mod entities;
pub mod index;
pub mod resolve;
pub mod scan;
pub mod store;

pub use entities::{
    Namespace, NamespaceId, Proc, ProcId, Reference, ReferenceKind, Scope, Variable, VariableId,
};
pub use index::Index;
pub use resolve::{best_fit, find_procs, index_script};
pub use scan::{scan_script, ScanContext};
pub use store::{Entity, Table};

/// Run both passes over `script`, populating `index`.
pub fn build(index: &mut Index, script: &Script) {
    let mut context = ScanContext::new(index.global_namespace);
    scan_script(index, &mut context, script);

    let mut context = ScanContext::new(index.global_namespace);
    index_script(index, &mut context, script);
}
