//! Document lifecycle and the published semantic index.
//!
//! One [`Workspace`] per server holds every open document plus a single
//! global [`Index`]. Edits schedule a rebuild (parse + both passes) on the
//! blocking pool, serialised on a single-writer strand so re-analyses never
//! interleave; the finished script and index are swapped in atomically under
//! the write half of one reader/writer lock. Queries run under the read half
//! and therefore always see one generation in its entirety.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{Mutex, RwLock};

use tclscope_index::{best_fit, build, find_procs, Index, Reference, ReferenceKind};
use tclscope_syntax::{
    find_position, parse_script, CallKind, LinePos, ParseContext, Script, SourceFile, Span,
};

/// The editor-supplied identity and content of one document.
#[derive(Debug, Clone)]
pub struct DocumentItem {
    pub uri: String,
    pub language_id: String,
    pub version: i32,
    pub text: String,
}

/// One content change from a `didChange` notification.
#[derive(Debug, Clone)]
pub struct DocumentChange {
    pub text: String,
    /// True when the change replaces the whole document (no range given).
    pub whole_document: bool,
}

struct Document {
    item: DocumentItem,
    script: Option<Script>,
}

struct State {
    documents: HashMap<String, Document>,
    index: Index,
}

/// Shared server state behind the reader/writer lock.
pub struct Workspace {
    state: RwLock<State>,
    /// Single-writer strand: at most one rebuild runs at a time.
    rebuild: Mutex<()>,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State { documents: HashMap::new(), index: Index::new() }),
            rebuild: Mutex::new(()),
        }
    }

    /// Track a newly opened document and build its first index generation.
    pub async fn open(&self, item: DocumentItem) {
        let uri = item.uri.clone();
        {
            let mut state = self.state.write().await;
            state.documents.insert(uri.clone(), Document { item, script: None });
        }
        self.rebuild(&uri).await;
    }

    /// Apply an edit. The update is atomic and only accepted when the new
    /// version strictly exceeds the stored one and exactly one
    /// whole-document change is supplied; anything else is a protocol error
    /// and is dropped. Returns whether the edit was applied.
    pub async fn change(&self, uri: &str, version: i32, mut changes: Vec<DocumentChange>) -> bool {
        {
            let mut state = self.state.write().await;
            let Some(doc) = state.documents.get_mut(uri) else {
                warn!("didChange for unknown document {uri}");
                return false;
            };
            if version <= doc.item.version {
                warn!(
                    "dropping out-of-order didChange for {uri}: {version} <= {}",
                    doc.item.version
                );
                return false;
            }
            if changes.len() != 1 {
                warn!("dropping didChange for {uri}: expected exactly one change");
                return false;
            }
            let Some(change) = changes.pop() else {
                return false;
            };
            if !change.whole_document {
                warn!("dropping incremental didChange for {uri}: full sync only");
                return false;
            }
            doc.item.version = version;
            doc.item.text = change.text;
        }
        self.rebuild(uri).await;
        true
    }

    /// Forget a document. Its contributions to the shared index remain until
    /// the next rebuild replaces the index wholesale.
    pub async fn close(&self, uri: &str) {
        let mut state = self.state.write().await;
        if state.documents.remove(uri).is_none() {
            warn!("didClose for unknown document {uri}");
        }
    }

    /// Definition sites for the procedure called at `pos`.
    pub async fn definitions(&self, uri: &str, pos: LinePos) -> Vec<Reference> {
        self.lookup(uri, pos, true).await
    }

    /// Every recorded reference to the procedure called at `pos`.
    pub async fn references(&self, uri: &str, pos: LinePos) -> Vec<Reference> {
        self.lookup(uri, pos, false).await
    }

    async fn lookup(&self, uri: &str, pos: LinePos, definitions_only: bool) -> Vec<Reference> {
        let state = self.state.read().await;
        let Some(doc) = state.documents.get(uri) else {
            return Vec::new();
        };
        let Some(script) = &doc.script else {
            return Vec::new();
        };
        let Some(cursor) = find_position(script, pos) else {
            return Vec::new();
        };
        // Only a cursor on the command-name word of an unrecognised call
        // names a procedure.
        if cursor.call.kind != CallKind::User || cursor.argument != 0 {
            return Vec::new();
        }
        let word = &cursor.call.words[0];
        if !word.is_text() {
            return Vec::new();
        }
        let Some(ns) = state.index.find_namespace(&cursor.call.namespace) else {
            return Vec::new();
        };
        let candidates = find_procs(&state.index, ns, word.text());
        let provided = cursor.call.words.len() - 1;
        let Some(best) = best_fit(&state.index, &candidates, provided) else {
            return Vec::new();
        };
        state
            .index
            .procs
            .references_to(best)
            .filter(|r| !definitions_only || r.kind == ReferenceKind::Definition)
            .cloned()
            .collect()
    }

    /// Parse and re-index one document, then atomically publish the result.
    async fn rebuild(&self, uri: &str) {
        let _strand = self.rebuild.lock().await;

        // Snapshot the latest text. A rebuild triggered by an already
        // obsolete version may observe newer state; the atomic swap makes
        // that harmless.
        let snapshot = {
            let state = self.state.read().await;
            state.documents.get(uri).map(|doc| (doc.item.uri.clone(), doc.item.text.clone()))
        };
        let Some((name, text)) = snapshot else {
            debug!("skipping rebuild of closed document {uri}");
            return;
        };

        let task = tokio::task::spawn_blocking(move || {
            let file = SourceFile::new(name, text);
            let mut ctx = ParseContext::new(Arc::clone(&file));
            let script = parse_script(&mut ctx, Span::new(0, file.contents().len()));
            let mut index = Index::new();
            build(&mut index, &script);
            (script, index)
        });
        let Ok((script, index)) = task.await else {
            warn!("rebuild task for {uri} failed");
            return;
        };

        let mut state = self.state.write().await;
        if let Some(doc) = state.documents.get_mut(uri) {
            doc.script = Some(script);
        }
        state.index = index;
        debug!("published new index generation for {uri}");
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(uri: &str, version: i32, text: &str) -> DocumentItem {
        DocumentItem {
            uri: uri.to_string(),
            language_id: "tcl".to_string(),
            version,
            text: text.to_string(),
        }
    }

    fn full_change(text: &str) -> Vec<DocumentChange> {
        vec![DocumentChange { text: text.to_string(), whole_document: true }]
    }

    #[tokio::test]
    async fn test_open_and_definition() {
        let workspace = Workspace::new();
        workspace.open(item("file:///a.tcl", 1, "proc Greet {} {}\nGreet\n")).await;

        let defs = workspace.definitions("file:///a.tcl", LinePos::new(1, 0)).await;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].kind, ReferenceKind::Definition);
        assert_eq!(defs[0].location.line, 0);
        assert_eq!(defs[0].location.column, 5);
    }

    #[tokio::test]
    async fn test_references_include_definition_and_usages() {
        let workspace = Workspace::new();
        workspace
            .open(item("file:///a.tcl", 1, "proc Greet {} {}\nGreet\nGreet\n"))
            .await;

        let refs = workspace.references("file:///a.tcl", LinePos::new(1, 2)).await;
        assert_eq!(refs.len(), 3);
        assert_eq!(refs.iter().filter(|r| r.kind == ReferenceKind::Usage).count(), 2);
    }

    #[tokio::test]
    async fn test_query_off_command_word_is_empty() {
        let workspace = Workspace::new();
        workspace.open(item("file:///a.tcl", 1, "proc Greet {a} {}\nGreet arg\n")).await;

        // Cursor on the argument, not the command name.
        let defs = workspace.definitions("file:///a.tcl", LinePos::new(1, 7)).await;
        assert!(defs.is_empty());
    }

    #[tokio::test]
    async fn test_query_unknown_document_is_empty() {
        let workspace = Workspace::new();
        let defs = workspace.definitions("file:///nope.tcl", LinePos::new(0, 0)).await;
        assert!(defs.is_empty());
    }

    #[tokio::test]
    async fn test_change_requires_newer_version() {
        let workspace = Workspace::new();
        workspace.open(item("file:///a.tcl", 2, "proc A {} {}\nA\n")).await;

        assert!(!workspace.change("file:///a.tcl", 2, full_change("proc B {} {}\n")).await);
        assert!(!workspace.change("file:///a.tcl", 1, full_change("proc B {} {}\n")).await);

        // The stale edits left the old index in place.
        let defs = workspace.definitions("file:///a.tcl", LinePos::new(1, 0)).await;
        assert_eq!(defs.len(), 1);
    }

    #[tokio::test]
    async fn test_change_requires_single_full_change() {
        let workspace = Workspace::new();
        workspace.open(item("file:///a.tcl", 1, "proc A {} {}\n")).await;

        let incremental =
            vec![DocumentChange { text: "x".to_string(), whole_document: false }];
        assert!(!workspace.change("file:///a.tcl", 2, incremental).await);
        assert!(!workspace.change("file:///a.tcl", 3, Vec::new()).await);

        let two = vec![
            DocumentChange { text: "a".to_string(), whole_document: true },
            DocumentChange { text: "b".to_string(), whole_document: true },
        ];
        assert!(!workspace.change("file:///a.tcl", 4, two).await);
    }

    #[tokio::test]
    async fn test_change_swaps_index_generation() {
        let workspace = Workspace::new();
        workspace.open(item("file:///a.tcl", 1, "proc Old {} {}\nOld\n")).await;
        assert!(
            workspace
                .change("file:///a.tcl", 2, full_change("proc New {} {}\nNew\n"))
                .await
        );

        let old = workspace.definitions("file:///a.tcl", LinePos::new(1, 0)).await;
        assert_eq!(old.len(), 1, "cursor now sits on the New call");

        let refs = workspace.references("file:///a.tcl", LinePos::new(1, 0)).await;
        assert_eq!(refs.len(), 2);
    }

    #[tokio::test]
    async fn test_close_forgets_document() {
        let workspace = Workspace::new();
        workspace.open(item("file:///a.tcl", 1, "proc A {} {}\nA\n")).await;
        workspace.close("file:///a.tcl").await;

        let defs = workspace.definitions("file:///a.tcl", LinePos::new(1, 0)).await;
        assert!(defs.is_empty());

        // Closing again is a logged no-op.
        workspace.close("file:///a.tcl").await;
    }

    #[tokio::test]
    async fn test_namespace_aware_query() {
        let text = "namespace eval X {\n  proc Y {} {}\n  Y\n}\n";
        let workspace = Workspace::new();
        workspace.open(item("file:///a.tcl", 1, text)).await;

        let defs = workspace.definitions("file:///a.tcl", LinePos::new(2, 2)).await;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].location.line, 1);
    }
}
