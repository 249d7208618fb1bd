//! Pass 2: resolve call sites to procedures and record usage references.
//!
//! The traversal mirrors pass 1. Inside a `proc` body the stack carries the
//! procedure's *parent namespace* (there is no per-procedure scope), so
//! relative lookups behave as the enclosing namespace dictates.

use tclscope_syntax::{CallKind, QualifiedName, Script, Word, WordPayload};

use crate::entities::{NamespaceId, ProcId, ReferenceKind};
use crate::index::Index;
use crate::scan::ScanContext;

/// Walk a script, emitting a usage reference for every call whose command
/// name resolves to an indexed procedure.
pub fn index_script(index: &mut Index, context: &mut ScanContext, script: &Script) {
    for call in &script.commands {
        let ns = context.current();
        let mut handled = false;

        match call.kind {
            CallKind::NamespaceEval => {
                if call.words[2].is_text() {
                    let qn = QualifiedName {
                        namespace: Some(call.words[2].text().to_string()),
                        name: String::new(),
                    };
                    let id = index.resolve_namespace(&qn, ns);
                    context.namespaces.push(id);
                    index_word(index, context, &call.words[3]);
                    context.namespaces.pop();
                    handled = true;
                }
            }
            CallKind::Proc => {
                let qn = QualifiedName::split(call.words[1].text());
                let id = index.resolve_namespace(&qn, ns);
                context.namespaces.push(id);
                index_word(index, context, &call.words[3]);
                context.namespaces.pop();
                handled = true;
            }
            CallKind::User => {
                if call.words[0].is_text() {
                    let candidates = find_procs(index, ns, call.words[0].text());
                    if let Some(best) = best_fit(index, &candidates, call.words.len() - 1) {
                        index.procs.add_reference(
                            best,
                            call.words[0].location.clone(),
                            ReferenceKind::Usage,
                        );
                    }
                }
            }
            _ => {}
        }

        if !handled {
            for word in &call.words {
                index_word(index, context, word);
            }
        }
    }
}

fn index_word(index: &mut Index, context: &mut ScanContext, word: &Word) {
    match &word.payload {
        WordPayload::ArrayAccess { index: subscript, .. } => {
            // The variable itself is not resolved; the subscript may hold
            // command substitutions.
            for inner in subscript {
                index_word(index, context, inner);
            }
        }
        WordPayload::TokenList(sub) | WordPayload::Expand(sub) => {
            for inner in sub {
                index_word(index, context, inner);
            }
        }
        WordPayload::Variable => {
            // Variable usage resolution is future work.
        }
        WordPayload::Script(body) => index_script(index, context, body),
        _ => {}
    }
}

/// Find candidate procedures for `name` as seen from `from`.
///
/// Candidates share the leaf name and live in the target namespace: the one
/// named by the qualifier (resolved from the root for absolute names, from
/// the current namespace otherwise), or the current namespace itself for
/// unqualified names. When nothing matches and the name is not absolute, the
/// search retries from each ancestor in turn.
pub fn find_procs(index: &Index, from: NamespaceId, name: &str) -> Vec<ProcId> {
    let qn = QualifiedName::split(name);
    let mut current = from;

    loop {
        let target = if qn.namespace.is_some() {
            let start = if qn.is_absolute() { index.global_namespace } else { current };
            qn.namespace_segments()
                .into_iter()
                .try_fold(start, |ns, segment| index.find_child(ns, segment))
        } else {
            Some(current)
        };

        if let Some(target) = target {
            let found: Vec<ProcId> = index
                .procs
                .ids_by_name(&qn.name)
                .iter()
                .copied()
                .filter(|&id| index.procs.get(id).parent_namespace == target)
                .collect();
            if !found.is_empty() {
                return found;
            }
        }

        if qn.is_absolute() {
            return Vec::new();
        }
        match index.namespaces.get(current).parent {
            Some(parent) => current = parent,
            None => return Vec::new(),
        }
    }
}

/// Arity-based overload selection over `candidates`, given the number of
/// words supplied after the command name.
///
/// An exact required-argument match wins immediately; otherwise the last
/// candidate that can absorb the provided count (through optionals or a
/// variadic tail) is kept. The last-eligible tie-break is a deliberate
/// conservative approximation.
pub fn best_fit(index: &Index, candidates: &[ProcId], provided: usize) -> Option<ProcId> {
    let mut best = None;
    for &id in candidates {
        let proc = index.procs.get(id);
        if provided < proc.required_args {
            continue;
        }
        if provided == proc.required_args {
            return Some(id);
        }
        if provided <= proc.required_args + proc.optional_args {
            best = Some(id);
        } else if proc.is_variadic {
            best = Some(id);
        }
    }
    best
}
