//! Pass 1: discover namespaces, procedure definitions, and their argument
//! variables.
//!
//! The walk carries a stack of namespace IDs; only `namespace eval` bodies
//! push onto it. `proc` bodies are reached through the generic word
//! recursion, so nested definitions land in the namespace that encloses the
//! outer `proc` lexically.

use tclscope_syntax::{Call, CallKind, QualifiedName, Script, Word, WordPayload};

use crate::entities::{NamespaceId, Proc, ReferenceKind, Variable};
use crate::index::Index;

/// Traversal context shared by both passes: the namespace stack, with the
/// global namespace at the bottom.
#[derive(Debug)]
pub struct ScanContext {
    pub namespaces: Vec<NamespaceId>,
}

impl ScanContext {
    pub fn new(global: NamespaceId) -> Self {
        Self { namespaces: vec![global] }
    }

    pub fn current(&self) -> NamespaceId {
        *self.namespaces.last().expect("namespace stack never empty")
    }
}

/// Walk a script, recording namespaces and procedure definitions.
pub fn scan_script(index: &mut Index, context: &mut ScanContext, script: &Script) {
    for call in &script.commands {
        let ns = context.current();
        let mut scanned = false;

        match call.kind {
            CallKind::NamespaceEval => {
                if call.words[2].is_text() {
                    let qn = QualifiedName {
                        namespace: Some(call.words[2].text().to_string()),
                        name: String::new(),
                    };
                    let id = index.resolve_namespace(&qn, ns);
                    context.namespaces.push(id);
                    scan_word(index, context, &call.words[3]);
                    context.namespaces.pop();
                    scanned = true;
                }
            }
            CallKind::Proc => {
                add_proc(index, ns, call);
            }
            _ => {}
        }

        if !scanned {
            for word in &call.words {
                scan_word(index, context, word);
            }
        }
    }
}

fn scan_word(index: &mut Index, context: &mut ScanContext, word: &Word) {
    match &word.payload {
        WordPayload::TokenList(sub) | WordPayload::Expand(sub) => {
            for inner in sub {
                scan_word(index, context, inner);
            }
        }
        WordPayload::Script(body) => scan_script(index, context, body),
        _ => {}
    }
}

/// Record one `proc` definition: argument variables, the procedure row in its
/// parent namespace, and a definition reference at the name word.
fn add_proc(index: &mut Index, ns: NamespaceId, call: &Call) {
    // proc name { arg | {arg default} ... } { body }
    let name_word = &call.words[1];
    let spec = match &call.words[2].payload {
        WordPayload::List(elements) => elements,
        _ => return,
    };

    let mut arguments = Vec::with_capacity(spec.len());
    let mut required_args = 0;
    let mut optional_args = 0;
    let mut is_variadic = false;

    for (position, element) in spec.iter().enumerate() {
        let (arg_word, has_default) = match &element.payload {
            WordPayload::Text => (element, false),
            WordPayload::List(items) => (&items[0], true),
            _ => return,
        };
        let name = arg_word.text().to_string();
        if position + 1 == spec.len() && !has_default && name == "args" {
            is_variadic = true;
        } else if has_default {
            optional_args += 1;
        } else {
            required_args += 1;
        }

        let variable = index.variables.insert(Variable { id: 0, name });
        index.variables.add_reference(
            variable,
            arg_word.location.clone(),
            ReferenceKind::Declaration,
        );
        arguments.push(variable);
    }

    let qn = QualifiedName::split(name_word.text());
    let parent = if qn.is_absolute() || qn.namespace.is_some() {
        index.resolve_namespace(&qn, ns)
    } else {
        ns
    };

    let doc = call.comment.map(|span| comment_text(name_word.location.file.slice(span)));

    let proc = index.procs.insert(Proc {
        id: 0,
        name: qn.name,
        parent_namespace: parent,
        arguments,
        required_args,
        optional_args,
        is_variadic,
        doc,
    });
    index.namespaces.get_mut(parent).scope.procs.push(proc);
    index.procs.add_reference(proc, name_word.location.clone(), ReferenceKind::Definition);
}

/// Strip the comment markers from a leading comment block.
fn comment_text(raw: &str) -> String {
    raw.lines()
        .map(|line| line.trim_start().trim_start_matches('#').trim())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tclscope_syntax::{parse_script, ParseContext, SourceFile, Span};

    fn scan(text: &str) -> Index {
        let file = SourceFile::new("test.tcl", text);
        let mut ctx = ParseContext::new(Arc::clone(&file));
        let script = parse_script(&mut ctx, Span::new(0, text.len()));
        let mut index = Index::new();
        let mut context = ScanContext::new(index.global_namespace);
        scan_script(&mut index, &mut context, &script);
        index
    }

    fn proc_by_name<'a>(index: &'a Index, name: &str) -> &'a Proc {
        let ids = index.procs.ids_by_name(name);
        assert_eq!(ids.len(), 1, "exactly one proc named {name}");
        index.procs.get(ids[0])
    }

    #[test]
    fn test_simple_proc_in_global() {
        let index = scan("proc Greet {who} { puts $who }\n");
        let proc = proc_by_name(&index, "Greet");
        assert_eq!(proc.parent_namespace, index.global_namespace);
        assert_eq!(proc.required_args, 1);
        assert_eq!(proc.arguments.len(), 1);
        assert_eq!(index.variables.get(proc.arguments[0]).name, "who");
    }

    #[test]
    fn test_argument_arithmetic() {
        let index = scan("proc F { a {b 1} args } {}\n");
        let proc = proc_by_name(&index, "F");
        assert_eq!(proc.required_args, 1);
        assert_eq!(proc.optional_args, 1);
        assert!(proc.is_variadic);
        assert_eq!(
            proc.required_args + proc.optional_args + usize::from(proc.is_variadic),
            proc.arguments.len()
        );
    }

    #[test]
    fn test_args_not_last_is_required() {
        let index = scan("proc F { args b } {}\n");
        let proc = proc_by_name(&index, "F");
        assert!(!proc.is_variadic);
        assert_eq!(proc.required_args, 2);
    }

    #[test]
    fn test_single_argument_spec() {
        let index = scan("proc F a {}\n");
        let proc = proc_by_name(&index, "F");
        assert_eq!(proc.required_args, 1);
        assert_eq!(index.variables.get(proc.arguments[0]).name, "a");
    }

    #[test]
    fn test_definition_reference_at_name_word() {
        let index = scan("proc Greet {} {}\n");
        let proc = proc_by_name(&index, "Greet");
        let refs: Vec<_> = index.procs.references_to(proc.id).collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::Definition);
        assert_eq!(refs[0].location.column, 5);
        assert_eq!(refs[0].location.line, 0);
    }

    #[test]
    fn test_argument_declarations() {
        let index = scan("proc F { a b } {}\n");
        let proc = proc_by_name(&index, "F");
        for &arg in &proc.arguments {
            let kinds: Vec<_> = index.variables.references_to(arg).map(|r| r.kind).collect();
            assert_eq!(kinds, vec![ReferenceKind::Declaration]);
        }
    }

    #[test]
    fn test_qualified_definition_creates_namespace() {
        let index = scan("proc ::A::B {} {}\n");
        let a = index.find_namespace("::A").expect("namespace A created");
        let proc = proc_by_name(&index, "B");
        assert_eq!(proc.parent_namespace, a);
        assert_eq!(index.namespaces.get(a).scope.procs, vec![proc.id]);
    }

    #[test]
    fn test_namespace_eval_scopes_procs() {
        let index = scan("namespace eval X { proc Y {} {} }\n");
        let x = index.find_namespace("::X").expect("namespace X created");
        let proc = proc_by_name(&index, "Y");
        assert_eq!(proc.parent_namespace, x);
    }

    #[test]
    fn test_nested_proc_lands_in_enclosing_namespace() {
        let index = scan("proc Outer {} {\n  proc Inner {} {}\n}\n");
        assert_eq!(index.procs.len(), 2);
        let outer = proc_by_name(&index, "Outer");
        let inner = proc_by_name(&index, "Inner");
        assert_eq!(outer.parent_namespace, index.global_namespace);
        assert_eq!(inner.parent_namespace, index.global_namespace);
    }

    #[test]
    fn test_doc_comment_captured() {
        let index = scan("# Says hello\n# twice\nproc Greet {} {}\n");
        let proc = proc_by_name(&index, "Greet");
        assert_eq!(proc.doc.as_deref(), Some("Says hello\ntwice"));
    }

    #[test]
    fn test_malformed_proc_contributes_nothing() {
        // The three-element argument entry rejects the whole definition, so
        // its body is opaque text and the nested definition is invisible.
        let index = scan("proc f { {a b c} } { proc Hidden {} {} }\n");
        assert!(index.procs.is_empty());
        assert!(index.procs.ids_by_name("Hidden").is_empty());
    }

    #[test]
    fn test_proc_inside_bracket_substitution_is_found() {
        let index = scan("set x [list [proc Hidden {} {}]]\n");
        assert_eq!(index.procs.ids_by_name("Hidden").len(), 1);
    }
}
