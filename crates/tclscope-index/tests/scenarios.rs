//! End-to-end indexing scenarios: parse real script text, run both passes,
//! and check the resulting entities and references.

use std::sync::Arc;

use tclscope_index::{build, Index, ReferenceKind};
use tclscope_syntax::{parse_script, ParseContext, SourceFile, Span};

fn indexed(text: &str) -> Index {
    let file = SourceFile::new("scenario.tcl", text);
    let mut ctx = ParseContext::new(Arc::clone(&file));
    let script = parse_script(&mut ctx, Span::new(0, text.len()));
    let mut index = Index::new();
    build(&mut index, &script);
    index
}

#[test]
fn nested_proc_definition() {
    let index = indexed("proc Outer {} { proc Inner {} {} }\n");

    assert_eq!(index.procs.len(), 2);
    let outer = index.procs.get(index.procs.ids_by_name("Outer")[0]);
    let inner = index.procs.get(index.procs.ids_by_name("Inner")[0]);
    assert_eq!(outer.parent_namespace, index.global_namespace);
    assert_eq!(inner.parent_namespace, index.global_namespace);
}

#[test]
fn absolute_qualified_definition() {
    let index = indexed("proc ::A::B {} {}\n");

    let a = index.find_namespace("::A").expect("namespace A under root");
    let b = index.procs.get(index.procs.ids_by_name("B")[0]);
    assert_eq!(b.parent_namespace, a);
    assert_eq!(index.proc_path(b), "::A::B");
}

#[test]
fn namespace_eval_and_qualified_reference() {
    let index = indexed("namespace eval X { proc Y {} {} }\nX::Y\n");

    let x = index.find_namespace("::X").expect("namespace X under root");
    let y = index.procs.get(index.procs.ids_by_name("Y")[0]);
    assert_eq!(y.parent_namespace, x);

    let usages: Vec<_> =
        index.procs.references_to(y.id).filter(|r| r.kind == ReferenceKind::Usage).collect();
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].location.line, 1);
    assert_eq!(usages[0].location.column, 0);
}

#[test]
fn variadic_and_optional_arguments() {
    let index = indexed("proc F { a {b 1} args } {}\n");

    let f = index.procs.get(index.procs.ids_by_name("F")[0]);
    assert_eq!(f.required_args, 1);
    assert_eq!(f.optional_args, 1);
    assert!(f.is_variadic);
    assert_eq!(f.arguments.len(), 3);
}

#[test]
fn error_recovery_keeps_later_definitions() {
    let index = indexed("This is [$a test\nproc Z {} {}\n");

    let ids = index.procs.ids_by_name("Z");
    assert_eq!(ids.len(), 1);
    let z = index.procs.get(ids[0]);
    let definitions: Vec<_> =
        index.procs.references_to(z.id).filter(|r| r.kind == ReferenceKind::Definition).collect();
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].location.line, 1);
}

#[test]
fn arity_overload_resolution() {
    let text = "proc P {} {}\nproc P {a b} {}\nP a b\nP\n";
    let index = indexed(text);

    let ids = index.procs.ids_by_name("P");
    assert_eq!(ids.len(), 2);
    let (zero_arg, two_arg) = (ids[0], ids[1]);

    let usage_line = |id| {
        index
            .procs
            .references_to(id)
            .filter(|r| r.kind == ReferenceKind::Usage)
            .map(|r| r.location.line)
            .collect::<Vec<_>>()
    };
    assert_eq!(usage_line(two_arg), vec![2], "P a b resolves to the 2-arg overload");
    assert_eq!(usage_line(zero_arg), vec![3], "bare P resolves to the 0-arg overload");
}

#[test]
fn definition_is_unique_per_site() {
    let text = "proc A {} {}\nproc A {} {}\nnamespace eval N { proc A {} {} }\n";
    let index = indexed(text);

    for proc in index.procs.iter() {
        let definitions: Vec<_> = index
            .procs
            .references_to(proc.id)
            .filter(|r| r.kind == ReferenceKind::Definition)
            .collect();
        assert_eq!(definitions.len(), 1, "one definition for {}", proc.name);
    }
    assert_eq!(index.procs.len(), 3);
}

#[test]
fn mixed_source_from_real_script() {
    // Adapted from a real exploratory script: comments, nested defs,
    // namespace blocks, qualified names, and broken stretches.
    let text = r#"
# Comment
proc Test { a b
           { c
             def } } {
  puts "This is a command"
  set cmd "Test"
  puts "And [$cmd test]"
}

Test test test test

# A proc which defines another proc
proc ProcInAProc {} {
  proc Parc { a {b ""} args } {
    puts "test"
  }
}

This is [$a test

namespace eval Test {
  proc Toast { } {
  }
  proc ::Tasty {} {}

  proc XYZ::Testing {} {
    proc This_Should_Be_In_XYZ_Right {} {}
  }
}

proc ::Toast {} {}
proc Test::Abort {} {
  set X "test"
  set Y [$X eatpies {*}$X]
  set Z {*}$Y
  set A $X
}
"#;
    let index = indexed(text);

    // Test has 3 arguments: a, b, {c def}.
    let test = index.procs.get(index.procs.ids_by_name("Test")[0]);
    assert_eq!(test.required_args, 2);
    assert_eq!(test.optional_args, 1);
    assert!(!test.is_variadic);
    assert_eq!(test.doc.as_deref(), Some("Comment"));

    // `Test test test test` supplies 3 words; optionals absorb at most 3.
    let usages: Vec<_> =
        index.procs.references_to(test.id).filter(|r| r.kind == ReferenceKind::Usage).collect();
    assert_eq!(usages.len(), 1);

    // Nested definition discovered, in the global namespace.
    let parc = index.procs.get(index.procs.ids_by_name("Parc")[0]);
    assert_eq!(parc.parent_namespace, index.global_namespace);
    assert!(parc.is_variadic);

    // Namespace-qualified and absolute definitions land where they say.
    let ns_test = index.find_namespace("::Test").expect("namespace Test");
    let toast_ids = index.procs.ids_by_name("Toast");
    assert_eq!(toast_ids.len(), 2);
    let parents: Vec<_> =
        toast_ids.iter().map(|&id| index.procs.get(id).parent_namespace).collect();
    assert!(parents.contains(&ns_test));
    assert!(parents.contains(&index.global_namespace));

    let tasty = index.procs.get(index.procs.ids_by_name("Tasty")[0]);
    assert_eq!(tasty.parent_namespace, index.global_namespace);

    // XYZ::Testing inside `namespace eval Test` creates Test::XYZ.
    let xyz = index.find_namespace("::Test::XYZ").expect("namespace Test::XYZ");
    let testing = index.procs.get(index.procs.ids_by_name("Testing")[0]);
    assert_eq!(testing.parent_namespace, xyz);

    // The broken `This is [$a test` line records nothing but stops nothing.
    let abort = index.procs.get(index.procs.ids_by_name("Abort")[0]);
    assert_eq!(abort.parent_namespace, ns_test);
}
