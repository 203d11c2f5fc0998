//! Multi-project runs: shared group files index once and their symbol data
//! survives across project generations.

mod common;

use common::run_projects;
use tsgraph::checker::{NodeKind, Program, ProgramBuilder, SymbolFlags};
use tsgraph::graph::{EventKind, EventScope, ItemProperty, Payload, Vertex};
use tsgraph::types::Span;

const SHARED_TEXT: &str = "export function util() {}";

/// Adds `/work/shared.ts` with `export function util() {}`.
fn add_shared_file(b: &mut ProgramBuilder) -> tsgraph::types::SymId {
    let file = b.add_file("/work/shared.ts", SHARED_TEXT);
    let module = b.add_symbol(SymbolFlags::VALUE_MODULE, "\"/work/shared\"");
    b.mark_module(file, module);
    let root = b.root_node(file);
    let func = b.add_node(file, NodeKind::FunctionDeclaration, Span::new(0, 25));
    b.child(root, func);
    let util = b.add_symbol(SymbolFlags::FUNCTION, "util");
    b.add_declaration(util, func);
    let name = b.ident(file, func, Span::new(16, 20), "util", Some(util));
    b.set_name(func, name);
    b.add_export(module, "util", util);
    util
}

/// A project whose root file references `util` from the shared file.
fn project_program(root_path: &str, text: &str, call_span: Span) -> Program {
    let mut b = ProgramBuilder::new("/work");
    let file = b.add_file(root_path, text);
    let module = b.add_symbol(SymbolFlags::VALUE_MODULE, format!("\"{root_path}\""));
    b.mark_module(file, module);
    let root = b.root_node(file);
    let util = add_shared_file(&mut b);
    b.ident(file, root, call_span, "util", Some(util));
    b.build()
}

#[test]
fn test_shared_file_indexes_once_across_projects() {
    let program_a = project_program("/work/p1/a.ts", "util();", Span::new(0, 4));
    let program_b = project_program("/work/p2/b.ts", "util();", Span::new(0, 4));

    let dump = run_projects(&[
        (&program_a, "p1", &["/work/p1/a.ts"]),
        (&program_b, "p2", &["/work/p2/b.ts"]),
    ]);
    dump.assert_valid();

    // Exactly one document vertex for the shared file.
    let shared_documents = dump
        .vertices()
        .filter(|(_, v)| matches!(v, Vertex::Document(doc) if doc.uri.ends_with("shared.ts")))
        .count();
    assert_eq!(shared_documents, 1);

    // One moniker and one result set for util, shared by both projects.
    let util_monikers: Vec<_> = dump
        .monikers()
        .into_iter()
        .filter(|(_, m)| m.identifier == "shared:util")
        .collect();
    assert_eq!(util_monikers.len(), 1);

    let (moniker_id, _) = &util_monikers[0];
    let result_set = dump.result_set_of_moniker(moniker_id).unwrap();
    let reference_result = dump.reference_result_of(&result_set).unwrap();

    // References land in both project root documents, each item edge tagged
    // with its own shard.
    let doc_a = dump.document_by_suffix("p1/a.ts").unwrap();
    let doc_b = dump.document_by_suffix("p2/b.ts").unwrap();
    let items = dump.item_edges_of(&reference_result);
    let reference_shards: Vec<_> = items
        .iter()
        .filter(|item| item.property == Some(ItemProperty::References))
        .map(|item| item.shard.clone())
        .collect();
    assert!(reference_shards.contains(&doc_a));
    assert!(reference_shards.contains(&doc_b));
}

#[test]
fn test_two_project_generations_emit_balanced_events() {
    let program_a = project_program("/work/p1/a.ts", "util();", Span::new(0, 4));
    let program_b = project_program("/work/p2/b.ts", "util();", Span::new(0, 4));

    let dump = run_projects(&[
        (&program_a, "p1", &["/work/p1/a.ts"]),
        (&program_b, "p2", &["/work/p2/b.ts"]),
    ]);

    let project_events: Vec<(EventKind, _)> = dump
        .elements
        .iter()
        .filter_map(|e| match &e.data {
            Payload::Vertex(Vertex::Event(event)) if event.scope == EventScope::Project => {
                Some((event.kind, event.data.clone()))
            }
            _ => None,
        })
        .collect();

    let begins = project_events
        .iter()
        .filter(|(kind, _)| *kind == EventKind::Begin)
        .count();
    let ends = project_events
        .iter()
        .filter(|(kind, _)| *kind == EventKind::End)
        .count();
    assert_eq!(begins, ends);
    // Two tsconfig projects plus the lazily begun group manager.
    assert!(begins >= 3, "expected tsconfig and group projects, got {begins}");
}

#[test]
fn test_project_names_surface_on_project_vertices() {
    let program_a = project_program("/work/p1/a.ts", "util();", Span::new(0, 4));
    let dump = run_projects(&[(&program_a, "p1", &["/work/p1/a.ts"])]);

    let names: Vec<_> = dump
        .vertices()
        .filter_map(|(_, v)| match v {
            Vertex::Project(project) => project.name.clone(),
            _ => None,
        })
        .collect();
    assert!(names.contains(&"p1".to_string()));
    assert!(names.contains(&"work".to_string()), "group manager begun lazily");
}
