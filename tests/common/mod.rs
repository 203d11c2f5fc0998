//! Shared test support: run a program through a full indexing session and
//! inspect the resulting dump.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use tsgraph::checker::Program;
use tsgraph::emitter::{Emitter, MemoryEmitter};
use tsgraph::graph::{
    Builder, Counter, Edge, Element, EventKind, EventScope, Id, Moniker, Payload, Vertex, schema,
};
use tsgraph::indexer::{IndexerOptions, Session};
use tsgraph::linker::Linker;

pub const WORKSPACE: &str = "/work";

/// Index a single program as one project and return the dump.
pub fn run_single(program: &Program, root_files: &[&str]) -> DumpInspector {
    run_projects(&[(program, "main", root_files)])
}

/// Index several programs as successive projects in one session.
pub fn run_projects(projects: &[(&Program, &str, &[&str])]) -> DumpInspector {
    let mut emitter = MemoryEmitter::new();
    let linker = Linker::new(WORKSPACE);
    let options = IndexerOptions {
        workspace_root: WORKSPACE.to_string(),
        group_name: "work".to_string(),
        no_contents: true,
        ..IndexerOptions::default()
    };
    let mut session = Session::new(Builder::new(Box::new(Counter::new())), linker, options);

    session.begin(&mut emitter).expect("preamble emits");
    for (program, name, root_files) in projects {
        let roots: HashSet<String> = root_files.iter().map(|s| s.to_string()).collect();
        session
            .index_project(*program, &mut emitter, name, None, None, roots)
            .expect("project indexes");
    }
    session.finish(&mut emitter).expect("session finishes");
    emitter.end().expect("sink closes");

    DumpInspector::new(emitter.elements)
}

/// Parsed view over an emitted dump with §-style invariant checks.
pub struct DumpInspector {
    pub elements: Vec<Element>,
}

impl DumpInspector {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn vertices(&self) -> impl Iterator<Item = (&Id, &Vertex)> {
        self.elements.iter().filter_map(|e| match &e.data {
            Payload::Vertex(v) => Some((&e.id, v)),
            Payload::Edge(_) => None,
        })
    }

    pub fn edges(&self) -> impl Iterator<Item = (&Id, &Edge)> {
        self.elements.iter().filter_map(|e| match &e.data {
            Payload::Edge(edge) => Some((&e.id, edge)),
            Payload::Vertex(_) => None,
        })
    }

    pub fn monikers(&self) -> Vec<(Id, &Moniker)> {
        self.vertices()
            .filter_map(|(id, v)| match v {
                Vertex::Moniker(m) => Some((id.clone(), m)),
                _ => None,
            })
            .collect()
    }

    pub fn find_moniker(&self, scheme: &str, identifier: &str) -> Option<(Id, &Moniker)> {
        self.monikers()
            .into_iter()
            .find(|(_, m)| m.scheme == scheme && m.identifier == identifier)
    }

    /// The result set a moniker vertex hangs off (via the moniker edge).
    pub fn result_set_of_moniker(&self, moniker: &Id) -> Option<Id> {
        self.edges().find_map(|(_, edge)| match edge {
            Edge::Moniker(data) if &data.in_v == moniker => Some(data.out_v.clone()),
            _ => None,
        })
    }

    /// Ranges wired to a result set through next edges.
    pub fn ranges_of_result_set(&self, result_set: &Id) -> Vec<Id> {
        self.edges()
            .filter_map(|(_, edge)| match edge {
                Edge::Next(data) if &data.in_v == result_set => Some(data.out_v.clone()),
                _ => None,
            })
            .collect()
    }

    /// The reference result reachable from a result set.
    pub fn reference_result_of(&self, result_set: &Id) -> Option<Id> {
        self.edges().find_map(|(_, edge)| match edge {
            Edge::References(data) if &data.out_v == result_set => Some(data.in_v.clone()),
            _ => None,
        })
    }

    pub fn item_edges_of(&self, out_v: &Id) -> Vec<&tsgraph::graph::ItemEdge> {
        self.edges()
            .filter_map(|(_, edge)| match edge {
                Edge::Item(item) if &item.out_v == out_v => Some(item),
                _ => None,
            })
            .collect()
    }

    pub fn range_vertex(&self, id: &Id) -> Option<&Vertex> {
        self.vertices()
            .find(|(vid, v)| *vid == id && matches!(v, Vertex::Range { .. }))
            .map(|(_, v)| v)
    }

    /// Document vertex id by URI suffix.
    pub fn document_by_suffix(&self, suffix: &str) -> Option<Id> {
        self.vertices().find_map(|(id, v)| match v {
            Vertex::Document(doc) if doc.uri.ends_with(suffix) => Some(id.clone()),
            _ => None,
        })
    }

    /// Check the dump-wide invariants: unique monotonic ids, edges only
    /// referencing already-emitted vertices, schema-legal edge shapes, and
    /// exactly one end event per begin event.
    pub fn assert_valid(&self) {
        let mut seen: HashMap<Id, &'static str> = HashMap::new();
        let mut last_number: Option<u32> = None;

        for element in &self.elements {
            if let Id::Number(n) = &element.id {
                if let Some(previous) = last_number {
                    assert!(
                        *n > previous,
                        "ids must be strictly monotonic: {n} after {previous}"
                    );
                }
                last_number = Some(*n);
            }
            assert!(
                !seen.contains_key(&element.id),
                "duplicate id {} in dump",
                element.id
            );

            match &element.data {
                Payload::Vertex(vertex) => {
                    seen.insert(element.id.clone(), vertex.label());
                }
                Payload::Edge(edge) => {
                    schema::validate(edge, |id| seen.get(id).copied())
                        .unwrap_or_else(|error| panic!("illegal edge in dump: {error}"));
                    seen.insert(element.id.clone(), "edge");
                }
            }
        }

        self.assert_events_balanced();
    }

    fn assert_events_balanced(&self) {
        let mut open: HashMap<(EventScope, Id), usize> = HashMap::new();
        for (_, vertex) in self.vertices() {
            if let Vertex::Event(event) = vertex {
                let key = (event.scope, event.data.clone());
                match event.kind {
                    EventKind::Begin => {
                        *open.entry(key).or_insert(0) += 1;
                    }
                    EventKind::End => {
                        let count = open.get_mut(&key).unwrap_or_else(|| {
                            panic!("end event without begin for {:?}", event.data)
                        });
                        assert!(*count > 0, "double end event for {:?}", event.data);
                        *count -= 1;
                    }
                }
            }
        }
        for ((scope, data), count) in open {
            assert_eq!(count, 0, "unbalanced {scope:?} events for {data}");
        }
    }
}
