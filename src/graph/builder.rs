//! Id-allocating factories for graph elements.
//!
//! Every vertex and edge is minted here so id allocation stays in one place:
//! a single mutable generator owned by the driver, per the single-threaded
//! resource model.

use super::{
    Capabilities, Diagnostic, Document, Edge, Element, Encoding, Event, EventKind, EventScope,
    FoldingRange, Hover, Id, ItemEdge, ItemProperty, MetaData, Moniker, MonikerKind, MultiEdge,
    PackageInformation, Payload, Project, RangeBasedDocumentSymbol, RangeTag, ResultSet,
    SingleEdge, Source, ToolInfo, UniquenessLevel, Vertex,
};
use crate::types::LsRange;

/// Maximum number of inbound ids on one `contains` edge.
pub const CONTAINS_BATCH: usize = 32;

/// Source of graph ids. Exactly one generator exists per dump.
pub trait IdGenerator {
    fn next_id(&mut self) -> Id;
}

/// Monotonically increasing numeric ids, starting at 1.
#[derive(Debug, Default)]
pub struct Counter {
    current: u32,
}

impl Counter {
    pub fn new() -> Self {
        Self { current: 0 }
    }
}

impl IdGenerator for Counter {
    fn next_id(&mut self) -> Id {
        self.current += 1;
        Id::Number(self.current)
    }
}

/// Random 128-bit ids for dumps that get merged downstream.
#[derive(Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> Id {
        Id::Uuid(uuid::Uuid::new_v4())
    }
}

/// Vertex/edge factory bound to an id generator.
pub struct Builder {
    generator: Box<dyn IdGenerator>,
}

impl Builder {
    pub fn new(generator: Box<dyn IdGenerator>) -> Self {
        Self { generator }
    }

    fn vertex(&mut self, vertex: Vertex) -> Element {
        Element {
            id: self.generator.next_id(),
            data: Payload::Vertex(vertex),
        }
    }

    fn edge(&mut self, edge: Edge) -> Element {
        Element {
            id: self.generator.next_id(),
            data: Payload::Edge(edge),
        }
    }

    // -- vertices -----------------------------------------------------------

    pub fn meta_data(
        &mut self,
        project_root: String,
        tool_info: Option<ToolInfo>,
    ) -> Element {
        self.vertex(Vertex::MetaData(MetaData {
            version: "0.6.0-next.7".to_string(),
            project_root,
            position_encoding: Encoding::Utf16,
            tool_info,
        }))
    }

    pub fn source(&mut self, workspace_root: String, kind: Option<String>) -> Element {
        self.vertex(Vertex::Source(Source {
            workspace_root,
            kind,
        }))
    }

    pub fn capabilities(&mut self) -> Element {
        self.vertex(Vertex::Capabilities(Capabilities {
            hover_provider: true,
            declaration_provider: false,
            definition_provider: true,
            type_definition_provider: true,
            references_provider: true,
            document_symbol_provider: true,
            folding_range_provider: true,
            diagnostic_provider: true,
        }))
    }

    pub fn project(
        &mut self,
        name: Option<String>,
        resource: Option<String>,
        contents: Option<String>,
    ) -> Element {
        self.vertex(Vertex::Project(Project {
            kind: "typescript".to_string(),
            name,
            resource,
            contents,
        }))
    }

    pub fn document(
        &mut self,
        uri: String,
        language_id: String,
        contents: Option<String>,
    ) -> Element {
        self.vertex(Vertex::Document(Document {
            uri,
            language_id,
            contents,
        }))
    }

    pub fn range(&mut self, range: LsRange, tag: Option<RangeTag>) -> Element {
        self.vertex(Vertex::Range { range, tag })
    }

    pub fn result_set(&mut self) -> Element {
        self.vertex(Vertex::ResultSet(ResultSet { key: None }))
    }

    pub fn moniker(
        &mut self,
        scheme: &str,
        identifier: String,
        unique: UniquenessLevel,
        kind: MonikerKind,
    ) -> Element {
        self.vertex(Vertex::Moniker(Moniker {
            scheme: scheme.to_string(),
            identifier,
            unique,
            kind,
        }))
    }

    pub fn package_information(&mut self, info: PackageInformation) -> Element {
        self.vertex(Vertex::PackageInformation(info))
    }

    pub fn event(&mut self, scope: EventScope, kind: EventKind, data: Id) -> Element {
        self.vertex(Vertex::Event(Event { scope, kind, data }))
    }

    pub fn definition_result(&mut self) -> Element {
        self.vertex(Vertex::DefinitionResult)
    }

    pub fn declaration_result(&mut self) -> Element {
        self.vertex(Vertex::DeclarationResult)
    }

    pub fn type_definition_result(&mut self) -> Element {
        self.vertex(Vertex::TypeDefinitionResult)
    }

    pub fn reference_result(&mut self) -> Element {
        self.vertex(Vertex::ReferenceResult)
    }

    pub fn implementation_result(&mut self) -> Element {
        self.vertex(Vertex::ImplementationResult)
    }

    pub fn hover_result(&mut self, result: Hover) -> Element {
        self.vertex(Vertex::HoverResult { result })
    }

    pub fn document_symbol_result(
        &mut self,
        result: Vec<RangeBasedDocumentSymbol>,
    ) -> Element {
        self.vertex(Vertex::DocumentSymbolResult { result })
    }

    pub fn folding_range_result(&mut self, result: Vec<FoldingRange>) -> Element {
        self.vertex(Vertex::FoldingRangeResult { result })
    }

    pub fn diagnostic_result(&mut self, result: Vec<Diagnostic>) -> Element {
        self.vertex(Vertex::DiagnosticResult { result })
    }

    // -- edges --------------------------------------------------------------

    /// Splits the children into `contains` edges of at most
    /// [`CONTAINS_BATCH`] targets each.
    pub fn contains(&mut self, parent: Id, children: &[Id]) -> Vec<Element> {
        children
            .chunks(CONTAINS_BATCH)
            .map(|chunk| {
                self.edge(Edge::Contains(MultiEdge {
                    out_v: parent.clone(),
                    in_vs: chunk.to_vec(),
                }))
            })
            .collect()
    }

    pub fn next(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::Next(SingleEdge { out_v, in_v }))
    }

    pub fn item(
        &mut self,
        out_v: Id,
        in_vs: Vec<Id>,
        shard: Id,
        property: Option<ItemProperty>,
    ) -> Element {
        self.edge(Edge::Item(ItemEdge {
            out_v,
            in_vs,
            shard,
            property,
        }))
    }

    pub fn moniker_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::Moniker(SingleEdge { out_v, in_v }))
    }

    pub fn attach(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::Attach(SingleEdge { out_v, in_v }))
    }

    pub fn package_information_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::PackageInformation(SingleEdge { out_v, in_v }))
    }

    pub fn definition_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::Definition(SingleEdge { out_v, in_v }))
    }

    pub fn type_definition_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::TypeDefinition(SingleEdge { out_v, in_v }))
    }

    pub fn references_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::References(SingleEdge { out_v, in_v }))
    }

    pub fn implementation_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::Implementation(SingleEdge { out_v, in_v }))
    }

    pub fn hover_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::Hover(SingleEdge { out_v, in_v }))
    }

    pub fn document_symbol_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::DocumentSymbol(SingleEdge { out_v, in_v }))
    }

    pub fn folding_range_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::FoldingRange(SingleEdge { out_v, in_v }))
    }

    pub fn diagnostic_edge(&mut self, out_v: Id, in_v: Id) -> Element {
        self.edge(Edge::Diagnostic(SingleEdge { out_v, in_v }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_monotonic_from_one() {
        let mut counter = Counter::new();
        assert_eq!(counter.next_id(), Id::Number(1));
        assert_eq!(counter.next_id(), Id::Number(2));
        assert_eq!(counter.next_id(), Id::Number(3));
    }

    #[test]
    fn test_uuid_generator_yields_unique_ids() {
        let mut generator = UuidGenerator;
        let a = generator.next_id();
        let b = generator.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_contains_batches_at_32() {
        let mut builder = Builder::new(Box::new(Counter::new()));
        let parent = Id::Number(999);
        let children: Vec<Id> = (1..=70).map(Id::Number).collect();
        let edges = builder.contains(parent, &children);
        assert_eq!(edges.len(), 3);

        let sizes: Vec<usize> = edges
            .iter()
            .map(|e| e.as_edge().unwrap().in_ids().len())
            .collect();
        assert_eq!(sizes, vec![32, 32, 6]);
    }

    #[test]
    fn test_builder_allocates_fresh_ids() {
        let mut builder = Builder::new(Box::new(Counter::new()));
        let a = builder.result_set();
        let b = builder.result_set();
        assert_eq!(a.id, Id::Number(1));
        assert_eq!(b.id, Id::Number(2));
    }
}
