//! LSIF graph model: bit-exact vertex and edge value types.
//!
//! Pure data. Every shape serializes to the exact JSON the Language Server
//! Index Format prescribes (newer protocol revision: `source` and
//! `capabilities` vertices, `group` uniqueness, `shard`-tagged item edges).
//! Id allocation lives in [`builder`]; shape legality in [`schema`].

pub mod builder;
pub mod schema;

pub use builder::{Builder, Counter, IdGenerator, UuidGenerator};

use crate::types::LsRange;
use serde::{Deserialize, Serialize};

/// Graph identifier: a monotonically increasing number or a random token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u32),
    Uuid(uuid::Uuid),
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{n}"),
            Id::Uuid(u) => write!(f, "{u}"),
        }
    }
}

/// One emitted element of the dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: Id,
    #[serde(flatten)]
    pub data: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Payload {
    Vertex(Vertex),
    Edge(Edge),
}

// ---------------------------------------------------------------------------
// Vertices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "camelCase")]
pub enum Vertex {
    MetaData(MetaData),
    #[serde(rename = "$event")]
    Event(Event),
    Source(Source),
    Capabilities(Capabilities),
    Project(Project),
    Document(Document),
    Location {
        uri: String,
        range: LsRange,
    },
    Range {
        #[serde(flatten)]
        range: LsRange,
        #[serde(skip_serializing_if = "Option::is_none")]
        tag: Option<RangeTag>,
    },
    ResultSet(ResultSet),
    Moniker(Moniker),
    PackageInformation(PackageInformation),
    DocumentSymbolResult {
        result: Vec<RangeBasedDocumentSymbol>,
    },
    FoldingRangeResult {
        result: Vec<FoldingRange>,
    },
    DocumentLinkResult {
        result: Vec<DocumentLink>,
    },
    DiagnosticResult {
        result: Vec<Diagnostic>,
    },
    DeclarationResult,
    DefinitionResult,
    TypeDefinitionResult,
    HoverResult {
        result: Hover,
    },
    ReferenceResult,
    ImplementationResult,
}

impl Vertex {
    /// Wire label of this vertex, used by the schema validator.
    pub fn label(&self) -> &'static str {
        match self {
            Vertex::MetaData(_) => "metaData",
            Vertex::Event(_) => "$event",
            Vertex::Source(_) => "source",
            Vertex::Capabilities(_) => "capabilities",
            Vertex::Project(_) => "project",
            Vertex::Document(_) => "document",
            Vertex::Location { .. } => "location",
            Vertex::Range { .. } => "range",
            Vertex::ResultSet(_) => "resultSet",
            Vertex::Moniker(_) => "moniker",
            Vertex::PackageInformation(_) => "packageInformation",
            Vertex::DocumentSymbolResult { .. } => "documentSymbolResult",
            Vertex::FoldingRangeResult { .. } => "foldingRangeResult",
            Vertex::DocumentLinkResult { .. } => "documentLinkResult",
            Vertex::DiagnosticResult { .. } => "diagnosticResult",
            Vertex::DeclarationResult => "declarationResult",
            Vertex::DefinitionResult => "definitionResult",
            Vertex::TypeDefinitionResult => "typeDefinitionResult",
            Vertex::HoverResult { .. } => "hoverResult",
            Vertex::ReferenceResult => "referenceResult",
            Vertex::ImplementationResult => "implementationResult",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    /// LSIF format version, semver notation.
    pub version: String,
    /// The project root (as a URI) used to compute this dump.
    pub project_root: String,
    pub position_encoding: Encoding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_info: Option<ToolInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "utf-16")]
    Utf16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Workspace-level vertex of the newer protocol revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub workspace_root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub hover_provider: bool,
    pub declaration_provider: bool,
    pub definition_provider: bool,
    pub type_definition_provider: bool,
    pub references_provider: bool,
    pub document_symbol_provider: bool,
    pub folding_range_provider: bool,
    pub diagnostic_provider: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Base64-encoded project file body, omitted with `--noContents`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub uri: String,
    pub language_id: String,
    /// Base64-encoded source body, omitted with `--noContents`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(tag = "type")]
pub enum RangeTag {
    Definition {
        text: String,
        kind: u8,
        full_range: LsRange,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Declaration {
        text: String,
        kind: u8,
        full_range: LsRange,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Reference {
        text: String,
    },
    Unknown {
        text: String,
    },
}

/// How widely a moniker identifier is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UniquenessLevel {
    Document,
    Project,
    Group,
    Scheme,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonikerKind {
    Import,
    Export,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moniker {
    pub scheme: String,
    pub identifier: String,
    pub unique: UniquenessLevel,
    pub kind: MonikerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(rename = "type")]
    pub repo_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInformation {
    pub name: String,
    pub manager: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventScope {
    Project,
    Document,
    MonikerAttach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Begin,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub scope: EventScope,
    pub kind: EventKind,
    pub data: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBasedDocumentSymbol {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RangeBasedDocumentSymbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldingRange {
    pub start_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_character: Option<u32>,
    pub end_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_character: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub range: LsRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Serializes as the numeric LSP severity code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl serde::Serialize for DiagnosticSeverity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> serde::Deserialize<'de> for DiagnosticSeverity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            1 => Ok(DiagnosticSeverity::Error),
            2 => Ok(DiagnosticSeverity::Warning),
            3 => Ok(DiagnosticSeverity::Information),
            4 => Ok(DiagnosticSeverity::Hint),
            other => Err(serde::de::Error::custom(format!(
                "invalid diagnostic severity {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: LsRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<DiagnosticSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkedString {
    Plain(String),
    Code { language: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hover {
    pub contents: Vec<MarkedString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<LsRange>,
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "camelCase")]
pub enum Edge {
    Contains(MultiEdge),
    Next(SingleEdge),
    Item(ItemEdge),
    Moniker(SingleEdge),
    Attach(SingleEdge),
    PackageInformation(SingleEdge),
    #[serde(rename = "textDocument/documentSymbol")]
    DocumentSymbol(SingleEdge),
    #[serde(rename = "textDocument/foldingRange")]
    FoldingRange(SingleEdge),
    #[serde(rename = "textDocument/documentLink")]
    DocumentLink(SingleEdge),
    #[serde(rename = "textDocument/diagnostic")]
    Diagnostic(SingleEdge),
    #[serde(rename = "textDocument/definition")]
    Definition(SingleEdge),
    #[serde(rename = "textDocument/declaration")]
    Declaration(SingleEdge),
    #[serde(rename = "textDocument/typeDefinition")]
    TypeDefinition(SingleEdge),
    #[serde(rename = "textDocument/hover")]
    Hover(SingleEdge),
    #[serde(rename = "textDocument/references")]
    References(SingleEdge),
    #[serde(rename = "textDocument/implementation")]
    Implementation(SingleEdge),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleEdge {
    pub out_v: Id,
    pub in_v: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiEdge {
    pub out_v: Id,
    pub in_vs: Vec<Id>,
}

/// Shard-tagged 1:N edge connecting a result to its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEdge {
    pub out_v: Id,
    pub in_vs: Vec<Id>,
    pub shard: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<ItemProperty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemProperty {
    Declarations,
    Definitions,
    References,
    ReferenceResults,
    ReferenceLinks,
    ImplementationResults,
    ImplementationLinks,
}

impl Edge {
    pub fn label(&self) -> &'static str {
        match self {
            Edge::Contains(_) => "contains",
            Edge::Next(_) => "next",
            Edge::Item(_) => "item",
            Edge::Moniker(_) => "moniker",
            Edge::Attach(_) => "attach",
            Edge::PackageInformation(_) => "packageInformation",
            Edge::DocumentSymbol(_) => "textDocument/documentSymbol",
            Edge::FoldingRange(_) => "textDocument/foldingRange",
            Edge::DocumentLink(_) => "textDocument/documentLink",
            Edge::Diagnostic(_) => "textDocument/diagnostic",
            Edge::Definition(_) => "textDocument/definition",
            Edge::Declaration(_) => "textDocument/declaration",
            Edge::TypeDefinition(_) => "textDocument/typeDefinition",
            Edge::Hover(_) => "textDocument/hover",
            Edge::References(_) => "textDocument/references",
            Edge::Implementation(_) => "textDocument/implementation",
        }
    }

    pub fn out_v(&self) -> &Id {
        match self {
            Edge::Contains(e) => &e.out_v,
            Edge::Item(e) => &e.out_v,
            Edge::Next(e)
            | Edge::Moniker(e)
            | Edge::Attach(e)
            | Edge::PackageInformation(e)
            | Edge::DocumentSymbol(e)
            | Edge::FoldingRange(e)
            | Edge::DocumentLink(e)
            | Edge::Diagnostic(e)
            | Edge::Definition(e)
            | Edge::Declaration(e)
            | Edge::TypeDefinition(e)
            | Edge::Hover(e)
            | Edge::References(e)
            | Edge::Implementation(e) => &e.out_v,
        }
    }

    /// All inbound vertex ids, regardless of cardinality.
    pub fn in_ids(&self) -> Vec<&Id> {
        match self {
            Edge::Contains(e) => e.in_vs.iter().collect(),
            Edge::Item(e) => e.in_vs.iter().collect(),
            Edge::Next(e)
            | Edge::Moniker(e)
            | Edge::Attach(e)
            | Edge::PackageInformation(e)
            | Edge::DocumentSymbol(e)
            | Edge::FoldingRange(e)
            | Edge::DocumentLink(e)
            | Edge::Diagnostic(e)
            | Edge::Definition(e)
            | Edge::Declaration(e)
            | Edge::TypeDefinition(e)
            | Edge::Hover(e)
            | Edge::References(e)
            | Edge::Implementation(e) => vec![&e.in_v],
        }
    }
}

impl Element {
    pub fn as_vertex(&self) -> Option<&Vertex> {
        match &self.data {
            Payload::Vertex(v) => Some(v),
            Payload::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match &self.data {
            Payload::Edge(e) => Some(e),
            Payload::Vertex(_) => None,
        }
    }
}
