//! Contract with the external semantic analyser.
//!
//! The indexer never type-checks. It consumes a *checked program snapshot*:
//! arena-allocated syntax nodes, symbols, and types exported by a compiler
//! front end, plus the query surface the engine needs ([`SemanticHost`]).
//! [`Program`] is the serializable snapshot and the only host shipped with
//! the crate; [`builder::ProgramBuilder`] assembles one programmatically.

pub mod builder;
pub mod flags;

pub use builder::ProgramBuilder;
pub use flags::{SymbolFlags, TypeFlags};

use crate::types::{FileIdx, LsPosition, LsRange, NodeId, Span, SymId, TypeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Syntax node kinds the indexing driver dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    SourceFile,
    ModuleDeclaration,
    ClassDeclaration,
    ClassExpression,
    InterfaceDeclaration,
    TypeAliasDeclaration,
    FunctionDeclaration,
    MethodDeclaration,
    MethodSignature,
    CallSignature,
    IndexSignature,
    Constructor,
    GetAccessor,
    SetAccessor,
    PropertyDeclaration,
    PropertySignature,
    Parameter,
    TypeParameter,
    VariableStatement,
    VariableDeclaration,
    ExportAssignment,
    ExportDeclaration,
    ExportSpecifier,
    ImportDeclaration,
    ImportSpecifier,
    ArrayType,
    Identifier,
    StringLiteral,
    Block,
}

impl NodeKind {
    /// Container kinds that open a scope on the document-symbol stack.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeKind::ModuleDeclaration
                | NodeKind::ClassDeclaration
                | NodeKind::ClassExpression
                | NodeKind::InterfaceDeclaration
                | NodeKind::TypeAliasDeclaration
                | NodeKind::FunctionDeclaration
                | NodeKind::MethodDeclaration
                | NodeKind::MethodSignature
                | NodeKind::Constructor
                | NodeKind::GetAccessor
                | NodeKind::SetAccessor
        )
    }
}

/// One syntax node of the checked tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub file: FileIdx,
    pub span: Span,
    /// The name identifier child, when the node is a named declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    /// Symbol the analyser resolved for this node, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymId>,
    /// Type the analyser computed at this node, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeId>,
    /// Token text for identifiers and string literals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Symbol record exported by the analyser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub flags: SymbolFlags,
    pub name: String,
    pub escaped_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub declarations: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_declaration: Option<NodeId>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub members: IndexMap<String, SymId>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub exports: IndexMap<String, SymId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<SymId>,
    /// Target of an alias symbol (`import`/`export` binding).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliased: Option<SymId>,
    /// Underlying root symbols for union/intersection members.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roots: Vec<SymId>,
    /// Declared type of the symbol, when the analyser computed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<TypeId>,
}

impl SymbolInfo {
    pub fn is_transient(&self) -> bool {
        self.flags.contains(SymbolFlags::TRANSIENT)
    }

    pub fn is_alias(&self) -> bool {
        self.flags.contains(SymbolFlags::ALIAS)
    }

    pub fn is_type_alias(&self) -> bool {
        self.flags.contains(SymbolFlags::TYPE_ALIAS)
    }

    pub fn is_method(&self) -> bool {
        self.flags.contains(SymbolFlags::METHOD)
    }

    pub fn is_prototype(&self) -> bool {
        self.flags.contains(SymbolFlags::PROTOTYPE)
    }

    pub fn is_type_parameter(&self) -> bool {
        self.flags.contains(SymbolFlags::TYPE_PARAMETER)
    }
}

/// Function or constructor signature of a type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<SymId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<SymId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeId>,
}

/// The four constituent types of a conditional type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalParts {
    pub check_type: TypeId,
    pub extends_type: TypeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_type: Option<TypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_type: Option<TypeId>,
}

/// Type record exported by the analyser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeInfo {
    #[serde(default)]
    pub flags: TypeFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_symbol: Option<SymId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alias_type_arguments: Vec<TypeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_arguments: Vec<TypeId>,
    /// Union or intersection constituents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constituents: Vec<TypeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_signatures: Vec<Signature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub construct_signatures: Vec<Signature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_types: Vec<TypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalParts>,
}

impl TypeInfo {
    pub fn is_callable(&self) -> bool {
        !self.call_signatures.is_empty() || !self.construct_signatures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Suggestion,
    Message,
}

/// One analyser diagnostic with its location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticInfo {
    pub span: Span,
    pub category: DiagnosticCategory,
    pub code: u32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutliningSpan {
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Hover payload from the analyser's quick-info query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickInfo {
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// Precomputed quick-info entry; `fails` models the upstream bug where the
/// query throws instead of returning nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickInfoEntry {
    pub offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<QuickInfo>,
    #[serde(default)]
    pub fails: bool,
}

/// A definition location answered by the analyser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: FileIdx,
    pub span: Span,
}

/// One source file of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_name: String,
    pub text: String,
    /// Byte offset of each line start, always starting with 0.
    pub line_starts: Vec<u32>,
    /// Root syntax node (kind `SourceFile`).
    pub node: NodeId,
    /// The module symbol, present iff the file is an external module.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymId>,
    #[serde(default)]
    pub is_default_library: bool,
    #[serde(default)]
    pub is_external_library: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub syntactic_diagnostics: Vec<DiagnosticInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub semantic_diagnostics: Vec<DiagnosticInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outlining_spans: Vec<OutliningSpan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_infos: Vec<QuickInfoEntry>,
}

impl SourceFile {
    /// Convert a byte offset into a zero-based line/character position.
    pub fn position_at(&self, offset: u32) -> LsPosition {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        LsPosition::new(line as u32, offset - self.line_starts[line])
    }

    pub fn ls_range(&self, span: Span) -> LsRange {
        LsRange::new(self.position_at(span.start), self.position_at(span.end))
    }
}

/// Compiler options subset the engine consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Raised by [`SemanticHost::quick_info_at`] when the analyser's hover query
/// throws; the driver recovers by emitting no hover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverFailed;

/// Query surface the indexing engine requires from the analyser.
pub trait SemanticHost {
    fn files(&self) -> &[SourceFile];
    fn file(&self, file: FileIdx) -> &SourceFile;
    fn node(&self, node: NodeId) -> &Node;
    fn symbol(&self, sym: SymId) -> &SymbolInfo;
    fn ty(&self, ty: TypeId) -> &TypeInfo;

    fn symbol_at(&self, node: NodeId) -> Option<SymId>;
    fn type_at(&self, node: NodeId) -> Option<TypeId>;
    fn type_of_symbol(&self, sym: SymId) -> Option<TypeId>;
    fn aliased_symbol(&self, sym: SymId) -> Option<SymId>;
    fn root_symbols(&self, sym: SymId) -> &[SymId];

    fn definition_at(&self, file: FileIdx, offset: u32) -> Vec<Location>;
    fn type_definition_at(&self, file: FileIdx, offset: u32) -> Vec<Location>;
    fn quick_info_at(&self, file: FileIdx, offset: u32)
    -> Result<Option<QuickInfo>, HoverFailed>;

    fn ambient_modules(&self) -> &[String];
    fn common_source_directory(&self) -> &str;
    fn root_file_names(&self) -> &[String];
    fn options(&self) -> &CompilerOptions;
}

/// The serializable checked-program snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub symbols: Vec<SymbolInfo>,
    #[serde(default)]
    pub types: Vec<TypeInfo>,
    #[serde(default)]
    pub ambient_modules: Vec<String>,
    #[serde(default)]
    pub common_source_directory: String,
    #[serde(default)]
    pub root_file_names: Vec<String>,
    #[serde(default)]
    pub options: CompilerOptions,
}

impl Program {
    /// Node at the exact given start offset, preferring the deepest match.
    fn node_at(&self, file: FileIdx, offset: u32) -> Option<NodeId> {
        let root = self.files[file.index()].node;
        let mut best: Option<NodeId> = None;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.index()];
            if node.span.contains(offset) || node.span.start == offset {
                if node.span.start == offset {
                    best = Some(id);
                }
                stack.extend(node.children.iter().copied());
            }
        }
        best
    }

    fn declarations_of(&self, sym: SymId) -> Vec<Location> {
        self.symbols[sym.index()]
            .declarations
            .iter()
            .map(|&decl| {
                let node = &self.nodes[decl.index()];
                Location {
                    file: node.file,
                    span: node.span,
                }
            })
            .collect()
    }
}

impl SemanticHost for Program {
    fn files(&self) -> &[SourceFile] {
        &self.files
    }

    fn file(&self, file: FileIdx) -> &SourceFile {
        &self.files[file.index()]
    }

    fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.index()]
    }

    fn symbol(&self, sym: SymId) -> &SymbolInfo {
        &self.symbols[sym.index()]
    }

    fn ty(&self, ty: TypeId) -> &TypeInfo {
        &self.types[ty.index()]
    }

    fn symbol_at(&self, node: NodeId) -> Option<SymId> {
        self.nodes[node.index()].symbol
    }

    fn type_at(&self, node: NodeId) -> Option<TypeId> {
        let node = &self.nodes[node.index()];
        node.ty
            .or_else(|| node.symbol.and_then(|sym| self.symbols[sym.index()].value_type))
    }

    fn type_of_symbol(&self, sym: SymId) -> Option<TypeId> {
        self.symbols[sym.index()].value_type
    }

    fn aliased_symbol(&self, sym: SymId) -> Option<SymId> {
        self.symbols[sym.index()].aliased
    }

    fn root_symbols(&self, sym: SymId) -> &[SymId] {
        &self.symbols[sym.index()].roots
    }

    fn definition_at(&self, file: FileIdx, offset: u32) -> Vec<Location> {
        self.node_at(file, offset)
            .and_then(|node| self.nodes[node.index()].symbol)
            .map(|sym| self.declarations_of(sym))
            .unwrap_or_default()
    }

    fn type_definition_at(&self, file: FileIdx, offset: u32) -> Vec<Location> {
        let Some(node) = self.node_at(file, offset) else {
            return Vec::new();
        };
        let Some(ty) = self.type_at(node) else {
            return Vec::new();
        };
        self.types[ty.index()]
            .symbol
            .map(|sym| self.declarations_of(sym))
            .unwrap_or_default()
    }

    fn quick_info_at(
        &self,
        file: FileIdx,
        offset: u32,
    ) -> Result<Option<QuickInfo>, HoverFailed> {
        let entry = self.files[file.index()]
            .quick_infos
            .iter()
            .find(|entry| entry.offset == offset);
        match entry {
            Some(entry) if entry.fails => Err(HoverFailed),
            Some(entry) => Ok(entry.info.clone()),
            None => Ok(None),
        }
    }

    fn ambient_modules(&self) -> &[String] {
        &self.ambient_modules
    }

    fn common_source_directory(&self) -> &str {
        &self.common_source_directory
    }

    fn root_file_names(&self) -> &[String] {
        &self.root_file_names
    }

    fn options(&self) -> &CompilerOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with_text(text: &str) -> SourceFile {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        SourceFile {
            file_name: "a.ts".to_string(),
            text: text.to_string(),
            line_starts,
            node: NodeId::from_index(0),
            symbol: None,
            is_default_library: false,
            is_external_library: false,
            syntactic_diagnostics: Vec::new(),
            semantic_diagnostics: Vec::new(),
            outlining_spans: Vec::new(),
            quick_infos: Vec::new(),
        }
    }

    #[test]
    fn test_position_at_maps_offsets_to_lines() {
        let file = file_with_text("let a = 1;\nlet b = 2;\n");
        assert_eq!(file.position_at(0), LsPosition::new(0, 0));
        assert_eq!(file.position_at(4), LsPosition::new(0, 4));
        assert_eq!(file.position_at(11), LsPosition::new(1, 0));
        assert_eq!(file.position_at(15), LsPosition::new(1, 4));
    }

    #[test]
    fn test_position_at_line_boundary() {
        let file = file_with_text("ab\ncd");
        // Offset 3 is the first character of line 1, not past line 0.
        assert_eq!(file.position_at(3), LsPosition::new(1, 0));
        assert_eq!(file.position_at(2), LsPosition::new(0, 2));
    }

    #[test]
    fn test_program_snapshot_round_trips() {
        let program = Program {
            files: vec![file_with_text("export const x = 10;")],
            nodes: vec![Node {
                kind: NodeKind::SourceFile,
                file: FileIdx::from_index(0),
                span: Span::new(0, 20),
                name: None,
                children: Vec::new(),
                symbol: None,
                ty: None,
                text: None,
            }],
            symbols: Vec::new(),
            types: Vec::new(),
            ambient_modules: Vec::new(),
            common_source_directory: "/work".to_string(),
            root_file_names: vec!["a.ts".to_string()],
            options: CompilerOptions::default(),
        };
        let json = serde_json::to_string(&program).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back.files.len(), 1);
        assert_eq!(back.root_file_names, vec!["a.ts".to_string()]);
    }
}
