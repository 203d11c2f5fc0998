//! Programmatic assembly of checked-program snapshots.
//!
//! Front ends use this to serialize their arenas; the test suite uses it to
//! build small programs without a compiler in the loop.

use super::{
    CompilerOptions, DiagnosticCategory, DiagnosticInfo, Node, NodeKind, OutliningSpan, Program,
    QuickInfo, QuickInfoEntry, SourceFile, SymbolFlags, SymbolInfo, TypeFlags, TypeInfo,
};
use crate::types::{FileIdx, NodeId, Span, SymId, TypeId};

pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new(common_source_directory: impl Into<String>) -> Self {
        Self {
            program: Program {
                common_source_directory: common_source_directory.into(),
                ..Program::default()
            },
        }
    }

    pub fn set_options(&mut self, options: CompilerOptions) -> &mut Self {
        self.program.options = options;
        self
    }

    pub fn add_ambient_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.program.ambient_modules.push(name.into());
        self
    }

    /// Register a source file. Creates the root `SourceFile` node and
    /// computes line starts from the text.
    pub fn add_file(&mut self, file_name: impl Into<String>, text: impl Into<String>) -> FileIdx {
        let file_name = file_name.into();
        let text = text.into();
        let file = FileIdx::from_index(self.program.files.len());

        let mut line_starts = vec![0u32];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }

        let root = NodeId::from_index(self.program.nodes.len());
        self.program.nodes.push(Node {
            kind: NodeKind::SourceFile,
            file,
            span: Span::new(0, text.len() as u32),
            name: None,
            children: Vec::new(),
            symbol: None,
            ty: None,
            text: None,
        });

        self.program.root_file_names.push(file_name.clone());
        self.program.files.push(SourceFile {
            file_name,
            text,
            line_starts,
            node: root,
            symbol: None,
            is_default_library: false,
            is_external_library: false,
            syntactic_diagnostics: Vec::new(),
            semantic_diagnostics: Vec::new(),
            outlining_spans: Vec::new(),
            quick_infos: Vec::new(),
        });
        file
    }

    pub fn root_node(&self, file: FileIdx) -> NodeId {
        self.program.files[file.index()].node
    }

    /// Attach a module symbol, turning the file into an external module.
    pub fn mark_module(&mut self, file: FileIdx, symbol: SymId) -> &mut Self {
        self.program.files[file.index()].symbol = Some(symbol);
        let root = self.program.files[file.index()].node;
        self.program.nodes[root.index()].symbol = Some(symbol);
        self
    }

    pub fn mark_default_library(&mut self, file: FileIdx) -> &mut Self {
        self.program.files[file.index()].is_default_library = true;
        self
    }

    pub fn mark_external_library(&mut self, file: FileIdx) -> &mut Self {
        self.program.files[file.index()].is_external_library = true;
        self
    }

    pub fn add_node(&mut self, file: FileIdx, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId::from_index(self.program.nodes.len());
        self.program.nodes.push(Node {
            kind,
            file,
            span,
            name: None,
            children: Vec::new(),
            symbol: None,
            ty: None,
            text: None,
        });
        id
    }

    /// Append `child` under `parent`, preserving source order.
    pub fn child(&mut self, parent: NodeId, child: NodeId) -> &mut Self {
        self.program.nodes[parent.index()].children.push(child);
        self
    }

    /// Identifier node with its token text, linked under `parent`.
    pub fn ident(
        &mut self,
        file: FileIdx,
        parent: NodeId,
        span: Span,
        text: impl Into<String>,
        symbol: Option<SymId>,
    ) -> NodeId {
        let id = self.add_node(file, NodeKind::Identifier, span);
        self.program.nodes[id.index()].text = Some(text.into());
        self.program.nodes[id.index()].symbol = symbol;
        self.child(parent, id);
        id
    }

    pub fn set_name(&mut self, node: NodeId, name: NodeId) -> &mut Self {
        self.program.nodes[node.index()].name = Some(name);
        self
    }

    pub fn set_node_symbol(&mut self, node: NodeId, symbol: SymId) -> &mut Self {
        self.program.nodes[node.index()].symbol = Some(symbol);
        self
    }

    pub fn set_node_type(&mut self, node: NodeId, ty: TypeId) -> &mut Self {
        self.program.nodes[node.index()].ty = Some(ty);
        self
    }

    pub fn add_symbol(&mut self, flags: SymbolFlags, name: impl Into<String>) -> SymId {
        let name = name.into();
        let id = SymId::from_index(self.program.symbols.len());
        self.program.symbols.push(SymbolInfo {
            flags,
            escaped_name: name.clone(),
            name,
            declarations: Vec::new(),
            value_declaration: None,
            members: indexmap::IndexMap::new(),
            exports: indexmap::IndexMap::new(),
            parent: None,
            aliased: None,
            roots: Vec::new(),
            value_type: None,
        });
        id
    }

    /// Record `node` as a declaration of `symbol` and bind the node back.
    pub fn add_declaration(&mut self, symbol: SymId, node: NodeId) -> &mut Self {
        let info = &mut self.program.symbols[symbol.index()];
        info.declarations.push(node);
        if info.value_declaration.is_none() {
            info.value_declaration = Some(node);
        }
        let node_info = &mut self.program.nodes[node.index()];
        if node_info.symbol.is_none() {
            node_info.symbol = Some(symbol);
        }
        self
    }

    pub fn add_export(
        &mut self,
        container: SymId,
        name: impl Into<String>,
        symbol: SymId,
    ) -> &mut Self {
        self.program.symbols[container.index()]
            .exports
            .insert(name.into(), symbol);
        if self.program.symbols[symbol.index()].parent.is_none() {
            self.program.symbols[symbol.index()].parent = Some(container);
        }
        self
    }

    pub fn add_member(
        &mut self,
        container: SymId,
        name: impl Into<String>,
        symbol: SymId,
    ) -> &mut Self {
        self.program.symbols[container.index()]
            .members
            .insert(name.into(), symbol);
        if self.program.symbols[symbol.index()].parent.is_none() {
            self.program.symbols[symbol.index()].parent = Some(container);
        }
        self
    }

    pub fn set_aliased(&mut self, symbol: SymId, target: SymId) -> &mut Self {
        self.program.symbols[symbol.index()].aliased = Some(target);
        self
    }

    pub fn set_roots(&mut self, symbol: SymId, roots: Vec<SymId>) -> &mut Self {
        self.program.symbols[symbol.index()].roots = roots;
        self
    }

    pub fn set_symbol_type(&mut self, symbol: SymId, ty: TypeId) -> &mut Self {
        self.program.symbols[symbol.index()].value_type = Some(ty);
        self
    }

    pub fn set_escaped_name(&mut self, symbol: SymId, escaped: impl Into<String>) -> &mut Self {
        self.program.symbols[symbol.index()].escaped_name = escaped.into();
        self
    }

    pub fn add_type(&mut self, flags: TypeFlags) -> TypeId {
        let id = TypeId::from_index(self.program.types.len());
        self.program.types.push(TypeInfo {
            flags,
            ..TypeInfo::default()
        });
        id
    }

    pub fn type_mut(&mut self, ty: TypeId) -> &mut TypeInfo {
        &mut self.program.types[ty.index()]
    }

    pub fn symbol_mut(&mut self, symbol: SymId) -> &mut SymbolInfo {
        &mut self.program.symbols[symbol.index()]
    }

    pub fn add_quick_info(
        &mut self,
        file: FileIdx,
        offset: u32,
        display: impl Into<String>,
    ) -> &mut Self {
        self.program.files[file.index()].quick_infos.push(QuickInfoEntry {
            offset,
            info: Some(QuickInfo {
                display: display.into(),
                documentation: None,
            }),
            fails: false,
        });
        self
    }

    /// Model the analyser bug where quick info throws at this position.
    pub fn add_failing_quick_info(&mut self, file: FileIdx, offset: u32) -> &mut Self {
        self.program.files[file.index()].quick_infos.push(QuickInfoEntry {
            offset,
            info: None,
            fails: true,
        });
        self
    }

    pub fn add_syntactic_diagnostic(&mut self, file: FileIdx, diagnostic: DiagnosticInfo) -> &mut Self {
        self.program.files[file.index()]
            .syntactic_diagnostics
            .push(diagnostic);
        self
    }

    pub fn add_semantic_diagnostic(&mut self, file: FileIdx, diagnostic: DiagnosticInfo) -> &mut Self {
        self.program.files[file.index()]
            .semantic_diagnostics
            .push(diagnostic);
        self
    }

    pub fn add_outlining_span(&mut self, file: FileIdx, span: Span, kind: Option<String>) -> &mut Self {
        self.program.files[file.index()]
            .outlining_spans
            .push(OutliningSpan { span, kind });
        self
    }

    pub fn diagnostic(
        span: Span,
        category: DiagnosticCategory,
        code: u32,
        message: impl Into<String>,
    ) -> DiagnosticInfo {
        DiagnosticInfo {
            span,
            category,
            code,
            message: message.into(),
        }
    }

    pub fn build(self) -> Program {
        self.program
    }
}
