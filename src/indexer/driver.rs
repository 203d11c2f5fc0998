//! Pre-order visitor that turns checked programs into the dump stream.
//!
//! A [`Session`] spans one whole run: it owns the id builder, the data
//! manager, the visibility engine, and the cross-package linker, so graph
//! ids and shared symbol data stay continuous across projects. Each project
//! snapshot is driven by a short-lived [`Indexer`] borrowing the session,
//! the project's semantic host, and the sink.

use super::document::FileState;
use crate::checker::{DiagnosticCategory, DiagnosticInfo, NodeKind, SemanticHost, SymbolFlags};
use crate::config::MonikerMode;
use crate::emitter::Emitter;
use crate::error::{IndexError, IndexResult};
use crate::graph::{
    Builder, Diagnostic, DiagnosticSeverity, FoldingRange, Hover, Id, ItemProperty, MarkedString,
    MonikerKind, RangeTag, ToolInfo, UniquenessLevel,
};
use crate::linker::Linker;
use crate::project::{DataManager, file_uri};
use crate::symbols::data::EmitCtx;
use crate::symbols::{SymbolKey, symbol_key};
use crate::types::{FileIdx, NodeId, Span, SymId};
use crate::visibility::{FlowMode, Visibility, VisibilityEngine};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

pub struct IndexerOptions {
    pub workspace_root: String,
    pub group_name: String,
    pub no_contents: bool,
    pub moniker_mode: MonikerMode,
    pub tool_args: Vec<String>,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            workspace_root: "/".to_string(),
            group_name: "workspace".to_string(),
            no_contents: false,
            moniker_mode: MonikerMode::Lenient,
            tool_args: Vec::new(),
        }
    }
}

/// Run-wide indexing state shared by every project generation.
pub struct Session {
    builder: Builder,
    manager: DataManager,
    engine: VisibilityEngine,
    linker: Linker,
    options: IndexerOptions,
    /// Symbols that already received a hover result.
    hovered: HashSet<SymbolKey>,
    /// (symbol, shard) pairs whose moniker cascade was recorded.
    cascaded: HashSet<(SymbolKey, Id)>,
    /// tsc monikers already handed to the cross-package linker.
    linked: HashSet<Id>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Session {
    pub fn new(builder: Builder, linker: Linker, options: IndexerOptions) -> Self {
        let manager = DataManager::new(&options.group_name);
        Self {
            builder,
            manager,
            engine: VisibilityEngine::new(),
            linker,
            options,
            hovered: HashSet::new(),
            cascaded: HashSet::new(),
            linked: HashSet::new(),
            cancel: None,
        }
    }

    /// Install a cancellation flag checked at source-file boundaries.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Emit the workspace preamble: metaData, source, capabilities.
    pub fn begin(&mut self, emitter: &mut dyn Emitter) -> IndexResult<()> {
        let root_uri = file_uri(&self.options.workspace_root);
        let tool_info = Some(ToolInfo {
            name: "tsgraph".to_string(),
            args: self.options.tool_args.clone(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        });
        let meta = self.builder.meta_data(root_uri.clone(), tool_info);
        emitter.emit(&meta)?;
        let source = self.builder.source(root_uri, Some("workspace".to_string()));
        emitter.emit(&source)?;
        let capabilities = self.builder.capabilities();
        emitter.emit(&capabilities)?;
        Ok(())
    }

    /// Index one project generation over the host's non-library files.
    pub fn index_project(
        &mut self,
        host: &dyn SemanticHost,
        emitter: &mut dyn Emitter,
        name: &str,
        resource: Option<String>,
        contents: Option<String>,
        root_files: HashSet<String>,
    ) -> IndexResult<()> {
        let mut indexer = Indexer {
            session: self,
            host,
            emitter,
            file_state: None,
            handled: HashSet::new(),
        };
        indexer.run(name, resource, contents, root_files)
    }

    /// Close the shared managers. Call once, after the last project.
    pub fn finish(&mut self, emitter: &mut dyn Emitter) -> IndexResult<()> {
        let mut ctx = EmitCtx::new(&mut self.builder, emitter);
        self.manager.end_all(&mut ctx)
    }
}

/// Per-project visitor borrowing the session.
pub struct Indexer<'a> {
    session: &'a mut Session,
    host: &'a dyn SemanticHost,
    emitter: &'a mut dyn Emitter,
    file_state: Option<FileState>,
    /// Nodes consumed eagerly (declaration names), reset per file.
    handled: HashSet<NodeId>,
}

impl<'a> Indexer<'a> {
    fn run(
        &mut self,
        name: &str,
        resource: Option<String>,
        contents: Option<String>,
        root_files: HashSet<String>,
    ) -> IndexResult<()> {
        {
            let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
            self.session
                .manager
                .begin_project(name, resource, contents, root_files, &mut ctx)?;
        }

        let file_count = self.host.files().len();
        for index in 0..file_count {
            if let Some(flag) = &self.session.cancel {
                if flag.load(Ordering::Relaxed) {
                    debug!("cancellation requested, stopping before next file");
                    break;
                }
            }
            let file = FileIdx::from_index(index);
            let source = self.host.file(file);
            if source.is_default_library || source.is_external_library {
                continue;
            }
            // A file shared between projects is indexed once, by the first
            // project that sees it.
            if self.session.manager.document_processed(&source.file_name) {
                continue;
            }
            self.index_file(file)?;
        }

        let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
        self.session.manager.end_project(&mut ctx)
    }

    // -- per-file driving ---------------------------------------------------

    fn index_file(&mut self, file: FileIdx) -> IndexResult<()> {
        let shard = {
            let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
            self.session.manager.get_or_create_document(
                self.host,
                file,
                !self.session.options.no_contents,
                &mut ctx,
            )?
        };
        debug!(file = %self.host.file(file).file_name, "indexing file");

        let mut state = FileState::new(file, shard);
        if let Some(module) = self.host.file(file).symbol {
            state.current_exports = self.host.symbol(module).exports.values().copied().collect();
        }
        self.file_state = Some(state);

        self.check_exports(file)?;
        self.visit(self.host.file(file).node)?;
        self.end_file(file)
    }

    /// Strict-moniker enforcement over the file's top-level exports.
    fn check_exports(&mut self, file: FileIdx) -> IndexResult<()> {
        let exports: Vec<SymId> = self
            .file_state
            .as_ref()
            .map(|state| state.current_exports.iter().copied().collect())
            .unwrap_or_default();
        let shard = self
            .file_state
            .as_ref()
            .expect("file state is live during the visit")
            .shard
            .clone();

        for sym in exports {
            let key = self.get_or_create_symbol_data(sym, &shard)?;
            let data = self
                .session
                .manager
                .table
                .lookup(&key, self.session.manager.current_project());
            let exported = data.is_some_and(|data| data.visibility == Visibility::Exported);
            if !exported {
                let name = self.host.symbol(sym).name.clone();
                match self.session.options.moniker_mode {
                    MonikerMode::Strict => {
                        return Err(IndexError::MonikerMissing { name });
                    }
                    MonikerMode::Lenient => {
                        warn!(symbol = %name, file = %self.host.file(file).file_name,
                            "exported symbol has no computable moniker, keeping local");
                    }
                }
            }
        }
        Ok(())
    }

    fn visit(&mut self, node: NodeId) -> IndexResult<()> {
        self.begin_node(node)?;
        let children = self.host.node(node).children.clone();
        for child in children {
            self.visit(child)?;
        }
        self.end_node(node)
    }

    fn begin_node(&mut self, node_id: NodeId) -> IndexResult<()> {
        let node = self.host.node(node_id);
        match node.kind {
            kind if kind.is_container() => {
                // Handle the declaration name eagerly so the stack entry can
                // carry its definition range.
                let range = match node.name {
                    Some(name) => {
                        self.handle_symbol(name)?;
                        self.handled.insert(name);
                        let span = self.host.node(name).span;
                        self.file_state
                            .as_ref()
                            .and_then(|state| state.range_at(span))
                    }
                    None => None,
                };
                if let Some(state) = self.file_state.as_mut() {
                    state.push_symbol(range);
                }
            }
            NodeKind::Identifier | NodeKind::StringLiteral => {
                self.handle_symbol(node_id)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn end_node(&mut self, node_id: NodeId) -> IndexResult<()> {
        let kind = self.host.node(node_id).kind;
        if kind.is_container() {
            if let Some(state) = self.file_state.as_mut() {
                state.pop_symbol();
            }
            self.extend_export_monikers(node_id)?;
        }
        Ok(())
    }

    // -- symbol handling ----------------------------------------------------

    fn get_or_create_symbol_data(&mut self, sym: SymId, shard: &Id) -> IndexResult<SymbolKey> {
        let key = {
            let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
            self.session.manager.get_or_create_symbol_data(
                self.host,
                &mut self.session.engine,
                sym,
                shard,
                &mut ctx,
            )?
        };
        self.link_monikers(&key)?;
        Ok(key)
    }

    /// Resolve the symbol at a node and record either a definition or a
    /// reference range linked to the symbol's result set.
    fn handle_symbol(&mut self, node_id: NodeId) -> IndexResult<()> {
        if self.handled.contains(&node_id) {
            return Ok(());
        }
        let node = self.host.node(node_id);
        let Some(sym) = self.host.symbol_at(node_id) else {
            return Ok(());
        };
        let Some(shard) = self.file_state.as_ref().map(|state| state.shard.clone()) else {
            return Ok(());
        };
        let span = node.span;
        if self
            .file_state
            .as_ref()
            .is_some_and(|state| state.range_at(span).is_some())
        {
            return Ok(());
        }

        let key = self.get_or_create_symbol_data(sym, &shard)?;

        let current = self.session.manager.current_project();
        let source = self.host.file(node.file);
        let Some(data) = self.session.manager.table.lookup(&key, current) else {
            return Ok(());
        };
        let result_set = data.result_set.clone();
        let is_definition = data.is_declaration(&source.file_name, span);
        let text = node
            .text
            .clone()
            .unwrap_or_else(|| slice_text(&source.text, span));

        if is_definition {
            self.record_definition(node_id, sym, &key, &shard, result_set, text)
        } else {
            self.record_reference(node_id, &key, &shard, result_set, text)
        }
    }

    fn record_definition(
        &mut self,
        node_id: NodeId,
        sym: SymId,
        key: &SymbolKey,
        shard: &Id,
        result_set: Id,
        text: String,
    ) -> IndexResult<()> {
        let node = self.host.node(node_id);
        let source = self.host.file(node.file);
        let span = node.span;
        let full_span = self.declaration_full_span(sym, node_id).unwrap_or(span);
        let tag = RangeTag::Definition {
            text,
            kind: lsp_symbol_kind(self.host.symbol(sym).flags),
            full_range: source.ls_range(full_span),
            detail: None,
        };

        let range = self.session.builder.range(source.ls_range(span), Some(tag));
        self.emitter.emit(&range)?;
        let next = self.session.builder.next(range.id.clone(), result_set);
        self.emitter.emit(&next)?;

        if let Some(state) = self.file_state.as_mut() {
            state.record_range(span, range.id.clone());
        }
        if let Some(document) = self.session.manager.document_mut(&source.file_name) {
            document.record_range(range.id.clone());
        }

        let current = self.session.manager.current_project();
        {
            let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
            self.session.manager.table.add_definition(
                key,
                current,
                shard,
                range.id.clone(),
                &mut ctx,
            )?;
        }

        self.emit_hover(node_id, key)?;
        self.record_type_definitions(node_id, key, shard)
    }

    fn record_reference(
        &mut self,
        node_id: NodeId,
        key: &SymbolKey,
        shard: &Id,
        result_set: Id,
        text: String,
    ) -> IndexResult<()> {
        let node = self.host.node(node_id);
        let source = self.host.file(node.file);
        let span = node.span;

        let range = self
            .session
            .builder
            .range(source.ls_range(span), Some(RangeTag::Reference { text }));
        self.emitter.emit(&range)?;
        let next = self.session.builder.next(range.id.clone(), result_set);
        self.emitter.emit(&next)?;

        if let Some(state) = self.file_state.as_mut() {
            state.record_range(span, range.id.clone());
        }
        if let Some(document) = self.session.manager.document_mut(&source.file_name) {
            document.record_range(range.id.clone());
        }

        let current = self.session.manager.current_project();
        {
            let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
            self.session.manager.table.add_reference_range(
                key,
                current,
                shard,
                range.id.clone(),
                ItemProperty::References,
                &mut ctx,
            )?;
        }

        // Exported symbols cascade their moniker into the shard once, so
        // cross-project readers can chase references through the moniker
        // graph.
        let cascade = self
            .session
            .manager
            .table
            .lookup(key, current)
            .and_then(|data| data.most_unique_moniker())
            .filter(|record| record.unique >= UniquenessLevel::Group)
            .map(|record| record.vertex.clone());
        if let Some(moniker) = cascade {
            if self.session.cascaded.insert((key.clone(), shard.clone())) {
                let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
                self.session.manager.table.record_reference_cascade(
                    key,
                    current,
                    shard,
                    moniker,
                    &mut ctx,
                )?;
            }
        }
        Ok(())
    }

    /// Full span of the declaration whose name is `name_node`.
    fn declaration_full_span(&self, sym: SymId, name_node: NodeId) -> Option<Span> {
        self.host
            .symbol(sym)
            .declarations
            .iter()
            .find(|&&decl| self.host.node(decl).name == Some(name_node))
            .map(|&decl| self.host.node(decl).span)
    }

    fn emit_hover(&mut self, node_id: NodeId, key: &SymbolKey) -> IndexResult<()> {
        if self.session.hovered.contains(key) {
            return Ok(());
        }
        let node = self.host.node(node_id);
        // The quick-info query is known to throw on odd positions upstream;
        // recover by emitting no hover.
        let info = match self.host.quick_info_at(node.file, node.span.start) {
            Ok(Some(info)) => info,
            Ok(None) => return Ok(()),
            Err(_) => {
                debug!("hover query failed, skipping hover result");
                return Ok(());
            }
        };
        self.session.hovered.insert(key.clone());

        let mut contents = vec![MarkedString::Code {
            language: "typescript".to_string(),
            value: info.display,
        }];
        if let Some(documentation) = info.documentation {
            contents.push(MarkedString::Plain(documentation));
        }
        let current = self.session.manager.current_project();
        let Some(data) = self.session.manager.table.lookup(key, current) else {
            return Ok(());
        };
        let result_set = data.result_set.clone();
        let hover = self.session.builder.hover_result(Hover {
            contents,
            range: None,
        });
        self.emitter.emit(&hover)?;
        let edge = self.session.builder.hover_edge(result_set, hover.id.clone());
        self.emitter.emit(&edge)?;
        Ok(())
    }

    /// Record same-document type-definition targets for a freshly recorded
    /// definition.
    fn record_type_definitions(
        &mut self,
        node_id: NodeId,
        key: &SymbolKey,
        shard: &Id,
    ) -> IndexResult<()> {
        let node = self.host.node(node_id);
        let locations = self.host.type_definition_at(node.file, node.span.start);
        if locations.is_empty() {
            return Ok(());
        }
        let current = self.session.manager.current_project();
        for location in locations {
            if location.file != node.file {
                continue;
            }
            let range_id = match self
                .file_state
                .as_ref()
                .and_then(|state| state.range_at(location.span))
            {
                Some(id) => id,
                None => {
                    let source = self.host.file(location.file);
                    let range = self
                        .session
                        .builder
                        .range(source.ls_range(location.span), None);
                    self.emitter.emit(&range)?;
                    if let Some(state) = self.file_state.as_mut() {
                        state.record_range(location.span, range.id.clone());
                    }
                    if let Some(document) = self.session.manager.document_mut(&source.file_name)
                    {
                        document.record_range(range.id.clone());
                    }
                    range.id
                }
            };
            let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
            self.session.manager.table.add_type_definition(
                key,
                current,
                shard,
                range_id,
                &mut ctx,
            )?;
        }
        Ok(())
    }

    /// Run the reachability walk from an exported container and extend the
    /// moniker chains of everything it reaches.
    fn extend_export_monikers(&mut self, node_id: NodeId) -> IndexResult<()> {
        let node = self.host.node(node_id);
        let sym = match node
            .symbol
            .or_else(|| node.name.and_then(|name| self.host.symbol_at(name)))
        {
            Some(sym) => sym,
            None => return Ok(()),
        };
        let key = symbol_key(self.host, sym);
        let current = self.session.manager.current_project();
        let exported = self
            .session
            .manager
            .table
            .lookup(&key, current)
            .is_some_and(|data| data.visibility == Visibility::Exported);
        if !exported {
            return Ok(());
        }
        let Some(path) = self.session.engine.export_path(self.host, sym) else {
            return Ok(());
        };

        let reach = self
            .session
            .engine
            .walk_exported(self.host, sym, &path, FlowMode::Exported);
        let Some(shard) = self.file_state.as_ref().map(|state| state.shard.clone()) else {
            return Ok(());
        };

        for marked in &reach.marked {
            let marked_key = self.get_or_create_symbol_data(*marked, &shard)?;
            if let Some(data) = self.session.manager.table.lookup_mut(&marked_key, current) {
                data.mark_indirect_exported();
            }
        }
        for attachment in &reach.attachments {
            let attach_key = self.get_or_create_symbol_data(attachment.sym, &shard)?;
            let identifier = attachment.export_path.identifier();
            let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
            self.session
                .manager
                .attach_export_moniker(&attach_key, identifier, &mut ctx)?;
        }
        Ok(())
    }

    /// Hand freshly minted tsc monikers to the cross-package linker.
    fn link_monikers(&mut self, key: &SymbolKey) -> IndexResult<()> {
        let current = self.session.manager.current_project();
        let record = match self
            .session
            .manager
            .table
            .lookup(key, current)
            .and_then(|data| data.primary_moniker())
        {
            Some(record) if record.scheme == "tsc" => record.clone(),
            _ => return Ok(()),
        };
        if !self.session.linked.insert(record.vertex.clone()) {
            return Ok(());
        }
        let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
        match record.kind {
            MonikerKind::Import => {
                self.session.linker.attach_import_moniker(&record, &mut ctx)?;
            }
            MonikerKind::Export => {
                self.session.linker.attach_export_moniker(&record, &mut ctx)?;
            }
            MonikerKind::Local => {}
        }
        Ok(())
    }

    // -- per-file wrap-up ---------------------------------------------------

    fn end_file(&mut self, file: FileIdx) -> IndexResult<()> {
        let source = self.host.file(file);
        let shard = self
            .file_state
            .as_ref()
            .map(|state| state.shard.clone())
            .expect("file state is live until end_file");

        // Diagnostics: syntactic first, then semantic, as reported.
        let diagnostics: Vec<Diagnostic> = source
            .syntactic_diagnostics
            .iter()
            .chain(source.semantic_diagnostics.iter())
            .map(|info| to_diagnostic(source, info))
            .collect();
        if !diagnostics.is_empty() {
            let vertex = self.session.builder.diagnostic_result(diagnostics);
            self.emitter.emit(&vertex)?;
            let edge = self.session.builder.diagnostic_edge(shard.clone(), vertex.id);
            self.emitter.emit(&edge)?;
        }

        let folding: Vec<FoldingRange> = source
            .outlining_spans
            .iter()
            .map(|outline| {
                let range = source.ls_range(outline.span);
                FoldingRange {
                    start_line: range.start.line,
                    start_character: Some(range.start.character),
                    end_line: range.end.line,
                    end_character: Some(range.end.character),
                    kind: outline.kind.clone(),
                }
            })
            .collect();
        if !folding.is_empty() {
            let vertex = self.session.builder.folding_range_result(folding);
            self.emitter.emit(&vertex)?;
            let edge = self
                .session
                .builder
                .folding_range_edge(shard.clone(), vertex.id);
            self.emitter.emit(&edge)?;
        }

        let symbols = self
            .file_state
            .as_mut()
            .map(|state| state.take_document_symbols())
            .unwrap_or_default();
        if !symbols.is_empty() {
            let vertex = self.session.builder.document_symbol_result(symbols);
            self.emitter.emit(&vertex)?;
            let edge = self
                .session
                .builder
                .document_symbol_edge(shard.clone(), vertex.id);
            self.emitter.emit(&edge)?;
        }

        {
            let mut ctx = EmitCtx::new(&mut self.session.builder, &mut *self.emitter);
            self.session.manager.end_document(&source.file_name, &mut ctx)?;
        }

        // Release per-file disposables on every exit path.
        self.file_state = None;
        self.handled.clear();
        Ok(())
    }
}

fn slice_text(text: &str, span: Span) -> String {
    text.get(span.start as usize..span.end as usize)
        .unwrap_or_default()
        .to_string()
}

fn to_diagnostic(source: &crate::checker::SourceFile, info: &DiagnosticInfo) -> Diagnostic {
    Diagnostic {
        range: source.ls_range(info.span),
        severity: Some(match info.category {
            DiagnosticCategory::Error => DiagnosticSeverity::Error,
            DiagnosticCategory::Warning => DiagnosticSeverity::Warning,
            DiagnosticCategory::Message => DiagnosticSeverity::Information,
            DiagnosticCategory::Suggestion => DiagnosticSeverity::Hint,
        }),
        code: Some(info.code),
        source: Some("ts".to_string()),
        message: info.message.clone(),
    }
}

/// LSP symbol-kind code for a definition range tag.
fn lsp_symbol_kind(flags: SymbolFlags) -> u8 {
    if flags.intersects(SymbolFlags::CLASS) {
        5
    } else if flags.intersects(SymbolFlags::METHOD) {
        6
    } else if flags.intersects(SymbolFlags::PROPERTY) {
        7
    } else if flags.intersects(SymbolFlags::CONSTRUCTOR) {
        9
    } else if flags.intersects(SymbolFlags::ENUM) {
        10
    } else if flags.intersects(SymbolFlags::INTERFACE) {
        11
    } else if flags.intersects(SymbolFlags::FUNCTION) {
        12
    } else if flags.intersects(SymbolFlags::MODULE) {
        3
    } else if flags.intersects(SymbolFlags::TYPE_PARAMETER | SymbolFlags::TYPE_ALIAS) {
        26
    } else {
        13
    }
}
