//! Project data managers and the multi-project lifecycle.
//!
//! Four manager flavours share one contract: the reserved *global*,
//! *default-libs*, and *group* managers live for the whole run and begin
//! lazily; each tsconfig project gets its own generation that begins
//! eagerly and releases its symbol data when it ends. The `DataManager`
//! routes documents and symbols to their owners, runs the visibility
//! counter sweep, and keeps the newest-first symbol chains.

use crate::checker::SemanticHost;
use crate::emitter::Emitter;
use crate::error::{IndexError, IndexResult};
use crate::graph::{EventKind, EventScope, Id, MonikerKind, UniquenessLevel};
use crate::symbols::data::{EmitCtx, MonikerRecord, SymbolDataKind, SymbolDataTable};
use crate::symbols::{
    DefinitionInfo, FactoryKind, ModuleSystemKind, SymbolKey, factory_kind, module_system,
    symbol_key,
};
use crate::types::{FileIdx, ProjectId, SymId};
use crate::visibility::{Visibility, VisibilityEngine};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Reserved project generations shared by every tsconfig project.
pub const LAST_SHARED_PROJECT: u32 = 3;

pub fn global_project() -> ProjectId {
    ProjectId::new(1).unwrap()
}

pub fn default_libs_project() -> ProjectId {
    ProjectId::new(2).unwrap()
}

pub fn group_project() -> ProjectId {
    ProjectId::new(3).unwrap()
}

/// How a manager's files were brought into the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// The whole project is parsed; symbol data can be freed once its
    /// visibility resolves.
    Full,
    /// Files are only referenced; symbol data stays managed until the
    /// manager ends.
    Referenced,
}

/// What happens to a symbol whose visibility resolved to internal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Free,
    Keep,
}

/// Per-manager state; one per reserved manager plus one per tsconfig
/// project.
#[derive(Debug)]
struct ProjectData {
    id: ProjectId,
    name: String,
    parse_mode: ParseMode,
    vertex: Option<Id>,
    documents: Vec<Id>,
    managed: Vec<SymbolKey>,
    ended: bool,
}

impl ProjectData {
    fn new(id: ProjectId, name: String, parse_mode: ParseMode) -> Self {
        Self {
            id,
            name,
            parse_mode,
            vertex: None,
            documents: Vec::new(),
            managed: Vec::new(),
            ended: false,
        }
    }

    fn data_mode(&self) -> DataMode {
        match self.parse_mode {
            ParseMode::Full => DataMode::Free,
            ParseMode::Referenced => DataMode::Keep,
        }
    }

    /// Lazy begin: the project vertex and begin event appear on first use.
    fn ensure_begun(&mut self, ctx: &mut EmitCtx<'_>) -> IndexResult<Id> {
        if let Some(id) = &self.vertex {
            return Ok(id.clone());
        }
        let vertex = ctx.builder.project(Some(self.name.clone()), None, None);
        ctx.emitter.emit(&vertex)?;
        let event = ctx
            .builder
            .event(EventScope::Project, EventKind::Begin, vertex.id.clone());
        ctx.emitter.emit(&event)?;
        self.vertex = Some(vertex.id.clone());
        debug!(project = %self.name, "project begun");
        Ok(vertex.id)
    }

    fn end(&mut self, table: &mut SymbolDataTable, ctx: &mut EmitCtx<'_>) -> IndexResult<()> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        let Some(vertex) = self.vertex.clone() else {
            // Never begun: nothing to close.
            return Ok(());
        };

        for key in std::mem::take(&mut self.managed) {
            if table.lookup(&key, self.id).is_some_and(|data| !data.is_ended()) {
                table.end_symbol(&key, self.id, ctx)?;
            }
        }
        for key in table.keys_for_project(self.id) {
            if table.lookup(&key, self.id).is_some_and(|data| !data.is_ended()) {
                table.end_symbol(&key, self.id, ctx)?;
            }
        }

        if !self.documents.is_empty() {
            let edges = ctx.builder.contains(vertex.clone(), &self.documents);
            for edge in edges {
                ctx.emitter.emit(&edge)?;
            }
        }
        let event = ctx.builder.event(EventScope::Project, EventKind::End, vertex);
        ctx.emitter.emit(&event)?;
        debug!(project = %self.name, "project ended");
        Ok(())
    }
}

/// Per-document emission state for one visited source file.
///
/// Documents are keyed by file name, not by the program-local `FileIdx`:
/// the same file can appear in several project snapshots and must keep one
/// identity across them.
#[derive(Debug)]
pub struct DocumentData {
    pub file_name: String,
    pub uri: String,
    pub vertex: Id,
    pub owner: ProjectId,
    ranges: Vec<Id>,
    ended: bool,
}

impl DocumentData {
    pub fn record_range(&mut self, range: Id) {
        self.ranges.push(range);
    }
}

pub struct DataManager {
    pub table: SymbolDataTable,
    global: ProjectData,
    default_libs: ProjectData,
    group: ProjectData,
    tsconfig: Vec<ProjectData>,
    current: Option<ProjectId>,
    next_project: u32,
    documents: HashMap<String, DocumentData>,
    /// File names still validating an unknown symbol's visibility.
    validation: HashMap<SymbolKey, HashSet<String>>,
    /// Root file names of the active tsconfig project.
    current_files: HashSet<String>,
}

impl DataManager {
    pub fn new(group_name: &str) -> Self {
        Self {
            table: SymbolDataTable::new(),
            global: ProjectData::new(global_project(), "global".to_string(), ParseMode::Referenced),
            default_libs: ProjectData::new(
                default_libs_project(),
                "defaultLibs".to_string(),
                ParseMode::Referenced,
            ),
            group: ProjectData::new(group_project(), group_name.to_string(), ParseMode::Referenced),
            tsconfig: Vec::new(),
            current: None,
            next_project: LAST_SHARED_PROJECT + 1,
            documents: HashMap::new(),
            validation: HashMap::new(),
            current_files: HashSet::new(),
        }
    }

    pub fn current_project(&self) -> ProjectId {
        self.current.expect("a project is active")
    }

    /// Begin a tsconfig project generation. The project vertex is emitted
    /// eagerly; its files become the classification root set.
    pub fn begin_project(
        &mut self,
        name: &str,
        resource: Option<String>,
        contents: Option<String>,
        root_files: HashSet<String>,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<ProjectId> {
        let id = ProjectId::new(self.next_project).expect("project ids never wrap");
        self.next_project += 1;

        let mut data = ProjectData::new(id, name.to_string(), ParseMode::Full);
        let vertex = ctx.builder.project(Some(name.to_string()), resource, contents);
        ctx.emitter.emit(&vertex)?;
        let event = ctx
            .builder
            .event(EventScope::Project, EventKind::Begin, vertex.id.clone());
        ctx.emitter.emit(&event)?;
        data.vertex = Some(vertex.id);

        self.tsconfig.push(data);
        self.current = Some(id);
        self.current_files = root_files;
        Ok(id)
    }

    fn project_data_mut(&mut self, id: ProjectId) -> &mut ProjectData {
        if id == self.global.id {
            &mut self.global
        } else if id == self.default_libs.id {
            &mut self.default_libs
        } else if id == self.group.id {
            &mut self.group
        } else {
            self.tsconfig
                .iter_mut()
                .find(|data| data.id == id)
                .expect("project data exists for every allocated id")
        }
    }

    /// Project generation owning a visited document.
    fn classify_document(&self, file_name: &str) -> ProjectId {
        if self.current_files.contains(file_name) {
            self.current_project()
        } else {
            self.group.id
        }
    }

    /// Project generation owning a symbol, per its factory and declarations.
    fn classify_symbol(
        &self,
        host: &dyn SemanticHost,
        sym: SymId,
        factory: FactoryKind,
    ) -> ProjectId {
        if matches!(factory, FactoryKind::Transient | FactoryKind::WithRoots) {
            return self.global.id;
        }
        let info = host.symbol(sym);
        let Some(&first) = info.declarations.first() else {
            return self.global.id;
        };
        let file = host.file(host.node(first).file);
        if file.is_default_library {
            self.default_libs.id
        } else if file.is_external_library {
            self.global.id
        } else if self.current_files.contains(&file.file_name) {
            self.current_project()
        } else {
            self.group.id
        }
    }

    // -- documents ----------------------------------------------------------

    /// True when the file was already indexed by this or an earlier project.
    pub fn document_processed(&self, file_name: &str) -> bool {
        self.documents
            .get(file_name)
            .is_some_and(|data| data.ended)
    }

    /// Create (or return) the document vertex for a visited file, emitting
    /// the vertex and its begin event.
    pub fn get_or_create_document(
        &mut self,
        host: &dyn SemanticHost,
        file: FileIdx,
        with_contents: bool,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<Id> {
        let source = host.file(file);
        if let Some(data) = self.documents.get(&source.file_name) {
            return Ok(data.vertex.clone());
        }

        let owner = self.classify_document(&source.file_name);
        self.project_data_mut(owner).ensure_begun(ctx)?;

        let uri = file_uri(&source.file_name);
        let contents = with_contents.then(|| {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD.encode(source.text.as_bytes())
        });
        let vertex = ctx
            .builder
            .document(uri.clone(), "typescript".to_string(), contents);
        ctx.emitter.emit(&vertex)?;
        let event = ctx
            .builder
            .event(EventScope::Document, EventKind::Begin, vertex.id.clone());
        ctx.emitter.emit(&event)?;

        self.project_data_mut(owner).documents.push(vertex.id.clone());
        self.documents.insert(
            source.file_name.clone(),
            DocumentData {
                file_name: source.file_name.clone(),
                uri,
                vertex: vertex.id.clone(),
                owner,
                ranges: Vec::new(),
                ended: false,
            },
        );
        Ok(vertex.id)
    }

    pub fn document(&self, file_name: &str) -> Option<&DocumentData> {
        self.documents.get(file_name)
    }

    pub fn document_mut(&mut self, file_name: &str) -> Option<&mut DocumentData> {
        self.documents.get_mut(file_name)
    }

    /// Close a document: flush symbol partitions for this shard, emit its
    /// contains edges and end event, then run the visibility sweep.
    pub fn end_document(&mut self, file_name: &str, ctx: &mut EmitCtx<'_>) -> IndexResult<()> {
        let current = self.current_project();
        let (vertex, ranges) = {
            let Some(data) = self.documents.get_mut(file_name) else {
                return Ok(());
            };
            if data.ended {
                return Ok(());
            }
            data.ended = true;
            (data.vertex.clone(), std::mem::take(&mut data.ranges))
        };

        self.table.end_shard(current, &vertex, ctx)?;

        if !ranges.is_empty() {
            let edges = ctx.builder.contains(vertex.clone(), &ranges);
            for edge in edges {
                ctx.emitter.emit(&edge)?;
            }
        }
        let event = ctx
            .builder
            .event(EventScope::Document, EventKind::End, vertex);
        ctx.emitter.emit(&event)?;

        self.sweep_visibility(file_name, ctx)
    }

    /// Visibility counter sweep: symbols still `unknown` whose last watching
    /// file just finished resolve to `internal`.
    fn sweep_visibility(&mut self, file_name: &str, ctx: &mut EmitCtx<'_>) -> IndexResult<()> {
        let mut resolved: Vec<SymbolKey> = Vec::new();
        self.validation.retain(|key, watchers| {
            watchers.remove(file_name);
            if watchers.is_empty() {
                resolved.push(key.clone());
                false
            } else {
                true
            }
        });

        let current = self.current_project();
        for key in resolved {
            let Some(data) = self.table.lookup_mut(&key, current) else {
                continue;
            };
            if data.visibility != Visibility::Unknown {
                continue;
            }
            data.resolve_internal();
            let owner = data.project;
            let mode = self.project_data_mut(owner).data_mode();
            match mode {
                DataMode::Free => {
                    self.table.end_symbol(&key, current, ctx)?;
                    self.table.remove_symbol(&key, owner);
                }
                DataMode::Keep => {
                    self.project_data_mut(owner).managed.push(key);
                }
            }
        }
        Ok(())
    }

    // -- symbols ------------------------------------------------------------

    /// Get or lazily create the symbol data for `sym`, returning its key.
    pub fn get_or_create_symbol_data(
        &mut self,
        host: &dyn SemanticHost,
        engine: &mut VisibilityEngine,
        sym: SymId,
        current_shard: &Id,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<SymbolKey> {
        let key = symbol_key(host, sym);
        let current = self.current_project();
        if self.table.lookup(&key, current).is_some() {
            return Ok(key);
        }

        let factory = factory_kind(host, sym);
        let owner = self.classify_symbol(host, sym, factory);
        self.project_data_mut(owner).ensure_begun(ctx)?;
        let regime = module_system(host, sym);
        let info = host.symbol(sym);

        // Root symbols must exist before the dependent data wires cascades.
        let kind = match factory {
            FactoryKind::WithRoots => {
                let roots = host.root_symbols(sym).to_vec();
                let mut root_keys = Vec::with_capacity(roots.len());
                for root in roots {
                    root_keys.push(self.get_or_create_symbol_data(
                        host,
                        engine,
                        root,
                        current_shard,
                        ctx,
                    )?);
                }
                SymbolDataKind::WithRoots { roots: root_keys }
            }
            FactoryKind::Method => {
                let roots: Vec<SymId> = host
                    .root_symbols(sym)
                    .iter()
                    .copied()
                    .filter(|&root| root != sym)
                    .collect();
                let mut root_keys = Vec::with_capacity(roots.len());
                for root in roots {
                    root_keys.push(self.get_or_create_symbol_data(
                        host,
                        engine,
                        root,
                        current_shard,
                        ctx,
                    )?);
                }
                SymbolDataKind::Method { roots: root_keys }
            }
            FactoryKind::Alias => {
                match host.aliased_symbol(sym) {
                    Some(target) => {
                        let target_key = self.get_or_create_symbol_data(
                            host,
                            engine,
                            target,
                            current_shard,
                            ctx,
                        )?;
                        let renames = host.symbol(target).name != info.name;
                        SymbolDataKind::Alias {
                            target: target_key,
                            renames,
                        }
                    }
                    None => SymbolDataKind::Standard,
                }
            }
            FactoryKind::Transient => SymbolDataKind::Transient,
            FactoryKind::TypeAlias | FactoryKind::Standard => SymbolDataKind::Standard,
        };

        let export_path = engine.export_path(host, sym);
        let visibility = match factory {
            FactoryKind::Transient | FactoryKind::WithRoots => Visibility::Transient,
            _ if export_path.is_some() => Visibility::Exported,
            _ => Visibility::Unknown,
        };

        let declaration_infos = declaration_infos(host, sym);
        let declaring_files: HashSet<String> = host
            .symbol(sym)
            .declarations
            .iter()
            .map(|&decl| host.file(host.node(decl).file).file_name.clone())
            .collect();

        self.table.create(
            key.clone(),
            owner,
            regime,
            visibility,
            kind,
            declaration_infos,
            current,
            current_shard,
            ctx,
        )?;

        // Primary moniker: export identifier for exported symbols, content
        // hash for everything else that has declarations.
        if let Some(path) = &export_path {
            let import = declares_only_in_external_library(host, sym);
            let kind = if import {
                MonikerKind::Import
            } else {
                MonikerKind::Export
            };
            self.set_primary_moniker(
                &key,
                path.identifier(),
                UniquenessLevel::Group,
                kind,
                ctx,
            )?;
        } else if !host.symbol(sym).declarations.is_empty() {
            self.set_primary_moniker(
                &key,
                key.as_str().to_string(),
                UniquenessLevel::Document,
                MonikerKind::Local,
                ctx,
            )?;
        }

        if visibility == Visibility::Unknown && !declaring_files.is_empty() {
            self.validation.insert(key.clone(), declaring_files);
        }
        Ok(key)
    }

    /// Mint and wire the primary moniker of `key`.
    fn set_primary_moniker(
        &mut self,
        key: &SymbolKey,
        identifier: String,
        unique: UniquenessLevel,
        kind: MonikerKind,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        let current = self.current_project();
        let data = self
            .table
            .lookup_mut(key, current)
            .ok_or_else(|| IndexError::General(format!("no symbol data for key {key}")))?;
        let vertex = ctx.builder.moniker("tsc", identifier.clone(), unique, kind);
        ctx.emitter.emit(&vertex)?;
        let edge = ctx
            .builder
            .moniker_edge(data.result_set.clone(), vertex.id.clone());
        ctx.emitter.emit(&edge)?;
        data.set_primary_moniker(MonikerRecord {
            vertex: vertex.id,
            scheme: "tsc".to_string(),
            identifier,
            unique,
            kind,
        });
        Ok(())
    }

    /// Attach an additional export moniker to an already-created symbol,
    /// chaining it onto the primary via an `attach` edge.
    pub fn attach_export_moniker(
        &mut self,
        key: &SymbolKey,
        identifier: String,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<Option<Id>> {
        let current = self.current_project();
        let Some(data) = self.table.lookup_mut(key, current) else {
            return Ok(None);
        };
        if data
            .most_unique_moniker()
            .is_some_and(|record| record.identifier == identifier)
        {
            return Ok(None);
        }

        let vertex = ctx.builder.moniker(
            "tsc",
            identifier.clone(),
            UniquenessLevel::Group,
            MonikerKind::Export,
        );
        ctx.emitter.emit(&vertex)?;
        match data.primary_moniker() {
            Some(primary) => {
                let edge = ctx
                    .builder
                    .attach(vertex.id.clone(), primary.vertex.clone());
                ctx.emitter.emit(&edge)?;
            }
            None => {
                let edge = ctx
                    .builder
                    .moniker_edge(data.result_set.clone(), vertex.id.clone());
                ctx.emitter.emit(&edge)?;
            }
        }
        let record = MonikerRecord {
            vertex: vertex.id.clone(),
            scheme: "tsc".to_string(),
            identifier,
            unique: UniquenessLevel::Group,
            kind: MonikerKind::Export,
        };
        if data.primary_moniker().is_none() {
            data.set_primary_moniker(record);
        } else {
            data.push_attached_moniker(record);
        }
        Ok(Some(vertex.id))
    }

    // -- lifecycle ----------------------------------------------------------

    /// End the active tsconfig project and release its symbol data.
    pub fn end_project(&mut self, ctx: &mut EmitCtx<'_>) -> IndexResult<()> {
        let current = self.current_project();
        // Close any documents the driver left open (cancellation path).
        let open: Vec<String> = self
            .documents
            .values()
            .filter(|data| !data.ended)
            .map(|data| data.file_name.clone())
            .collect();
        for file_name in open {
            self.end_document(&file_name, ctx)?;
        }

        let table = &mut self.table;
        let data = self
            .tsconfig
            .iter_mut()
            .find(|data| data.id == current)
            .expect("current project exists");
        data.end(table, ctx)?;

        self.table.release_project(current);
        // Ended documents stay registered so later projects skip re-indexing
        // the same file.
        self.current = None;
        self.current_files.clear();
        Ok(())
    }

    /// End the shared managers at the end of the run.
    pub fn end_all(&mut self, ctx: &mut EmitCtx<'_>) -> IndexResult<()> {
        // Shared managers close newest-affinity first.
        let mut group = std::mem::replace(
            &mut self.group,
            ProjectData::new(group_project(), String::new(), ParseMode::Referenced),
        );
        group.end(&mut self.table, ctx)?;
        let mut default_libs = std::mem::replace(
            &mut self.default_libs,
            ProjectData::new(default_libs_project(), String::new(), ParseMode::Referenced),
        );
        default_libs.end(&mut self.table, ctx)?;
        let mut global = std::mem::replace(
            &mut self.global,
            ProjectData::new(global_project(), String::new(), ParseMode::Referenced),
        );
        global.end(&mut self.table, ctx)?;
        Ok(())
    }
}

fn declaration_infos(host: &dyn SemanticHost, sym: SymId) -> Vec<DefinitionInfo> {
    host.symbol(sym)
        .declarations
        .iter()
        .map(|&decl| {
            let node = host.node(decl);
            let span = node
                .name
                .map(|name| host.node(name).span)
                .unwrap_or(node.span);
            DefinitionInfo {
                file_name: host.file(node.file).file_name.clone(),
                span,
            }
        })
        .collect()
}

fn declares_only_in_external_library(host: &dyn SemanticHost, sym: SymId) -> bool {
    let info = host.symbol(sym);
    !info.declarations.is_empty()
        && info.declarations.iter().all(|&decl| {
            let file = host.file(host.node(decl).file);
            file.is_external_library
        })
}

/// Percent-free file URI for a path.
pub fn file_uri(path: &str) -> String {
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}
