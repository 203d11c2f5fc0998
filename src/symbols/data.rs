//! Per-symbol emission state and the multi-generation data table.
//!
//! `SymbolData` owns a symbol's result set, result vertices, monikers, and
//! partition chain. `SymbolDataTable` stores one chain of data records per
//! `SymbolKey` (newest first, one entry per project generation that can see
//! the symbol) and dispatches add-definition/add-reference calls through the
//! five behaviour variants.

use super::classifier::ModuleSystemKind;
use super::partition::{Partition, ResultIds};
use super::{DefinitionInfo, SymbolKey};
use crate::emitter::Emitter;
use crate::error::{IndexError, IndexResult};
use crate::graph::{Builder, Id, ItemProperty, MonikerKind, UniquenessLevel};
use crate::types::{ProjectId, Span};
use crate::visibility::Visibility;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Builder plus sink, threaded through every emitting operation.
pub struct EmitCtx<'a> {
    pub builder: &'a mut Builder,
    pub emitter: &'a mut dyn Emitter,
}

impl<'a> EmitCtx<'a> {
    pub fn new(builder: &'a mut Builder, emitter: &'a mut dyn Emitter) -> Self {
        Self { builder, emitter }
    }
}

/// A moniker owned by or attached to a symbol.
#[derive(Debug, Clone)]
pub struct MonikerRecord {
    pub vertex: Id,
    pub scheme: String,
    pub identifier: String,
    pub unique: UniquenessLevel,
    pub kind: MonikerKind,
}

/// Behaviour variant of a symbol-data record.
#[derive(Debug, Clone)]
pub enum SymbolDataKind {
    Standard,
    /// `export { x as y }`; `renames` is false when the exported name equals
    /// the local name.
    Alias { target: SymbolKey, renames: bool },
    /// Class/interface methods forward to the methods they override.
    Method { roots: Vec<SymbolKey> },
    /// Union/intersection members forward to their underlying roots.
    WithRoots { roots: Vec<SymbolKey> },
    Transient,
}

#[derive(Debug)]
pub struct SymbolData {
    pub key: SymbolKey,
    pub project: ProjectId,
    pub module_system: ModuleSystemKind,
    pub visibility: Visibility,
    pub kind: SymbolDataKind,
    pub result_set: Id,
    declaration_infos: Vec<DefinitionInfo>,
    results: ResultIds,
    primary_moniker: Option<MonikerRecord>,
    attached_monikers: Vec<MonikerRecord>,
    /// Shard id -> open partitions (one per project).
    partitions: IndexMap<Id, Vec<Partition>>,
    cleared: HashSet<(ProjectId, Id)>,
    ended: bool,
}

impl SymbolData {
    fn new(
        key: SymbolKey,
        project: ProjectId,
        module_system: ModuleSystemKind,
        visibility: Visibility,
        kind: SymbolDataKind,
        result_set: Id,
        declaration_infos: Vec<DefinitionInfo>,
    ) -> Self {
        Self {
            key,
            project,
            module_system,
            visibility,
            kind,
            result_set,
            declaration_infos,
            results: ResultIds::default(),
            primary_moniker: None,
            attached_monikers: Vec::new(),
            partitions: IndexMap::new(),
            cleared: HashSet::new(),
            ended: false,
        }
    }

    pub fn is_declaration(&self, file_name: &str, span: Span) -> bool {
        self.declaration_infos
            .iter()
            .any(|info| info.matches(file_name, span))
    }

    pub fn has_declarations(&self) -> bool {
        !self.declaration_infos.is_empty()
    }

    /// Upgrade `unknown` to `indirectExported`. Any other state is left
    /// untouched; downgrades of exported symbols are forbidden.
    pub fn mark_indirect_exported(&mut self) {
        if self.visibility == Visibility::Unknown {
            self.visibility = Visibility::IndirectExported;
        }
    }

    /// Downgrade `unknown` to `internal` once every watching file finished.
    pub fn resolve_internal(&mut self) {
        if self.visibility == Visibility::Unknown {
            self.visibility = Visibility::Internal;
        }
    }

    pub fn primary_moniker(&self) -> Option<&MonikerRecord> {
        self.primary_moniker.as_ref()
    }

    pub fn set_primary_moniker(&mut self, record: MonikerRecord) {
        debug_assert!(self.primary_moniker.is_none());
        self.primary_moniker = Some(record);
    }

    pub fn push_attached_moniker(&mut self, record: MonikerRecord) {
        self.attached_monikers.push(record);
    }

    /// The moniker preferred for cross-project links.
    pub fn most_unique_moniker(&self) -> Option<&MonikerRecord> {
        self.primary_moniker
            .iter()
            .chain(self.attached_monikers.iter())
            .max_by_key(|record| record.unique)
    }

    pub fn ensure_definition_result(&mut self, ctx: &mut EmitCtx<'_>) -> IndexResult<Id> {
        if let Some(id) = &self.results.definition_result {
            return Ok(id.clone());
        }
        let vertex = ctx.builder.definition_result();
        ctx.emitter.emit(&vertex)?;
        let edge = ctx
            .builder
            .definition_edge(self.result_set.clone(), vertex.id.clone());
        ctx.emitter.emit(&edge)?;
        self.results.definition_result = Some(vertex.id.clone());
        Ok(vertex.id)
    }

    pub fn ensure_type_definition_result(&mut self, ctx: &mut EmitCtx<'_>) -> IndexResult<Id> {
        if let Some(id) = &self.results.type_definition_result {
            return Ok(id.clone());
        }
        let vertex = ctx.builder.type_definition_result();
        ctx.emitter.emit(&vertex)?;
        let edge = ctx
            .builder
            .type_definition_edge(self.result_set.clone(), vertex.id.clone());
        ctx.emitter.emit(&edge)?;
        self.results.type_definition_result = Some(vertex.id.clone());
        Ok(vertex.id)
    }

    pub fn ensure_reference_result(&mut self, ctx: &mut EmitCtx<'_>) -> IndexResult<Id> {
        if let Some(id) = &self.results.reference_result {
            return Ok(id.clone());
        }
        let vertex = ctx.builder.reference_result();
        ctx.emitter.emit(&vertex)?;
        let edge = ctx
            .builder
            .references_edge(self.result_set.clone(), vertex.id.clone());
        ctx.emitter.emit(&edge)?;
        self.results.reference_result = Some(vertex.id.clone());
        Ok(vertex.id)
    }

    /// Open or retrieve the partition for `(project, shard)`. Returns whether
    /// the partition was newly created.
    fn partition_mut(
        &mut self,
        project: ProjectId,
        shard: &Id,
    ) -> IndexResult<(&mut Partition, bool)> {
        if self.cleared.contains(&(project, shard.clone())) {
            return Err(IndexError::PartitionReopened {
                project,
                shard: shard.to_string(),
            });
        }
        let chain = self.partitions.entry(shard.clone()).or_default();
        if let Some(at) = chain.iter().position(|p| p.project == project) {
            return Ok((&mut chain[at], false));
        }
        chain.push(Partition::new(project, shard.clone()));
        let last = chain.len() - 1;
        Ok((&mut chain[last], true))
    }

    /// Flush and drop the `(project, shard)` partition.
    pub fn end_partition(
        &mut self,
        project: ProjectId,
        shard: &Id,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        let Some(chain) = self.partitions.get_mut(shard) else {
            return Ok(());
        };
        let Some(at) = chain.iter().position(|p| p.project == project) else {
            return Ok(());
        };
        let partition = chain.remove(at);
        if chain.is_empty() {
            self.partitions.shift_remove(shard);
        }
        self.cleared.insert((project, shard.clone()));
        partition.end(&self.results, ctx.builder, ctx.emitter)
    }

    /// Flush every remaining partition in insertion order and release the
    /// chain. Ending twice is a lifecycle violation.
    pub fn end(&mut self, ctx: &mut EmitCtx<'_>) -> IndexResult<()> {
        if self.ended {
            return Err(IndexError::SymbolEndedTwice {
                key: self.key.to_string(),
            });
        }
        self.ended = true;
        let partitions = std::mem::take(&mut self.partitions);
        for (shard, chain) in partitions {
            for partition in chain {
                self.cleared.insert((partition.project, shard.clone()));
                partition.end(&self.results, ctx.builder, ctx.emitter)?;
            }
        }
        Ok(())
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

/// Shared project generations every project can read.
fn is_shared_project(project: ProjectId) -> bool {
    project.value() <= crate::project::LAST_SHARED_PROJECT
}

fn accessible(entry: ProjectId, current: ProjectId) -> bool {
    entry == current || is_shared_project(entry)
}

/// All live symbol data, keyed by `SymbolKey` with newest-first chains.
#[derive(Default)]
pub struct SymbolDataTable {
    items: HashMap<SymbolKey, Vec<SymbolData>>,
    /// Symbols holding an open partition per shard, in creation order.
    shard_index: IndexMap<Id, Vec<SymbolKey>>,
}

impl SymbolDataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &SymbolKey, current: ProjectId) -> Option<&SymbolData> {
        self.items
            .get(key)?
            .iter()
            .find(|data| accessible(data.project, current))
    }

    pub fn lookup_mut(&mut self, key: &SymbolKey, current: ProjectId) -> Option<&mut SymbolData> {
        self.items
            .get_mut(key)?
            .iter_mut()
            .find(|data| accessible(data.project, current))
    }

    /// Create a record owned by `owner` and prepend it to the key's chain.
    /// The result set is emitted here ("begin"); alias and roots variants
    /// additionally wire their cascade plumbing into the current shard under
    /// `current`, the active project generation.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        key: SymbolKey,
        owner: ProjectId,
        module_system: ModuleSystemKind,
        visibility: Visibility,
        kind: SymbolDataKind,
        declaration_infos: Vec<DefinitionInfo>,
        current: ProjectId,
        current_shard: &Id,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        let result_set = ctx.builder.result_set();
        ctx.emitter.emit(&result_set)?;

        // Cycles can hand a symbol back as its own root; drop those and any
        // duplicate keys while keeping forward order.
        let dedupe = |roots: Vec<SymbolKey>, own: &SymbolKey| {
            let mut seen = HashSet::new();
            roots
                .into_iter()
                .filter(|root| root != own && seen.insert(root.clone()))
                .collect::<Vec<_>>()
        };
        let kind = match kind {
            SymbolDataKind::WithRoots { roots } => SymbolDataKind::WithRoots {
                roots: dedupe(roots, &key),
            },
            SymbolDataKind::Method { roots } => SymbolDataKind::Method {
                roots: dedupe(roots, &key),
            },
            other => other,
        };

        let data = SymbolData::new(
            key.clone(),
            owner,
            module_system,
            visibility,
            kind.clone(),
            result_set.id.clone(),
            declaration_infos,
        );
        self.items.entry(key.clone()).or_default().insert(0, data);

        match kind {
            SymbolDataKind::Alias {
                target,
                renames: false,
            } => {
                // Non-renaming aliases share the target's results directly.
                if let Some(target_set) = self
                    .lookup(&target, current)
                    .map(|data| data.result_set.clone())
                {
                    let own_set = self.lookup(&key, current).unwrap().result_set.clone();
                    let edge = ctx.builder.next(own_set, target_set);
                    ctx.emitter.emit(&edge)?;
                }
            }
            SymbolDataKind::Alias {
                target,
                renames: true,
            } => {
                // Renamed exports keep their own results and cascade to the
                // target's reference result.
                if self.lookup(&target, current).is_some() {
                    let target_result = self.with_entry(&target, current, |data, ctx| {
                        data.ensure_reference_result(ctx)
                    }, ctx)?;
                    self.record_reference_result(&key, current, current_shard, target_result, ctx)?;
                }
            }
            SymbolDataKind::WithRoots { roots } => {
                for root in roots {
                    if self.lookup(&root, current).is_none() {
                        continue;
                    }
                    let root_result = self.with_entry(&root, current, |data, ctx| {
                        data.ensure_reference_result(ctx)
                    }, ctx)?;
                    self.record_reference_result(&key, current, current_shard, root_result, ctx)?;
                    if let Some(moniker) = self
                        .lookup(&root, current)
                        .and_then(|data| data.most_unique_moniker())
                        .map(|record| record.vertex.clone())
                    {
                        self.record_reference_cascade(&key, current, current_shard, moniker, ctx)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn with_entry<T>(
        &mut self,
        key: &SymbolKey,
        current: ProjectId,
        f: impl FnOnce(&mut SymbolData, &mut EmitCtx<'_>) -> IndexResult<T>,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<T> {
        let data = self
            .lookup_mut(key, current)
            .ok_or_else(|| IndexError::General(format!("no symbol data for key {key}")))?;
        f(data, ctx)
    }

    fn track_shard(&mut self, shard: &Id, key: &SymbolKey) {
        let keys = self.shard_index.entry(shard.clone()).or_default();
        if !keys.contains(key) {
            keys.push(key.clone());
        }
    }

    /// Record a definition range, dispatching on the behaviour variant.
    pub fn add_definition(
        &mut self,
        key: &SymbolKey,
        current: ProjectId,
        shard: &Id,
        range: Id,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        let kind = match self.lookup(key, current) {
            Some(data) => data.kind.clone(),
            None => return Ok(()),
        };
        match kind {
            SymbolDataKind::Standard => {
                self.record_definition(key, current, shard, range.clone(), true, ctx)
            }
            SymbolDataKind::Alias { renames: true, .. } => {
                self.record_definition(key, current, shard, range, false, ctx)
            }
            SymbolDataKind::Alias {
                target,
                renames: false,
            } => self.add_reference_range(&target, current, shard, range, ItemProperty::References, ctx),
            SymbolDataKind::Method { roots } => {
                self.record_definition(key, current, shard, range.clone(), roots.is_empty(), ctx)?;
                for root in roots {
                    self.record_reference_range(
                        &root,
                        current,
                        shard,
                        range.clone(),
                        ItemProperty::Definitions,
                        ctx,
                    )?;
                }
                Ok(())
            }
            // Transient and multi-root symbols never own definitions.
            SymbolDataKind::WithRoots { .. } | SymbolDataKind::Transient => Ok(()),
        }
    }

    /// Record a reference range, dispatching on the behaviour variant.
    pub fn add_reference_range(
        &mut self,
        key: &SymbolKey,
        current: ProjectId,
        shard: &Id,
        range: Id,
        property: ItemProperty,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        let kind = match self.lookup(key, current) {
            Some(data) => data.kind.clone(),
            None => return Ok(()),
        };
        match kind {
            SymbolDataKind::Standard | SymbolDataKind::Transient => {
                self.record_reference_range(key, current, shard, range, property, ctx)
            }
            SymbolDataKind::Alias { renames: true, .. } => {
                self.record_reference_range(key, current, shard, range, property, ctx)
            }
            SymbolDataKind::Alias {
                target,
                renames: false,
            } => {
                if &target == key {
                    return Ok(());
                }
                self.add_reference_range(&target, current, shard, range, property, ctx)
            }
            SymbolDataKind::Method { roots } => {
                self.record_reference_range(key, current, shard, range.clone(), property, ctx)?;
                for root in roots {
                    self.record_reference_range(&root, current, shard, range.clone(), property, ctx)?;
                }
                Ok(())
            }
            SymbolDataKind::WithRoots { roots } => {
                for root in roots {
                    self.record_reference_range(&root, current, shard, range.clone(), property, ctx)?;
                }
                Ok(())
            }
        }
    }

    pub fn add_type_definition(
        &mut self,
        key: &SymbolKey,
        current: ProjectId,
        shard: &Id,
        range: Id,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        if self.lookup(key, current).is_none() {
            return Ok(());
        }
        self.with_entry(key, current, |data, ctx| data.ensure_type_definition_result(ctx), ctx)?;
        self.track_shard(shard, key);
        self.with_entry(key, current, |data, _| {
            let (partition, _) = data.partition_mut(current, shard)?;
            partition.add_type_definition(range);
            Ok(())
        }, ctx)
    }

    /// Cascade another symbol's reference result into `key`'s partition.
    pub fn record_reference_result(
        &mut self,
        key: &SymbolKey,
        current: ProjectId,
        shard: &Id,
        result: Id,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        self.with_entry(key, current, |data, ctx| {
            data.ensure_reference_result(ctx)?;
            Ok(())
        }, ctx)?;
        self.track_shard(shard, key);
        self.with_entry(key, current, |data, _| {
            let (partition, _) = data.partition_mut(current, shard)?;
            partition.add_reference_result(result);
            Ok(())
        }, ctx)
    }

    /// Cascade a moniker into `key`'s partition (`referenceLinks`).
    pub fn record_reference_cascade(
        &mut self,
        key: &SymbolKey,
        current: ProjectId,
        shard: &Id,
        moniker: Id,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        self.with_entry(key, current, |data, ctx| {
            data.ensure_reference_result(ctx)?;
            Ok(())
        }, ctx)?;
        self.track_shard(shard, key);
        self.with_entry(key, current, |data, _| {
            let (partition, _) = data.partition_mut(current, shard)?;
            partition.add_reference_cascade(moniker);
            Ok(())
        }, ctx)
    }

    fn record_definition(
        &mut self,
        key: &SymbolKey,
        current: ProjectId,
        shard: &Id,
        range: Id,
        self_reference: bool,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        self.with_entry(key, current, |data, ctx| {
            data.ensure_definition_result(ctx)?;
            Ok(())
        }, ctx)?;
        self.track_shard(shard, key);
        self.with_entry(key, current, |data, _| {
            let (partition, _) = data.partition_mut(current, shard)?;
            partition.add_definition(range.clone());
            Ok(())
        }, ctx)?;
        if self_reference {
            self.record_reference_range(key, current, shard, range, ItemProperty::Definitions, ctx)?;
        }
        Ok(())
    }

    fn record_reference_range(
        &mut self,
        key: &SymbolKey,
        current: ProjectId,
        shard: &Id,
        range: Id,
        property: ItemProperty,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        if self.lookup(key, current).is_none() {
            return Ok(());
        }
        self.with_entry(key, current, |data, ctx| {
            data.ensure_reference_result(ctx)?;
            Ok(())
        }, ctx)?;
        self.track_shard(shard, key);
        self.with_entry(key, current, |data, _| {
            let (partition, _) = data.partition_mut(current, shard)?;
            partition.add_reference_range(range, property);
            Ok(())
        }, ctx)
    }

    /// Flush every partition registered in `shard` for `project`.
    pub fn end_shard(
        &mut self,
        project: ProjectId,
        shard: &Id,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        let keys = self.shard_index.shift_remove(shard).unwrap_or_default();
        for key in keys {
            if let Some(data) = self.lookup_mut(&key, project) {
                data.end_partition(project, shard, ctx)?;
            }
        }
        Ok(())
    }

    /// End one symbol's data outright (remaining partitions flush with their
    /// recorded shard).
    pub fn end_symbol(
        &mut self,
        key: &SymbolKey,
        current: ProjectId,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<()> {
        self.with_entry(key, current, |data, ctx| data.end(ctx), ctx)
    }

    /// Drop one ended entry from a key's chain.
    pub fn remove_symbol(&mut self, key: &SymbolKey, owner: ProjectId) {
        if let Some(chain) = self.items.get_mut(key) {
            chain.retain(|data| data.project != owner);
            if chain.is_empty() {
                self.items.remove(key);
            }
        }
    }

    /// Drop chain entries owned by `project` once it ends. Shared entries
    /// stay live for later projects.
    pub fn release_project(&mut self, project: ProjectId) {
        if is_shared_project(project) {
            return;
        }
        self.items.retain(|_, chain| {
            chain.retain(|data| data.project != project);
            !chain.is_empty()
        });
    }

    /// Iterate all live records (diagnostic and flush passes).
    pub fn iter_project(&self, project: ProjectId) -> impl Iterator<Item = &SymbolData> {
        self.items
            .values()
            .flat_map(|chain| chain.iter())
            .filter(move |data| data.project == project)
    }

    pub fn keys_for_project(&self, project: ProjectId) -> Vec<SymbolKey> {
        self.iter_project(project)
            .map(|data| data.key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::MemoryEmitter;
    use crate::graph::{Counter, Edge, Vertex};

    fn project(n: u32) -> ProjectId {
        ProjectId::new(n).unwrap()
    }

    fn create_standard(
        table: &mut SymbolDataTable,
        key: &str,
        owner: ProjectId,
        shard: &Id,
        builder: &mut Builder,
        emitter: &mut MemoryEmitter,
    ) -> SymbolKey {
        let key = SymbolKey::new(key);
        let mut ctx = EmitCtx::new(builder, emitter);
        table
            .create(
                key.clone(),
                owner,
                ModuleSystemKind::Module,
                Visibility::Exported,
                SymbolDataKind::Standard,
                Vec::new(),
                owner,
                shard,
                &mut ctx,
            )
            .unwrap();
        key
    }

    #[test]
    fn test_create_emits_result_set() {
        let mut table = SymbolDataTable::new();
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let shard = Id::Number(100);
        create_standard(&mut table, "k1", project(4), &shard, &mut builder, &mut emitter);

        assert_eq!(emitter.elements.len(), 1);
        assert!(matches!(
            emitter.elements[0].as_vertex(),
            Some(Vertex::ResultSet(_))
        ));
    }

    #[test]
    fn test_standard_definition_records_self_reference() {
        let mut table = SymbolDataTable::new();
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let shard = Id::Number(100);
        let owner = project(4);
        let key = create_standard(&mut table, "k1", owner, &shard, &mut builder, &mut emitter);

        let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
        table
            .add_definition(&key, owner, &shard, Id::Number(77), &mut ctx)
            .unwrap();
        table.end_shard(owner, &shard, &mut ctx).unwrap();

        let item_edges: Vec<_> = emitter
            .elements
            .iter()
            .filter_map(|e| match e.as_edge() {
                Some(Edge::Item(item)) => Some(item),
                _ => None,
            })
            .collect();
        // One plain definition item, one self-reference item.
        assert_eq!(item_edges.len(), 2);
        assert!(item_edges.iter().any(|i| i.property.is_none()));
        assert!(
            item_edges
                .iter()
                .any(|i| i.property == Some(ItemProperty::Definitions))
        );
        for item in item_edges {
            assert_eq!(item.shard, shard);
            assert_eq!(item.in_vs, vec![Id::Number(77)]);
        }
    }

    #[test]
    fn test_partition_reopen_is_an_error() {
        let mut table = SymbolDataTable::new();
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let shard = Id::Number(100);
        let owner = project(4);
        let key = create_standard(&mut table, "k1", owner, &shard, &mut builder, &mut emitter);

        let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
        table
            .add_reference_range(&key, owner, &shard, Id::Number(7), ItemProperty::References, &mut ctx)
            .unwrap();
        table.end_shard(owner, &shard, &mut ctx).unwrap();

        let result = table.add_reference_range(
            &key,
            owner,
            &shard,
            Id::Number(8),
            ItemProperty::References,
            &mut ctx,
        );
        assert!(matches!(result, Err(IndexError::PartitionReopened { .. })));
    }

    #[test]
    fn test_non_renaming_alias_forwards_to_target() {
        let mut table = SymbolDataTable::new();
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let shard = Id::Number(100);
        let owner = project(4);
        let target = create_standard(&mut table, "target", owner, &shard, &mut builder, &mut emitter);

        let alias = SymbolKey::new("alias");
        {
            let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
            table
                .create(
                    alias.clone(),
                    owner,
                    ModuleSystemKind::Module,
                    Visibility::Exported,
                    SymbolDataKind::Alias {
                        target: target.clone(),
                        renames: false,
                    },
                    Vec::new(),
                    owner,
                    &shard,
                    &mut ctx,
                )
                .unwrap();
        }

        // The alias shares results through a next edge.
        assert!(emitter.elements.iter().any(|e| matches!(
            e.as_edge(),
            Some(Edge::Next(_))
        )));

        // Definitions of the alias surface as references on the target.
        let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
        table
            .add_definition(&alias, owner, &shard, Id::Number(55), &mut ctx)
            .unwrap();
        table.end_shard(owner, &shard, &mut ctx).unwrap();

        let item_edges: Vec<_> = emitter
            .elements
            .iter()
            .filter_map(|e| match e.as_edge() {
                Some(Edge::Item(item)) => Some(item),
                _ => None,
            })
            .collect();
        assert_eq!(item_edges.len(), 1);
        assert_eq!(item_edges[0].property, Some(ItemProperty::References));
        assert_eq!(item_edges[0].in_vs, vec![Id::Number(55)]);
    }

    #[test]
    fn test_with_roots_forwards_references_to_all_roots() {
        let mut table = SymbolDataTable::new();
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let shard = Id::Number(100);
        let owner = project(4);
        let r1 = create_standard(&mut table, "r1", owner, &shard, &mut builder, &mut emitter);
        let r2 = create_standard(&mut table, "r2", owner, &shard, &mut builder, &mut emitter);

        let multi = SymbolKey::new("multi");
        let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
        table
            .create(
                multi.clone(),
                owner,
                ModuleSystemKind::Module,
                Visibility::Transient,
                SymbolDataKind::WithRoots {
                    roots: vec![r1.clone(), r2.clone()],
                },
                Vec::new(),
                owner,
                &shard,
                &mut ctx,
            )
            .unwrap();

        table
            .add_reference_range(&multi, owner, &shard, Id::Number(60), ItemProperty::References, &mut ctx)
            .unwrap();
        // Definitions are ignored for multi-root symbols.
        table
            .add_definition(&multi, owner, &shard, Id::Number(61), &mut ctx)
            .unwrap();
        table.end_shard(owner, &shard, &mut ctx).unwrap();

        let item_edges: Vec<_> = emitter
            .elements
            .iter()
            .filter_map(|e| match e.as_edge() {
                Some(Edge::Item(item)) => Some(item),
                _ => None,
            })
            .collect();
        // Two roots each flush one references item; the multi symbol itself
        // flushes its cascaded reference results.
        let reference_items: Vec<_> = item_edges
            .iter()
            .filter(|i| i.property == Some(ItemProperty::References))
            .collect();
        assert_eq!(reference_items.len(), 2);
        for item in reference_items {
            assert_eq!(item.in_vs, vec![Id::Number(60)]);
        }
        assert!(
            item_edges
                .iter()
                .any(|i| i.property == Some(ItemProperty::ReferenceResults))
        );
    }

    #[test]
    fn test_chain_lookup_respects_project_access() {
        let mut table = SymbolDataTable::new();
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let shard = Id::Number(100);
        let key = SymbolKey::new("shared");

        // Entry owned by project 4, then a newer one owned by project 5.
        for owner in [4u32, 5u32] {
            let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
            table
                .create(
                    key.clone(),
                    project(owner),
                    ModuleSystemKind::Module,
                    Visibility::Exported,
                    SymbolDataKind::Standard,
                    Vec::new(),
                    project(owner),
                    &shard,
                    &mut ctx,
                )
                .unwrap();
        }

        assert_eq!(table.lookup(&key, project(4)).unwrap().project, project(4));
        assert_eq!(table.lookup(&key, project(5)).unwrap().project, project(5));
        // A third project sees neither private entry.
        assert!(table.lookup(&key, project(6)).is_none());

        table.release_project(project(5));
        assert!(table.lookup(&key, project(5)).is_none());
        assert_eq!(table.lookup(&key, project(4)).unwrap().project, project(4));
    }

    #[test]
    fn test_symbol_end_twice_is_an_error() {
        let mut table = SymbolDataTable::new();
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let shard = Id::Number(100);
        let owner = project(4);
        let key = create_standard(&mut table, "k", owner, &shard, &mut builder, &mut emitter);

        let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
        table.end_symbol(&key, owner, &mut ctx).unwrap();
        assert!(matches!(
            table.end_symbol(&key, owner, &mut ctx),
            Err(IndexError::SymbolEndedTwice { .. })
        ));
    }
}
