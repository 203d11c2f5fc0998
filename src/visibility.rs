//! Visibility classification and indirect-export reachability.
//!
//! Exported symbols get a computable export path (dotted container chain
//! plus a module path part). Everything else starts `unknown` and is either
//! upgraded to `indirectExported` by the reachability walk below, or
//! downgraded to `internal` once every file watching it has finished.

use crate::checker::{SemanticHost, Signature, TypeFlags};
use crate::symbols::{SymbolKey, symbol_key};
use crate::types::{FileIdx, SymId, TypeId};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Total order; only `unknown -> indirectExported` and `unknown -> internal`
/// transitions are legal after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    Internal = 1,
    Unknown = 2,
    Transient = 3,
    IndirectExported = 4,
    Exported = 5,
}

/// Whether the walk attributes new export paths or only marks reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowMode {
    Exported,
    Imported,
}

/// Per-step traversal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraverseMode {
    Done,
    NoMark,
    Mark,
    NoExport,
    Export,
}

impl TraverseMode {
    fn marks(self) -> bool {
        matches!(self, TraverseMode::Mark | TraverseMode::NoExport | TraverseMode::Export)
    }

    fn attributes(self) -> bool {
        matches!(self, TraverseMode::Export)
    }

    /// Entering an input position drops path attribution; leaving one
    /// restores it for the exported flow.
    fn reversed(self, flow: FlowMode) -> Self {
        match self {
            TraverseMode::Done => TraverseMode::Done,
            TraverseMode::NoMark => TraverseMode::NoMark,
            TraverseMode::Export | TraverseMode::NoExport => TraverseMode::Mark,
            TraverseMode::Mark => match flow {
                FlowMode::Exported => TraverseMode::Export,
                FlowMode::Imported => TraverseMode::Mark,
            },
        }
    }
}

/// The `pathPart:namePart` pieces of a computed export path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPath {
    /// Module path part; empty for the global regime.
    pub path_part: String,
    /// Dotted chain of export names.
    pub name_path: String,
}

impl ExportPath {
    pub fn identifier(&self) -> String {
        crate::moniker::create(&self.name_path, Some(&self.path_part))
    }
}

/// One symbol reached by the walk that needs an attached export moniker.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub sym: SymId,
    pub export_path: ExportPath,
}

/// Result of one reachability walk.
#[derive(Debug, Default)]
pub struct Reachability {
    /// Symbols whose `unknown` visibility upgrades to `indirectExported`.
    pub marked: Vec<SymId>,
    /// Ordered attachments for moniker minting.
    pub attachments: Vec<Attachment>,
}

/// Stable synthetic tokens for internal symbol names (`__constructor`,
/// `__call`, ...). `default` and `export=` pass through unchanged.
#[derive(Debug, Default)]
struct SyntheticNames {
    assigned: HashMap<SymId, String>,
    next: u32,
}

impl SyntheticNames {
    fn name_for(&mut self, sym: SymId, escaped: &str, plain: &str) -> String {
        if !escaped.starts_with("__") {
            return plain.to_string();
        }
        self.assigned
            .entry(sym)
            .or_insert_with(|| {
                self.next += 1;
                format!("{}I", self.next)
            })
            .clone()
    }
}

/// Strip the source root prefix and extension to build a moniker path part.
pub fn module_path_for_file(host: &dyn SemanticHost, file: FileIdx) -> String {
    let file_name = &host.file(file).file_name;
    let root = host
        .options()
        .root_dir
        .clone()
        .unwrap_or_else(|| host.common_source_directory().to_string());
    let relative = file_name
        .strip_prefix(&root)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(file_name.as_str());

    for extension in [".d.ts", ".tsx", ".ts", ".jsx", ".js"] {
        if let Some(stem) = relative.strip_suffix(extension) {
            return stem.to_string();
        }
    }
    relative.to_string()
}

pub struct VisibilityEngine {
    synthetic: SyntheticNames,
}

impl Default for VisibilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityEngine {
    pub fn new() -> Self {
        Self {
            synthetic: SyntheticNames::default(),
        }
    }

    /// Compute the export path of `sym` by climbing the container chain to a
    /// module root. Every hop must appear in its container's exports; the
    /// global regime bottoms out at a parentless symbol instead.
    pub fn export_path(&mut self, host: &dyn SemanticHost, sym: SymId) -> Option<ExportPath> {
        let regime = crate::symbols::module_system(host, sym);
        let mut names: Vec<String> = Vec::new();
        let mut current = sym;

        loop {
            let info = host.symbol(current);
            let Some(parent) = info.parent else {
                // Only the global regime roots at a parentless symbol; a
                // module-level symbol without an export chain has no path.
                if regime != crate::symbols::ModuleSystemKind::Global {
                    return None;
                }
                let name = self.synthetic.name_for(current, &info.escaped_name, &info.name);
                names.push(name);
                names.reverse();
                return Some(ExportPath {
                    path_part: String::new(),
                    name_path: names.join("."),
                });
            };

            let parent_info = host.symbol(parent);
            let export_name = parent_info
                .exports
                .iter()
                .find(|&(_, &child)| child == current)
                .map(|(name, _)| name.clone())?;
            let export_name = match export_name.as_str() {
                "default" | "export=" => export_name,
                _ => self.synthetic.name_for(current, &info.escaped_name, &export_name),
            };
            names.push(export_name);

            // A file module symbol roots the chain with its module path.
            if let Some(module_file) = module_file_of(host, parent) {
                names.reverse();
                return Some(ExportPath {
                    path_part: module_path_for_file(host, module_file),
                    name_path: names.join("."),
                });
            }
            current = parent;
        }
    }

    /// Walk the types and members reachable from `start` (already exported
    /// with `path`), marking reachability and collecting attachments.
    pub fn walk_exported(
        &mut self,
        host: &dyn SemanticHost,
        start: SymId,
        path: &ExportPath,
        flow: FlowMode,
    ) -> Reachability {
        let mode = match flow {
            FlowMode::Exported => TraverseMode::Export,
            FlowMode::Imported => TraverseMode::Mark,
        };
        let mut walk = Walk {
            host,
            flow,
            seen_symbols: HashSet::new(),
            seen_types: HashSet::new(),
            synthetic: &mut self.synthetic,
            result: Reachability::default(),
        };
        // The start symbol itself is exported; only its reachable graph is
        // of interest.
        walk.seen_symbols.insert(symbol_key(host, start));
        if let Some(ty) = host
            .type_of_symbol(start)
            .or_else(|| declared_type(host, start))
        {
            walk.type_step(ty, &path.path_part, &path.name_path, mode);
        }
        walk.children_step(start, &path.path_part, &path.name_path, mode);
        walk.result
    }
}

fn declared_type(host: &dyn SemanticHost, sym: SymId) -> Option<TypeId> {
    host.symbol(sym)
        .declarations
        .iter()
        .find_map(|&decl| host.node(decl).ty)
}

/// Find the source file whose module symbol is `sym`, if any.
fn module_file_of(host: &dyn SemanticHost, sym: SymId) -> Option<FileIdx> {
    host.files()
        .iter()
        .enumerate()
        .find(|(_, file)| file.symbol == Some(sym))
        .map(|(index, _)| FileIdx::from_index(index))
}

struct Walk<'a> {
    host: &'a dyn SemanticHost,
    flow: FlowMode,
    seen_symbols: HashSet<SymbolKey>,
    seen_types: HashSet<TypeId>,
    synthetic: &'a mut SyntheticNames,
    result: Reachability,
}

impl Walk<'_> {
    fn type_step(&mut self, ty: TypeId, path_part: &str, name_path: &str, mode: TraverseMode) {
        if mode == TraverseMode::Done {
            return;
        }
        // Identity cycle break. Call and construct signatures are walked
        // below even when the owning symbol is already exported, so inferred
        // signature types still surface.
        if !self.seen_types.insert(ty) {
            return;
        }
        let info = self.host.ty(ty);
        if info.flags.intersects(TypeFlags::PRIMITIVE) {
            return;
        }
        trace!(type_id = ty.value(), ?mode, "visibility type step");

        if let Some(sym) = info.symbol {
            self.symbol_step(sym, path_part, name_path, mode);
        }
        if let Some(alias) = info.alias_symbol {
            self.symbol_step(alias, path_part, name_path, TraverseMode::Mark);
        }

        let signatures: Vec<Signature> = info
            .call_signatures
            .iter()
            .chain(info.construct_signatures.iter())
            .cloned()
            .collect();
        for signature in signatures {
            self.signature_step(&signature, path_part, name_path, mode);
        }

        let constituents = info.constituents.clone();
        for constituent in constituents {
            self.type_step(constituent, path_part, name_path, mode);
        }
        let base_types = info.base_types.clone();
        for base in base_types {
            self.type_step(base, path_part, name_path, mode);
        }
        let type_arguments = info.type_arguments.clone();
        for argument in type_arguments {
            self.type_step(argument, path_part, name_path, mode);
        }
        let alias_arguments = info.alias_type_arguments.clone();
        for argument in alias_arguments {
            self.type_step(argument, path_part, name_path, mode);
        }
        if let Some(conditional) = info.conditional {
            self.type_step(conditional.check_type, path_part, name_path, mode);
            self.type_step(conditional.extends_type, path_part, name_path, mode);
            if let Some(true_type) = conditional.true_type {
                self.type_step(true_type, path_part, name_path, mode);
            }
            if let Some(false_type) = conditional.false_type {
                self.type_step(false_type, path_part, name_path, mode);
            }
        }
    }

    fn signature_step(
        &mut self,
        signature: &Signature,
        path_part: &str,
        name_path: &str,
        mode: TraverseMode,
    ) {
        for &type_parameter in &signature.type_parameters {
            self.symbol_step(type_parameter, path_part, name_path, mode);
        }
        for &parameter in &signature.parameters {
            let parameter_mode = match self.host.type_of_symbol(parameter) {
                Some(parameter_type) if self.host.ty(parameter_type).is_callable() => {
                    mode.reversed(self.flow)
                }
                _ => mode,
            };
            self.symbol_step(parameter, path_part, name_path, parameter_mode);
            if let Some(parameter_type) = self.host.type_of_symbol(parameter) {
                self.type_step(parameter_type, path_part, name_path, parameter_mode);
            }
        }
        if let Some(return_type) = signature.return_type {
            self.type_step(return_type, path_part, name_path, mode);
        }
    }

    fn symbol_step(&mut self, sym: SymId, path_part: &str, parent_path: &str, mode: TraverseMode) {
        if mode == TraverseMode::Done || mode == TraverseMode::NoMark {
            return;
        }
        let key = symbol_key(self.host, sym);
        if !self.seen_symbols.insert(key) {
            return;
        }
        if mode.marks() {
            self.result.marked.push(sym);
        }

        let info = self.host.symbol(sym);
        let name = self.synthetic.name_for(sym, &info.escaped_name, &info.name);
        let child_path = if parent_path.is_empty() {
            name
        } else {
            format!("{parent_path}.{name}")
        };
        if mode.attributes() {
            self.result.attachments.push(Attachment {
                sym,
                export_path: ExportPath {
                    path_part: path_part.to_string(),
                    name_path: child_path.clone(),
                },
            });
        }

        if let Some(ty) = self.host.type_of_symbol(sym) {
            self.type_step(ty, path_part, &child_path, mode);
        }
        self.children_step(sym, path_part, &child_path, mode);
    }

    /// Walk declared children via exports and members, skipping the
    /// prototype and type-parameter pseudo-members.
    fn children_step(&mut self, sym: SymId, path_part: &str, parent_path: &str, mode: TraverseMode) {
        if mode == TraverseMode::Done || mode == TraverseMode::NoMark {
            return;
        }
        let info = self.host.symbol(sym);
        let children: Vec<SymId> = info
            .exports
            .values()
            .chain(info.members.values())
            .copied()
            .collect();
        for child in children {
            let child_info = self.host.symbol(child);
            if child_info.is_prototype() || child_info.is_type_parameter() {
                continue;
            }
            self.symbol_step(child, path_part, parent_path, mode);
        }
    }
}
