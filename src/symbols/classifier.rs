//! Symbol classification: stable keys, factory kinds, module regimes.

use super::SymbolKey;
use crate::checker::SemanticHost;
use crate::types::SymId;
use sha2::{Digest, Sha256};

/// Sentinel keys for symbols the checker reports without declarations.
const KEY_UNKNOWN: &str = "|unknown|";
const KEY_UNDEFINED: &str = "|undefined|";
const KEY_NONE: &str = "|none|";

/// Which specialised symbol-data factory handles a symbol.
///
/// Order matters: the first matching kind wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryKind {
    /// More than one underlying root symbol (union/intersection members).
    WithRoots,
    Transient,
    TypeAlias,
    Alias,
    Method,
    Standard,
}

/// Module regime of a symbol's declaring files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleSystemKind {
    Module,
    Global,
    Unknown,
}

/// Content hash over the symbol's sorted declaration triples.
pub fn symbol_key(host: &dyn SemanticHost, sym: SymId) -> SymbolKey {
    let info = host.symbol(sym);
    if info.declarations.is_empty() {
        let sentinel = match info.name.as_str() {
            "unknown" => KEY_UNKNOWN,
            "undefined" => KEY_UNDEFINED,
            _ => KEY_NONE,
        };
        return SymbolKey::new(sentinel);
    }

    let mut triples: Vec<(String, u32, u32)> = info
        .declarations
        .iter()
        .map(|&decl| {
            let node = host.node(decl);
            let file = host.file(node.file);
            (file.file_name.clone(), node.span.start, node.span.end)
        })
        .collect();
    triples.sort();

    let mut hasher = Sha256::new();
    for (file, start, end) in &triples {
        hasher.update(file.as_bytes());
        hasher.update(b"|");
        hasher.update(start.to_le_bytes());
        hasher.update(end.to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(32);
    for byte in digest.iter().take(16) {
        hex.push_str(&format!("{byte:02x}"));
    }
    SymbolKey::new(hex)
}

/// Pick the factory for a symbol. First match wins.
pub fn factory_kind(host: &dyn SemanticHost, sym: SymId) -> FactoryKind {
    let roots = host.root_symbols(sym);
    if roots.len() > 1 {
        return FactoryKind::WithRoots;
    }
    let info = host.symbol(sym);
    if info.is_transient() {
        return FactoryKind::Transient;
    }
    if info.is_type_alias() {
        return FactoryKind::TypeAlias;
    }
    if info.is_alias() {
        return FactoryKind::Alias;
    }
    if info.is_method() {
        return FactoryKind::Method;
    }
    FactoryKind::Standard
}

/// A file is module-regime when the checker assigned it a file symbol.
/// All declaring files must agree, otherwise the regime is unknown.
pub fn module_system(host: &dyn SemanticHost, sym: SymId) -> ModuleSystemKind {
    let info = host.symbol(sym);
    let mut result: Option<ModuleSystemKind> = None;
    for &decl in &info.declarations {
        let file = host.file(host.node(decl).file);
        let kind = if file.symbol.is_some() {
            ModuleSystemKind::Module
        } else {
            ModuleSystemKind::Global
        };
        match result {
            None => result = Some(kind),
            Some(previous) if previous == kind => {}
            Some(_) => return ModuleSystemKind::Unknown,
        }
    }
    result.unwrap_or(ModuleSystemKind::Unknown)
}
