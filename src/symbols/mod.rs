//! Symbol identity, classification, and per-symbol emission state.
//!
//! A checker symbol is keyed by a content hash of its declarations
//! ([`SymbolKey`]), classified into one of six factory kinds, and backed by
//! a [`data::SymbolData`] record that buffers per-(project, shard)
//! partitions until the shard closes.

pub mod classifier;
pub mod data;
pub mod partition;

pub use classifier::{FactoryKind, ModuleSystemKind, factory_kind, module_system, symbol_key};
pub use data::{SymbolData, SymbolDataKind, SymbolDataTable};
pub use partition::Partition;

use crate::types::Span;
use serde::{Deserialize, Serialize};

/// Stable identity of a checker symbol across project generations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolKey(Box<str>);

impl SymbolKey {
    pub fn new(value: impl Into<Box<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity tuple of one declaration name; answers "is this location a
/// declaration of the symbol" without consulting the checker again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionInfo {
    pub file_name: String,
    pub span: Span,
}

impl DefinitionInfo {
    pub fn matches(&self, file_name: &str, span: Span) -> bool {
        self.file_name == file_name && self.span == span
    }
}
