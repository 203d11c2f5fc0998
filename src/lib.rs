//! LSIF index generation for checked TypeScript program snapshots.
//!
//! The engine walks a checked syntax tree once per source file, resolves
//! names to stable symbol identities, classifies visibility and export
//! reachability, mints cross-package monikers, and buffers per-shard data so
//! the dump stream carries correct cardinality and lifecycle events.

pub mod checker;
pub mod cli;
pub mod config;
pub mod emitter;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod linker;
pub mod logging;
pub mod moniker;
pub mod project;
pub mod symbols;
pub mod types;
pub mod visibility;

pub use config::{ProjectSnapshot, Settings, TsConfig};
pub use error::{IndexError, IndexResult, ProjectError, ProjectResult};
pub use indexer::{IndexerOptions, Session};
pub use types::*;
