//! The indexing driver: a pre-order visitor over the checked tree that
//! feeds the symbol store and emits the dump.

pub mod document;
pub mod driver;

pub use document::FileState;
pub use driver::{Indexer, IndexerOptions, Session};
