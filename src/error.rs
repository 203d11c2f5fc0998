//! Error types for the index generator.
//!
//! Structured errors via thiserror, split by domain: `IndexError` for the
//! emission engine (invariant violations are fatal, the dump is invalid),
//! `ProjectError` for loading project snapshots and configuration.

use crate::types::ProjectId;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the indexing engine
#[derive(Error, Debug)]
pub enum IndexError {
    /// Partition lifecycle violation: a (project, shard) partition was
    /// re-opened after its end edges were already emitted.
    #[error("Partition for project {project:?} re-opened after end in shard {shard}")]
    PartitionReopened { project: ProjectId, shard: String },

    #[error("Symbol data for key '{key}' ended twice")]
    SymbolEndedTwice { key: String },

    #[error("Edge label '{label}' does not permit {out_label} -> {in_label}")]
    IllegalEdge {
        label: &'static str,
        out_label: &'static str,
        in_label: &'static str,
    },

    #[error("Edge references id {id} before its vertex was emitted")]
    DanglingEdge { id: String },

    /// Strict moniker mode: an exported symbol has no computable export path.
    #[error("No moniker could be computed for exported symbol '{name}'")]
    MonikerMissing { name: String },

    #[error("Failed to write dump to '{path}': {source}")]
    DumpWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize graph element: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    General(String),
}

impl IndexError {
    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::PartitionReopened { .. } | Self::SymbolEndedTwice { .. } => vec![
                "This is an internal lifecycle bug; the produced dump must be discarded",
                "Re-run with RUST_LOG=tsgraph=debug and file an issue with the log",
            ],
            Self::MonikerMissing { .. } => vec![
                "Re-run with '--moniker lenient' to fall back to a local moniker",
            ],
            Self::DumpWrite { .. } => vec![
                "Check disk space and permissions for the output path",
                "Use '--stdout' to bypass the file sink",
            ],
            _ => vec![],
        }
    }
}

/// Errors raised while loading project snapshots and tsconfig data
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Project file '{path}' does not exist")]
    Missing { path: PathBuf },

    #[error("Failed to read project file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Project reference '{reference}' from '{path}' could not be resolved")]
    BadReference { path: PathBuf, reference: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

/// Result type alias for engine operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for project loading
pub type ProjectResult<T> = Result<T, ProjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_actionable() {
        let err = IndexError::PartitionReopened {
            project: ProjectId::new(1).unwrap(),
            shard: "file:///a.ts".to_string(),
        };
        assert!(err.to_string().contains("re-opened"));
        assert!(!err.recovery_suggestions().is_empty());

        let err = ProjectError::Missing {
            path: PathBuf::from("/missing/tsconfig.json"),
        };
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_moniker_missing_suggests_lenient() {
        let err = IndexError::MonikerMissing {
            name: "foo".to_string(),
        };
        let suggestions = err.recovery_suggestions();
        assert!(suggestions.iter().any(|s| s.contains("lenient")));
    }
}
