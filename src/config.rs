//! Configuration for the index generator.
//!
//! Layered settings: built-in defaults, then `tsgraph.toml`, then
//! `TSGRAPH_`-prefixed environment variables, then CLI flags. Project input
//! is a checked-program snapshot (`program.json`) carrying its tsconfig;
//! tsconfig bodies are JSON5 (comments and trailing commas allowed).
//!
//! # Environment Variables
//!
//! Nested levels use double underscores:
//! - `TSGRAPH_OUTPUT__FORMAT=json` sets `output.format`
//! - `TSGRAPH_LOGGING__DEFAULT=debug` sets `logging.default`

use crate::checker::{CompilerOptions, Program};
use crate::error::{ProjectError, ProjectResult};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Line,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    Number,
    Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MonikerMode {
    /// Fail when an exported symbol has no computable moniker.
    Strict,
    /// Warn and fall back to a local moniker.
    Lenient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: OutputFormat,
    #[serde(default)]
    pub out: Option<PathBuf>,
    #[serde(default)]
    pub stdout: bool,
    #[serde(default)]
    pub no_contents: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default = "default_id_strategy")]
    pub id: IdStrategy,
    #[serde(default = "default_moniker_mode")]
    pub moniker: MonikerMode,
    /// Workspace group name used for the source vertex and group manager.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub no_project_references: bool,
    /// Recorded for the front end; acquisition itself happens there.
    #[serde(default)]
    pub type_acquisition: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_format() -> OutputFormat {
    OutputFormat::Line
}

fn default_id_strategy() -> IdStrategy {
    IdStrategy::Number
}

fn default_moniker_mode() -> MonikerMode {
    MonikerMode::Lenient
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            out: None,
            stdout: false,
            no_contents: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            id: default_id_strategy(),
            moniker: default_moniker_mode(),
            group: None,
            project_name: None,
            no_project_references: false,
            type_acquisition: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Load configuration from defaults, `tsgraph.toml`, and environment.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("tsgraph.toml"))
            .merge(Env::prefixed("TSGRAPH_").split("__"))
            .extract()
    }
}

// ---------------------------------------------------------------------------
// Project snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectReference {
    pub path: String,
}

/// The tsconfig subset the engine consumes, JSON5-tolerant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TsConfig {
    #[serde(default)]
    pub compiler_options: CompilerOptions,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub references: Vec<ProjectReference>,
}

impl TsConfig {
    /// Resolve the project's root file set against the program's file list.
    /// `files` wins outright; otherwise `include`/`exclude` globs filter the
    /// candidates; an empty config takes everything.
    pub fn root_files(&self, base: &Path, candidates: &[String]) -> HashSet<String> {
        if !self.files.is_empty() {
            return self
                .files
                .iter()
                .map(|file| resolve_against(base, file))
                .collect();
        }

        let include: Vec<glob::Pattern> = self
            .include
            .iter()
            .filter_map(|pattern| glob::Pattern::new(&resolve_against(base, pattern)).ok())
            .collect();
        let exclude: Vec<glob::Pattern> = self
            .exclude
            .iter()
            .filter_map(|pattern| glob::Pattern::new(&resolve_against(base, pattern)).ok())
            .collect();

        candidates
            .iter()
            .filter(|candidate| {
                let included =
                    include.is_empty() || include.iter().any(|p| p.matches(candidate));
                let excluded = exclude.iter().any(|p| p.matches(candidate));
                included && !excluded
            })
            .cloned()
            .collect()
    }
}

fn resolve_against(base: &Path, relative: &str) -> String {
    if relative.starts_with('/') {
        relative.to_string()
    } else {
        base.join(relative).to_string_lossy().into_owned()
    }
}

/// One loadable unit of work: a checked program plus its tsconfig.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tsconfig: TsConfig,
    pub program: Program,
}

impl ProjectSnapshot {
    pub fn load(path: &Path) -> ProjectResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ProjectError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json5::from_str(&text).map_err(|error| ProjectError::Parse {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })
    }
}

/// Load the initial snapshot plus (optionally) its transitive project
/// references, dependencies first. Reference cycles are tolerated; each
/// snapshot loads once.
pub fn collect_snapshots(
    initial: &Path,
    follow_references: bool,
) -> ProjectResult<Vec<(PathBuf, ProjectSnapshot)>> {
    let mut ordered: Vec<(PathBuf, ProjectSnapshot)> = Vec::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    collect_into(initial, follow_references, &mut visited, &mut ordered)?;
    Ok(ordered)
}

fn collect_into(
    path: &Path,
    follow_references: bool,
    visited: &mut HashSet<PathBuf>,
    ordered: &mut Vec<(PathBuf, ProjectSnapshot)>,
) -> ProjectResult<()> {
    let resolved = resolve_project_path(path)?;
    if !visited.insert(resolved.clone()) {
        return Ok(());
    }
    let snapshot = ProjectSnapshot::load(&resolved)?;

    if follow_references {
        let base = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
        for reference in &snapshot.tsconfig.references {
            let target = base.join(&reference.path);
            collect_into(&target, follow_references, visited, ordered).map_err(|_| {
                ProjectError::BadReference {
                    path: resolved.clone(),
                    reference: reference.path.clone(),
                }
            })?;
        }
    }

    ordered.push((resolved, snapshot));
    Ok(())
}

/// Resolve `-p`: a snapshot file directly, or a directory containing
/// `program.json`.
pub fn resolve_project_path(path: &Path) -> ProjectResult<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.is_dir() {
        for entry in walkdir::WalkDir::new(path)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && entry.file_name() == "program.json" {
                return Ok(entry.into_path());
            }
        }
    }
    Err(ProjectError::Missing {
        path: path.to_path_buf(),
    })
}
