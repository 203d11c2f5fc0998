//! Cross-package moniker linking.
//!
//! Import-kind `tsc` monikers whose path crosses a `node_modules` boundary
//! get an `npm` alias moniker attached, plus a `packageInformation` vertex
//! built from the owning package manifest. When the indexed project itself
//! has a manifest, exported monikers get the same treatment in the other
//! direction.

use crate::emitter::Emitter;
use crate::error::{IndexError, IndexResult};
use crate::graph::{Id, MonikerKind, PackageInformation, Repository, UniquenessLevel};
use crate::moniker;
use crate::symbols::data::{EmitCtx, MonikerRecord};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The manifest fields the linker consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub typings: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub repository: Option<ManifestRepository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestRepository {
    #[serde(rename = "type")]
    pub repo_type: String,
    pub url: String,
}

impl PackageManifest {
    /// The in-package path that maps to the bare package name.
    fn entry_paths(&self) -> Vec<String> {
        self.typings
            .iter()
            .chain(self.types.iter())
            .chain(self.main.iter())
            .map(|entry| strip_entry(entry))
            .collect()
    }
}

fn strip_entry(entry: &str) -> String {
    let entry = entry.strip_prefix("./").unwrap_or(entry);
    for extension in [".d.ts", ".ts", ".js"] {
        if let Some(stem) = entry.strip_suffix(extension) {
            return stem.to_string();
        }
    }
    entry.to_string()
}

pub struct Linker {
    /// Directory all moniker paths are resolved against.
    workspace_root: PathBuf,
    /// The indexed project's own manifest, for export monikers.
    project_manifest: Option<(PathBuf, PackageManifest)>,
    /// Write-once manifest cache; `None` records a failed probe.
    manifests: HashMap<PathBuf, Option<PackageManifest>>,
    /// One packageInformation vertex per package name.
    package_vertices: HashMap<String, Id>,
}

impl Linker {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            project_manifest: None,
            manifests: HashMap::new(),
            package_vertices: HashMap::new(),
        }
    }

    /// Load the project's own package.json so exported symbols can carry npm
    /// monikers. A missing or unreadable manifest disables the export side.
    pub fn with_project_manifest(mut self, path: impl Into<PathBuf>) -> IndexResult<Self> {
        let path = path.into();
        let manifest = read_manifest(&path)?;
        self.project_manifest = Some((path, manifest));
        Ok(self)
    }

    /// Attach an `npm` alias to an import-kind `tsc` moniker. Unresolvable
    /// packages are cached as misses and left unlinked.
    pub fn attach_import_moniker(
        &mut self,
        record: &MonikerRecord,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<Option<Id>> {
        debug_assert_eq!(record.kind, MonikerKind::Import);
        let (Some(path), name) = moniker::parse(&record.identifier) else {
            return Ok(None);
        };

        let segments: Vec<&str> = path.split('/').collect();
        // Right-to-left so nested node_modules resolve to the innermost
        // package.
        let Some(nm_index) = segments.iter().rposition(|s| *s == "node_modules") else {
            return Ok(None);
        };
        let scoped = segments
            .get(nm_index + 1)
            .is_some_and(|s| s.starts_with('@'));
        let name_len = if scoped { 2 } else { 1 };
        if segments.len() < nm_index + 1 + name_len {
            return Ok(None);
        }
        let package_dir_segments = &segments[..nm_index + 1 + name_len];
        let in_package = segments[nm_index + 1 + name_len..].join("/");

        let manifest_path = self
            .workspace_root
            .join(package_dir_segments.join("/"))
            .join("package.json");
        let Some(manifest) = self.manifest_at(&manifest_path)? else {
            return Ok(None);
        };

        let in_package = if manifest.entry_paths().contains(&in_package) {
            String::new()
        } else {
            in_package
        };
        let identifier = npm_identifier(&manifest.name, &in_package, &name);
        self.emit_npm_moniker(record, &manifest, identifier, MonikerKind::Import, ctx)
            .map(Some)
    }

    /// Attach an `npm` alias to an exported moniker of the indexed project.
    pub fn attach_export_moniker(
        &mut self,
        record: &MonikerRecord,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<Option<Id>> {
        debug_assert_eq!(record.kind, MonikerKind::Export);
        let Some((_, manifest)) = self.project_manifest.clone() else {
            return Ok(None);
        };
        let (path, name) = moniker::parse(&record.identifier);
        let path = path.unwrap_or_default();
        let in_package = if manifest.entry_paths().contains(&path) {
            String::new()
        } else {
            path
        };
        let identifier = npm_identifier(&manifest.name, &in_package, &name);
        self.emit_npm_moniker(record, &manifest, identifier, MonikerKind::Export, ctx)
            .map(Some)
    }

    fn manifest_at(&mut self, path: &Path) -> IndexResult<Option<PackageManifest>> {
        if let Some(cached) = self.manifests.get(path) {
            return Ok(cached.clone());
        }
        let loaded = match read_manifest(path) {
            Ok(manifest) => Some(manifest),
            Err(error) => {
                // Import resolution failures are silent; the tsc moniker
                // simply keeps standing alone.
                debug!(path = %path.display(), %error, "package manifest probe failed");
                None
            }
        };
        self.manifests.insert(path.to_path_buf(), loaded.clone());
        Ok(loaded)
    }

    fn emit_npm_moniker(
        &mut self,
        original: &MonikerRecord,
        manifest: &PackageManifest,
        identifier: String,
        kind: MonikerKind,
        ctx: &mut EmitCtx<'_>,
    ) -> IndexResult<Id> {
        let vertex = ctx
            .builder
            .moniker("npm", identifier, UniquenessLevel::Scheme, kind);
        ctx.emitter.emit(&vertex)?;
        let attach = ctx
            .builder
            .attach(vertex.id.clone(), original.vertex.clone());
        ctx.emitter.emit(&attach)?;

        let package_vertex = match self.package_vertices.get(&manifest.name) {
            Some(id) => id.clone(),
            None => {
                let info = ctx.builder.package_information(PackageInformation {
                    name: manifest.name.clone(),
                    manager: "npm".to_string(),
                    uri: None,
                    version: manifest.version.clone(),
                    repository: manifest.repository.as_ref().map(|repo| Repository {
                        repo_type: repo.repo_type.clone(),
                        url: repo.url.clone(),
                        commit_id: None,
                    }),
                });
                ctx.emitter.emit(&info)?;
                self.package_vertices
                    .insert(manifest.name.clone(), info.id.clone());
                info.id
            }
        };
        let edge = ctx
            .builder
            .package_information_edge(vertex.id.clone(), package_vertex);
        ctx.emitter.emit(&edge)?;
        Ok(vertex.id)
    }
}

/// `pkgName:pathInsidePkg:namePart` with the package and path escaped.
fn npm_identifier(package: &str, in_package: &str, name: &str) -> String {
    let inner = moniker::create(name, Some(in_package));
    moniker::create(&inner, Some(package))
}

fn read_manifest(path: &Path) -> IndexResult<PackageManifest> {
    let text = std::fs::read_to_string(path)
        .map_err(|error| IndexError::General(format!("read {}: {error}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|error| IndexError::General(format!("parse {}: {error}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::MemoryEmitter;
    use crate::graph::{Builder, Counter, Edge, Vertex};
    use tempfile::TempDir;

    fn record(identifier: &str, kind: MonikerKind) -> MonikerRecord {
        MonikerRecord {
            vertex: Id::Number(10),
            scheme: "tsc".to_string(),
            identifier: identifier.to_string(),
            unique: UniquenessLevel::Group,
            kind,
        }
    }

    fn write_manifest(dir: &Path, body: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("package.json"), body).unwrap();
    }

    #[test]
    fn test_import_moniker_gets_npm_alias() {
        let tmp = TempDir::new().unwrap();
        write_manifest(
            &tmp.path().join("node_modules/lodash"),
            r#"{"name": "lodash", "version": "4.17.21", "main": "index.js"}"#,
        );

        let mut linker = Linker::new(tmp.path());
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
        let npm = linker
            .attach_import_moniker(
                &record("node_modules/lodash/index:chunk", MonikerKind::Import),
                &mut ctx,
            )
            .unwrap();
        assert!(npm.is_some());

        let monikers: Vec<_> = emitter
            .elements
            .iter()
            .filter_map(|e| match e.as_vertex() {
                Some(Vertex::Moniker(m)) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(monikers.len(), 1);
        assert_eq!(monikers[0].scheme, "npm");
        // index.js is the package main, so the in-package path is dropped.
        assert_eq!(monikers[0].identifier, "lodash::chunk");
        assert_eq!(monikers[0].unique, UniquenessLevel::Scheme);

        assert!(emitter.elements.iter().any(|e| matches!(
            e.as_edge(),
            Some(Edge::Attach(_))
        )));
        assert!(emitter.elements.iter().any(|e| matches!(
            e.as_vertex(),
            Some(Vertex::PackageInformation(info)) if info.name == "lodash"
        )));
        assert!(emitter.elements.iter().any(|e| matches!(
            e.as_edge(),
            Some(Edge::PackageInformation(_))
        )));
    }

    #[test]
    fn test_scoped_package_name_spans_two_segments() {
        let tmp = TempDir::new().unwrap();
        write_manifest(
            &tmp.path().join("node_modules/@types/node"),
            r#"{"name": "@types/node", "version": "20.0.0", "types": "index.d.ts"}"#,
        );

        let mut linker = Linker::new(tmp.path());
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
        linker
            .attach_import_moniker(
                &record(
                    "node_modules/@types/node/fs/promises:readFile",
                    MonikerKind::Import,
                ),
                &mut ctx,
            )
            .unwrap();

        let moniker = emitter
            .elements
            .iter()
            .find_map(|e| match e.as_vertex() {
                Some(Vertex::Moniker(m)) => Some(m),
                _ => None,
            })
            .unwrap();
        assert_eq!(moniker.identifier, "@types/node:fs/promises:readFile");
    }

    #[test]
    fn test_missing_manifest_is_cached_and_silent() {
        let tmp = TempDir::new().unwrap();
        let mut linker = Linker::new(tmp.path());
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();

        for _ in 0..2 {
            let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
            let result = linker
                .attach_import_moniker(
                    &record("node_modules/ghost/lib:spooky", MonikerKind::Import),
                    &mut ctx,
                )
                .unwrap();
            assert!(result.is_none());
        }
        assert!(emitter.elements.is_empty());
        assert_eq!(linker.manifests.len(), 1);
    }

    #[test]
    fn test_export_moniker_uses_project_manifest() {
        let tmp = TempDir::new().unwrap();
        write_manifest(
            tmp.path(),
            r#"{"name": "mylib", "version": "1.0.0", "main": "index.js"}"#,
        );

        let mut linker = Linker::new(tmp.path())
            .with_project_manifest(tmp.path().join("package.json"))
            .unwrap();
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
        linker
            .attach_export_moniker(&record("index:fn", MonikerKind::Export), &mut ctx)
            .unwrap();

        let moniker = emitter
            .elements
            .iter()
            .find_map(|e| match e.as_vertex() {
                Some(Vertex::Moniker(m)) => Some(m),
                _ => None,
            })
            .unwrap();
        assert_eq!(moniker.scheme, "npm");
        assert_eq!(moniker.identifier, "mylib::fn");
        assert_eq!(moniker.kind, MonikerKind::Export);
    }

    #[test]
    fn test_moniker_without_node_modules_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let mut linker = Linker::new(tmp.path());
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        let mut ctx = EmitCtx::new(&mut builder, &mut emitter);
        let result = linker
            .attach_import_moniker(&record("src/local:thing", MonikerKind::Import), &mut ctx)
            .unwrap();
        assert!(result.is_none());
        assert!(emitter.elements.is_empty());
    }
}
