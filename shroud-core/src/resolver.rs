//! 路径解析器
//!
//! 将请求路径解析为具体文件。
//!
//! # 解析规则
//! - `./x`、`../x`、`.`、`..` → 相对于调用方目录
//! - `/x` → 绝对路径
//! - 其他 → 依次相对于搜索路径中的每个目录
//!
//! For every candidate `p` the probes run in this order, the first existing
//! file wins:
//!
//! 1. `p` as given
//! 2. its compiled artifact `p<suffix>`
//! 3. the package entry `p/__init__.<ext>`
//! 4. the package entry's compiled artifact
//! 5. `p.<ext>` (skipped when `p` already ends in `.<ext>`)
//! 6. `p.<ext><suffix>` (likewise)
//!
//! With an artifact store attached, a compiled form only counts when the
//! store would hand out its contents.

use crate::artifact::ArtifactStore;
use crate::error::LoadError;
use crate::location::{is_absolute, Location};
use crate::targets;
use serde::Serialize;
use shroud_config::LoaderConfig;
use shroud_vfs::VirtualFileSystem;
use std::collections::HashSet;
use tracing::trace;

/// Naming conventions the resolver probes with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLayout {
    /// Source extension without the dot
    pub extension: String,
    /// Package entry name without extension
    pub package_init: String,
    /// Compiled-artifact suffix
    pub artifact_suffix: String,
}

impl UnitLayout {
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            extension: config.source_extension.clone(),
            package_init: config.package_init.clone(),
            artifact_suffix: config.artifact_tag.clone(),
        }
    }

    /// `.src`
    pub fn dotted_extension(&self) -> String {
        format!(".{}", self.extension)
    }

    /// `__init__.src`
    pub fn package_entry(&self) -> String {
        format!("{}.{}", self.package_init, self.extension)
    }
}

impl Default for UnitLayout {
    fn default() -> Self {
        Self::from_config(&LoaderConfig::default())
    }
}

/// Outcome of resolving a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    /// The file that exists and will be loaded
    pub file: Location,
    /// Whether `file` is a compiled artifact
    pub compiled: bool,
    /// Canonical source location; the unit's identity
    pub source: Location,
}

/// How a request path is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `./`, `../`, `.` or `..`: against the caller's directory
    Relative,
    /// Leading `/` (or drive root)
    Absolute,
    /// Anything else: against each search-path entry
    Search,
}

pub fn classify(request: &str) -> RequestKind {
    if is_caller_relative(request) {
        RequestKind::Relative
    } else if is_absolute(request) {
        RequestKind::Absolute
    } else {
        RequestKind::Search
    }
}

/// `.`, `..`, `./…` or `../…`
pub fn is_caller_relative(path: &str) -> bool {
    path == "." || path == ".." || path.starts_with("./") || path.starts_with("../")
}

/// Turn host-supplied search entries into locations.
///
/// Entries written relative to the caller (`./lib`) are anchored at the
/// caller's directory; other relative entries at the working directory.
/// Empty entries are ignored.
pub fn absolutize_entries<S: AsRef<str>>(
    entries: &[S],
    caller_dir: &Location,
    working_dir: &Location,
) -> Vec<Location> {
    entries
        .iter()
        .map(AsRef::as_ref)
        .filter(|e| !e.is_empty())
        .map(|e| {
            if is_caller_relative(e) {
                caller_dir.join(e)
            } else {
                working_dir.join(e)
            }
        })
        .collect()
}

/// Concatenate search-path layers in priority order, keeping the first
/// position of every duplicate.
pub fn assemble_search_path(layers: &[&[Location]]) -> Vec<Location> {
    let mut seen: HashSet<&Location> = HashSet::new();
    let mut assembled = Vec::new();
    for layer in layers {
        for entry in layer.iter() {
            if seen.insert(entry) {
                assembled.push(entry.clone());
            }
        }
    }
    assembled
}

/// Resolves requests to concrete files
pub struct PathResolver<'a> {
    vfs: &'a dyn VirtualFileSystem,
    layout: &'a UnitLayout,
    artifacts: Option<&'a dyn ArtifactStore>,
}

impl<'a> PathResolver<'a> {
    pub fn new(vfs: &'a dyn VirtualFileSystem, layout: &'a UnitLayout) -> Self {
        Self {
            vfs,
            layout,
            artifacts: None,
        }
    }

    /// Skip compiled forms that `store` would reject
    pub fn with_artifacts(mut self, store: &'a dyn ArtifactStore) -> Self {
        self.artifacts = Some(store);
        self
    }

    /// `.` and `./` name the package entry of the caller's directory
    pub fn normalize_request(&self, request: &str) -> String {
        match request {
            "." | "./" => format!("./{}", self.layout.package_init),
            other => other.to_string(),
        }
    }

    /// Resolve `request` against `base` (the caller's directory) and the
    /// already assembled `search` path.
    pub fn resolve(
        &self,
        request: &str,
        base: &Location,
        search: &[Location],
    ) -> Result<Resolved, LoadError> {
        if request.trim().is_empty() {
            return Err(LoadError::invalid_request(request, "empty path"));
        }
        let normalized = self.normalize_request(request);

        let (searched, candidates) = match classify(&normalized) {
            RequestKind::Relative => (vec![base.clone()], vec![base.join(&normalized)]),
            RequestKind::Absolute => {
                let absolute = Location::parse(&normalized).ok_or_else(|| {
                    LoadError::invalid_request(request, "malformed absolute path")
                })?;
                (Vec::new(), vec![absolute])
            }
            RequestKind::Search => {
                let candidates = search.iter().map(|dir| dir.join(&normalized)).collect();
                (search.to_vec(), candidates)
            }
        };

        let mut tried = Vec::new();
        for candidate in &candidates {
            if let Some(resolved) = self.probe(candidate, &mut tried) {
                trace!(
                    target: targets::RESOLVE,
                    request,
                    file = %resolved.file,
                    compiled = resolved.compiled,
                    "resolved"
                );
                return Ok(resolved);
            }
        }

        trace!(target: targets::RESOLVE, request, probes = tried.len(), "not found");
        Err(LoadError::NotFound {
            request: request.to_string(),
            searched,
            tried,
        })
    }

    /// Probe one candidate in the fixed order, recording every file tried
    fn probe(&self, candidate: &Location, tried: &mut Vec<Location>) -> Option<Resolved> {
        let suffix = self.layout.artifact_suffix.as_str();
        let dotted = self.layout.dotted_extension();
        let entry = candidate.join(&self.layout.package_entry());

        let mut forms = vec![
            (candidate.clone(), false),
            (candidate.with_suffix(suffix), true),
            (entry.clone(), false),
            (entry.with_suffix(suffix), true),
        ];
        if !candidate.ends_with(&dotted) {
            let completed = candidate.with_suffix(&dotted);
            forms.push((completed.with_suffix(suffix), true));
            forms.insert(4, (completed, false));
        }

        for (file, compiled) in forms {
            tried.push(file.clone());
            if !self.vfs.is_file(file.as_path()) {
                continue;
            }
            let source = if compiled {
                file.strip_suffix(suffix)?
            } else {
                file.clone()
            };
            if compiled && !self.usable_artifact(&source) {
                trace!(target: targets::RESOLVE, file = %file, "unusable artifact skipped");
                continue;
            }
            return Some(Resolved {
                file,
                compiled,
                source,
            });
        }
        None
    }

    fn usable_artifact(&self, source: &Location) -> bool {
        match self.artifacts {
            Some(store) => store.try_get_compiled(source).is_some(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_vfs::MemoryFileSystem;

    fn loc(s: &str) -> Location {
        Location::parse(s).unwrap()
    }

    fn tag() -> String {
        UnitLayout::default().artifact_suffix
    }

    fn create_test_fs() -> MemoryFileSystem {
        MemoryFileSystem::with_files([
            ("/app/main.src".to_string(), "export 1"),
            ("/app/lib/status.src".to_string(), "export 2"),
            ("/app/plugin/__init__.src".to_string(), "export 3"),
            ("/app/exact".to_string(), "export 4"),
            (format!("/app/shipped.src{}", tag()), "compiled"),
            ("/opt/shared/status.src".to_string(), "export 5"),
            ("/opt/shared/extra.src".to_string(), "export 6"),
        ])
    }

    #[test]
    fn test_relative_with_extension_completion() {
        let fs = create_test_fs();
        let layout = UnitLayout::default();
        let resolver = PathResolver::new(&fs, &layout);

        let r = resolver.resolve("./lib/status", &loc("/app"), &[]).unwrap();
        assert_eq!(r.file.as_str(), "/app/lib/status.src");
        assert_eq!(r.source, r.file);
        assert!(!r.compiled);

        let r = resolver.resolve("../main.src", &loc("/app/lib"), &[]).unwrap();
        assert_eq!(r.file.as_str(), "/app/main.src");
    }

    #[test]
    fn test_literal_file_wins() {
        let fs = create_test_fs();
        let layout = UnitLayout::default();
        let resolver = PathResolver::new(&fs, &layout);

        let r = resolver.resolve("/app/exact", &loc("/"), &[]).unwrap();
        assert_eq!(r.file.as_str(), "/app/exact");
    }

    #[test]
    fn test_package_directory() {
        let fs = create_test_fs();
        let layout = UnitLayout::default();
        let resolver = PathResolver::new(&fs, &layout);

        let r = resolver.resolve("./plugin", &loc("/app"), &[]).unwrap();
        assert_eq!(r.file.as_str(), "/app/plugin/__init__.src");

        let r = resolver.resolve(".", &loc("/app/plugin"), &[]).unwrap();
        assert_eq!(r.file.as_str(), "/app/plugin/__init__.src");
        let r = resolver.resolve("./", &loc("/app/plugin"), &[]).unwrap();
        assert_eq!(r.file.as_str(), "/app/plugin/__init__.src");
    }

    #[test]
    fn test_compiled_only() {
        let fs = create_test_fs();
        let layout = UnitLayout::default();
        let resolver = PathResolver::new(&fs, &layout);

        let r = resolver.resolve("./shipped", &loc("/app"), &[]).unwrap();
        assert!(r.compiled);
        assert_eq!(r.file.as_str(), format!("/app/shipped.src{}", tag()));
        assert_eq!(r.source.as_str(), "/app/shipped.src");
    }

    #[test]
    fn test_search_path_order() {
        let fs = create_test_fs();
        let layout = UnitLayout::default();
        let resolver = PathResolver::new(&fs, &layout);
        let search = [loc("/app/lib"), loc("/opt/shared")];

        let r = resolver.resolve("status", &loc("/elsewhere"), &search).unwrap();
        assert_eq!(r.file.as_str(), "/app/lib/status.src");

        let r = resolver.resolve("extra", &loc("/elsewhere"), &search).unwrap();
        assert_eq!(r.file.as_str(), "/opt/shared/extra.src");
    }

    #[test]
    fn test_not_found_lists_probes() {
        let fs = create_test_fs();
        let layout = UnitLayout::default();
        let resolver = PathResolver::new(&fs, &layout);
        let search = [loc("/app/lib")];

        match resolver.resolve("missing", &loc("/app"), &search) {
            Err(LoadError::NotFound {
                request,
                searched,
                tried,
            }) => {
                assert_eq!(request, "missing");
                assert_eq!(searched, vec![loc("/app/lib")]);
                assert_eq!(tried.len(), 6);
                assert_eq!(tried[0].as_str(), "/app/lib/missing");
                assert_eq!(tried[2].as_str(), "/app/lib/missing/__init__.src");
                assert_eq!(tried[4].as_str(), "/app/lib/missing.src");
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_extension_skips_completion() {
        let fs = create_test_fs();
        let layout = UnitLayout::default();
        let resolver = PathResolver::new(&fs, &layout);

        match resolver.resolve("./nothing.src", &loc("/app"), &[]) {
            Err(LoadError::NotFound { tried, .. }) => assert_eq!(tried.len(), 4),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_search_request_without_search_path() {
        let fs = create_test_fs();
        let layout = UnitLayout::default();
        let resolver = PathResolver::new(&fs, &layout);

        let err = resolver.resolve("status", &loc("/app/lib"), &[]).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { ref tried, .. } if tried.is_empty()));
    }

    #[test]
    fn test_empty_request_is_invalid() {
        let fs = create_test_fs();
        let layout = UnitLayout::default();
        let resolver = PathResolver::new(&fs, &layout);

        let err = resolver.resolve("  ", &loc("/app"), &[]).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRequest { .. }));
    }

    #[test]
    fn test_assemble_search_path_dedupes() {
        let call = [loc("/a"), loc("/b")];
        let inherited = [loc("/b"), loc("/c")];
        let defaults = [loc("/a"), loc("/d")];

        let assembled = assemble_search_path(&[&call, &inherited, &defaults]);
        let names: Vec<&str> = assembled.iter().map(Location::as_str).collect();
        assert_eq!(names, ["/a", "/b", "/c", "/d"]);
    }

    #[test]
    fn test_absolutize_entries() {
        let entries = ["./vendor", "../shared", "lib", "/opt/x", ""];
        let out = absolutize_entries(&entries, &loc("/app/plugins"), &loc("/work"));
        let names: Vec<&str> = out.iter().map(Location::as_str).collect();
        assert_eq!(names, ["/app/plugins/vendor", "/app/shared", "/work/lib", "/opt/x"]);
    }

    #[test]
    fn test_dead_artifact_is_skipped_with_store() {
        use crate::artifact::{ArtifactKind, VfsArtifactStore};
        use std::sync::Arc;

        let fs = MemoryFileSystem::with_files([("/app/gone.src", "export 1")]);
        let store = VfsArtifactStore::new(Arc::new(fs.clone()), tag());
        store
            .put_compiled(&loc("/app/gone.src"), b"cached", ArtifactKind::Cache)
            .unwrap();
        fs.remove_file(std::path::Path::new("/app/gone.src")).unwrap();

        let layout = UnitLayout::default();
        // 只看文件是否存在时会命中缓存产物
        let plain = PathResolver::new(&fs, &layout);
        assert!(plain.resolve("./gone", &loc("/app"), &[]).unwrap().compiled);

        let checked = PathResolver::new(&fs, &layout).with_artifacts(&store);
        let err = checked.resolve("./gone", &loc("/app"), &[]).unwrap_err();
        match err {
            LoadError::NotFound { tried, .. } => {
                assert!(tried.contains(&loc(&format!("/app/gone.src{}", tag()))));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
