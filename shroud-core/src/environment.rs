//! Loading environments
//!
//! An [`Environment`] owns everything one loading world needs: the registry,
//! the context stack, the default search path and the collaborators. Two
//! environments never share units.

use crate::artifact::{ArtifactStore, VfsArtifactStore};
use crate::error::LoadError;
use crate::executor::Executor;
use crate::loader::{Loader, LoaderState, Shared};
use crate::location::Location;
use crate::reload::{Cascade, Reload, ReloadMode};
use crate::resolver::{Resolved, UnitLayout};
use crate::unit::Unit;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use shroud_config::LoaderConfig;
use shroud_vfs::VirtualFileSystem;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A request for a unit
///
/// # Example
/// ```
/// use shroud_core::{Cascade, ReloadMode, Request};
///
/// let request = Request::new("./lib/status")
///     .directory("/app")
///     .search_path(["./vendor"])
///     .reload(ReloadMode::InPlace)
///     .cascade(Cascade::Dependents);
/// assert_eq!(request.path(), "./lib/status");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub(crate) path: String,
    pub(crate) directory: Option<String>,
    pub(crate) search_path: Vec<String>,
    pub(crate) reload: Option<Reload>,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Base directory for relative requests, instead of the caller's own.
    /// Relative directories are taken against the working directory.
    pub fn directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Extra search entries, ahead of inherited and default ones
    pub fn search_path<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_path.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Force a reload of the requested unit
    pub fn reload(mut self, mode: ReloadMode) -> Self {
        let cascade = self.reload.map_or(Cascade::None, |r| r.cascade);
        self.reload = Some(Reload { mode, cascade });
        self
    }

    /// Force a reload that cascades (implies [`ReloadMode::Replace`] unless set)
    pub fn cascade(mut self, cascade: Cascade) -> Self {
        let mode = self.reload.map_or(ReloadMode::Replace, |r| r.mode);
        self.reload = Some(Reload { mode, cascade });
        self
    }

    pub fn with_reload(mut self, reload: Reload) -> Self {
        self.reload = Some(reload);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reload_options(&self) -> Option<Reload> {
        self.reload
    }
}

impl From<&str> for Request {
    fn from(path: &str) -> Self {
        Request::new(path)
    }
}

impl From<String> for Request {
    fn from(path: String) -> Self {
        Request::new(path)
    }
}

impl From<&String> for Request {
    fn from(path: &String) -> Self {
        Request::new(path.as_str())
    }
}

/// An isolated loading environment. Clones are handles to the same one.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<Inner>,
}

struct Inner {
    shared: Shared,
    state: Mutex<LoaderState>,
}

impl Environment {
    pub fn builder(
        vfs: Arc<dyn VirtualFileSystem>,
        executor: Arc<dyn Executor>,
    ) -> EnvironmentBuilder {
        EnvironmentBuilder::new(vfs, executor)
    }

    /// Environment with default configuration
    pub fn new(
        vfs: Arc<dyn VirtualFileSystem>,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, LoadError> {
        Self::builder(vfs, executor).build()
    }

    fn with_loader<R>(&self, f: impl FnOnce(&mut Loader<'_>) -> R) -> R {
        let shared = &self.inner.shared;
        let mut state = self.inner.state.lock();
        let mut loader = Loader::new(shared, &mut state);
        f(&mut loader)
    }

    /// Request a unit, loading it on first use.
    ///
    /// Must not be called from inside [`Executor::execute`] for the same
    /// environment; use the [`crate::Scope`] handed to the executor instead.
    pub fn request(&self, request: impl Into<Request>) -> Result<Unit, LoadError> {
        let request = request.into();
        self.with_loader(|loader| loader.request(&request))
    }

    /// [`Environment::request`] and return the unit's exports
    pub fn require(&self, request: impl Into<Request>) -> Result<Value, LoadError> {
        self.request(request).map(|unit| unit.exports())
    }

    /// [`Environment::request`] and hand the unit to `get_exports`
    pub fn require_with<T>(
        &self,
        request: impl Into<Request>,
        get_exports: impl FnOnce(&Unit) -> T,
    ) -> Result<T, LoadError> {
        self.request(request).map(|unit| get_exports(&unit))
    }

    /// Reload `unit` by location, reusing the search path it was loaded with
    pub fn reload(&self, unit: &Unit, reload: Reload) -> Result<Unit, LoadError> {
        self.with_loader(|loader| loader.reload_unit(unit, reload))
    }

    /// Resolve a request to a concrete file without loading it
    pub fn resolve(&self, request: impl Into<Request>) -> Result<Resolved, LoadError> {
        let request = request.into();
        self.with_loader(|loader| loader.resolve(&request))
    }

    /// Compile a unit and write its artifact without executing it.
    /// Returns the artifact location.
    pub fn compile(&self, request: impl Into<Request>) -> Result<Location, LoadError> {
        let request = request.into();
        self.with_loader(|loader| loader.compile_only(&request))
    }

    pub fn get(&self, location: &Location) -> Option<Unit> {
        self.inner.state.lock().registry.get(location).cloned()
    }

    /// Whether a unit is registered at `path` (taken against the working
    /// directory when relative)
    pub fn contains(&self, path: &str) -> bool {
        let location = self.inner.shared.working_dir.join(path);
        self.inner.state.lock().registry.contains(&location)
    }

    /// Drop a unit from the registry
    pub fn evict(&self, location: &Location) -> Option<Unit> {
        self.inner.state.lock().registry.remove(location)
    }

    /// Registry contents
    pub fn units(&self) -> BTreeMap<Location, Unit> {
        self.inner.state.lock().registry.snapshot()
    }

    pub fn dependencies_of(&self, location: &Location) -> Vec<Location> {
        self.inner.state.lock().registry.dependencies_of(location)
    }

    pub fn dependents_of(&self, location: &Location) -> Vec<Location> {
        self.inner.state.lock().registry.dependents_of(location)
    }

    pub fn default_path(&self) -> Vec<String> {
        self.inner.shared.default_path.read().clone()
    }

    /// Replace the default search path; applies from the next resolution
    pub fn set_default_path<I, S>(&self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.inner.shared.default_path.write() = entries.into_iter().map(Into::into).collect();
    }

    pub fn push_default_path(&self, entry: impl Into<String>) {
        self.inner.shared.default_path.write().push(entry.into());
    }

    pub fn working_dir(&self) -> &Location {
        &self.inner.shared.working_dir
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.shared.config
    }

    pub fn layout(&self) -> &UnitLayout {
        &self.inner.shared.layout
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("working_dir", &self.inner.shared.working_dir)
            .field("default_path", &*self.inner.shared.default_path.read())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Environment`]
pub struct EnvironmentBuilder {
    vfs: Arc<dyn VirtualFileSystem>,
    executor: Arc<dyn Executor>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
    config: LoaderConfig,
}

impl EnvironmentBuilder {
    pub fn new(vfs: Arc<dyn VirtualFileSystem>, executor: Arc<dyn Executor>) -> Self {
        Self {
            vfs,
            executor,
            artifacts: None,
            config: LoaderConfig::default(),
        }
    }

    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial default search path
    pub fn search_path<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.search_path = entries.into_iter().map(Into::into).collect();
        self
    }

    /// Directory used when a top-level request names none (must be absolute)
    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.working_dir = Some(dir.into());
        self
    }

    /// Artifact store to use instead of one over the environment's file system
    pub fn artifacts(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(store);
        self
    }

    pub fn build(self) -> Result<Environment, LoadError> {
        let working_dir = match &self.config.working_dir {
            Some(dir) => Location::parse(dir).ok_or_else(|| {
                LoadError::Config(format!("working directory '{}' is not absolute", dir))
            })?,
            None => Location::root(),
        };
        let artifacts = match self.artifacts {
            Some(store) => store,
            None => Arc::new(VfsArtifactStore::new(
                Arc::clone(&self.vfs),
                self.config.artifact_tag.clone(),
            )),
        };
        let shared = Shared {
            vfs: self.vfs,
            executor: self.executor,
            artifacts,
            layout: UnitLayout::from_config(&self.config),
            working_dir,
            default_path: RwLock::new(self.config.search_path.clone()),
            config: self.config,
        };
        Ok(Environment {
            inner: Arc::new(Inner {
                shared,
                state: Mutex::new(LoaderState::default()),
            }),
        })
    }
}
