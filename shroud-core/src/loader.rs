//! Loading engine
//!
//! A [`Loader`] borrows an environment's shared parts together with its
//! locked state for the duration of one top-level call. Nested requests made
//! by executing units re-enter the same loader through [`Scope`], so the
//! environment lock is taken once per top-level call and never re-entered.

use crate::artifact::{ArtifactKind, ArtifactStore};
use crate::context::{ContextStack, Frame, Propagation};
use crate::environment::Request;
use crate::error::LoadError;
use crate::executor::{Executor, Scope};
use crate::location::Location;
use crate::registry::UnitRegistry;
use crate::reload::{self, Cascade, Reload, ReloadMode};
use crate::resolver::{self, PathResolver, Resolved, UnitLayout};
use crate::targets;
use crate::unit::Unit;
use parking_lot::RwLock;
use shroud_config::LoaderConfig;
use shroud_vfs::VirtualFileSystem;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Parts of an environment that do not change while loading
pub(crate) struct Shared {
    pub vfs: Arc<dyn VirtualFileSystem>,
    pub executor: Arc<dyn Executor>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub layout: UnitLayout,
    pub config: LoaderConfig,
    pub working_dir: Location,
    /// Lowest-priority search entries, host-supplied strings
    pub default_path: RwLock<Vec<String>>,
}

/// Mutable loading state, guarded by the environment lock
#[derive(Debug, Default)]
pub(crate) struct LoaderState {
    pub registry: UnitRegistry,
    pub stack: ContextStack,
    /// Last dependency-cascade generation handed out
    pub generation: u64,
}

/// Where a load takes its context from
pub(crate) enum Origin {
    /// The innermost executing unit, if any
    Caller,
    /// Nobody: reloads of a known unit with its recorded search path
    Detached { search_path: Vec<Location> },
}

#[derive(Debug, Clone, Copy, Default)]
struct Plan {
    reload: Option<ReloadMode>,
    propagation: Option<Propagation>,
}

struct Code {
    bytes: Vec<u8>,
    /// Compiled from source during this load (a candidate for writing out)
    compiled_now: bool,
}

/// Resolution context of one request
struct Lookup {
    base: Location,
    /// Full search path for this call
    search: Vec<Location>,
    /// What a new unit's frame records (defaults excluded)
    frame_path: Vec<Location>,
}

pub(crate) struct Loader<'env> {
    shared: &'env Shared,
    pub(crate) state: &'env mut LoaderState,
}

impl<'env> Loader<'env> {
    pub(crate) fn new(shared: &'env Shared, state: &'env mut LoaderState) -> Self {
        Self { shared, state }
    }

    /// Request on behalf of the innermost executing unit (or the host)
    pub(crate) fn request(&mut self, request: &Request) -> Result<Unit, LoadError> {
        self.dispatch(request, Origin::Caller)
    }

    /// Reload a known unit by its identity, with its recorded search path
    pub(crate) fn reload_unit(&mut self, unit: &Unit, reload: Reload) -> Result<Unit, LoadError> {
        let identity = unit.identity();
        let request = Request::new(identity.as_str())
            .directory(identity.parent().as_str())
            .with_reload(reload);
        self.dispatch(
            &request,
            Origin::Detached {
                search_path: unit.search_path(),
            },
        )
    }

    /// Resolve without loading, in the caller's context
    pub(crate) fn resolve(&mut self, request: &Request) -> Result<Resolved, LoadError> {
        let parent = self.state.stack.current().cloned();
        let lookup = self.lookup(request, parent.as_ref(), None);
        self.resolver()
            .resolve(&request.path, &lookup.base, &lookup.search)
    }

    fn resolver(&self) -> PathResolver<'env> {
        let shared = self.shared;
        PathResolver::new(shared.vfs.as_ref(), &shared.layout)
            .with_artifacts(shared.artifacts.as_ref())
    }

    fn dispatch(&mut self, request: &Request, origin: Origin) -> Result<Unit, LoadError> {
        let inherits = matches!(origin, Origin::Caller)
            && self
                .state
                .stack
                .current()
                .and_then(|f| f.propagation)
                .is_some();
        match request.reload {
            Some(reload) if reload.cascade == Cascade::Dependents && !inherits => {
                reload::reload_dependents(self, request, origin, reload.mode)
            }
            _ => self.load(request, origin),
        }
    }

    /// Load one unit: resolve, check cycles and the cache, then execute
    pub(crate) fn load(&mut self, request: &Request, origin: Origin) -> Result<Unit, LoadError> {
        let (parent, recorded) = match origin {
            Origin::Caller => (self.state.stack.current().cloned(), None),
            Origin::Detached { search_path } => (None, Some(search_path)),
        };
        let lookup = self.lookup(request, parent.as_ref(), recorded);
        let plan = self.plan(request, parent.as_ref());

        let resolved = match self
            .resolver()
            .resolve(&request.path, &lookup.base, &lookup.search)
        {
            Ok(resolved) => resolved,
            Err(err) => {
                if plan.reload.is_some() {
                    self.evict_probed(&err);
                }
                return Err(err);
            }
        };
        let identity = resolved.source.clone();

        if let Some(chain) = self.state.stack.cycle_chain(&identity) {
            debug!(target: targets::LOAD, unit = %identity, depth = chain.len(), "cyclic load");
            return Err(LoadError::CyclicLoad { chain });
        }

        let existing = self.state.registry.get(&identity).cloned();
        if let Some(unit) = &existing {
            let reusable = match (plan.reload, plan.propagation) {
                (None, _) => true,
                (Some(_), Some(p)) => unit.generation() == p.generation,
                (Some(_), None) => false,
            };
            if reusable {
                trace!(target: targets::LOAD, unit = %identity, "cache hit");
                self.record_edge(parent.as_ref(), &identity);
                return Ok(unit.clone());
            }
        }

        match self.execute(&resolved, plan, lookup.frame_path, existing.as_ref()) {
            Ok(unit) => {
                self.record_edge(parent.as_ref(), &identity);
                Ok(unit)
            }
            Err(err) => {
                if existing.is_some() && self.state.registry.remove(&identity).is_some() {
                    warn!(target: targets::RELOAD, unit = %identity, error = %err, "reload failed, unit evicted");
                }
                Err(err)
            }
        }
    }

    fn lookup(
        &self,
        request: &Request,
        parent: Option<&Frame>,
        recorded: Option<Vec<Location>>,
    ) -> Lookup {
        let shared = self.shared;
        let base = match (&request.directory, parent) {
            (Some(dir), _) => shared.working_dir.join(dir),
            (None, Some(frame)) => frame.directory.clone(),
            (None, None) => shared.working_dir.clone(),
        };
        let inherited = match recorded {
            Some(path) => path,
            None => parent.map(|f| f.search_path.clone()).unwrap_or_default(),
        };
        let call =
            resolver::absolutize_entries(request.search_path.as_slice(), &base, &shared.working_dir);
        let defaults = {
            let entries = shared.default_path.read();
            resolver::absolutize_entries(entries.as_slice(), &base, &shared.working_dir)
        };

        let search = resolver::assemble_search_path(&[
            call.as_slice(),
            inherited.as_slice(),
            defaults.as_slice(),
        ]);
        let frame_path = resolver::assemble_search_path(&[call.as_slice(), inherited.as_slice()]);
        Lookup {
            base,
            search,
            frame_path,
        }
    }

    fn plan(&mut self, request: &Request, parent: Option<&Frame>) -> Plan {
        // 级联中的嵌套请求沿用同一次级联
        if let Some(propagation) = parent.and_then(|f| f.propagation) {
            return Plan {
                reload: Some(propagation.mode),
                propagation: Some(propagation),
            };
        }
        match request.reload {
            None => Plan::default(),
            Some(reload) => {
                let propagation = if reload.cascade == Cascade::Dependencies {
                    self.state.generation += 1;
                    Some(Propagation {
                        generation: self.state.generation,
                        mode: reload.mode,
                    })
                } else {
                    None
                };
                Plan {
                    reload: Some(reload.mode),
                    propagation,
                }
            }
        }
    }

    fn execute(
        &mut self,
        resolved: &Resolved,
        plan: Plan,
        search_path: Vec<Location>,
        existing: Option<&Unit>,
    ) -> Result<Unit, LoadError> {
        let shared = self.shared;
        let identity = &resolved.source;
        let code = self.obtain_code(resolved)?;

        let staged = Unit::new(
            identity.clone(),
            resolved.file.clone(),
            resolved.compiled,
            search_path.clone(),
            plan.propagation.map_or(0, |p| p.generation),
            existing.map_or(0, Unit::executions) + 1,
        );
        let frame = Frame {
            location: identity.clone(),
            directory: resolved.file.parent(),
            search_path,
            propagation: plan.propagation,
        };

        debug!(
            target: targets::LOAD,
            unit = %identity,
            file = %resolved.file,
            reload = plan.reload.is_some(),
            "executing"
        );
        self.state.registry.clear_dependencies(identity);
        {
            let mut guard = FrameGuard::push(self, frame.clone());
            let mut scope = Scope::new(&mut guard, frame);
            shared.executor.execute(&staged, &code.bytes, &mut scope)?;
        }

        if code.compiled_now && shared.config.write_artifacts {
            let written = shared
                .artifacts
                .put_compiled(identity, &code.bytes, ArtifactKind::Cache);
            if let Err(e) = written {
                warn!(target: targets::ARTIFACT, unit = %identity, error = %e, "could not write compiled artifact");
            }
        }

        let unit = match (existing, plan.reload) {
            (Some(current), Some(ReloadMode::InPlace)) => {
                current.refresh_from(&staged);
                current.clone()
            }
            _ => staged,
        };
        self.state.registry.install(identity.clone(), unit.clone());
        debug!(target: targets::LOAD, unit = %identity, executions = unit.executions(), "loaded");
        Ok(unit)
    }

    fn obtain_code(&self, resolved: &Resolved) -> Result<Code, LoadError> {
        let shared = self.shared;
        if resolved.compiled {
            return shared
                .artifacts
                .try_get_compiled(&resolved.source)
                .map(|bytes| Code {
                    bytes,
                    compiled_now: false,
                })
                .ok_or_else(|| {
                    LoadError::compile(
                        &resolved.source,
                        format!("compiled artifact '{}' is unusable", resolved.file),
                    )
                });
        }

        let text = self.read_source(resolved)?;
        if shared.config.use_artifacts {
            if let Some(compiled) = shared.artifacts.try_get_compiled(&resolved.source) {
                trace!(target: targets::ARTIFACT, unit = %resolved.source, "fresh artifact reused");
                return Ok(Code {
                    bytes: compiled,
                    compiled_now: false,
                });
            }
        }

        let compiled = shared.executor.compile(&resolved.source, &text)?;
        Ok(Code {
            bytes: compiled,
            compiled_now: true,
        })
    }

    fn read_source(&self, resolved: &Resolved) -> Result<String, LoadError> {
        let bytes = self
            .shared
            .vfs
            .read_file(resolved.file.as_path())
            .map_err(|source| LoadError::Read {
                location: resolved.file.clone(),
                source,
            })?;
        String::from_utf8(bytes).map_err(|e| {
            LoadError::compile(&resolved.source, format!("source is not valid UTF-8: {}", e))
        })
    }

    /// Compile a unit and write its artifact without executing it.
    ///
    /// Unlike loading, a failed artifact write is an error here.
    pub(crate) fn compile_only(&mut self, request: &Request) -> Result<Location, LoadError> {
        let resolved = self.resolve(request)?;
        let shared = self.shared;
        if resolved.compiled {
            return Ok(resolved.file);
        }
        let text = self.read_source(&resolved)?;
        let compiled = shared.executor.compile(&resolved.source, &text)?;
        let target = shared.artifacts.compiled_location(&resolved.source);
        shared
            .artifacts
            .put_compiled(&resolved.source, &compiled, ArtifactKind::Standalone)
            .map_err(|source| LoadError::Write {
                location: target.clone(),
                source,
            })?;
        debug!(target: targets::ARTIFACT, unit = %resolved.source, artifact = %target, "compiled");
        Ok(target)
    }

    fn record_edge(&mut self, parent: Option<&Frame>, dependency: &Location) {
        if let Some(frame) = parent {
            self.state
                .registry
                .record_dependency(&frame.location, dependency);
        }
    }

    /// A reload whose path no longer resolves drops whatever it used to find
    fn evict_probed(&mut self, err: &LoadError) {
        if let LoadError::NotFound { tried, .. } = err {
            for location in tried {
                if self.state.registry.remove(location).is_some() {
                    warn!(target: targets::RELOAD, unit = %location, "unit no longer resolves, evicted");
                }
            }
        }
    }
}

/// Keeps a frame on the context stack while a unit executes.
///
/// The frame is popped on drop, so it is also removed when execution fails
/// or panics.
struct FrameGuard<'l, 'env> {
    loader: &'l mut Loader<'env>,
}

impl<'l, 'env> FrameGuard<'l, 'env> {
    fn push(loader: &'l mut Loader<'env>, frame: Frame) -> Self {
        loader.state.stack.push(frame);
        Self { loader }
    }
}

impl<'env> Deref for FrameGuard<'_, 'env> {
    type Target = Loader<'env>;

    fn deref(&self) -> &Self::Target {
        self.loader
    }
}

impl<'env> DerefMut for FrameGuard<'_, 'env> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.loader
    }
}

impl Drop for FrameGuard<'_, '_> {
    fn drop(&mut self) {
        self.loader.state.stack.pop();
    }
}
