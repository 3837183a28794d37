//! Loaded units
//!
//! A [`Unit`] is a shared handle: the registry, every caller that requested
//! it, and the executor filling it all hold the same object. An in-place
//! reload refreshes the state behind the handle, so existing holders observe
//! the new namespace; a replacing reload installs a different handle.

use crate::location::Location;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Namespace of a unit: the bindings its execution produced
pub type Namespace = Map<String, Value>;

/// Binding holding a unit's explicit exports
pub const EXPORTS: &str = "exports";

/// Handle to a loaded (or loading) unit
#[derive(Clone)]
pub struct Unit {
    inner: Arc<UnitInner>,
}

struct UnitInner {
    identity: Location,
    state: RwLock<UnitState>,
}

#[derive(Debug, Clone)]
struct UnitState {
    file: Location,
    compiled: bool,
    namespace: Namespace,
    executions: u64,
    generation: u64,
    search_path: Vec<Location>,
}

impl Unit {
    pub(crate) fn new(
        identity: Location,
        file: Location,
        compiled: bool,
        search_path: Vec<Location>,
        generation: u64,
        executions: u64,
    ) -> Self {
        Self {
            inner: Arc::new(UnitInner {
                identity,
                state: RwLock::new(UnitState {
                    file,
                    compiled,
                    namespace: Namespace::new(),
                    executions,
                    generation,
                    search_path,
                }),
            }),
        }
    }

    /// Canonical source location; the registry key
    pub fn identity(&self) -> &Location {
        &self.inner.identity
    }

    /// Concrete file that was executed (the source, or its compiled artifact)
    pub fn file(&self) -> Location {
        self.inner.state.read().file.clone()
    }

    /// Whether the last execution ran from a compiled artifact file
    pub fn is_compiled(&self) -> bool {
        self.inner.state.read().compiled
    }

    /// Directory nested relative requests resolve against
    pub fn directory(&self) -> Location {
        self.inner.state.read().file.parent()
    }

    /// Search path recorded for this unit's frame; reused by reloads
    pub fn search_path(&self) -> Vec<Location> {
        self.inner.state.read().search_path.clone()
    }

    /// How many times this location has been executed into a unit
    pub fn executions(&self) -> u64 {
        self.inner.state.read().executions
    }

    pub(crate) fn generation(&self) -> u64 {
        self.inner.state.read().generation
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.state.read().namespace.get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.inner.state.write().namespace.insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.inner.state.write().namespace.remove(name)
    }

    pub fn set_exports(&self, value: Value) {
        self.set(EXPORTS, value);
    }

    /// The `exports` binding, or the whole namespace when there is none
    pub fn exports(&self) -> Value {
        let state = self.inner.state.read();
        match state.namespace.get(EXPORTS) {
            Some(value) => value.clone(),
            None => Value::Object(state.namespace.clone()),
        }
    }

    /// Snapshot of every binding
    pub fn namespace(&self) -> Namespace {
        self.inner.state.read().namespace.clone()
    }

    /// Whether two handles are the same unit object
    pub fn ptr_eq(a: &Unit, b: &Unit) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Move a freshly executed unit's state behind this handle
    pub(crate) fn refresh_from(&self, staged: &Unit) {
        if Unit::ptr_eq(self, staged) {
            return;
        }
        let next = staged.inner.state.read().clone();
        *self.inner.state.write() = next;
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Unit")
            .field("identity", &self.inner.identity)
            .field("file", &state.file)
            .field("compiled", &state.compiled)
            .field("executions", &state.executions)
            .field("bindings", &state.namespace.len())
            .finish()
    }
}
