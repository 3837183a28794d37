//! Executor seam
//!
//! The loader never interprets unit code itself. It hands the source to an
//! [`Executor`] for compilation and runs the compiled form with a [`Scope`],
//! through which the executing unit makes its own nested requests.

use crate::context::Frame;
use crate::environment::Request;
use crate::error::LoadError;
use crate::loader::Loader;
use crate::location::Location;
use crate::unit::Unit;
use serde_json::Value;

/// Compiles and executes unit code
pub trait Executor: Send + Sync {
    /// Compile source text into the form handed to [`Executor::execute`] and
    /// stored as an artifact.
    fn compile(&self, location: &Location, source: &str) -> Result<Vec<u8>, LoadError>;

    /// Execute a compiled form, populating `unit`'s namespace.
    ///
    /// Nested loads must go through `scope`. Calling back into the owning
    /// `Environment` from here blocks forever.
    fn execute(&self, unit: &Unit, compiled: &[u8], scope: &mut Scope<'_, '_>)
        -> Result<(), LoadError>;
}

/// What an executing unit can see of the loader
pub struct Scope<'s, 'env> {
    loader: &'s mut Loader<'env>,
    frame: Frame,
}

impl<'s, 'env> Scope<'s, 'env> {
    pub(crate) fn new(loader: &'s mut Loader<'env>, frame: Frame) -> Self {
        Self { loader, frame }
    }

    /// Request a unit on behalf of the executing one.
    ///
    /// Relative paths resolve against [`Scope::directory`], and the executing
    /// unit's search path is inherited.
    pub fn request(&mut self, request: impl Into<Request>) -> Result<Unit, LoadError> {
        self.loader.request(&request.into())
    }

    /// [`Scope::request`] and return the unit's exports
    pub fn require(&mut self, request: impl Into<Request>) -> Result<Value, LoadError> {
        self.request(request).map(|unit| unit.exports())
    }

    /// [`Scope::request`] and hand the unit to `get_exports`
    pub fn require_with<T>(
        &mut self,
        request: impl Into<Request>,
        get_exports: impl FnOnce(&Unit) -> T,
    ) -> Result<T, LoadError> {
        self.request(request).map(|unit| get_exports(&unit))
    }

    /// Location of the executing unit
    pub fn location(&self) -> &Location {
        &self.frame.location
    }

    pub fn directory(&self) -> &Location {
        &self.frame.directory
    }

    pub fn search_path(&self) -> &[Location] {
        &self.frame.search_path
    }

    /// Number of units currently executing, this one included
    pub fn depth(&self) -> usize {
        self.loader.state.stack.depth()
    }
}
