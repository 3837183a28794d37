//! Shroud Core - path-addressed unit loading
//!
//! Units are requested by file-system-like path instead of by symbolic name.
//! A request is resolved against the caller's directory and an ordered search
//! path, loaded once per canonical [`Location`], cached in the environment's
//! registry, and can later be reloaded in place, replaced, or cascaded through
//! everything that depends on it.
//!
//! ```text
//! Environment::request
//!   ├── PathResolver      request + base dir + search path → Resolved
//!   ├── UnitRegistry      Location → Unit, dependency edges
//!   ├── ArtifactStore     reuse a fresh compiled form, or
//!   ├── Executor          compile + execute (nested requests via Scope)
//!   ├── ContextStack      base dir / search path of the executing unit
//!   └── reload            replace / in-place / cascades
//! ```
//!
//! All state lives in an explicit [`Environment`]; there is no global registry.

pub mod artifact;
pub mod context;
pub mod environment;
pub mod error;
pub mod executor;
pub mod location;
pub mod registry;
pub mod reload;
pub mod resolver;
pub mod script;
pub mod unit;

mod loader;

pub use artifact::{ArtifactKind, ArtifactStore, ContentHash, VfsArtifactStore};
pub use context::{ContextStack, Frame, Propagation};
pub use environment::{Environment, EnvironmentBuilder, Request};
pub use error::{ErrorKind, LoadError};
pub use executor::{Executor, Scope};
pub use location::Location;
pub use registry::UnitRegistry;
pub use reload::{Cascade, CascadeReport, Reload, ReloadMode};
pub use resolver::{PathResolver, Resolved, UnitLayout};
pub use script::ScriptExecutor;
pub use unit::{Namespace, Unit, EXPORTS};

pub use serde_json::Value;
pub use shroud_config::{LoaderConfig, Phase};

/// Log targets, one per loading phase
pub(crate) mod targets {
    use shroud_config::Phase;

    pub const RESOLVE: &str = Phase::Resolve.target();
    pub const LOAD: &str = Phase::Load.target();
    pub const RELOAD: &str = Phase::Reload.target();
    pub const ARTIFACT: &str = Phase::Artifact.target();
}
