//! Shroud - a unit loader with path resolution, caching and hot reload
//!
//! Units are source files that a host requests by path. Shroud resolves the
//! request against the caller's directory and a search path, executes the
//! unit once, caches it per environment and reloads it on demand, optionally
//! cascading to the units that depend on it.
//!
//! # Architecture
//!
//! ```text
//! shroud-config  - Configuration data (LoaderConfig, Phase)
//! shroud-vfs     - Backing store (memory / native file system)
//! shroud-core    - Resolution, registry, loading, reload, artifacts
//! shroud-api     - Ambient environment, error reports
//! shroud-cli     - `shroud` binary
//! ```
//!
//! # Quick Start
//!
//! ```
//! use shroud_workspace::{environment, LoaderConfig, MemoryFileSystem};
//! use std::sync::Arc;
//!
//! let fs = MemoryFileSystem::with_files([("/app/lib/status.src", "export \"up\"")]);
//! let env = environment(Arc::new(fs), LoaderConfig::default()).unwrap();
//! let status = env.require("/app/lib/status").unwrap();
//! assert_eq!(status, "up");
//! ```

pub use shroud_api::*;
pub use shroud_core::{
    ArtifactKind, ArtifactStore, CascadeReport, ContentHash, ErrorKind, Executor, Namespace,
    Resolved, Scope, UnitLayout, VfsArtifactStore,
};
pub use shroud_vfs::VfsError;

pub use shroud_api;
pub use shroud_core;
pub use shroud_vfs;
