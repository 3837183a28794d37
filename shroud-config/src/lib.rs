//! Shroud Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all Shroud crates.

use serde::{Deserialize, Serialize};

/// Default extension of unit source files (without the dot)
pub const DEFAULT_SOURCE_EXTENSION: &str = "src";

/// Default name of a package directory's entry unit (without extension)
pub const DEFAULT_PACKAGE_INIT: &str = "__init__";

/// Suffix appended to a source path to name its compiled artifact.
///
/// Tagged with the engine's major and minor version, e.g. `c@0-1`, so
/// artifacts written by another engine version are never picked up.
pub fn default_artifact_tag() -> String {
    format!(
        "c@{}-{}",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR")
    )
}

/// Configuration for unit resolution and loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Extension tried by extension completion (`<path>.<ext>`)
    pub source_extension: String,
    /// Entry unit name probed inside package directories
    pub package_init: String,
    /// Compiled-artifact suffix
    pub artifact_tag: String,
    /// Whether fresh compiled artifacts may replace compilation
    pub use_artifacts: bool,
    /// Whether compiled artifacts are written after compiling from source
    pub write_artifacts: bool,
    /// Process-wide default search path (lowest priority)
    pub search_path: Vec<String>,
    /// Directory used for requests that carry no base directory
    pub working_dir: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            package_init: DEFAULT_PACKAGE_INIT.to_string(),
            artifact_tag: default_artifact_tag(),
            use_artifacts: true,
            write_artifacts: true,
            search_path: Vec::new(),
            working_dir: None,
        }
    }
}

/// Loading phase enum for phase-specific log targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Resolve,
    Load,
    Reload,
    Artifact,
}

impl Phase {
    /// All phases, in pipeline order
    pub const ALL: [Phase; 4] = [Phase::Resolve, Phase::Load, Phase::Reload, Phase::Artifact];

    /// Get the string name of the phase
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Resolve => "resolve",
            Phase::Load => "load",
            Phase::Reload => "reload",
            Phase::Artifact => "artifact",
        }
    }

    /// Get the log target name for this phase
    pub const fn target(&self) -> &'static str {
        match self {
            Phase::Resolve => "shroud::resolve",
            Phase::Load => "shroud::load",
            Phase::Reload => "shroud::reload",
            Phase::Artifact => "shroud::artifact",
        }
    }
}
