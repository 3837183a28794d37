//! Shroud API - environment construction and error reporting
//!
//! Provides:
//! - Environment construction over the in-memory or native file system
//! - Unified error handling (ShroudError / ErrorReport)
//! - Serializable outputs for tools (RunOutput, UnitGraph)
//!
//! For CLI convenience, this crate provides an optional ambient environment.
//! For library use, prefer passing an explicit `Environment`.

use std::sync::Arc;

pub mod config;
pub use config::{ambient, init, is_initialized, require};

pub mod error;
pub mod types;
pub use error::{ErrorDetails, ErrorReport, FailedUnit, ShroudError};
pub use types::{GraphNode, RunOutput, UnitGraph};

// Re-export core types
pub use shroud_config::{LoaderConfig, Phase};
pub use shroud_core::{
    Cascade, Environment, LoadError, Location, Reload, ReloadMode, Request, ScriptExecutor,
    Unit, Value,
};
pub use shroud_vfs::{MemoryFileSystem, NativeFileSystem, VirtualFileSystem};

/// Build an environment running unit scripts over `vfs`
pub fn environment(
    vfs: Arc<dyn VirtualFileSystem>,
    config: LoaderConfig,
) -> Result<Environment, ShroudError> {
    let env = Environment::builder(vfs, Arc::new(ScriptExecutor::new()))
        .config(config)
        .build()?;
    Ok(env)
}

/// Build an environment over the native file system
///
/// Without an explicit working directory the process's current directory
/// is used.
pub fn native_environment(mut config: LoaderConfig) -> Result<Environment, ShroudError> {
    if config.working_dir.is_none() {
        let cwd = std::env::current_dir()
            .map_err(|e| ShroudError::Host(format!("cannot read current directory: {}", e)))?;
        config.working_dir = Some(cwd.to_string_lossy().into_owned());
    }
    environment(Arc::new(NativeFileSystem::new()), config)
}

/// Load `request` and describe the result
pub fn run(env: &Environment, request: impl Into<Request>) -> Result<RunOutput, ShroudError> {
    let request = request.into();
    tracing::info!(request = request.path(), "Starting load");
    let unit = env.request(request)?;
    tracing::info!(unit = %unit.identity(), "Load completed");
    Ok(RunOutput::from(&unit))
}

/// Compile `request` without executing it; returns the artifact location
pub fn compile(env: &Environment, request: impl Into<Request>) -> Result<Location, ShroudError> {
    Ok(env.compile(request)?)
}

/// Snapshot of the dependency graph
pub fn graph(env: &Environment) -> UnitGraph {
    UnitGraph::of(env)
}

// ==================== Ambient API ====================

/// Require from the ambient environment, installing a native one if needed
pub fn quick_require(request: impl Into<Request>) -> Result<Value, ShroudError> {
    if !is_initialized() {
        // 并发初始化时后到者失败，使用先装好的环境即可
        let _ = init(native_environment(LoaderConfig::default())?);
    }
    require(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_env(files: &[(&str, &str)]) -> Environment {
        let fs = MemoryFileSystem::with_files(files.iter().copied());
        let config = LoaderConfig {
            write_artifacts: false,
            ..LoaderConfig::default()
        };
        environment(Arc::new(fs), config).unwrap()
    }

    #[test]
    fn test_run_with_explicit_environment() {
        let env = memory_env(&[("/app/main.src", "export [1, 2]")]);
        let output = run(&env, "/app/main").unwrap();

        assert_eq!(output.location.as_str(), "/app/main.src");
        assert!(!output.compiled);
        assert_eq!(output.exports, json!([1, 2]));
    }

    #[test]
    fn test_run_error_converts() {
        let env = memory_env(&[]);
        let err = run(&env, "ghost").unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(err.to_report().phase, "resolve");
    }

    #[test]
    fn test_graph() {
        let env = memory_env(&[
            ("/a.src", "export 1"),
            ("/b.src", "let a = require \"./a\""),
        ]);
        run(&env, "/b").unwrap();

        let graph = graph(&env);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.units[0].location.as_str(), "/a.src");
        assert_eq!(graph.units[0].dependents, vec![Location::parse("/b.src").unwrap()]);
        assert_eq!(graph.to_string(), "/a.src\n/b.src\n  -> /a.src\n");

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["units"][1]["dependencies"][0], "/a.src");
    }

    #[test]
    fn test_native_environment_uses_given_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.src"), "export \"native\"").unwrap();
        let config = LoaderConfig {
            working_dir: Some(dir.path().to_string_lossy().into_owned()),
            ..LoaderConfig::default()
        };

        let env = native_environment(config).unwrap();
        assert_eq!(env.require("./m").unwrap(), json!("native"));
        let artifact = compile(&env, "./m").unwrap();
        assert!(artifact.as_path().is_file());
    }
}
