//! 测试辅助工具
//!
//! Environments over a `MemoryFileSystem`, with an executor that records
//! what it compiled and executed.

#![allow(dead_code)]

use parking_lot::Mutex;
use shroud_core::{
    Environment, Executor, LoadError, LoaderConfig, Location, ScriptExecutor, Scope, Unit,
};
use shroud_vfs::{MemoryFileSystem, VirtualFileSystem};
use std::path::Path;
use std::sync::Arc;

/// Script executor that counts compilations and logs executions in order
#[derive(Default)]
pub struct RecordingExecutor {
    inner: ScriptExecutor,
    compiled: Mutex<Vec<String>>,
    executed: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn compiles(&self) -> usize {
        self.compiled.lock().len()
    }

    /// Identities in the order their execution started
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn clear(&self) {
        self.compiled.lock().clear();
        self.executed.lock().clear();
    }
}

impl Executor for RecordingExecutor {
    fn compile(&self, location: &Location, source: &str) -> Result<Vec<u8>, LoadError> {
        self.compiled.lock().push(location.to_string());
        self.inner.compile(location, source)
    }

    fn execute(
        &self,
        unit: &Unit,
        compiled: &[u8],
        scope: &mut Scope<'_, '_>,
    ) -> Result<(), LoadError> {
        self.executed.lock().push(unit.identity().to_string());
        self.inner.execute(unit, compiled, scope)
    }
}

pub struct Fixture {
    pub fs: MemoryFileSystem,
    pub env: Environment,
    pub executor: Arc<RecordingExecutor>,
}

impl Fixture {
    pub fn write(&self, path: &str, content: &str) {
        self.fs.write_file(Path::new(path), content.as_bytes()).unwrap();
    }

    pub fn remove(&self, path: &str) {
        self.fs.remove_file(Path::new(path)).unwrap();
    }

    pub fn exists(&self, path: &str) -> bool {
        self.fs.is_file(Path::new(path))
    }
}

/// Fixture that never writes compiled artifacts, so the store holds only
/// the files a test put there
pub fn fixture(files: &[(&str, &str)]) -> Fixture {
    let config = LoaderConfig {
        write_artifacts: false,
        ..LoaderConfig::default()
    };
    fixture_with(files, config)
}

pub fn fixture_with(files: &[(&str, &str)], config: LoaderConfig) -> Fixture {
    let fs = MemoryFileSystem::with_files(files.iter().copied());
    let executor = Arc::new(RecordingExecutor::default());
    let env = Environment::builder(Arc::new(fs.clone()), executor.clone())
        .config(config)
        .build()
        .unwrap();
    Fixture { fs, env, executor }
}

pub fn loc(path: &str) -> Location {
    Location::parse(path).unwrap()
}

/// Compiled-artifact suffix of the default configuration
pub fn tag() -> String {
    LoaderConfig::default().artifact_tag
}
