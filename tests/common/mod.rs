//! 测试辅助工具
//!
//! 提供端到端测试的辅助函数

#![allow(dead_code)]

use shroud_workspace::{environment, Environment, LoaderConfig, MemoryFileSystem, VirtualFileSystem};
use std::path::Path;
use std::sync::Arc;

/// 内存文件系统上的测试环境
pub struct Project {
    pub fs: MemoryFileSystem,
    pub env: Environment,
}

impl Project {
    pub fn write(&self, path: &str, content: &str) {
        self.fs.write_file(Path::new(path), content.as_bytes()).unwrap();
    }

    pub fn remove(&self, path: &str) {
        self.fs.remove_file(Path::new(path)).unwrap();
    }
}

/// 创建项目，不写编译产物
///
/// # Example
/// ```ignore
/// let project = project(&[("/app/main.src", "export 1")]);
/// assert_eq!(project.env.require("/app/main").unwrap(), 1);
/// ```
pub fn project(files: &[(&str, &str)]) -> Project {
    project_with(
        files,
        LoaderConfig {
            write_artifacts: false,
            ..LoaderConfig::default()
        },
    )
}

pub fn project_with(files: &[(&str, &str)], config: LoaderConfig) -> Project {
    let fs = MemoryFileSystem::with_files(files.iter().copied());
    let env = environment(Arc::new(fs.clone()), config).unwrap();
    Project { fs, env }
}
