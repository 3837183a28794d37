//! Native file system implementation

use crate::error::{from_io, VfsResult};
use crate::VirtualFileSystem;
use std::path::Path;

/// A native OS file system implementation.
///
/// This wraps `std::fs` operations and provides the `VirtualFileSystem`
/// interface for local file access. Writes create missing parent
/// directories, so compiled artifacts can be dropped next to any source.
#[derive(Debug, Clone, Default)]
pub struct NativeFileSystem;

impl NativeFileSystem {
    /// Create a new native file system.
    pub fn new() -> Self {
        Self
    }
}

impl VirtualFileSystem for NativeFileSystem {
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| from_io(e, path))
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> VfsResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                std::fs::create_dir_all(parent).map_err(|e| from_io(e, parent))?;
            }
        }
        std::fs::write(path, content).map_err(|e| from_io(e, path))
    }

    fn remove_file(&self, path: &Path) -> VfsResult<()> {
        std::fs::remove_file(path).map_err(|e| from_io(e, path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
