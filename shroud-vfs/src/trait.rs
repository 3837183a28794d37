//! VirtualFileSystem trait definition

use crate::error::VfsResult;
use std::path::Path;

/// Virtual File System trait
///
/// Provides a unified interface for file operations, decoupling the loader
/// from specific file system implementations.
///
/// # Implementations
/// - `MemoryFileSystem`: In-memory file system
/// - `NativeFileSystem`: Native OS file system
pub trait VirtualFileSystem: Send + Sync {
    /// Read file contents
    ///
    /// # Returns
    /// File contents as bytes, or VfsError
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>>;

    /// Write file contents
    ///
    /// Creates the file if it doesn't exist, truncates it if it does.
    fn write_file(&self, path: &Path, content: &[u8]) -> VfsResult<()>;

    /// Remove a file
    ///
    /// # Returns
    /// `VfsError::NotFound` if there is no file at `path`
    fn remove_file(&self, path: &Path) -> VfsResult<()>;

    /// Check if path exists (file or directory)
    fn exists(&self, path: &Path) -> bool;

    /// Check if path exists and is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path exists and is a directory
    fn is_dir(&self, path: &Path) -> bool;
}
