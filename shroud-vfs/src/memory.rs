//! In-memory file system implementation

use crate::error::{VfsError, VfsResult};
use crate::VirtualFileSystem;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// An in-memory file system implementation.
///
/// Files live in a shared `BTreeMap` keyed by '/'-separated paths. Directories
/// are not stored: a path is a directory when at least one file lives below it.
/// Clones share the same map, so a test can keep a handle and edit the backing
/// store while an environment reads from it.
///
/// # Example
/// ```
/// use shroud_vfs::{MemoryFileSystem, VirtualFileSystem};
/// use std::path::Path;
///
/// let fs = MemoryFileSystem::new();
/// fs.write_file(Path::new("/plugin/__init__.src"), b"export 1").unwrap();
/// assert!(fs.is_dir(Path::new("/plugin")));
/// assert!(fs.is_file(Path::new("/plugin/__init__.src")));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryFileSystem {
    /// Create a new empty memory file system.
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Create a new memory file system pre-populated with files.
    ///
    /// # Arguments
    /// * `files` - Iterator of (path, content) tuples
    pub fn with_files<I, S, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (S, C)>,
        S: AsRef<str>,
        C: Into<Vec<u8>>,
    {
        let fs = Self::new();
        if let Ok(mut map) = fs.files.write() {
            for (path, content) in files {
                map.insert(normalize(path.as_ref()), content.into());
            }
        }
        fs
    }

    /// All file paths currently stored, in sorted order
    pub fn paths(&self) -> Vec<String> {
        match self.files.read() {
            Ok(files) => files.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    fn normalize_path(&self, path: &Path) -> String {
        normalize(&path.to_string_lossy())
    }
}

/// Uses forward slashes consistently and drops trailing separators.
fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let trimmed = unified.trim_end_matches('/');
    if trimmed.is_empty() && unified.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn poisoned() -> VfsError {
    VfsError::Custom {
        message: String::from("Lock poisoned"),
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let normalized = self.normalize_path(path);
        let files = self.files.read().map_err(|_| poisoned())?;

        files
            .get(&normalized)
            .cloned()
            .ok_or(VfsError::NotFound { path: normalized })
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> VfsResult<()> {
        let normalized = self.normalize_path(path);
        if normalized.is_empty() || normalized == "/" {
            return Err(VfsError::InvalidPath {
                path: normalized,
                reason: String::from("not a file path"),
            });
        }
        if self.is_dir(path) {
            return Err(VfsError::AlreadyExists { path: normalized });
        }
        let mut files = self.files.write().map_err(|_| poisoned())?;
        files.insert(normalized, content.to_vec());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> VfsResult<()> {
        let normalized = self.normalize_path(path);
        let mut files = self.files.write().map_err(|_| poisoned())?;
        match files.remove(&normalized) {
            Some(_) => Ok(()),
            None => Err(VfsError::NotFound { path: normalized }),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let normalized = self.normalize_path(path);
        match self.files.read() {
            Ok(files) => files.contains_key(&normalized),
            Err(_) => false,
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        let normalized = self.normalize_path(path);
        let prefix = if normalized.ends_with('/') {
            normalized
        } else {
            format!("{}/", normalized)
        };
        let files = match self.files.read() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        files
            .range(prefix.clone()..)
            .next()
            .map_or(false, |(key, _)| key.starts_with(&prefix))
    }
}
