//! Compiled artifact store
//!
//! Compiled forms live next to their source as `<source><tag>`. Each artifact
//! carries the engine tag and a fingerprint of the source it was compiled
//! from; an artifact whose source has since changed is stale and ignored.
//!
//! Artifacts written while loading are caches of their source and are dead
//! once the source is gone. Only standalone artifacts, written by an explicit
//! compile, may stand in for a missing source.

use crate::location::Location;
use crate::targets;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use shroud_vfs::{VfsError, VirtualFileSystem};
use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;
use tracing::trace;

/// Reads and writes compiled forms of units
pub trait ArtifactStore: Send + Sync {
    /// Where the compiled form of `source` lives
    fn compiled_location(&self, source: &Location) -> Location;

    /// A usable compiled form of `source`, or `None` when there is no fresh one
    fn try_get_compiled(&self, source: &Location) -> Option<Vec<u8>>;

    /// Persist the compiled form of `source`. Loads treat failure as
    /// non-fatal.
    fn put_compiled(
        &self,
        source: &Location,
        compiled: &[u8],
        kind: ArtifactKind,
    ) -> Result<(), VfsError>;
}

/// Why an artifact was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Written through while loading from source; needs the source to be valid
    Cache,
    /// Written by an explicit compile; usable without its source
    Standalone,
}

/// Stable fingerprint of source bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(u64);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(bytes);
        ContentHash(hasher.finish())
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// On-disk artifact layout
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactRecord {
    tag: String,
    kind: ArtifactKind,
    fingerprint: u64,
    payload: Vec<u8>,
}

/// [`ArtifactStore`] that keeps artifacts in a virtual file system
#[derive(Clone)]
pub struct VfsArtifactStore {
    vfs: Arc<dyn VirtualFileSystem>,
    tag: String,
}

impl VfsArtifactStore {
    pub fn new(vfs: Arc<dyn VirtualFileSystem>, tag: impl Into<String>) -> Self {
        Self {
            vfs,
            tag: tag.into(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl ArtifactStore for VfsArtifactStore {
    fn compiled_location(&self, source: &Location) -> Location {
        source.with_suffix(&self.tag)
    }

    fn try_get_compiled(&self, source: &Location) -> Option<Vec<u8>> {
        let path = self.compiled_location(source);
        let bytes = self.vfs.read_file(path.as_path()).ok()?;
        let record: ArtifactRecord = match bincode::deserialize(&bytes) {
            Ok(record) => record,
            Err(e) => {
                trace!(target: targets::ARTIFACT, artifact = %path, error = %e, "unreadable artifact");
                return None;
            }
        };
        if record.tag != self.tag {
            trace!(target: targets::ARTIFACT, artifact = %path, tag = %record.tag, "foreign artifact tag");
            return None;
        }
        if self.vfs.is_file(source.as_path()) {
            let current = ContentHash::of(&self.vfs.read_file(source.as_path()).ok()?);
            if current.value() != record.fingerprint {
                trace!(target: targets::ARTIFACT, artifact = %path, source = %current, "stale artifact");
                return None;
            }
        } else if record.kind == ArtifactKind::Cache {
            // 源文件已删除，缓存产物随之失效
            trace!(target: targets::ARTIFACT, artifact = %path, "cache artifact without source");
            return None;
        }
        Some(record.payload)
    }

    fn put_compiled(
        &self,
        source: &Location,
        compiled: &[u8],
        kind: ArtifactKind,
    ) -> Result<(), VfsError> {
        let text = self.vfs.read_file(source.as_path())?;
        let record = ArtifactRecord {
            tag: self.tag.clone(),
            kind,
            fingerprint: ContentHash::of(&text).value(),
            payload: compiled.to_vec(),
        };
        let bytes = bincode::serialize(&record).map_err(|e| VfsError::Custom {
            message: format!("failed to encode artifact: {}", e),
        })?;
        let path = self.compiled_location(source);
        self.vfs.write_file(path.as_path(), &bytes)?;
        trace!(target: targets::ARTIFACT, artifact = %path, bytes = bytes.len(), "artifact written");
        Ok(())
    }
}
