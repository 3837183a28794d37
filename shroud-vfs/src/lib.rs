//! Shroud Virtual File System
//!
//! The backing store every unit, package directory and compiled artifact is
//! probed on. Two backends ship with the crate:
//!
//! - [`MemoryFileSystem`]: shared in-memory map, used by tests and embedders
//! - [`NativeFileSystem`]: the host OS file system
//!
//! # Usage
//! ```rust
//! use shroud_vfs::{VirtualFileSystem, MemoryFileSystem};
//! use std::path::Path;
//!
//! let fs = MemoryFileSystem::new();
//! fs.write_file(Path::new("/app/main.src"), b"export 1").unwrap();
//! assert!(fs.is_dir(Path::new("/app")));
//! ```

mod error;
mod memory;
mod native;
mod r#trait;

pub use error::{VfsError, VfsResult};
pub use memory::MemoryFileSystem;
pub use native::NativeFileSystem;
pub use r#trait::VirtualFileSystem;

/// Create a new memory-based file system.
pub fn memory_fs() -> MemoryFileSystem {
    MemoryFileSystem::new()
}

/// Create a new native file system.
pub fn native_fs() -> NativeFileSystem {
    NativeFileSystem::new()
}
