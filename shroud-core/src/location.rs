//! 规范化的单元位置
//!
//! A [`Location`] is an absolute, lexically normalized path with '/'
//! separators. It is the identity of a unit: two requests that name the same
//! file (through `..`, `.`, doubled separators or different search entries)
//! end up at equal locations.

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Absolute, normalized, '/'-separated path
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location(Arc<str>);

impl Location {
    /// The file system root `/`
    pub fn root() -> Self {
        Location(Arc::from("/"))
    }

    /// Parse an absolute path, normalizing it lexically.
    ///
    /// Backslashes are treated as separators, `.` segments and empty segments
    /// are dropped, and `..` removes the previous segment without ever climbing
    /// above the root. Returns `None` for relative paths.
    pub fn parse(path: &str) -> Option<Self> {
        let unified = path.replace('\\', "/");
        let (root, rest) = split_root(&unified)?;
        Some(Self::from_parts(root, rest))
    }

    /// Build a location from a host path (e.g. `std::env::current_dir()`)
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::parse(&path.to_string_lossy())
    }

    /// Resolve `path` against this location.
    ///
    /// Absolute paths replace the base entirely; anything else is appended and
    /// the result is normalized.
    pub fn join(&self, path: &str) -> Location {
        if let Some(absolute) = Self::parse(path) {
            return absolute;
        }
        let unified = path.replace('\\', "/");
        match split_root(&self.0) {
            Some((root, rest)) => Self::from_parts(root, &format!("{}/{}", rest, unified)),
            None => self.clone(),
        }
    }

    /// Containing directory; the root is its own parent
    pub fn parent(&self) -> Location {
        match self.0.rfind('/') {
            Some(idx) => {
                let head = &self.0[..idx];
                if head.is_empty() {
                    Location::root()
                } else if is_drive(head) {
                    Location(Arc::from(format!("{}/", head)))
                } else {
                    Location(Arc::from(head))
                }
            }
            None => self.clone(),
        }
    }

    /// Last segment, empty for the root
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        }
    }

    /// Append a raw suffix to the final segment (`/a/b.src` + `c@0-1`)
    pub fn with_suffix(&self, suffix: &str) -> Location {
        Location(Arc::from(format!("{}{}", self.0, suffix)))
    }

    /// Inverse of [`Location::with_suffix`]
    pub fn strip_suffix(&self, suffix: &str) -> Option<Location> {
        let stripped = self.0.strip_suffix(suffix)?;
        if stripped.is_empty() || stripped.ends_with('/') {
            return None;
        }
        Some(Location(Arc::from(stripped)))
    }

    pub fn ends_with(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&*self.0)
    }

    fn from_parts(root: &str, rest: &str) -> Location {
        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        Location(Arc::from(format!("{}{}", root, segments.join("/"))))
    }
}

/// Whether `path` is absolute (`/x`, `C:/x` or `C:\x`)
pub fn is_absolute(path: &str) -> bool {
    split_root(&path.replace('\\', "/")).is_some()
}

/// Split an absolute path into its root (`/` or `C:/`) and the remainder
fn split_root(path: &str) -> Option<(&str, &str)> {
    if let Some(rest) = path.strip_prefix('/') {
        return Some(("/", rest));
    }
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && is_drive(&path[..2]) && bytes[2] == b'/' {
        return Some((&path[..3], &path[3..]));
    }
    None
}

fn is_drive(head: &str) -> bool {
    let bytes = head.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({:?})", &*self.0)
    }
}

impl AsRef<Path> for Location {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> Location {
        Location::parse(s).unwrap()
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(loc("/app//lib/./x.src").as_str(), "/app/lib/x.src");
        assert_eq!(loc("/app/lib/../x.src").as_str(), "/app/x.src");
        assert_eq!(loc("/app/lib/").as_str(), "/app/lib");
        assert_eq!(loc("\\app\\x.src").as_str(), "/app/x.src");
    }

    #[test]
    fn test_parent_cannot_climb_above_root() {
        assert_eq!(loc("/../../x").as_str(), "/x");
        assert_eq!(loc("/..").as_str(), "/");
        assert_eq!(Location::root().parent(), Location::root());
    }

    #[test]
    fn test_relative_is_rejected() {
        assert!(Location::parse("lib/x.src").is_none());
        assert!(Location::parse("./x").is_none());
        assert!(!is_absolute("x"));
        assert!(is_absolute("/x"));
        assert!(is_absolute("C:\\work"));
    }

    #[test]
    fn test_join() {
        let base = loc("/app/plugins");
        assert_eq!(base.join("./a").as_str(), "/app/plugins/a");
        assert_eq!(base.join("../lib/b.src").as_str(), "/app/lib/b.src");
        assert_eq!(base.join("/abs/c").as_str(), "/abs/c");
        assert_eq!(base.join(".").as_str(), "/app/plugins");
        assert_eq!(Location::root().join("x").as_str(), "/x");
    }

    #[test]
    fn test_parent_and_file_name() {
        let l = loc("/app/lib/x.src");
        assert_eq!(l.parent().as_str(), "/app/lib");
        assert_eq!(l.file_name(), "x.src");
        assert_eq!(loc("/x").parent(), Location::root());
    }

    #[test]
    fn test_drive_roots() {
        let l = loc("C:\\work\\app\\..\\x.src");
        assert_eq!(l.as_str(), "C:/work/x.src");
        assert_eq!(loc("C:/x").parent().as_str(), "C:/");
        assert_eq!(loc("C:/").join("../y").as_str(), "C:/y");
    }

    #[test]
    fn test_suffix() {
        let l = loc("/a/b.src");
        let compiled = l.with_suffix("c@0-1");
        assert_eq!(compiled.as_str(), "/a/b.srcc@0-1");
        assert_eq!(compiled.strip_suffix("c@0-1"), Some(l));
        assert_eq!(loc("/a/b").strip_suffix("b"), None);
    }
}
