//! Error types for unit loading

use crate::location::Location;
use crate::reload::CascadeReport;
use shroud_vfs::VfsError;
use thiserror::Error;

/// Main loading error type
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error("unit '{request}' not found (searched: {})", join_locations(.searched, ", "))]
    NotFound {
        request: String,
        /// Directories the request was resolved against, in order
        searched: Vec<Location>,
        /// Every concrete file probed, in order
        tried: Vec<Location>,
    },

    #[error("invalid request '{request}': {reason}")]
    InvalidRequest { request: String, reason: String },

    #[error("failed to read '{location}': {source}")]
    Read {
        location: Location,
        #[source]
        source: VfsError,
    },

    #[error("failed to write '{location}': {source}")]
    Write {
        location: Location,
        #[source]
        source: VfsError,
    },

    #[error("compile error in '{location}': {message}")]
    Compile { location: Location, message: String },

    #[error("execution error in '{location}': {message}")]
    Execution { location: Location, message: String },

    #[error("cyclic load: {}", join_locations(.chain, " -> "))]
    CyclicLoad {
        /// From the first in-flight occurrence back to the repeated location
        chain: Vec<Location>,
    },

    #[error("{0}")]
    CascadeReload(Box<CascadeReport>),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Discriminant of [`LoadError`], for reports and matching across crates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidRequest,
    Read,
    Write,
    Compile,
    Execution,
    CyclicLoad,
    CascadeReload,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Read => "read",
            ErrorKind::Write => "write",
            ErrorKind::Compile => "compile",
            ErrorKind::Execution => "execution",
            ErrorKind::CyclicLoad => "cyclic_load",
            ErrorKind::CascadeReload => "cascade_reload",
            ErrorKind::Config => "config",
        }
    }
}

impl LoadError {
    pub fn compile(location: &Location, message: impl Into<String>) -> Self {
        LoadError::Compile {
            location: location.clone(),
            message: message.into(),
        }
    }

    pub fn execution(location: &Location, message: impl Into<String>) -> Self {
        LoadError::Execution {
            location: location.clone(),
            message: message.into(),
        }
    }

    pub fn invalid_request(request: &str, reason: impl Into<String>) -> Self {
        LoadError::InvalidRequest {
            request: request.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::NotFound { .. } => ErrorKind::NotFound,
            LoadError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            LoadError::Read { .. } => ErrorKind::Read,
            LoadError::Write { .. } => ErrorKind::Write,
            LoadError::Compile { .. } => ErrorKind::Compile,
            LoadError::Execution { .. } => ErrorKind::Execution,
            LoadError::CyclicLoad { .. } => ErrorKind::CyclicLoad,
            LoadError::CascadeReload(_) => ErrorKind::CascadeReload,
            LoadError::Config(_) => ErrorKind::Config,
        }
    }

    /// The unit or file the error is about, when there is one
    pub fn location(&self) -> Option<&Location> {
        match self {
            LoadError::Read { location, .. }
            | LoadError::Write { location, .. }
            | LoadError::Compile { location, .. }
            | LoadError::Execution { location, .. } => Some(location),
            LoadError::CyclicLoad { chain } => chain.last(),
            LoadError::CascadeReload(report) => Some(&report.root),
            _ => None,
        }
    }
}

fn join_locations(locations: &[Location], sep: &str) -> String {
    locations
        .iter()
        .map(Location::as_str)
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> Location {
        Location::parse(s).unwrap()
    }

    #[test]
    fn test_not_found_display() {
        let err = LoadError::NotFound {
            request: "helpers".to_string(),
            searched: vec![loc("/app/lib"), loc("/opt/shared")],
            tried: vec![loc("/app/lib/helpers")],
        };
        assert_eq!(
            err.to_string(),
            "unit 'helpers' not found (searched: /app/lib, /opt/shared)"
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.location().is_none());
    }

    #[test]
    fn test_cyclic_display() {
        let err = LoadError::CyclicLoad {
            chain: vec![loc("/a.src"), loc("/b.src"), loc("/a.src")],
        };
        assert_eq!(err.to_string(), "cyclic load: /a.src -> /b.src -> /a.src");
        assert_eq!(err.location(), Some(&loc("/a.src")));
    }

    #[test]
    fn test_read_error_source() {
        use std::error::Error as _;

        let err = LoadError::Read {
            location: loc("/x.src"),
            source: VfsError::PermissionDenied {
                path: "/x.src".to_string(),
            },
        };
        assert!(err.source().is_some());
        assert_eq!(err.kind().as_str(), "read");
    }
}
