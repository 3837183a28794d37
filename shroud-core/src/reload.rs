//! Reload modes and cascades

use crate::environment::Request;
use crate::error::LoadError;
use crate::loader::{Loader, Origin};
use crate::location::Location;
use crate::targets;
use crate::unit::Unit;
use std::fmt;
use tracing::{info, warn};

/// What happens to the existing unit object on reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadMode {
    /// Execute into a new unit and install it; old handles keep the old state
    #[default]
    Replace,
    /// Re-execute and refresh the existing unit, so every holder sees the result
    InPlace,
}

/// Which other units a reload re-executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cascade {
    /// Only the requested unit
    #[default]
    None,
    /// Afterwards, every loaded unit that depends on it, dependencies first
    Dependents,
    /// Every unit requested while it re-executes, at most once each
    Dependencies,
}

/// Reload options for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reload {
    pub mode: ReloadMode,
    pub cascade: Cascade,
}

impl Reload {
    pub fn replace() -> Self {
        Self::default()
    }

    pub fn in_place() -> Self {
        Self {
            mode: ReloadMode::InPlace,
            cascade: Cascade::None,
        }
    }

    pub fn with_cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }
}

/// Outcome of a dependents cascade in which some unit failed
#[derive(Debug, Clone)]
pub struct CascadeReport {
    pub root: Location,
    pub succeeded: Vec<Location>,
    pub failed: Vec<(Location, LoadError)>,
}

impl CascadeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for CascadeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cascade reload of '{}' incomplete: {} reloaded, {} failed",
            self.root,
            self.succeeded.len(),
            self.failed.len()
        )?;
        for (location, error) in &self.failed {
            write!(f, "\n  - {}: {}", location, error)?;
        }
        Ok(())
    }
}

/// Reload the requested unit, then every loaded unit depending on it.
///
/// A failure of the root is returned as is. Failures further down do not stop
/// the cascade; they are collected into a [`CascadeReport`]. Nothing that
/// succeeded is rolled back.
pub(crate) fn reload_dependents(
    loader: &mut Loader<'_>,
    request: &Request,
    origin: Origin,
    mode: ReloadMode,
) -> Result<Unit, LoadError> {
    let single = Reload {
        mode,
        cascade: Cascade::None,
    };
    let root = loader.load(&request.clone().with_reload(single), origin)?;
    let order = loader.state.registry.reload_order(root.identity());

    let mut report = CascadeReport {
        root: root.identity().clone(),
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for location in order {
        // 失败后被移除的依赖方不再重载
        let Some(unit) = loader.state.registry.get(&location).cloned() else {
            continue;
        };
        match loader.reload_unit(&unit, single) {
            Ok(_) => report.succeeded.push(location),
            Err(e) => {
                warn!(target: targets::RELOAD, unit = %location, error = %e, "dependent reload failed");
                report.failed.push((location, e));
            }
        }
    }

    info!(
        target: targets::RELOAD,
        root = %report.root,
        reloaded = report.succeeded.len(),
        failed = report.failed.len(),
        "cascade finished"
    );
    if report.is_complete() {
        Ok(root)
    } else {
        Err(LoadError::CascadeReload(Box::new(report)))
    }
}
