//! Execution context stack
//!
//! One [`Frame`] per unit currently being executed, innermost last. Nested
//! requests read their default base directory and inherited search path from
//! the top frame, and the stack doubles as the in-flight set used to detect
//! cyclic loads.

use crate::location::Location;
use crate::reload::ReloadMode;

/// Reload propagation carried by frames during a dependency cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Propagation {
    /// Cascade generation; a unit is reloaded at most once per generation
    pub generation: u64,
    pub mode: ReloadMode,
}

/// Context of one executing unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub location: Location,
    /// Base directory for relative requests made by this unit
    pub directory: Location,
    /// Call-specific entries followed by inherited ones, defaults excluded
    pub search_path: Vec<Location>,
    pub propagation: Option<Propagation>,
}

#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Innermost frame, `None` at top level
    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether `location` is being executed somewhere up the stack
    pub fn contains(&self, location: &Location) -> bool {
        self.frames.iter().any(|f| &f.location == location)
    }

    /// Chain from the first in-flight occurrence of `location` to the top,
    /// closed with `location` again. `None` when it is not in flight.
    pub fn cycle_chain(&self, location: &Location) -> Option<Vec<Location>> {
        let start = self.frames.iter().position(|f| &f.location == location)?;
        let mut chain: Vec<Location> = self.frames[start..]
            .iter()
            .map(|f| f.location.clone())
            .collect();
        chain.push(location.clone());
        Some(chain)
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}
