//! Unit registry
//!
//! Maps each canonical [`Location`] to its loaded [`Unit`] and records which
//! unit loaded which, so dependents of a reloaded unit can be found.

use crate::location::Location;
use crate::unit::Unit;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Registry of loaded units plus the dependency graph between them
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: HashMap<Location, Unit>,
    /// unit → units it requested
    dependencies: HashMap<Location, BTreeSet<Location>>,
    /// unit → units that requested it
    dependents: HashMap<Location, BTreeSet<Location>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, location: &Location) -> Option<&Unit> {
        self.units.get(location)
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.units.contains_key(location)
    }

    /// Install `unit` under `location`, returning the handle it replaced
    pub fn install(&mut self, location: Location, unit: Unit) -> Option<Unit> {
        self.units.insert(location, unit)
    }

    /// Evict a unit.
    ///
    /// Its outgoing edges go with it; units that depend on it keep their
    /// edges so a later cascade still reaches them once it is loaded again.
    pub fn remove(&mut self, location: &Location) -> Option<Unit> {
        let removed = self.units.remove(location)?;
        self.clear_dependencies(location);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Loaded locations, sorted
    pub fn locations(&self) -> Vec<Location> {
        let mut locations: Vec<Location> = self.units.keys().cloned().collect();
        locations.sort();
        locations
    }

    /// Snapshot of the registry, sorted by location
    pub fn snapshot(&self) -> BTreeMap<Location, Unit> {
        self.units
            .iter()
            .map(|(l, u)| (l.clone(), u.clone()))
            .collect()
    }

    pub fn record_dependency(&mut self, dependent: &Location, dependency: &Location) {
        if dependent == dependency {
            return;
        }
        self.dependencies
            .entry(dependent.clone())
            .or_default()
            .insert(dependency.clone());
        self.dependents
            .entry(dependency.clone())
            .or_default()
            .insert(dependent.clone());
    }

    /// Forget every edge going out of `location` (before it re-executes)
    pub fn clear_dependencies(&mut self, location: &Location) {
        if let Some(dependencies) = self.dependencies.remove(location) {
            for dependency in dependencies {
                if let Some(set) = self.dependents.get_mut(&dependency) {
                    set.remove(location);
                    if set.is_empty() {
                        self.dependents.remove(&dependency);
                    }
                }
            }
        }
    }

    /// Direct dependencies, sorted
    pub fn dependencies_of(&self, location: &Location) -> Vec<Location> {
        self.dependencies
            .get(location)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Direct dependents, sorted
    pub fn dependents_of(&self, location: &Location) -> Vec<Location> {
        self.dependents
            .get(location)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every unit that depends on `root`, directly or transitively
    pub fn transitive_dependents(&self, root: &Location) -> BTreeSet<Location> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<Location> = VecDeque::from([root.clone()]);
        while let Some(next) = queue.pop_front() {
            for dependent in self.dependents_of(&next) {
                if &dependent != root && seen.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }
        seen
    }

    /// Order in which the dependents of `root` are re-executed.
    ///
    /// A unit comes after every affected unit it depends on; ties are broken
    /// by location. Units caught in a cycle among themselves are appended in
    /// location order.
    pub fn reload_order(&self, root: &Location) -> Vec<Location> {
        let affected = self.transitive_dependents(root);
        let mut pending: BTreeMap<Location, usize> = affected
            .iter()
            .map(|l| {
                let count = self
                    .dependencies_of(l)
                    .iter()
                    .filter(|d| affected.contains(*d))
                    .count();
                (l.clone(), count)
            })
            .collect();

        let mut ready: BTreeSet<Location> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(l, _)| l.clone())
            .collect();
        let mut order = Vec::with_capacity(affected.len());

        while let Some(next) = ready.pop_first() {
            pending.remove(&next);
            for dependent in self.dependents_of(&next) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
            order.push(next);
        }

        // 剩下的都在环里
        order.extend(pending.into_keys());
        order
    }
}
