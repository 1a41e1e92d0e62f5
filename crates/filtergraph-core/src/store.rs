//! # Relationship Store
//!
//! Raw join lookups over the module↔unit and unit↔location relations.
//!
//! This module defines the `RelationshipStore` trait and the in-memory
//! backend. No business rules live here: a store answers "which ids are
//! linked to these ids" and hydrates ids into records, nothing else.

use crate::formats::Dataset;
use crate::{
    FilterError, Location, LocationId, LocationIds, Module, ModuleId, ModuleIds, Unit, UnitId,
    UnitIds,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// RELATIONSHIPSTORE TRAIT
// =============================================================================

/// Read-only access to entities and relationship edges.
///
/// Every call may fail with `FilterError::StoreUnavailable`. Lookups over an
/// empty id set return an empty set. Hydration skips unknown ids and returns
/// records ordered by id.
pub trait RelationshipStore {
    /// All modules, ordered by id.
    fn all_modules(&self) -> Result<Vec<Module>, FilterError>;

    /// All units, ordered by id.
    fn all_units(&self) -> Result<Vec<Unit>, FilterError>;

    /// All locations, ordered by id.
    fn all_locations(&self) -> Result<Vec<Location>, FilterError>;

    /// Unit ids mapped to any of the given module ids.
    fn units_for_modules(&self, module_ids: &ModuleIds) -> Result<UnitIds, FilterError>;

    /// Unit ids mapped to any of the given location ids.
    fn units_for_locations(&self, location_ids: &LocationIds) -> Result<UnitIds, FilterError>;

    /// Module ids mapped to any of the given unit ids.
    fn modules_for_units(&self, unit_ids: &UnitIds) -> Result<ModuleIds, FilterError>;

    /// Location ids mapped to any of the given unit ids.
    fn locations_for_units(&self, unit_ids: &UnitIds) -> Result<LocationIds, FilterError>;

    fn modules_by_id(&self, ids: &ModuleIds) -> Result<Vec<Module>, FilterError>;

    fn units_by_id(&self, ids: &UnitIds) -> Result<Vec<Unit>, FilterError>;

    fn locations_by_id(&self, ids: &LocationIds) -> Result<Vec<Location>, FilterError>;

    /// Every unit that has at least one location edge.
    ///
    /// Backends with a reverse index should override this.
    fn located_units(&self) -> Result<UnitIds, FilterError> {
        let all: LocationIds = self.all_locations()?.into_iter().map(|l| l.id).collect();
        self.units_for_locations(&all)
    }

    /// Entity and edge counts.
    fn stats(&self) -> Result<CatalogStats, FilterError>;
}

/// Size of a catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub modules: usize,
    pub units: usize,
    pub locations: usize,
    pub module_unit_links: usize,
    pub unit_location_links: usize,
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-memory store with forward and reverse adjacency.
///
/// Uses `BTreeMap` exclusively so hydration and id sets come out ordered.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    modules: BTreeMap<ModuleId, Module>,
    units: BTreeMap<UnitId, Unit>,
    locations: BTreeMap<LocationId, Location>,

    /// module -> units
    module_units: BTreeMap<ModuleId, UnitIds>,
    /// unit -> modules
    unit_modules: BTreeMap<UnitId, ModuleIds>,
    /// unit -> locations
    unit_locations: BTreeMap<UnitId, LocationIds>,
    /// location -> units
    location_units: BTreeMap<LocationId, UnitIds>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a dataset, rejecting integrity violations.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self, FilterError> {
        dataset.validate()?;

        let mut store = Self::new();
        for module in &dataset.modules {
            store.modules.insert(module.id, module.clone());
        }
        for unit in &dataset.units {
            store.units.insert(unit.id, unit.clone());
        }
        for location in &dataset.locations {
            store.locations.insert(location.id, location.clone());
        }

        for link in &dataset.module_unit_mapping {
            store
                .module_units
                .entry(link.module_id)
                .or_default()
                .insert(link.unit_id);
            store
                .unit_modules
                .entry(link.unit_id)
                .or_default()
                .insert(link.module_id);
        }
        for link in &dataset.unit_location_mapping {
            store
                .unit_locations
                .entry(link.unit_id)
                .or_default()
                .insert(link.location_id);
            store
                .location_units
                .entry(link.location_id)
                .or_default()
                .insert(link.unit_id);
        }

        Ok(store)
    }
}

/// Union of the adjacency sets of `keys`.
fn reach<K: Ord, V: Ord + Copy>(
    adjacency: &BTreeMap<K, BTreeSet<V>>,
    keys: &BTreeSet<K>,
) -> BTreeSet<V> {
    keys.iter()
        .filter_map(|key| adjacency.get(key))
        .flat_map(|targets| targets.iter().copied())
        .collect()
}

/// Records for `ids`, skipping unknown ones.
fn hydrate<K: Ord, V: Clone>(records: &BTreeMap<K, V>, ids: &BTreeSet<K>) -> Vec<V> {
    ids.iter()
        .filter_map(|id| records.get(id))
        .cloned()
        .collect()
}

fn edge_count<K, V>(adjacency: &BTreeMap<K, BTreeSet<V>>) -> usize {
    adjacency.values().map(BTreeSet::len).sum()
}

impl RelationshipStore for MemoryStore {
    fn all_modules(&self) -> Result<Vec<Module>, FilterError> {
        Ok(self.modules.values().cloned().collect())
    }

    fn all_units(&self) -> Result<Vec<Unit>, FilterError> {
        Ok(self.units.values().cloned().collect())
    }

    fn all_locations(&self) -> Result<Vec<Location>, FilterError> {
        Ok(self.locations.values().cloned().collect())
    }

    fn units_for_modules(&self, module_ids: &ModuleIds) -> Result<UnitIds, FilterError> {
        Ok(reach(&self.module_units, module_ids))
    }

    fn units_for_locations(&self, location_ids: &LocationIds) -> Result<UnitIds, FilterError> {
        Ok(reach(&self.location_units, location_ids))
    }

    fn modules_for_units(&self, unit_ids: &UnitIds) -> Result<ModuleIds, FilterError> {
        Ok(reach(&self.unit_modules, unit_ids))
    }

    fn locations_for_units(&self, unit_ids: &UnitIds) -> Result<LocationIds, FilterError> {
        Ok(reach(&self.unit_locations, unit_ids))
    }

    fn modules_by_id(&self, ids: &ModuleIds) -> Result<Vec<Module>, FilterError> {
        Ok(hydrate(&self.modules, ids))
    }

    fn units_by_id(&self, ids: &UnitIds) -> Result<Vec<Unit>, FilterError> {
        Ok(hydrate(&self.units, ids))
    }

    fn locations_by_id(&self, ids: &LocationIds) -> Result<Vec<Location>, FilterError> {
        Ok(hydrate(&self.locations, ids))
    }

    fn located_units(&self) -> Result<UnitIds, FilterError> {
        Ok(self
            .unit_locations
            .iter()
            .filter(|(_, locations)| !locations.is_empty())
            .map(|(unit, _)| *unit)
            .collect())
    }

    fn stats(&self) -> Result<CatalogStats, FilterError> {
        Ok(CatalogStats {
            modules: self.modules.len(),
            units: self.units.len(),
            locations: self.locations.len(),
            module_unit_links: edge_count(&self.module_units),
            unit_location_links: edge_count(&self.unit_locations),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
