//! # Filter Resolver
//!
//! Narrowing and combination validation over a `RelationshipStore`.
//!
//! ## Narrowing
//!
//! For every entity type the resolver computes the values still reachable
//! given selections on the two other axes. An empty selection means "no
//! constraint on this axis"; all selections empty returns the full set.
//!
//! Units and locations use independent resolution: each given selection is
//! resolved on its own and the results are intersected. Modules use a join:
//! a module qualifies only through ONE unit that satisfies the unit selection
//! and itself reaches a selected location.
//!
//! ```text
//!   M1 ── U1 ── L1        resolve_modules(units=[U1], locations=[L2])
//!    └─── U2 ── L2        -> {}   (U1 never reaches L2)
//! ```
//!
//! ## Validation
//!
//! A triple (modules, units, locations) is consistent when every unit is
//! offered by one of the modules and every location is served by one of the
//! units. The second check uses the caller's units, not the module-derived
//! set.

use crate::query::FilterQuery;
use crate::store::RelationshipStore;
use crate::{FilterError, Location, LocationIds, Module, ModuleIds, Unit, UnitIds};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// VERDICT
// =============================================================================

/// Outcome of checking a (modules, units, locations) combination.
///
/// Only the first failing step is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every unit and every location is reachable.
    Valid,
    /// Units not offered by any of the selected modules.
    UnreachableUnits(UnitIds),
    /// Locations not served by any of the selected units.
    UnreachableLocations(LocationIds),
}

impl Verdict {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::UnreachableUnits(units) => {
                write!(
                    f,
                    "Units not offered by the selected modules: {}",
                    join_ids(units)
                )
            }
            Self::UnreachableLocations(locations) => write!(
                f,
                "Locations not served by the selected units: {}",
                join_ids(locations)
            ),
        }
    }
}

fn join_ids<T: fmt::Display>(ids: &BTreeSet<T>) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Result of a `FilterQuery`, shaped like the HTTP response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Modules(Vec<Module>),
    Units(Vec<Unit>),
    Locations(Vec<Location>),
}

impl Resolution {
    /// Number of records returned.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Modules(m) => m.len(),
            Self::Units(u) => u.len(),
            Self::Locations(l) => l.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// FILTER RESOLVER
// =============================================================================

/// Stateless resolver over a borrowed store. Cheap to build per request.
pub struct FilterResolver<'a, S: RelationshipStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RelationshipStore + ?Sized> FilterResolver<'a, S> {
    /// Create a resolver over `store`.
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    // -------------------------------------------------------------------------
    // MODULES (join-then-filter)
    // -------------------------------------------------------------------------

    /// Modules compatible with the unit and location selections.
    pub fn resolve_modules(
        &self,
        unit_ids: &UnitIds,
        location_ids: &LocationIds,
    ) -> Result<Vec<Module>, FilterError> {
        match self.narrow_modules(unit_ids, location_ids)? {
            None => self.store.all_modules(),
            Some(ids) => self.store.modules_by_id(&ids),
        }
    }

    /// Id-level form of [`Self::resolve_modules`].
    pub fn resolve_module_ids(
        &self,
        unit_ids: &UnitIds,
        location_ids: &LocationIds,
    ) -> Result<ModuleIds, FilterError> {
        match self.narrow_modules(unit_ids, location_ids)? {
            None => Ok(self.store.all_modules()?.into_iter().map(|m| m.id).collect()),
            Some(ids) => Ok(ids),
        }
    }

    /// `None` when unconstrained.
    ///
    /// Pivot units are the units that carry a location edge (inside the
    /// location selection, when there is one) and belong to the unit
    /// selection, when there is one. A module qualifies iff it links to a
    /// pivot unit.
    fn narrow_modules(
        &self,
        unit_ids: &UnitIds,
        location_ids: &LocationIds,
    ) -> Result<Option<ModuleIds>, FilterError> {
        if unit_ids.is_empty() && location_ids.is_empty() {
            return Ok(None);
        }

        let mut pivots = if location_ids.is_empty() {
            self.store.located_units()?
        } else {
            self.store.units_for_locations(location_ids)?
        };
        if !unit_ids.is_empty() {
            pivots.retain(|unit| unit_ids.contains(unit));
        }

        if pivots.is_empty() {
            return Ok(Some(ModuleIds::new()));
        }
        self.store.modules_for_units(&pivots).map(Some)
    }

    // -------------------------------------------------------------------------
    // UNITS (resolve-then-intersect)
    // -------------------------------------------------------------------------

    /// Units compatible with the module and location selections.
    pub fn resolve_units(
        &self,
        module_ids: &ModuleIds,
        location_ids: &LocationIds,
    ) -> Result<Vec<Unit>, FilterError> {
        match self.narrow_units(module_ids, location_ids)? {
            None => self.store.all_units(),
            Some(ids) => self.store.units_by_id(&ids),
        }
    }

    /// Id-level form of [`Self::resolve_units`].
    pub fn resolve_unit_ids(
        &self,
        module_ids: &ModuleIds,
        location_ids: &LocationIds,
    ) -> Result<UnitIds, FilterError> {
        match self.narrow_units(module_ids, location_ids)? {
            None => Ok(self.store.all_units()?.into_iter().map(|u| u.id).collect()),
            Some(ids) => Ok(ids),
        }
    }

    fn narrow_units(
        &self,
        module_ids: &ModuleIds,
        location_ids: &LocationIds,
    ) -> Result<Option<UnitIds>, FilterError> {
        let from_modules = if module_ids.is_empty() {
            None
        } else {
            Some(self.store.units_for_modules(module_ids)?)
        };
        let from_locations = if location_ids.is_empty() {
            None
        } else {
            Some(self.store.units_for_locations(location_ids)?)
        };
        Ok(combine(from_modules, from_locations))
    }

    // -------------------------------------------------------------------------
    // LOCATIONS (resolve-then-intersect, two hops from modules)
    // -------------------------------------------------------------------------

    /// Locations compatible with the unit and module selections.
    pub fn resolve_locations(
        &self,
        unit_ids: &UnitIds,
        module_ids: &ModuleIds,
    ) -> Result<Vec<Location>, FilterError> {
        match self.narrow_locations(unit_ids, module_ids)? {
            None => self.store.all_locations(),
            Some(ids) => self.store.locations_by_id(&ids),
        }
    }

    /// Id-level form of [`Self::resolve_locations`].
    pub fn resolve_location_ids(
        &self,
        unit_ids: &UnitIds,
        module_ids: &ModuleIds,
    ) -> Result<LocationIds, FilterError> {
        match self.narrow_locations(unit_ids, module_ids)? {
            None => Ok(self
                .store
                .all_locations()?
                .into_iter()
                .map(|l| l.id)
                .collect()),
            Some(ids) => Ok(ids),
        }
    }

    fn narrow_locations(
        &self,
        unit_ids: &UnitIds,
        module_ids: &ModuleIds,
    ) -> Result<Option<LocationIds>, FilterError> {
        let from_units = if unit_ids.is_empty() {
            None
        } else {
            Some(self.store.locations_for_units(unit_ids)?)
        };
        let from_modules = if module_ids.is_empty() {
            None
        } else {
            let units = self.store.units_for_modules(module_ids)?;
            Some(self.store.locations_for_units(&units)?)
        };
        Ok(combine(from_units, from_modules))
    }

    // -------------------------------------------------------------------------
    // VALIDATION
    // -------------------------------------------------------------------------

    /// True iff every unit is offered by one of the modules and every
    /// location is served by one of the units.
    ///
    /// Callers guarantee non-empty inputs; empty sets are vacuously covered.
    pub fn validate_combination(
        &self,
        module_ids: &ModuleIds,
        unit_ids: &UnitIds,
        location_ids: &LocationIds,
    ) -> Result<bool, FilterError> {
        Ok(self
            .check_combination(module_ids, unit_ids, location_ids)?
            .is_valid())
    }

    /// Like [`Self::validate_combination`], naming the offending ids of the
    /// first failing step.
    pub fn check_combination(
        &self,
        module_ids: &ModuleIds,
        unit_ids: &UnitIds,
        location_ids: &LocationIds,
    ) -> Result<Verdict, FilterError> {
        let offered = self.store.units_for_modules(module_ids)?;
        let stray_units: UnitIds = unit_ids.difference(&offered).copied().collect();
        if !stray_units.is_empty() {
            return Ok(Verdict::UnreachableUnits(stray_units));
        }

        let served = self.store.locations_for_units(unit_ids)?;
        let stray_locations: LocationIds = location_ids.difference(&served).copied().collect();
        if !stray_locations.is_empty() {
            return Ok(Verdict::UnreachableLocations(stray_locations));
        }

        Ok(Verdict::Valid)
    }

    // -------------------------------------------------------------------------
    // QUERY DISPATCH
    // -------------------------------------------------------------------------

    /// Execute a structured query.
    pub fn run(&self, query: &FilterQuery) -> Result<Resolution, FilterError> {
        match query {
            FilterQuery::Modules {
                unit_ids,
                location_ids,
            } => self
                .resolve_modules(unit_ids, location_ids)
                .map(Resolution::Modules),
            FilterQuery::Units {
                module_ids,
                location_ids,
            } => self
                .resolve_units(module_ids, location_ids)
                .map(Resolution::Units),
            FilterQuery::Locations {
                unit_ids,
                module_ids,
            } => self
                .resolve_locations(unit_ids, module_ids)
                .map(Resolution::Locations),
        }
    }
}

/// Intersection if both sides are constrained, otherwise whichever side is.
fn combine<T: Ord + Copy>(
    left: Option<BTreeSet<T>>,
    right: Option<BTreeSet<T>>,
) -> Option<BTreeSet<T>> {
    match (left, right) {
        (Some(left), Some(right)) => Some(left.intersection(&right).copied().collect()),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
