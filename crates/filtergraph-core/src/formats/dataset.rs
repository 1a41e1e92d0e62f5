//! # Dataset Format
//!
//! The JSON interchange format used to seed a store.
//!
//! A dataset mirrors the five relations of the catalog:
//!
//! ```json
//! {
//!   "modules": [{"id": 1, "title": "Algebra"}],
//!   "units": [{"id": 10, "title": "Unit A"}],
//!   "locations": [{"id": 100, "title": "North"}],
//!   "moduleUnitMapping": [{"moduleId": 1, "unitId": 10}],
//!   "unitLocationMapping": [{"unitId": 10, "locationId": 100}]
//! }
//! ```
//!
//! Every store validates a dataset with [`Dataset::validate`] before exposing
//! it, so referential integrity holds for the resolver.

use crate::{
    FilterError, Location, LocationId, Module, ModuleId, ModuleUnitLink, Unit, UnitId,
    UnitLocationLink,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum accepted size of a serialized dataset.
///
/// Validated before parsing so an oversized file never reaches serde.
pub const MAX_DATASET_SIZE: usize = 256 * 1024 * 1024; // 256 MB

/// A complete set of entities and relationship edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub module_unit_mapping: Vec<ModuleUnitLink>,
    #[serde(default)]
    pub unit_location_mapping: Vec<UnitLocationLink>,
}

impl Dataset {
    /// Parse a dataset from JSON bytes. Does not validate integrity.
    pub fn from_json_slice(data: &[u8]) -> Result<Self, FilterError> {
        if data.len() > MAX_DATASET_SIZE {
            return Err(FilterError::SerializationError(format!(
                "Dataset size {} bytes exceeds maximum {} bytes",
                data.len(),
                MAX_DATASET_SIZE
            )));
        }
        serde_json::from_slice(data).map_err(|e| FilterError::SerializationError(e.to_string()))
    }

    /// Serialize the dataset as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, FilterError> {
        serde_json::to_vec_pretty(self).map_err(|e| FilterError::SerializationError(e.to_string()))
    }

    /// Check entity id uniqueness and referential integrity of every edge.
    ///
    /// Duplicate edges are allowed; stores collapse them.
    pub fn validate(&self) -> Result<(), FilterError> {
        let module_ids = unique_ids(self.modules.iter().map(|m| m.id), "module")?;
        let unit_ids = unique_ids(self.units.iter().map(|u| u.id), "unit")?;
        let location_ids = unique_ids(self.locations.iter().map(|l| l.id), "location")?;

        for link in &self.module_unit_mapping {
            if !module_ids.contains(&link.module_id) {
                return Err(dangling("moduleUnitMapping", "module", link.module_id.0));
            }
            if !unit_ids.contains(&link.unit_id) {
                return Err(dangling("moduleUnitMapping", "unit", link.unit_id.0));
            }
        }

        for link in &self.unit_location_mapping {
            if !unit_ids.contains(&link.unit_id) {
                return Err(dangling("unitLocationMapping", "unit", link.unit_id.0));
            }
            if !location_ids.contains(&link.location_id) {
                return Err(dangling(
                    "unitLocationMapping",
                    "location",
                    link.location_id.0,
                ));
            }
        }

        Ok(())
    }

    /// Convenience builder used by tests and fixtures.
    #[must_use]
    pub fn with_module(mut self, id: i64, title: &str) -> Self {
        self.modules.push(Module::new(ModuleId(id), title));
        self
    }

    #[must_use]
    pub fn with_unit(mut self, id: i64, title: &str) -> Self {
        self.units.push(Unit::new(UnitId(id), title));
        self
    }

    #[must_use]
    pub fn with_location(mut self, id: i64, title: &str) -> Self {
        self.locations.push(Location::new(LocationId(id), title));
        self
    }

    #[must_use]
    pub fn link_module_unit(mut self, module: i64, unit: i64) -> Self {
        self.module_unit_mapping
            .push(ModuleUnitLink::new(ModuleId(module), UnitId(unit)));
        self
    }

    #[must_use]
    pub fn link_unit_location(mut self, unit: i64, location: i64) -> Self {
        self.unit_location_mapping
            .push(UnitLocationLink::new(UnitId(unit), LocationId(location)));
        self
    }
}

fn unique_ids<T: Ord + Copy + std::fmt::Display>(
    ids: impl Iterator<Item = T>,
    kind: &str,
) -> Result<BTreeSet<T>, FilterError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(FilterError::InvalidDataset(format!(
                "duplicate {} id {}",
                kind, id
            )));
        }
    }
    Ok(seen)
}

fn dangling(relation: &str, kind: &str, id: i64) -> FilterError {
    FilterError::InvalidDataset(format!("{} references unknown {} {}", relation, kind, id))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::default()
            .with_module(1, "M1")
            .with_unit(10, "U1")
            .with_location(100, "L1")
            .link_module_unit(1, 10)
            .link_unit_location(10, 100)
    }

    #[test]
    fn valid_dataset_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn dangling_module_edge_rejected() {
        let dataset = sample().link_module_unit(2, 10);
        let err = dataset.validate().expect_err("dangling module");
        assert!(matches!(err, FilterError::InvalidDataset(_)));
        assert!(err.to_string().contains("unknown module 2"));
    }

    #[test]
    fn dangling_location_edge_rejected() {
        let dataset = sample().link_unit_location(10, 999);
        assert!(matches!(
            dataset.validate(),
            Err(FilterError::InvalidDataset(_))
        ));
    }

    #[test]
    fn duplicate_entity_id_rejected() {
        let dataset = sample().with_unit(10, "again");
        let err = dataset.validate().expect_err("duplicate");
        assert!(err.to_string().contains("duplicate unit id 10"));
    }

    #[test]
    fn duplicate_edges_allowed() {
        let dataset = sample().link_module_unit(1, 10);
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn parses_camel_case_json() {
        let json = br#"{
            "modules": [{"id": 1, "title": "M1"}],
            "units": [{"id": 10, "title": "U1"}],
            "moduleUnitMapping": [{"moduleId": 1, "unitId": 10}]
        }"#;
        let dataset = Dataset::from_json_slice(json).expect("parse");
        assert_eq!(dataset.modules.len(), 1);
        assert!(dataset.locations.is_empty());
        assert_eq!(
            dataset.module_unit_mapping,
            vec![ModuleUnitLink::new(ModuleId(1), UnitId(10))]
        );
    }

    #[test]
    fn json_round_trip_preserves_content() {
        let dataset = sample();
        let bytes = dataset.to_json_pretty().expect("encode");
        assert_eq!(Dataset::from_json_slice(&bytes).expect("decode"), dataset);
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        assert!(matches!(
            Dataset::from_json_slice(b"not json"),
            Err(FilterError::SerializationError(_))
        ));
    }
}
