//! # Core Type Definitions
//!
//! This module contains all core types for filtergraph:
//! - Entity identifiers (`ModuleId`, `UnitId`, `LocationId`)
//! - Entity records (`Module`, `Unit`, `Location`)
//! - Relationship edges (`ModuleUnitLink`, `UnitLocationLink`)
//! - Error types (`FilterError`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers implement `Ord` so that id sets are `BTreeSet`s and every
//! response is ordered by id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Identifier of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub i64);

/// Identifier of a unit. Units are the pivot: the only entity related to both
/// modules and locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub i64);

/// Identifier of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub i64);

impl From<i64> for ModuleId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<i64> for UnitId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<i64> for LocationId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id sets, one per axis.
pub type ModuleIds = BTreeSet<ModuleId>;
pub type UnitIds = BTreeSet<UnitId>;
pub type LocationIds = BTreeSet<LocationId>;

// =============================================================================
// ENTITY RECORDS
// =============================================================================

/// A module. Identity is the id; the title is display data only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
}

/// A unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub title: String,
}

/// A location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub title: String,
}

impl Module {
    #[must_use]
    pub fn new(id: ModuleId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl Unit {
    #[must_use]
    pub fn new(id: UnitId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl Location {
    #[must_use]
    pub fn new(id: LocationId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

// =============================================================================
// RELATIONSHIP EDGES
// =============================================================================

/// Many-to-many edge between a module and a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleUnitLink {
    pub module_id: ModuleId,
    pub unit_id: UnitId,
}

/// Many-to-many edge between a unit and a location.
///
/// There is no module-location edge type: a module reaches a location only
/// through a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitLocationLink {
    pub unit_id: UnitId,
    pub location_id: LocationId,
}

impl ModuleUnitLink {
    #[must_use]
    pub const fn new(module_id: ModuleId, unit_id: UnitId) -> Self {
        Self { module_id, unit_id }
    }
}

impl UnitLocationLink {
    #[must_use]
    pub const fn new(unit_id: UnitId, location_id: LocationId) -> Self {
        Self {
            unit_id,
            location_id,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in filtergraph.
///
/// Malformed id lists are not an error (entries are dropped while parsing) and
/// an inconsistent combination is a `Verdict`, not an error.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The relationship store could not be reached or read.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A dataset violates referential integrity or repeats an entity id.
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A command-line selection the boundary contract rejects.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// =============================================================================
// TESTS
// =============================================================================
