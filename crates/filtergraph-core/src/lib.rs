//! # filtergraph-core
//!
//! The relationship engine behind filtergraph's cascading filters.
//!
//! Three entity types (modules, units, locations) are linked by two
//! many-to-many relations:
//!
//! ```text
//!   Module ──< module_unit >── Unit ──< unit_location >── Location
//! ```
//!
//! Given selections on any two types, the resolver computes which values of
//! the third remain reachable, and checks whether a full selection is
//! mutually consistent.
//!
//! ## Architectural Constraints
//!
//! - Synchronous and deterministic: id sets are ordered, results are sorted
//! - No async, no network dependencies
//! - Stores are read-only during resolution; writes only happen on import

// =============================================================================
// MODULES
// =============================================================================

pub mod formats;
pub mod query;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    FilterError, Location, LocationId, LocationIds, Module, ModuleId, ModuleIds, ModuleUnitLink,
    Unit, UnitId, UnitIds, UnitLocationLink,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use query::{FilterQuery, FilterTarget, parse_id_list};
pub use resolver::{FilterResolver, Resolution, Verdict};
pub use store::{CatalogStats, MemoryStore, RelationshipStore};
pub use storage::RedbStore;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{Dataset, MAX_DATASET_SIZE};
