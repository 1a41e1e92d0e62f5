//! # redb-backed Relationship Storage
//!
//! A disk-backed relationship store using the redb embedded database.
//!
//! ## Layout
//!
//! - Entity tables map id → postcard-encoded record.
//! - Each relation is stored twice, forward and reverse, keyed `(from, to)`
//!   with a unit value. A range scan over `(id, MIN)..=(id, MAX)` yields the
//!   adjacency of `id` without a secondary index.
//!
//! redb gives MVCC reads, so concurrent requests each open their own read
//! transaction and never block one another.

use crate::formats::Dataset;
use crate::store::{CatalogStats, RelationshipStore};
use crate::{
    FilterError, Location, LocationId, LocationIds, Module, ModuleId, ModuleIds, Unit, UnitId,
    UnitIds,
};
use redb::{
    Database, ReadOnlyTable, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::Path;

/// Entity table: id -> postcard-encoded record.
type EntityTable = TableDefinition<'static, i64, &'static [u8]>;

/// Edge table: (from, to) -> ().
type EdgeTable = TableDefinition<'static, (i64, i64), ()>;

/// Table for modules: ModuleId(i64) -> serialized Module bytes
const MODULES: EntityTable = TableDefinition::new("modules");

/// Table for units: UnitId(i64) -> serialized Unit bytes
const UNITS: EntityTable = TableDefinition::new("units");

/// Table for locations: LocationId(i64) -> serialized Location bytes
const LOCATIONS: EntityTable = TableDefinition::new("locations");

/// (module_id, unit_id)
const MODULE_UNITS: EdgeTable = TableDefinition::new("module_units");

/// (unit_id, module_id)
const UNIT_MODULES: EdgeTable = TableDefinition::new("unit_modules");

/// (unit_id, location_id)
const UNIT_LOCATIONS: EdgeTable = TableDefinition::new("unit_locations");

/// (location_id, unit_id)
const LOCATION_UNITS: EdgeTable = TableDefinition::new("location_units");

/// Map any redb failure to `StoreUnavailable`.
fn unavailable(e: impl std::fmt::Display) -> FilterError {
    FilterError::StoreUnavailable(e.to_string())
}

/// A disk-backed relationship store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a relationship database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        let db = Database::create(path.as_ref()).map_err(unavailable)?;
        Self::with_tables(db)
    }

    /// Open a database that must already exist. A missing path is an error,
    /// never a fresh empty catalog.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FilterError::StoreUnavailable(format!(
                "no database at '{}'; run `init` or `load` first",
                path.display()
            )));
        }
        let db = Database::open(path).map_err(unavailable)?;
        Self::with_tables(db)
    }

    fn with_tables(db: Database) -> Result<Self, FilterError> {
        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(unavailable)?;
            write_txn.open_table(MODULES).map_err(unavailable)?;
            write_txn.open_table(UNITS).map_err(unavailable)?;
            write_txn.open_table(LOCATIONS).map_err(unavailable)?;
            write_txn.open_table(MODULE_UNITS).map_err(unavailable)?;
            write_txn.open_table(UNIT_MODULES).map_err(unavailable)?;
            write_txn.open_table(UNIT_LOCATIONS).map_err(unavailable)?;
            write_txn.open_table(LOCATION_UNITS).map_err(unavailable)?;
            write_txn.commit().map_err(unavailable)?;
        }

        Ok(Self { db })
    }

    /// Replace the whole database content with `dataset` in a single ACID
    /// transaction.
    ///
    /// The dataset is validated before the transaction opens; an invalid
    /// dataset leaves the database untouched.
    pub fn import(&mut self, dataset: &Dataset) -> Result<CatalogStats, FilterError> {
        dataset.validate()?;

        let write_txn = self.db.begin_write().map_err(unavailable)?;

        for table in [MODULES, UNITS, LOCATIONS] {
            write_txn.delete_table(table).map_err(unavailable)?;
        }
        for table in [MODULE_UNITS, UNIT_MODULES, UNIT_LOCATIONS, LOCATION_UNITS] {
            write_txn.delete_table(table).map_err(unavailable)?;
        }

        {
            let mut modules = write_txn.open_table(MODULES).map_err(unavailable)?;
            for module in &dataset.modules {
                modules
                    .insert(module.id.0, encode(module)?.as_slice())
                    .map_err(unavailable)?;
            }

            let mut units = write_txn.open_table(UNITS).map_err(unavailable)?;
            for unit in &dataset.units {
                units
                    .insert(unit.id.0, encode(unit)?.as_slice())
                    .map_err(unavailable)?;
            }

            let mut locations = write_txn.open_table(LOCATIONS).map_err(unavailable)?;
            for location in &dataset.locations {
                locations
                    .insert(location.id.0, encode(location)?.as_slice())
                    .map_err(unavailable)?;
            }

            let mut module_units = write_txn.open_table(MODULE_UNITS).map_err(unavailable)?;
            let mut unit_modules = write_txn.open_table(UNIT_MODULES).map_err(unavailable)?;
            for link in &dataset.module_unit_mapping {
                module_units
                    .insert((link.module_id.0, link.unit_id.0), ())
                    .map_err(unavailable)?;
                unit_modules
                    .insert((link.unit_id.0, link.module_id.0), ())
                    .map_err(unavailable)?;
            }

            let mut unit_locations = write_txn.open_table(UNIT_LOCATIONS).map_err(unavailable)?;
            let mut location_units = write_txn.open_table(LOCATION_UNITS).map_err(unavailable)?;
            for link in &dataset.unit_location_mapping {
                unit_locations
                    .insert((link.unit_id.0, link.location_id.0), ())
                    .map_err(unavailable)?;
                location_units
                    .insert((link.location_id.0, link.unit_id.0), ())
                    .map_err(unavailable)?;
            }
        }

        write_txn.commit().map_err(unavailable)?;

        self.stats()
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), FilterError> {
        self.db.compact().map_err(unavailable)?;
        Ok(())
    }

    /// Union of the adjacency of every key in `keys` within one edge table.
    fn reach<K, V>(
        &self,
        table: EdgeTable,
        keys: &BTreeSet<K>,
        raw: impl Fn(&K) -> i64,
    ) -> Result<BTreeSet<V>, FilterError>
    where
        V: From<i64> + Ord,
    {
        if keys.is_empty() {
            return Ok(BTreeSet::new());
        }

        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let edges = read_txn.open_table(table).map_err(unavailable)?;

        let mut reached = BTreeSet::new();
        for key in keys {
            let from = raw(key);
            for entry in edges
                .range((from, i64::MIN)..=(from, i64::MAX))
                .map_err(unavailable)?
            {
                let (edge, _) = entry.map_err(unavailable)?;
                let (_, to) = edge.value();
                reached.insert(V::from(to));
            }
        }
        Ok(reached)
    }

    /// All records of an entity table, ordered by id.
    fn all<T: DeserializeOwned>(
        &self,
        table: EntityTable,
    ) -> Result<Vec<T>, FilterError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let records = read_txn.open_table(table).map_err(unavailable)?;

        let mut out = Vec::new();
        for entry in records.iter().map_err(unavailable)? {
            let (_, value) = entry.map_err(unavailable)?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    /// Records for `ids`, skipping unknown ones.
    fn by_id<K, T: DeserializeOwned>(
        &self,
        table: EntityTable,
        ids: &BTreeSet<K>,
        raw: impl Fn(&K) -> i64,
    ) -> Result<Vec<T>, FilterError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let records = read_txn.open_table(table).map_err(unavailable)?;

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(data) = records.get(raw(id)).map_err(unavailable)? {
                out.push(decode(data.value())?);
            }
        }
        Ok(out)
    }
}

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, FilterError> {
    postcard::to_allocvec(record).map_err(|e| FilterError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FilterError> {
    postcard::from_bytes(bytes).map_err(|e| FilterError::SerializationError(e.to_string()))
}

fn table_len<K: redb::Key + 'static, V: redb::Value + 'static>(
    table: &ReadOnlyTable<K, V>,
) -> Result<usize, FilterError> {
    table.len().map(|n| n as usize).map_err(unavailable)
}

// =============================================================================
// RELATIONSHIPSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl RelationshipStore for RedbStore {
    fn all_modules(&self) -> Result<Vec<Module>, FilterError> {
        self.all(MODULES)
    }

    fn all_units(&self) -> Result<Vec<Unit>, FilterError> {
        self.all(UNITS)
    }

    fn all_locations(&self) -> Result<Vec<Location>, FilterError> {
        self.all(LOCATIONS)
    }

    fn units_for_modules(&self, module_ids: &ModuleIds) -> Result<UnitIds, FilterError> {
        self.reach(MODULE_UNITS, module_ids, |id: &ModuleId| id.0)
    }

    fn units_for_locations(&self, location_ids: &LocationIds) -> Result<UnitIds, FilterError> {
        self.reach(LOCATION_UNITS, location_ids, |id: &LocationId| id.0)
    }

    fn modules_for_units(&self, unit_ids: &UnitIds) -> Result<ModuleIds, FilterError> {
        self.reach(UNIT_MODULES, unit_ids, |id: &UnitId| id.0)
    }

    fn locations_for_units(&self, unit_ids: &UnitIds) -> Result<LocationIds, FilterError> {
        self.reach(UNIT_LOCATIONS, unit_ids, |id: &UnitId| id.0)
    }

    fn modules_by_id(&self, ids: &ModuleIds) -> Result<Vec<Module>, FilterError> {
        self.by_id(MODULES, ids, |id: &ModuleId| id.0)
    }

    fn units_by_id(&self, ids: &UnitIds) -> Result<Vec<Unit>, FilterError> {
        self.by_id(UNITS, ids, |id: &UnitId| id.0)
    }

    fn locations_by_id(&self, ids: &LocationIds) -> Result<Vec<Location>, FilterError> {
        self.by_id(LOCATIONS, ids, |id: &LocationId| id.0)
    }

    fn located_units(&self) -> Result<UnitIds, FilterError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;
        let edges = read_txn.open_table(UNIT_LOCATIONS).map_err(unavailable)?;

        let mut units = UnitIds::new();
        for entry in edges.iter().map_err(unavailable)? {
            let (edge, _) = entry.map_err(unavailable)?;
            let (unit, _) = edge.value();
            units.insert(UnitId(unit));
        }
        Ok(units)
    }

    fn stats(&self) -> Result<CatalogStats, FilterError> {
        let read_txn = self.db.begin_read().map_err(unavailable)?;

        Ok(CatalogStats {
            modules: table_len(&read_txn.open_table(MODULES).map_err(unavailable)?)?,
            units: table_len(&read_txn.open_table(UNITS).map_err(unavailable)?)?,
            locations: table_len(&read_txn.open_table(LOCATIONS).map_err(unavailable)?)?,
            module_unit_links: table_len(&read_txn.open_table(MODULE_UNITS).map_err(unavailable)?)?,
            unit_location_links: table_len(
                &read_txn.open_table(UNIT_LOCATIONS).map_err(unavailable)?,
            )?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        Dataset::default()
            .with_module(1, "M1")
            .with_module(2, "M2")
            .with_unit(10, "U1")
            .with_unit(20, "U2")
            .with_unit(30, "U3")
            .with_location(100, "L1")
            .with_location(200, "L2")
            .link_module_unit(1, 10)
            .link_module_unit(1, 20)
            .link_module_unit(2, 30)
            .link_unit_location(10, 100)
            .link_unit_location(20, 200)
    }

    fn ids<T: From<i64> + Ord>(raw: &[i64]) -> BTreeSet<T> {
        raw.iter().map(|&id| T::from(id)).collect()
    }

    #[test]
    fn empty_database_has_no_entities() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        assert!(store.all_modules().expect("modules").is_empty());
        assert_eq!(store.stats().expect("stats"), CatalogStats::default());
    }

    #[test]
    fn import_then_lookup() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let stats = store.import(&sample()).expect("import");

        assert_eq!(stats.modules, 2);
        assert_eq!(stats.units, 3);
        assert_eq!(stats.locations, 2);
        assert_eq!(stats.module_unit_links, 3);
        assert_eq!(stats.unit_location_links, 2);

        assert_eq!(
            store.units_for_modules(&ids(&[1])).expect("lookup"),
            ids::<UnitId>(&[10, 20])
        );
        assert_eq!(
            store.modules_for_units(&ids(&[30])).expect("lookup"),
            ids::<ModuleId>(&[2])
        );
        assert_eq!(
            store.units_for_locations(&ids(&[100, 200])).expect("lookup"),
            ids::<UnitId>(&[10, 20])
        );
        assert_eq!(store.located_units().expect("located"), ids::<UnitId>(&[10, 20]));
    }

    #[test]
    fn range_scan_does_not_bleed_into_neighbours() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let dataset = Dataset::default()
            .with_module(-1, "neg")
            .with_module(0, "zero")
            .with_module(1, "one")
            .with_unit(i64::MIN, "min")
            .with_unit(i64::MAX, "max")
            .link_module_unit(-1, i64::MIN)
            .link_module_unit(1, i64::MAX);
        store.import(&dataset).expect("import");

        assert!(store.units_for_modules(&ids(&[0])).expect("lookup").is_empty());
        assert_eq!(
            store.units_for_modules(&ids(&[-1])).expect("lookup"),
            ids::<UnitId>(&[i64::MIN])
        );
        assert_eq!(
            store.units_for_modules(&ids(&[1])).expect("lookup"),
            ids::<UnitId>(&[i64::MAX])
        );
    }

    #[test]
    fn hydration_matches_memory_store() {
        let temp = tempdir().expect("temp dir");
        let mut redb = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        redb.import(&sample()).expect("import");
        let memory = MemoryStore::from_dataset(&sample()).expect("memory");

        assert_eq!(
            redb.all_units().expect("redb"),
            memory.all_units().expect("memory")
        );
        assert_eq!(
            redb.locations_by_id(&ids(&[200, 999])).expect("redb"),
            memory.locations_by_id(&ids(&[200, 999])).expect("memory")
        );
        assert_eq!(
            redb.modules_by_id(&ids(&[2, 1])).expect("redb"),
            memory.modules_by_id(&ids(&[2, 1])).expect("memory")
        );
    }

    #[test]
    fn import_replaces_previous_content() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store.import(&sample()).expect("first import");

        let smaller = Dataset::default().with_module(5, "M5");
        let stats = store.import(&smaller).expect("second import");

        assert_eq!(stats.modules, 1);
        assert_eq!(stats.module_unit_links, 0);
        assert!(store.units_for_modules(&ids(&[1])).expect("lookup").is_empty());
    }

    #[test]
    fn invalid_import_leaves_database_untouched() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store.import(&sample()).expect("import");

        let broken = sample().link_module_unit(1, 999);
        assert!(matches!(
            store.import(&broken),
            Err(FilterError::InvalidDataset(_))
        ));
        assert_eq!(store.stats().expect("stats").module_unit_links, 3);
    }

    #[test]
    fn recovery_persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        // Phase 1: import and drop
        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store.import(&sample()).expect("import");
        }

        // Phase 2: verify after reopen
        {
            let store = RedbStore::open(&db_path).expect("reopen db");
            assert_eq!(store.all_modules().expect("modules").len(), 2);
            assert_eq!(
                store.locations_for_units(&ids(&[10, 20])).expect("lookup"),
                ids::<LocationId>(&[100, 200])
            );
        }
    }

    #[test]
    fn recovery_compact_and_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store.import(&sample()).expect("import");
            store.compact().expect("compact");
        }

        let store = RedbStore::open(&db_path).expect("reopen db");
        assert_eq!(store.stats().expect("stats").units, 3);
    }

    #[test]
    fn open_existing_refuses_missing_path() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("typo.redb");

        assert!(matches!(
            RedbStore::open_existing(&db_path),
            Err(FilterError::StoreUnavailable(_))
        ));
        assert!(!db_path.exists());
    }

    #[test]
    fn open_existing_reads_imported_catalog() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store.import(&sample()).expect("import");
        }

        let store = RedbStore::open_existing(&db_path).expect("open existing");
        assert_eq!(store.stats().expect("stats").modules, 2);
    }
}
