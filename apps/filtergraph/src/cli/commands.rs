//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, SharedStore, ValidateResponse};
use crate::config::{AppConfig, Backend, StoreConfig};
use filtergraph_core::{
    CatalogStats, Dataset, FilterError, FilterQuery, FilterResolver, FilterTarget, LocationIds,
    MemoryStore, ModuleIds, RedbStore, RelationshipStore, Resolution, UnitIds, Verdict,
    parse_id_list,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Maximum dataset file size accepted by `load` and the file backend (256 MB).
const MAX_DATASET_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), FilterError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| FilterError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(FilterError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, FilterError> {
    let canonical = path.canonicalize().map_err(|e| {
        FilterError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(FilterError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read and parse a JSON dataset file.
pub fn read_dataset(path: &Path) -> Result<Dataset, FilterError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_DATASET_FILE_SIZE)?;

    let data = std::fs::read(&path)
        .map_err(|e| FilterError::IoError(format!("Read dataset: {}", e)))?;
    Dataset::from_json_slice(&data)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), FilterError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| FilterError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// STORE OPENING
// =============================================================================

/// Open the configured store.
///
/// The file backend reads a JSON dataset into memory; a missing file gives
/// an empty catalog. The redb backend never creates a database here: only
/// `init` and `load` do.
pub fn open_store(store: &StoreConfig) -> Result<SharedStore, FilterError> {
    match store.backend {
        Backend::Redb => Ok(Arc::new(RedbStore::open_existing(&store.path)?)),
        Backend::File => {
            if store.path.exists() {
                let dataset = read_dataset(&store.path)?;
                Ok(Arc::new(MemoryStore::from_dataset(&dataset)?))
            } else {
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), FilterError> {
    let store = open_store(&config.store)?;
    let stats = store.stats()?;
    let addr = config.server.addr();

    println!("filtergraph server starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", addr);
    println!("  Backend:  {}", config.store.backend);
    println!("  Database: {}", config.store.path.display());
    println!(
        "  Catalog:  {} modules, {} units, {} locations",
        stats.modules, stats.units, stats.locations
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /api/filters/modules   - Narrow modules");
    println!("  GET  /api/filters/units     - Narrow units");
    println!("  GET  /api/filters/locations - Narrow locations");
    println!("  POST /api/filters/validate  - Validate a selection");
    println!("  GET  /health                - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(store, config.http.clone());
    api::run_server(&addr, state).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create an empty database.
pub fn cmd_init(store: &StoreConfig, force: bool) -> Result<(), FilterError> {
    let path = &store.path;
    if path.exists() {
        if !force {
            return Err(FilterError::IoError(format!(
                "Database already exists at '{}'. Use --force to overwrite.",
                path.display()
            )));
        }
        std::fs::remove_file(path)
            .map_err(|e| FilterError::IoError(format!("Cannot remove database: {}", e)))?;
    }

    match store.backend {
        Backend::Redb => {
            RedbStore::open(path)?;
        }
        Backend::File => {
            let data = Dataset::default().to_json_pretty()?;
            std::fs::write(path, data)
                .map_err(|e| FilterError::IoError(format!("Write database: {}", e)))?;
        }
    }

    tracing::info!("Initialized {} database at {}", store.backend, path.display());
    println!("Initialized empty database: {}", path.display());
    Ok(())
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// Validate a dataset and import it into redb.
///
/// With the file backend the dataset is only validated; point `--database`
/// at it to serve it.
pub fn cmd_load(store: &StoreConfig, json_mode: bool, file: &Path) -> Result<(), FilterError> {
    let dataset = read_dataset(file)?;

    let stats = match store.backend {
        Backend::Redb => {
            let mut redb = RedbStore::open(&store.path)?;
            redb.import(&dataset)?
        }
        Backend::File => MemoryStore::from_dataset(&dataset)?.stats()?,
    };

    tracing::info!(
        "Loaded {} modules, {} units, {} locations from {}",
        stats.modules,
        stats.units,
        stats.locations,
        file.display()
    );

    if json_mode {
        return print_json(&serde_json::json!({
            "file": file.to_string_lossy(),
            "backend": store.backend,
            "imported": store.backend == Backend::Redb,
            "stats": stats,
        }));
    }

    match store.backend {
        Backend::Redb => println!("Imported {} into {}", file.display(), store.path.display()),
        Backend::File => println!("Dataset {} is valid", file.display()),
    }
    print_stats(&stats);
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show catalog counts.
pub fn cmd_status(store: &StoreConfig, json_mode: bool, verbose: bool) -> Result<(), FilterError> {
    let stats = open_store(store)?.stats()?;

    if json_mode {
        return print_json(&serde_json::json!({
            "database": store.path.to_string_lossy(),
            "backend": store.backend,
            "stats": stats,
        }));
    }

    println!("filtergraph Catalog Status");
    println!("==========================");
    println!("Database: {}", store.path.display());
    println!("Backend:  {}", store.backend);
    if verbose {
        let size = std::fs::metadata(&store.path).map(|m| m.len()).unwrap_or(0);
        println!("Size:     {} bytes", size);
    }
    println!();
    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &CatalogStats) {
    println!("Modules:             {}", stats.modules);
    println!("Units:               {}", stats.units);
    println!("Locations:           {}", stats.locations);
    println!("Module-unit links:   {}", stats.module_unit_links);
    println!("Unit-location links: {}", stats.unit_location_links);
}

// =============================================================================
// RESOLVE COMMAND
// =============================================================================

/// Run a narrowing query against the configured store.
pub fn cmd_resolve(
    store: &StoreConfig,
    json_mode: bool,
    target: FilterTarget,
    modules: Option<&str>,
    units: Option<&str>,
    locations: Option<&str>,
) -> Result<(), FilterError> {
    let shared = open_store(store)?;
    let query = FilterQuery::from_csv(target, modules, units, locations);
    let resolution = FilterResolver::new(shared.as_ref()).run(&query)?;

    if json_mode {
        return print_json(&resolution);
    }

    let rows: Vec<(i64, &str)> = match &resolution {
        Resolution::Modules(modules) => modules
            .iter()
            .map(|m| (m.id.0, m.title.as_str()))
            .collect(),
        Resolution::Units(units) => units.iter().map(|u| (u.id.0, u.title.as_str())).collect(),
        Resolution::Locations(locations) => locations
            .iter()
            .map(|l| (l.id.0, l.title.as_str()))
            .collect(),
    };

    println!("{} result(s)", resolution.len());
    for (id, title) in rows {
        println!("  {:>6}  {}", id, title);
    }
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Check a full selection. An inconsistent selection is reported, not an
/// error; an empty list is.
pub fn cmd_validate(
    store: &StoreConfig,
    json_mode: bool,
    modules: &str,
    units: &str,
    locations: &str,
) -> Result<(), FilterError> {
    let module_ids: ModuleIds = parse_id_list(Some(modules));
    let unit_ids: UnitIds = parse_id_list(Some(units));
    let location_ids: LocationIds = parse_id_list(Some(locations));

    if module_ids.is_empty() || unit_ids.is_empty() || location_ids.is_empty() {
        return Err(FilterError::InvalidInput(api::MISSING_FILTERS_MESSAGE.to_string()));
    }

    let shared = open_store(store)?;
    let verdict = FilterResolver::new(shared.as_ref()).check_combination(
        &module_ids,
        &unit_ids,
        &location_ids,
    )?;

    let response = match &verdict {
        Verdict::Valid => ValidateResponse::valid(),
        other => ValidateResponse::invalid(other.to_string()),
    };

    if json_mode {
        return print_json(&response);
    }

    match verdict {
        Verdict::Valid => println!("Valid combination"),
        other => {
            println!("Invalid combination");
            println!("  {}", other);
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::default()
            .with_module(1, "Calculus")
            .with_unit(1, "Week 1")
            .with_location(1, "North Campus")
            .link_module_unit(1, 1)
            .link_unit_location(1, 1)
    }

    fn write_sample(dir: &Path) -> PathBuf {
        let path = dir.join("dataset.json");
        std::fs::write(&path, sample().to_json_pretty().expect("json")).expect("write");
        path
    }

    #[test]
    fn file_backend_reads_dataset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig {
            backend: Backend::File,
            path: write_sample(dir.path()),
        };

        let store = open_store(&config).expect("open");
        assert_eq!(store.stats().expect("stats").unit_location_links, 1);
    }

    #[test]
    fn file_backend_missing_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig {
            backend: Backend::File,
            path: dir.path().join("absent.json"),
        };

        let store = open_store(&config).expect("open");
        assert_eq!(store.stats().expect("stats"), CatalogStats::default());
    }

    #[test]
    fn redb_backend_missing_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig {
            backend: Backend::Redb,
            path: dir.path().join("mistyped.redb"),
        };

        assert!(matches!(
            open_store(&config),
            Err(FilterError::StoreUnavailable(_))
        ));
        assert!(matches!(
            cmd_status(&config, true, false),
            Err(FilterError::StoreUnavailable(_))
        ));
        assert!(!config.path.exists());
    }

    #[test]
    fn oversized_file_rejected_before_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_sample(dir.path());

        assert!(validate_file_size(&path, MAX_DATASET_FILE_SIZE).is_ok());
        assert!(matches!(
            validate_file_size(&path, 8),
            Err(FilterError::SerializationError(_))
        ));
        assert_eq!(read_dataset(&path).expect("read"), sample());
    }

    #[test]
    fn init_refuses_existing_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig {
            backend: Backend::Redb,
            path: dir.path().join("catalog.redb"),
        };

        cmd_init(&config, false).expect("first init");
        assert!(matches!(
            cmd_init(&config, false),
            Err(FilterError::IoError(_))
        ));
        cmd_init(&config, true).expect("forced init");
    }

    #[test]
    fn load_imports_into_redb() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dataset = write_sample(dir.path());
        let config = StoreConfig {
            backend: Backend::Redb,
            path: dir.path().join("catalog.redb"),
        };

        cmd_load(&config, true, &dataset).expect("load");

        let store = open_store(&config).expect("open");
        assert_eq!(store.stats().expect("stats").modules, 1);
    }

    #[test]
    fn load_rejects_dangling_edges() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        let broken = sample().link_module_unit(1, 99);
        std::fs::write(&path, broken.to_json_pretty().expect("json")).expect("write");

        let config = StoreConfig {
            backend: Backend::File,
            path: dir.path().join("unused.json"),
        };
        assert!(matches!(
            cmd_load(&config, false, &path),
            Err(FilterError::InvalidDataset(_))
        ));
    }

    #[test]
    fn validate_requires_every_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig {
            backend: Backend::File,
            path: write_sample(dir.path()),
        };

        assert!(matches!(
            cmd_validate(&config, true, "1", "abc", "1"),
            Err(FilterError::InvalidInput(_))
        ));
        cmd_validate(&config, true, "1", "1", "1").expect("validate");
    }
}
