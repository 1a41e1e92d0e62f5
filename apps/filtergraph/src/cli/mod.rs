//! # filtergraph CLI Module
//!
//! This module implements the CLI interface for filtergraph.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `load` - Validate a dataset and import it
//! - `status` - Show catalog counts
//! - `resolve` - Run a narrowing query
//! - `validate` - Check a full selection

mod commands;

use crate::config::{AppConfig, Backend};
use clap::{Parser, Subcommand};
use filtergraph_core::{FilterError, FilterTarget};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// filtergraph - cascading filters over modules, units and locations
///
/// Narrows each filter to the values still compatible with the others and
/// validates complete selections.
#[derive(Parser, Debug)]
#[command(name = "filtergraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the relationship database (overrides `[store] path`)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides `[store] backend`)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides `[server] host`)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides `[server] port`)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a JSON dataset and import it
    Load {
        /// Path to the dataset file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show catalog counts
    Status,

    /// Narrow one entity type by selections on the other two
    Resolve {
        /// Entity type to return (modules, units, locations)
        #[arg(short = 't', long, value_parser = parse_target)]
        target: FilterTarget,

        /// Module ids (comma-separated)
        #[arg(long)]
        modules: Option<String>,

        /// Unit ids (comma-separated)
        #[arg(long)]
        units: Option<String>,

        /// Location ids (comma-separated)
        #[arg(long)]
        locations: Option<String>,
    },

    /// Check whether a full selection is consistent
    Validate {
        /// Module ids (comma-separated)
        #[arg(long)]
        modules: String,

        /// Unit ids (comma-separated)
        #[arg(long)]
        units: String,

        /// Location ids (comma-separated)
        #[arg(long)]
        locations: String,
    },
}

fn parse_target(name: &str) -> Result<FilterTarget, String> {
    FilterTarget::parse(name).ok_or_else(|| {
        format!(
            "unknown target '{}' (expected modules, units or locations)",
            name
        )
    })
}

// =============================================================================
// CONFIGURATION LAYERING
// =============================================================================

/// Defaults, config file and environment, then global flags.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, FilterError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.store.path = database.clone();
    }
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }
    Ok(config)
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), FilterError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Init { force }) => cmd_init(&config.store, force),
        Some(Commands::Load { file }) => cmd_load(&config.store, json_mode, &file),
        Some(Commands::Status) => cmd_status(&config.store, json_mode, cli.verbose),
        Some(Commands::Resolve {
            target,
            modules,
            units,
            locations,
        }) => cmd_resolve(
            &config.store,
            json_mode,
            target,
            modules.as_deref(),
            units.as_deref(),
            locations.as_deref(),
        ),
        Some(Commands::Validate {
            modules,
            units,
            locations,
        }) => cmd_validate(&config.store, json_mode, &modules, &units, &locations),
        None => {
            // No subcommand - show status by default
            cmd_status(&config.store, json_mode, cli.verbose)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
