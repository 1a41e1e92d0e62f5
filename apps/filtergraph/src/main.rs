//! # filtergraph
//!
//! The main binary for the filtergraph cascading filter API.
//!
//! This application provides:
//! - HTTP filter API (axum-based)
//! - CLI interface for loading catalogs and running queries offline
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              apps/filtergraph (THE BINARY)           │
//! │                                                      │
//! │     ┌─────────────┐          ┌─────────────┐         │
//! │     │    CLI      │          │  HTTP API   │         │
//! │     │   (clap)    │          │   (axum)    │         │
//! │     └──────┬──────┘          └──────┬──────┘         │
//! │            └───────────┬────────────┘                │
//! │                        ▼                             │
//! │               ┌──────────────────┐                   │
//! │               │ filtergraph-core │                   │
//! │               │  (THE LOGIC)     │                   │
//! │               └──────────────────┘                   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Import a catalog and start the HTTP server
//! filtergraph load -f catalog.json
//! filtergraph server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! filtergraph status
//! filtergraph resolve -t modules --units 3,4
//! filtergraph validate --modules 1 --units 3 --locations 7
//! ```

use clap::Parser;
use filtergraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // FILTERGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("FILTERGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "filtergraph=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  filtergraph v{}

  modules -> units -> locations
"#,
        env!("CARGO_PKG_VERSION")
    );
}
