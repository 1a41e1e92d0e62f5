//! # filtergraph HTTP API Module
//!
//! This module implements the HTTP filter API using axum.
//!
//! ## Endpoints
//!
//! - `GET /api/filters/modules?unitIds=&locationIds=` - Narrow modules
//! - `GET /api/filters/units?moduleIds=&locationIds=` - Narrow units
//! - `GET /api/filters/locations?unitIds=&moduleIds=` - Narrow locations
//! - `POST /api/filters/validate` - Check a full selection
//! - `GET /health` - Health check
//!
//! ## Security Configuration
//!
//! - `cors_origins` / `FILTERGRAPH_CORS_ORIGINS`: comma-separated list of
//!   allowed origins, or "*" for all (default: localhost only)
//! - `rate_limit` / `FILTERGRAPH_RATE_LIMIT`: requests per second (default:
//!   100, 0 to disable)

mod handlers;
mod middleware;
mod types;

pub use handlers::{
    health_handler, locations_handler, modules_handler, units_handler, validate_handler,
};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    BODY_TOO_LARGE_MESSAGE, HealthResponse, INVALID_COMBINATION_MESSAGE, LocationsQuery,
    LocationsResponse, MISSING_FILTERS_MESSAGE, ModulesQuery, ModulesResponse, QueryPairs,
    UnitsQuery, UnitsResponse, VALIDATION_FAILED_MESSAGE, ValidateRequest, ValidateResponse,
};

use crate::config::HttpConfig;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use filtergraph_core::{FilterError, RelationshipStore};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Relationship store shared by all request handlers.
pub type SharedStore = Arc<dyn RelationshipStore + Send + Sync>;

/// Shared server state. The store is read-only, so no lock is needed.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub http: HttpConfig,
}

impl AppState {
    #[must_use]
    pub fn new(store: SharedStore, http: HttpConfig) -> Self {
        Self { store, http }
    }

    /// State with default HTTP settings.
    #[must_use]
    pub fn with_store(store: SharedStore) -> Self {
        Self::new(store, HttpConfig::default())
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer:
/// - `"*"`: allows all origins (development only)
/// - `None`: localhost only
/// - otherwise: the comma-separated list, falling back to localhost if no
///   entry parses
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins.map(str::trim) {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", s);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", s, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .map(HeaderValue::from_static)
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - if enabled
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(state.http.cors_origins.as_deref());

    let rate_limiter = create_rate_limiter(state.http.rate_limit);
    match rate_limiter {
        Some(_) => tracing::info!(
            "Rate limiting enabled: {} requests/second",
            state.http.rate_limit
        ),
        None => tracing::info!("Rate limiting disabled"),
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/filters/modules", get(handlers::modules_handler))
        .route("/api/filters/units", get(handlers::units_handler))
        .route("/api/filters/locations", get(handlers::locations_handler))
        .route("/api/filters/validate", post(handlers::validate_handler));

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    let body_limit = state.http.body_limit_bytes;
    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `addr` and serve until the process is stopped.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), FilterError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| FilterError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("filtergraph HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| FilterError::IoError(format!("Server error: {}", e)))
}
