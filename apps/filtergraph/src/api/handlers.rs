//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Store failures are logged and answered with 500 and the empty shape of
//! the endpoint's response; partial results are never returned.

use super::{
    AppState,
    types::{
        HealthResponse, LocationsQuery, LocationsResponse, ModulesQuery, ModulesResponse,
        QueryPairs, UnitsQuery, UnitsResponse, ValidateRequest, ValidateResponse,
    },
};
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use filtergraph_core::{FilterResolver, LocationIds, ModuleIds, UnitIds, Verdict, parse_id_list};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// NARROWING HANDLERS
// =============================================================================

/// Query pairs with repeated keys kept; an unreadable query string is no
/// constraint at all.
fn query_pairs(query: Result<Query<QueryPairs>, QueryRejection>) -> QueryPairs {
    match query {
        Ok(Query(pairs)) => pairs,
        Err(rejection) => {
            tracing::debug!("Ignoring unreadable query string: {}", rejection);
            QueryPairs::new()
        }
    }
}

/// Modules compatible with the selected units and locations.
pub async fn modules_handler(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> impl IntoResponse {
    let query = ModulesQuery::from_pairs(&query_pairs(query));
    let unit_ids: UnitIds = parse_id_list(query.unit_ids.as_deref());
    let location_ids: LocationIds = parse_id_list(query.location_ids.as_deref());

    let resolver = FilterResolver::new(state.store.as_ref());
    match resolver.resolve_modules(&unit_ids, &location_ids) {
        Ok(modules) => (StatusCode::OK, Json(ModulesResponse { modules })),
        Err(e) => {
            tracing::error!("Error fetching filtered modules: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ModulesResponse::default()),
            )
        }
    }
}

/// Units compatible with the selected modules and locations.
pub async fn units_handler(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> impl IntoResponse {
    let query = UnitsQuery::from_pairs(&query_pairs(query));
    let module_ids: ModuleIds = parse_id_list(query.module_ids.as_deref());
    let location_ids: LocationIds = parse_id_list(query.location_ids.as_deref());

    let resolver = FilterResolver::new(state.store.as_ref());
    match resolver.resolve_units(&module_ids, &location_ids) {
        Ok(units) => (StatusCode::OK, Json(UnitsResponse { units })),
        Err(e) => {
            tracing::error!("Error fetching filtered units: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UnitsResponse::default()),
            )
        }
    }
}

/// Locations compatible with the selected units and modules.
pub async fn locations_handler(
    State(state): State<AppState>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> impl IntoResponse {
    let query = LocationsQuery::from_pairs(&query_pairs(query));
    let unit_ids: UnitIds = parse_id_list(query.unit_ids.as_deref());
    let module_ids: ModuleIds = parse_id_list(query.module_ids.as_deref());

    let resolver = FilterResolver::new(state.store.as_ref());
    match resolver.resolve_locations(&unit_ids, &module_ids) {
        Ok(locations) => (StatusCode::OK, Json(LocationsResponse { locations })),
        Err(e) => {
            tracing::error!("Error fetching filtered locations: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LocationsResponse::default()),
            )
        }
    }
}

// =============================================================================
// VALIDATE HANDLER
// =============================================================================

/// Check a full (modules, units, locations) selection.
///
/// A body that does not parse is answered like one with empty arrays; a
/// body over the size limit gets 413.
pub async fn validate_handler(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::debug!("Validate body too large: {}", rejection);
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ValidateResponse::body_too_large()),
            );
        }
        Err(rejection) => {
            tracing::debug!("Rejected validate body: {}", rejection);
            return (
                StatusCode::BAD_REQUEST,
                Json(ValidateResponse::missing_filters()),
            );
        }
    };

    let Some((module_ids, unit_ids, location_ids)) = request.selections() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ValidateResponse::missing_filters()),
        );
    };

    let resolver = FilterResolver::new(state.store.as_ref());
    match resolver.check_combination(&module_ids, &unit_ids, &location_ids) {
        Ok(Verdict::Valid) => (StatusCode::OK, Json(ValidateResponse::valid())),
        Ok(verdict) => {
            tracing::debug!("Invalid filter combination: {}", verdict);
            (
                StatusCode::OK,
                Json(ValidateResponse::invalid(verdict.to_string())),
            )
        }
        Err(e) => {
            tracing::error!("Error validating filters: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ValidateResponse::internal_error()),
            )
        }
    }
}
