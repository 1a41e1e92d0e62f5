//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Field names are camelCase on the wire.

use filtergraph_core::{Location, LocationIds, Module, ModuleIds, Unit, UnitIds};
use serde::{Deserialize, Serialize};

/// Error for a validate body with a missing or empty array.
pub const MISSING_FILTERS_MESSAGE: &str =
    "All filter arrays (moduleIds, unitIds, locationIds) are required and must not be empty";

/// First error for an inconsistent combination.
pub const INVALID_COMBINATION_MESSAGE: &str = "The selected combination of filters is not valid";

/// Error for a store failure during validation.
pub const VALIDATION_FAILED_MESSAGE: &str = "An error occurred while validating filters";

/// Error for a validate body over the configured size limit.
pub const BODY_TOO_LARGE_MESSAGE: &str = "Request body exceeds the configured size limit";

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// NARROWING QUERIES
// =============================================================================

/// Raw query-string pairs, in order, repeated keys included.
pub type QueryPairs = Vec<(String, String)>;

/// All values given for `key`, joined into one comma-separated list.
///
/// `?unitIds=1&unitIds=2,3` reads as `1,2,3`. `None` when the key is absent.
fn merged(pairs: &[(String, String)], key: &str) -> Option<String> {
    let values: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

/// `GET /api/filters/modules` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulesQuery {
    pub unit_ids: Option<String>,
    pub location_ids: Option<String>,
}

impl ModulesQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            unit_ids: merged(pairs, "unitIds"),
            location_ids: merged(pairs, "locationIds"),
        }
    }
}

/// `GET /api/filters/units` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitsQuery {
    pub module_ids: Option<String>,
    pub location_ids: Option<String>,
}

impl UnitsQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            module_ids: merged(pairs, "moduleIds"),
            location_ids: merged(pairs, "locationIds"),
        }
    }
}

/// `GET /api/filters/locations` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsQuery {
    pub unit_ids: Option<String>,
    pub module_ids: Option<String>,
}

impl LocationsQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            unit_ids: merged(pairs, "unitIds"),
            module_ids: merged(pairs, "moduleIds"),
        }
    }
}

// =============================================================================
// NARROWING RESPONSES
// =============================================================================

/// `{modules: [...]}`. The default is the empty shape returned on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulesResponse {
    pub modules: Vec<Module>,
}

/// `{units: [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitsResponse {
    pub units: Vec<Unit>,
}

/// `{locations: [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationsResponse {
    pub locations: Vec<Location>,
}

// =============================================================================
// VALIDATE REQUEST/RESPONSE
// =============================================================================

/// `POST /api/filters/validate` body.
///
/// Arrays are optional here so that a missing key is reported with the same
/// 400 body as an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default)]
    pub module_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub unit_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub location_ids: Option<Vec<i64>>,
}

impl ValidateRequest {
    /// The three selections, or `None` if any is missing or empty.
    pub fn selections(&self) -> Option<(ModuleIds, UnitIds, LocationIds)> {
        let modules = non_empty(self.module_ids.as_deref())?;
        let units = non_empty(self.unit_ids.as_deref())?;
        let locations = non_empty(self.location_ids.as_deref())?;
        Some((modules, units, locations))
    }
}

fn non_empty<T: From<i64> + Ord>(ids: Option<&[i64]>) -> Option<std::collections::BTreeSet<T>> {
    match ids {
        Some(ids) if !ids.is_empty() => Some(ids.iter().map(|&id| T::from(id)).collect()),
        _ => None,
    }
}

/// `{valid, errors?}`. `errors` is omitted when valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ValidateResponse {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: None,
        }
    }

    /// Inconsistent combination, with a detail line naming the stray ids.
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: Some(vec![INVALID_COMBINATION_MESSAGE.to_string(), detail.into()]),
        }
    }

    pub fn missing_filters() -> Self {
        Self::error(MISSING_FILTERS_MESSAGE)
    }

    pub fn body_too_large() -> Self {
        Self::error(BODY_TOO_LARGE_MESSAGE)
    }

    pub fn internal_error() -> Self {
        Self::error(VALIDATION_FAILED_MESSAGE)
    }

    fn error(message: &str) -> Self {
        Self {
            valid: false,
            errors: Some(vec![message.to_string()]),
        }
    }
}
