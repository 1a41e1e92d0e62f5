//! # Query Module
//!
//! Structured filter queries and the id-list parser shared by the HTTP and
//! CLI surfaces.
//!
//! - Comma-separated integer lists
//! - Entries that fail integer parsing are dropped, never rejected
//! - An absent or empty list means "no constraint on this axis"

use crate::{LocationIds, ModuleIds, UnitIds};
use std::collections::BTreeSet;

/// Parse a comma-separated id list.
///
/// Each entry is trimmed and parsed as an `i64`; entries that do not parse
/// are dropped. `None` and `""` both yield the empty set.
#[must_use]
pub fn parse_id_list<T>(raw: Option<&str>) -> BTreeSet<T>
where
    T: From<i64> + Ord,
{
    raw.map(|s| {
        s.split(',')
            .filter_map(|part| part.trim().parse::<i64>().ok().map(T::from))
            .collect()
    })
    .unwrap_or_default()
}

/// Which entity type a narrowing query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    Modules,
    Units,
    Locations,
}

impl FilterTarget {
    /// Parse a target name (`modules`, `units`, `locations`).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "modules" | "module" => Some(Self::Modules),
            "units" | "unit" => Some(Self::Units),
            "locations" | "location" => Some(Self::Locations),
            _ => None,
        }
    }
}

/// A narrowing query: the target type plus the selections on the other two
/// axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterQuery {
    Modules {
        unit_ids: UnitIds,
        location_ids: LocationIds,
    },
    Units {
        module_ids: ModuleIds,
        location_ids: LocationIds,
    },
    Locations {
        unit_ids: UnitIds,
        module_ids: ModuleIds,
    },
}

impl FilterQuery {
    /// Build a query for `target` from raw comma-separated selections.
    ///
    /// The selection on the target's own axis is ignored.
    #[must_use]
    pub fn from_csv(
        target: FilterTarget,
        modules: Option<&str>,
        units: Option<&str>,
        locations: Option<&str>,
    ) -> Self {
        match target {
            FilterTarget::Modules => Self::Modules {
                unit_ids: parse_id_list(units),
                location_ids: parse_id_list(locations),
            },
            FilterTarget::Units => Self::Units {
                module_ids: parse_id_list(modules),
                location_ids: parse_id_list(locations),
            },
            FilterTarget::Locations => Self::Locations {
                unit_ids: parse_id_list(units),
                module_ids: parse_id_list(modules),
            },
        }
    }

    /// True when no axis carries a selection.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        match self {
            Self::Modules {
                unit_ids,
                location_ids,
            } => unit_ids.is_empty() && location_ids.is_empty(),
            Self::Units {
                module_ids,
                location_ids,
            } => module_ids.is_empty() && location_ids.is_empty(),
            Self::Locations {
                unit_ids,
                module_ids,
            } => unit_ids.is_empty() && module_ids.is_empty(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocationId, ModuleId, UnitId};

    #[test]
    fn malformed_entries_are_dropped() {
        let ids: UnitIds = parse_id_list(Some("abc,2"));
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![UnitId(2)]);
    }

    #[test]
    fn absent_and_empty_mean_no_constraint() {
        let absent: ModuleIds = parse_id_list(None);
        let empty: ModuleIds = parse_id_list(Some(""));
        assert!(absent.is_empty());
        assert!(empty.is_empty());
    }

    #[test]
    fn whitespace_and_duplicates_are_tolerated() {
        let ids: LocationIds = parse_id_list(Some(" 3, 1 ,3,,x1,-4"));
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec![LocationId(-4), LocationId(1), LocationId(3)]
        );
    }

    #[test]
    fn overflowing_entries_are_dropped() {
        let ids: UnitIds = parse_id_list(Some("99999999999999999999,5"));
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![UnitId(5)]);
    }

    #[test]
    fn target_names() {
        assert_eq!(FilterTarget::parse("Modules"), Some(FilterTarget::Modules));
        assert_eq!(FilterTarget::parse("unit"), Some(FilterTarget::Units));
        assert_eq!(FilterTarget::parse("locations"), Some(FilterTarget::Locations));
        assert_eq!(FilterTarget::parse("rooms"), None);
    }

    #[test]
    fn from_csv_ignores_own_axis() {
        let query = FilterQuery::from_csv(FilterTarget::Units, Some("1"), Some("9"), None);
        assert_eq!(
            query,
            FilterQuery::Units {
                module_ids: [ModuleId(1)].into_iter().collect(),
                location_ids: LocationIds::new(),
            }
        );
        assert!(!query.is_unconstrained());
    }

    #[test]
    fn from_csv_unconstrained() {
        let query = FilterQuery::from_csv(FilterTarget::Modules, Some("1"), Some("x"), Some(""));
        assert!(query.is_unconstrained());
    }
}
