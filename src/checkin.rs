//! ## Check-in tracker
//! Request-facing layer over `EstimatorStore`: each method is one request of the
//! check-in service and returns the typed body that the transport serializes.
//!
//! With the `with_serde` feature the bodies serialize as:
//! - `CheckIns`  - `{ "checkIns": 45 }`
//! - `Total`     - `{ "total": 1001 }`
//! - `Locations` - `{ "locations": ["epcot", "magic-kingdom"] }`
//!
//! Validating that a location is registered is left to the transport; unknown
//! locations simply count as zero here.

use tracing::debug;

use crate::error::Result;
use crate::store::EstimatorStore;

/// Separator between location names in a multi-location request, e.g. `epcot+magic-kingdom`.
pub const LOCATION_SEPARATOR: char = '+';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(rename_all = "camelCase"))]
pub struct CheckIns {
    pub check_ins: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Total {
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Locations {
    pub locations: Vec<String>,
}

#[derive(Debug)]
pub struct CheckinTracker {
    store: EstimatorStore,
}

impl CheckinTracker {
    pub fn new(store: EstimatorStore) -> Self {
        Self { store }
    }

    #[inline]
    pub fn store(&self) -> &EstimatorStore {
        &self.store
    }

    /// Record that `email` checked in at `location` and return the updated count.
    pub fn check_in(&self, location: &str, email: &str) -> CheckIns {
        let changed = self.store.add_to_key(location, email.as_bytes());
        let check_ins = self.store.count_key(location);
        debug!(location, changed, check_ins, "check-in");
        CheckIns { check_ins }
    }

    /// Unique check-ins at a single location.
    pub fn location(&self, location: &str) -> CheckIns {
        CheckIns {
            check_ins: self.store.count_key(location),
        }
    }

    /// Unique visitors across the `+`-joined locations in `locations`.
    ///
    /// Empty names are skipped; a request naming no location fails with `EmptyUnion`.
    pub fn multi_location(&self, locations: &str) -> Result<Total> {
        let total = self.store.count_union(split_locations(locations))?;
        Ok(Total { total })
    }

    /// Every location with at least one check-in, sorted by name.
    pub fn locations(&self) -> Locations {
        Locations {
            locations: self.store.list_keys().into_iter().collect(),
        }
    }
}

/// Split a multi-location path segment into location names.
///
/// Names are kept verbatim, so `"epcot "` is a different location than `"epcot"`.
/// Empty segments are dropped, which makes `"+"` a request naming no location.
pub fn split_locations(locations: &str) -> impl Iterator<Item = &str> {
    locations
        .split(LOCATION_SEPARATOR)
        .filter(|location| !location.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::error::Error;
    use test_case::test_case;

    fn tracker() -> CheckinTracker {
        CheckinTracker::new(EstimatorStore::new(StoreConfig::default()).unwrap())
    }

    #[test_case("epcot" => vec!["epcot"])]
    #[test_case("epcot+magic-kingdom" => vec!["epcot", "magic-kingdom"])]
    #[test_case("epcot++magic-kingdom+" => vec!["epcot", "magic-kingdom"])]
    #[test_case("" => Vec::<&str>::new())]
    #[test_case("+" => Vec::<&str>::new())]
    #[test_case("epcot +magic-kingdom" => vec!["epcot ", "magic-kingdom"]; "whitespace is part of the name")]
    fn test_split_locations(input: &str) -> Vec<&str> {
        split_locations(input).collect()
    }

    #[test]
    fn test_check_in() {
        let t = tracker();
        assert_eq!(t.check_in("epcot", "a@x.com"), CheckIns { check_ins: 1 });
        assert_eq!(t.check_in("epcot", "a@x.com"), CheckIns { check_ins: 1 });
        assert_eq!(t.location("epcot"), CheckIns { check_ins: 1 });
        assert_eq!(t.location("never-seen"), CheckIns { check_ins: 0 });
    }

    #[test]
    fn test_multi_location() {
        let t = tracker();
        t.check_in("epcot", "a@x.com");
        t.check_in("magic-kingdom", "a@x.com");
        assert_eq!(t.multi_location("epcot+magic-kingdom"), Ok(Total { total: 1 }));
        assert_eq!(t.multi_location("epcot+never-seen"), Ok(Total { total: 1 }));
        assert_eq!(t.multi_location("+"), Err(Error::EmptyUnion));
        // a padded name is an unknown location, not epcot
        assert_eq!(t.multi_location(" epcot"), Ok(Total { total: 0 }));
    }

    #[test]
    fn test_locations() {
        let t = tracker();
        assert_eq!(t.locations(), Locations { locations: vec![] });
        t.check_in("magic-kingdom", "c@x.com");
        t.check_in("epcot", "a@x.com");
        assert_eq!(
            t.locations().locations,
            vec!["epcot".to_string(), "magic-kingdom".to_string()]
        );
    }

    #[cfg(feature = "with_serde")]
    #[test]
    fn test_response_bodies() {
        let t = tracker();
        let body = serde_json::to_string(&t.check_in("epcot", "a@x.com")).unwrap();
        assert_eq!(body, r#"{"checkIns":1}"#);
        let body = serde_json::to_string(&t.multi_location("epcot").unwrap()).unwrap();
        assert_eq!(body, r#"{"total":1}"#);
        let body = serde_json::to_string(&t.locations()).unwrap();
        assert_eq!(body, r#"{"locations":["epcot"]}"#);
    }
}
