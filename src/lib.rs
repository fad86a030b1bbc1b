//! `checkin-estimator` counts approximate unique visitors per location and across unions of
//! locations, keeping one HyperLogLog register array per location as its only storage.
//!
//! ```
//! use checkin_estimator::{EstimatorStore, StoreConfig};
//!
//! let store = EstimatorStore::new(StoreConfig::default()).unwrap();
//! store.add_to_key("epcot", b"a@x.com");
//! store.add_to_key("epcot", b"a@x.com");
//! assert_eq!(store.count_key("epcot"), 1);
//! assert_eq!(store.count_key("never-seen"), 0);
//! assert_eq!(store.count_union(["epcot", "never-seen"]).unwrap(), 1);
//! ```
mod atomic;
mod backend;
pub mod checkin;
pub mod config;
pub mod error;
pub mod hash;
mod locked;
pub mod registers;
#[cfg(feature = "with_serde")]
mod serde;
pub mod store;
pub mod union;

pub use checkin::{CheckIns, CheckinTracker, Locations, Total};
pub use config::{BackendKind, StoreConfig};
pub use error::{Error, Result};
pub use registers::RegisterArray;
pub use store::{EstimatorStore, StoreSnapshot};
