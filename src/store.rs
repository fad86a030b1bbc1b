//! Estimator store maps keys (location names) to HyperLogLog register arrays and
//! answers approximate distinct counts per key or across a union of keys.
//!
//! # Design
//!
//! ## Shared precision
//! The precision `b` is fixed when the store is created and every key gets `2^b`
//! registers, so any two keys can be unioned without a precision check failing.
//! Expected error for the supported precisions:
//!   b = 10: 1.04 / sqrt(2^10) = 3.25%
//!   b = 12: 1.04 / sqrt(2^12) = 1.62%
//!   b = 14: 1.04 / sqrt(2^14) = 0.81%
//!   b = 16: 1.04 / sqrt(2^16) = 0.41%
//!
//! ## Lazy keys
//! A key is created by its first add and lives until `clear`. Counting an unknown key
//! yields 0, and unknown keys inside a union contribute all-zero registers, which is
//! the identity for the register-wise maximum.
//!
//! ## Concurrency
//! All operations take `&self`. The configured backend decides how concurrent adds
//! to one key are synchronized:
//! - `Locked`: one read-write lock per key, reads estimate a whole array.
//! - `Atomic`: `fetch_max` per register, adds never block.
//!
//! ## Snapshots
//! The register array of each key is the unit of snapshot and restore. A snapshot
//! records its precision and can only be restored into a store of the same precision.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::atomic::Atomic;
use crate::backend::{Backend, BackendTrait};
use crate::config::{BackendKind, StoreConfig};
use crate::error::{Error, Result};
use crate::hash::hash;
use crate::locked::Locked;
use crate::registers::RegisterArray;

#[derive(Debug)]
pub struct EstimatorStore {
    config: StoreConfig,
    /// All-zero registers of the configured precision
    empty: RegisterArray,
    backend: Backend,
}

/// Point-in-time copy of every key's registers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreSnapshot {
    pub precision: u8,
    pub entries: BTreeMap<String, RegisterArray>,
}

impl EstimatorStore {
    /// Create an empty store. Fails if the configuration is invalid.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let empty = RegisterArray::new(config.precision)?;
        let backend = match config.backend {
            BackendKind::Locked => Backend::from(Locked::new(empty.clone())),
            BackendKind::Atomic => Backend::from(Atomic::new(empty.clone())),
        };
        info!(
            precision = config.precision,
            registers = empty.len(),
            backend = ?config.backend,
            "estimator store created"
        );
        Ok(Self {
            config,
            empty,
            backend,
        })
    }

    /// Rebuild a store from a snapshot taken by `snapshot`.
    pub fn restore(config: StoreConfig, snapshot: StoreSnapshot) -> Result<Self> {
        let store = Self::new(config)?;
        if snapshot.precision != config.precision {
            warn!(
                expected = config.precision,
                found = snapshot.precision,
                "snapshot precision differs from store precision"
            );
            return Err(Error::PrecisionMismatch {
                expected: store.empty.len(),
                found: 1usize
                    .checked_shl(u32::from(snapshot.precision))
                    .unwrap_or(usize::MAX),
            });
        }
        let keys = snapshot.entries.len();
        for (key, registers) in snapshot.entries {
            if registers.len() != store.empty.len() {
                warn!(key = %key, registers = registers.len(), "rejecting snapshot entry");
                return Err(Error::PrecisionMismatch {
                    expected: store.empty.len(),
                    found: registers.len(),
                });
            }
            store.backend.insert(key, registers);
        }
        debug!(keys, "estimator store restored");
        Ok(store)
    }

    #[inline]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[inline]
    pub fn precision(&self) -> u8 {
        self.config.precision
    }

    /// Add `identifier` to `key`, creating the key on first use.
    /// Returns whether the key's registers changed.
    #[inline]
    pub fn add_to_key(&self, key: &str, identifier: &[u8]) -> bool {
        self.add_hash_to_key(key, hash(identifier))
    }

    /// Add an already hashed identifier to `key`.
    #[inline]
    pub fn add_hash_to_key(&self, key: &str, hash: u64) -> bool {
        self.backend.add_hash(key, hash)
    }

    /// Approximate number of distinct identifiers added to `key`; 0 for unknown keys.
    #[inline]
    pub fn count_key(&self, key: &str) -> u64 {
        self.backend.count(key).unwrap_or(0)
    }

    /// Approximate number of distinct identifiers added to any of `keys`.
    ///
    /// Unknown keys contribute nothing. Fails with `EmptyUnion` if `keys` is empty.
    pub fn count_union<I, K>(&self, keys: I) -> Result<u64>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.union_registers(keys).map(|merged| merged.count())
    }

    /// Register-wise maximum over the registers of `keys`.
    pub fn union_registers<I, K>(&self, keys: I) -> Result<RegisterArray>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut merged = self.empty.clone();
        let mut requested = 0usize;
        let mut found = 0usize;
        for key in keys {
            requested += 1;
            if self.backend.merge_into(key.as_ref(), &mut merged)? {
                found += 1;
            }
        }
        if requested == 0 {
            return Err(Error::EmptyUnion);
        }
        debug!(requested, found, "computed union");
        Ok(merged)
    }

    /// Consistent copy of the registers of `key`.
    #[inline]
    pub fn registers(&self, key: &str) -> Option<RegisterArray> {
        self.backend.registers(key)
    }

    /// Every key that has received at least one add.
    pub fn list_keys(&self) -> BTreeSet<String> {
        self.backend.keys().into_iter().collect()
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.backend.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every key. Administrative reset, not part of regular request handling.
    pub fn clear(&self) {
        let keys = self.backend.len();
        self.backend.clear();
        info!(keys, "estimator store cleared");
    }

    /// Copy the registers of every key.
    ///
    /// Each key is copied consistently; keys added to during the snapshot may or may
    /// not include those adds.
    pub fn snapshot(&self) -> StoreSnapshot {
        let entries: BTreeMap<String, RegisterArray> = self
            .backend
            .keys()
            .into_iter()
            .filter_map(|key| self.backend.registers(&key).map(|r| (key, r)))
            .collect();
        debug!(keys = entries.len(), "estimator store snapshot taken");
        StoreSnapshot {
            precision: self.config.precision,
            entries,
        }
    }
}
