//! ## Atomic backend
//! Every key owns a slice of `AtomicU8` registers updated with `fetch_max`.
//!
//! Concurrent adds to the same key never block each other and the larger rank always
//! wins. A read loads each register atomically, so no register is ever torn, but the
//! copy is not a point-in-time snapshot: it may combine an older value of one register
//! with a newer value of another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::backend::BackendTrait;
use crate::error::{Error, Result};
use crate::registers::{decode_hash, RegisterArray};

#[derive(Debug)]
struct AtomicRegisters(Box<[AtomicU8]>);

impl AtomicRegisters {
    fn new(m: usize) -> Self {
        Self((0..m).map(|_| AtomicU8::new(0)).collect())
    }

    /// Raise registers of `array` to the current values, which must have the same length.
    fn load_into(&self, array: &mut RegisterArray) {
        for (idx, register) in self.0.iter().enumerate() {
            array.update_rank(idx, register.load(Ordering::Relaxed));
        }
    }

    fn store_from(array: &RegisterArray) -> Self {
        Self(array.registers().iter().map(|&r| AtomicU8::new(r)).collect())
    }
}

#[derive(Debug)]
pub(crate) struct Atomic {
    /// All-zero registers used as the starting point for snapshots
    empty: RegisterArray,
    entries: RwLock<HashMap<String, Arc<AtomicRegisters>>>,
}

impl Atomic {
    pub(crate) fn new(empty: RegisterArray) -> Self {
        Self {
            empty,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    fn get(&self, key: &str) -> Option<Arc<AtomicRegisters>> {
        self.entries.read().get(key).cloned()
    }

    #[inline]
    fn get_or_create(&self, key: &str) -> Arc<AtomicRegisters> {
        if let Some(entry) = self.get(key) {
            return entry;
        }
        self.entries
            .write()
            .entry(key.to_owned())
            .or_insert_with(|| {
                debug!(key, "creating atomic register array");
                Arc::new(AtomicRegisters::new(self.empty.len()))
            })
            .clone()
    }
}

impl BackendTrait for Atomic {
    fn add_hash(&self, key: &str, hash: u64) -> bool {
        let (idx, rank) = decode_hash(hash, self.empty.precision());
        let entry = self.get_or_create(key);
        entry.0[idx].fetch_max(rank, Ordering::Relaxed) < rank
    }

    fn count(&self, key: &str) -> Option<u64> {
        self.registers(key).map(|registers| registers.count())
    }

    fn merge_into(&self, key: &str, target: &mut RegisterArray) -> Result<bool> {
        let Some(entry) = self.get(key) else {
            return Ok(false);
        };
        if target.len() != entry.0.len() {
            return Err(Error::PrecisionMismatch {
                expected: target.len(),
                found: entry.0.len(),
            });
        }
        entry.load_into(target);
        Ok(true)
    }

    fn registers(&self, key: &str) -> Option<RegisterArray> {
        let entry = self.get(key)?;
        let mut array = self.empty.clone();
        entry.load_into(&mut array);
        Some(array)
    }

    fn insert(&self, key: String, registers: RegisterArray) {
        self.entries
            .write()
            .insert(key, Arc::new(AtomicRegisters::store_from(&registers)));
    }

    fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}
