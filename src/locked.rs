//! ## Locked backend
//! Every key owns a `RegisterArray` behind its own `RwLock`.
//!
//! Adds take the key's write lock, reads take its read lock, so an estimate always
//! sees a whole register array. The outer map lock is only held to find or create
//! the entry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::backend::BackendTrait;
use crate::error::Result;
use crate::registers::{decode_hash, RegisterArray};

#[derive(Debug)]
pub(crate) struct Locked {
    /// All-zero registers cloned for new keys
    empty: RegisterArray,
    entries: RwLock<HashMap<String, Arc<RwLock<RegisterArray>>>>,
}

impl Locked {
    pub(crate) fn new(empty: RegisterArray) -> Self {
        Self {
            empty,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    fn get(&self, key: &str) -> Option<Arc<RwLock<RegisterArray>>> {
        self.entries.read().get(key).cloned()
    }

    /// Return the entry for `key`, creating it if needed.
    #[inline]
    fn get_or_create(&self, key: &str) -> Arc<RwLock<RegisterArray>> {
        if let Some(entry) = self.get(key) {
            return entry;
        }
        // another writer may have created the entry between the two locks
        self.entries
            .write()
            .entry(key.to_owned())
            .or_insert_with(|| {
                debug!(key, "creating register array");
                Arc::new(RwLock::new(self.empty.clone()))
            })
            .clone()
    }
}

impl BackendTrait for Locked {
    fn add_hash(&self, key: &str, hash: u64) -> bool {
        let (idx, rank) = decode_hash(hash, self.empty.precision());
        let entry = self.get_or_create(key);
        let mut registers = entry.write();
        registers.update_rank(idx, rank)
    }

    fn count(&self, key: &str) -> Option<u64> {
        self.get(key).map(|entry| {
            let registers = entry.read();
            registers.count()
        })
    }

    fn merge_into(&self, key: &str, target: &mut RegisterArray) -> Result<bool> {
        let Some(entry) = self.get(key) else {
            return Ok(false);
        };
        let registers = entry.read();
        target.merge(&registers)?;
        Ok(true)
    }

    fn registers(&self, key: &str) -> Option<RegisterArray> {
        self.get(key).map(|entry| {
            let registers = entry.read();
            registers.clone()
        })
    }

    fn insert(&self, key: String, registers: RegisterArray) {
        self.entries
            .write()
            .insert(key, Arc::new(RwLock::new(registers)));
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
