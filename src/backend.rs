use enum_dispatch::enum_dispatch;

use crate::atomic::Atomic;
use crate::error::Result;
use crate::locked::Locked;
use crate::registers::RegisterArray;

/// Backends supported by `EstimatorStore`
#[derive(Debug)]
#[enum_dispatch]
pub(crate) enum Backend {
    Locked(Locked),
    Atomic(Atomic),
}

/// Operations every register backend must implement.
///
/// A backend owns the mapping from key to registers and decides how concurrent
/// adds and reads are synchronized. All keys in a backend share one precision.
#[enum_dispatch(Backend)]
pub(crate) trait BackendTrait {
    /// Add a hash to `key`, creating its registers on first use.
    /// Returns whether a register changed.
    fn add_hash(&self, key: &str, hash: u64) -> bool;
    /// Estimate for `key`, or `None` if the key was never added to.
    fn count(&self, key: &str) -> Option<u64>;
    /// Merge the registers of `key` into `target`. Returns whether the key exists.
    fn merge_into(&self, key: &str, target: &mut RegisterArray) -> Result<bool>;
    /// Consistent copy of the registers of `key`.
    fn registers(&self, key: &str) -> Option<RegisterArray>;
    /// Replace the registers of `key`, e.g. when restoring a snapshot.
    fn insert(&self, key: String, registers: RegisterArray);
    fn contains_key(&self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
    fn len(&self) -> usize;
    /// Drop every key.
    fn clear(&self);
}
