//! ## Hash stage
//! Maps opaque identifiers to uniformly distributed 64-bit hashes.
//!
//! The seed is fixed so register arrays built in different processes (or restored
//! from a snapshot) agree with freshly computed hashes and stay mergeable.

use wyhash::wyhash;

/// Seed shared by every process using this crate. Changing it invalidates persisted registers.
const SEED: u64 = 0;

/// Hash an identifier into a `u64`.
#[inline]
pub fn hash(identifier: &[u8]) -> u64 {
    wyhash(identifier, SEED)
}

/// Hash a string identifier (e.g. an email address).
#[inline]
pub fn hash_str(identifier: &str) -> u64 {
    hash(identifier.as_bytes())
}
