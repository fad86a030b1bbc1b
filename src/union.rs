//! ## Union
//! Combines register arrays by register-wise maximum. The result estimates the
//! cardinality of the union of the underlying sets, and the inputs are left untouched.

use crate::error::{Error, Result};
use crate::registers::RegisterArray;

/// Merge `arrays` into a new register array.
///
/// Fails with `EmptyUnion` when `arrays` yields nothing and with `PrecisionMismatch`
/// when the register counts differ. A single input is returned as an equal copy.
pub fn union<'a, I>(arrays: I) -> Result<RegisterArray>
where
    I: IntoIterator<Item = &'a RegisterArray>,
{
    let mut arrays = arrays.into_iter();
    let mut merged = arrays.next().ok_or(Error::EmptyUnion)?.clone();
    for array in arrays {
        merged.merge(array)?;
    }
    Ok(merged)
}

/// Estimate the cardinality of the union of `arrays`, rounded like `RegisterArray::count`.
pub fn union_count<'a, I>(arrays: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a RegisterArray>,
{
    union(arrays).map(|merged| merged.count())
}
