//! Process-wide store configuration.
//!
//! Every key of a store shares the configured precision, which is fixed for the
//! lifetime of the store.

use crate::error::Result;
use crate::registers::{validate_precision, DEFAULT_PRECISION};

/// Where and how registers are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(rename_all = "snake_case"))]
pub enum BackendKind {
    /// One read-write lock per key.
    #[default]
    Locked,
    /// Lock-free per-register `fetch_max`.
    Atomic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(default))]
pub struct StoreConfig {
    /// Precision `b`, giving `2^b` registers per key.
    pub precision: u8,
    pub backend: BackendKind,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Check the configuration before a store is built from it.
    pub fn validate(&self) -> Result<()> {
        validate_precision(self.precision).map(|_| ())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            backend: BackendKind::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use test_case::test_case;

    #[test]
    fn test_default() {
        let config = StoreConfig::default();
        assert_eq!(config.precision, 14);
        assert_eq!(config.backend, BackendKind::Locked);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test_case(0 => Err(Error::InvalidPrecision(0)))]
    #[test_case(4 => Ok(()))]
    #[test_case(16 => Ok(()))]
    #[test_case(20 => Err(Error::InvalidPrecision(20)))]
    fn test_validate(precision: u8) -> Result<()> {
        StoreConfig::new().with_precision(precision).validate()
    }

    #[cfg(feature = "with_serde")]
    #[test]
    fn test_deserialize_partial() {
        let config: StoreConfig = serde_json::from_str(r#"{"backend":"atomic"}"#).unwrap();
        assert_eq!(
            config,
            StoreConfig::new().with_backend(BackendKind::Atomic)
        );
    }
}
