//! Errors returned by register arrays and the estimator store.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Register arrays built with different precisions were combined.
    #[error("precision mismatch: expected {expected} registers, found {found}")]
    PrecisionMismatch { expected: usize, found: usize },
    /// A union was requested over zero inputs.
    #[error("union requires at least one input")]
    EmptyUnion,
    /// Precision outside the supported `[4, 16]` range.
    #[error("precision {0} is outside the supported range [4, 16]")]
    InvalidPrecision(u8),
    /// Restored register data failed validation.
    #[error("invalid register data: {0}")]
    InvalidRegisters(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by configuration.
    ///
    /// Request-serving layers map these to a bad-request response.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::EmptyUnion)
    }
}
