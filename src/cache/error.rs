//! Cache error types

use crate::source::SourceError;
use thiserror::Error;

/// Errors that can occur in the caching layer
#[derive(Error, Debug)]
pub enum CacheError {
    /// Channel name prefix has no database mapping in the routing table
    #[error("Unknown channel prefix: {0}")]
    UnknownChannelPrefix(String),

    /// I/O failure on the cache directory or its files
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Index serialization/persist failure. Load-side failures are not
    /// errors: an unreadable index degrades to an empty cache.
    #[error("Cache index error: {0}")]
    Index(String),

    /// The external source failed while filling a gap
    #[error("Source fetch failed: {0}")]
    Source(#[from] SourceError),

    /// A timestamp could not be represented as a nanosecond instant
    #[error("Invalid timestamp: {0}")]
    Timestamp(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Index(err.to_string())
    }
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::UnknownChannelPrefix("xyz".to_string());
        assert_eq!(err.to_string(), "Unknown channel prefix: xyz");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CacheError = io_err.into();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
