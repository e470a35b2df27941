//! Error types for privbit

use thiserror::Error;

/// Recoverable errors. Programming faults (out-of-catalog index, comparing
/// entries of different kinds, comparing un-analysed entries) panic instead.
#[derive(Debug, Error)]
pub enum PrivError {
    /// The requested privileges are not valid for the target entry kind
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    #[error("grant already exists: {0}")]
    GrantExists(String),

    #[error("no such grant: {0}")]
    NoSuchGrant(String),

    /// Entry used before its patterns were compiled
    #[error("entry is not analysed")]
    NotAnalysed,

    /// Truncated or inconsistent serialized data
    #[error("malformed entry data: {0}")]
    Malformed(String),

    #[error("invalid pattern: {0}")]
    Pattern(String),

    #[error("store: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for privbit operations
pub type Result<T> = std::result::Result<T, PrivError>;

/// Convert a storage error to PrivError
pub fn err<E: std::error::Error>(e: E) -> PrivError {
    PrivError::Store(e.to_string())
}

/// Convert an I/O error hit while decoding into a malformed-data error
pub fn malformed(e: std::io::Error) -> PrivError {
    PrivError::Malformed(e.to_string())
}
