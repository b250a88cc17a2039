//! Error types for dedup store operations.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or rejected the command.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A zero TTL was requested.
    #[error("invalid ttl for key '{0}': ttl must be positive")]
    InvalidTtl(String),

    /// The TTL puts the expiry beyond what the clock can represent.
    #[error("ttl of {secs}s for key '{key}' is out of range")]
    TtlOutOfRange { key: String, secs: u64 },
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
