//! Error types for the runtime crate.

use thiserror::Error;

/// Errors that can occur while polling and dispatching events.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required environment variable is missing.
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    /// An environment variable holds a value that cannot be used.
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidEnv {
        name: String,
        value: String,
        reason: String,
    },

    /// The Frigate base URL cannot be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport-level failure talking to Frigate.
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// Frigate answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The events payload is not valid JSON for the expected shape.
    #[error("cannot parse events from {url}: {message} (byte offset {offset})")]
    Decode {
        url: String,
        message: String,
        offset: usize,
    },

    /// Dedup store failure.
    #[error("store error: {0}")]
    Store(#[from] frigate_store::StoreError),

    /// The notifier could not deliver a message.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// A per-event task panicked.
    #[error("event task panicked: {0}")]
    TaskPanicked(String),

    /// Dispatcher not started.
    #[error("dispatcher not started")]
    NotStarted,

    /// Dispatcher already started.
    #[error("dispatcher already started")]
    AlreadyStarted,

    /// Shutdown error.
    #[error("shutdown error: {0}")]
    Shutdown(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RelayError>;
