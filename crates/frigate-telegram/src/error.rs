//! Error types for Telegram delivery.

use thiserror::Error;

/// Errors that can occur setting up or talking to the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// A required variable is not set.
    #[error("{0} not set. Set the {0} environment variable.")]
    MissingVar(String),

    /// A variable is set to something unusable.
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: String, value: String },

    /// Telegram rejected a request.
    #[error("Telegram request failed: {0}")]
    Request(String),

    /// Relay runtime error.
    #[error("relay error: {0}")]
    Relay(#[from] frigate_runtime::RelayError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl From<teloxide::RequestError> for TelegramError {
    fn from(e: teloxide::RequestError) -> Self {
        TelegramError::Request(e.to_string())
    }
}
