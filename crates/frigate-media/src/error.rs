//! Error types for media operations.

use thiserror::Error;

/// Errors that can occur while preparing media.
#[derive(Error, Debug)]
pub enum MediaError {
    /// A required external tool could not be located.
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    /// An external tool exited unsuccessfully.
    #[error("{tool} failed ({status}): {stderr}")]
    CommandFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// ffprobe printed something that is not a number.
    #[error("could not parse duration from ffprobe output: '{0}'")]
    DurationParse(String),

    /// The probed duration is zero, negative or not finite.
    #[error("invalid clip duration: {0}")]
    InvalidDuration(f64),

    /// The file already fits under the limit.
    #[error("file is {size} bytes, within the {max} byte limit")]
    NotOversized { size: u64, max: u64 },

    /// Splitting would produce an unreasonable number of parts.
    #[error("split needs {count} parts, limit is {max}")]
    TooManyParts { count: usize, max: usize },

    /// Chunk options are unusable.
    #[error("invalid chunk options: {0}")]
    InvalidOptions(String),

    /// Thumbnail payload is not valid base64.
    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Thumbnail payload decoded to nothing.
    #[error("thumbnail is empty")]
    EmptyThumbnail,

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;
