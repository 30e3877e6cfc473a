//! Error types for castplay.

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing or driving a playback session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A local source file was not found.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The cast control channel failed.
    #[error("cast error: {0}")]
    Cast(String),

    /// The device sent something we could not understand.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The device did not report an active media session in time.
    #[error("device did not become active within {}s", timeout.as_secs())]
    ActivationTimeout { timeout: Duration },

    /// The operation was abandoned because playback was interrupted.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a cast channel error.
    pub fn cast(message: impl Into<String>) -> Self {
        Self::Cast(message.into())
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<native_tls::Error> for Error {
    fn from(err: native_tls::Error) -> Self {
        Error::Cast(err.to_string())
    }
}
