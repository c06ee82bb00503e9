//! Error types for page loading and contrast analysis

use thiserror::Error;

/// Result type alias for engine and analyzer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, snapshotting, or analyzing a page
#[derive(Error, Debug)]
pub enum Error {
    /// The analyzer was handed an absent or malformed element collection
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failed to initialize the engine
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load a URL
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Failed to produce a document snapshot
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Filesystem error while writing report artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}
