//! Error types for container and resource access

use std::path::PathBuf;

/// Error type for container read/write operations
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// File could not be read or written
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not a valid container
    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Container could not be encoded
    #[error("Failed to encode container: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Error type for resource resolution
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    /// Resource does not exist under its category directory
    #[error("Resource not found: {0:?}")]
    NotFound(PathBuf),
}
