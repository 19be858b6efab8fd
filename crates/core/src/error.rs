//! Error types for the object model

use std::io;
use std::path::PathBuf;

use protoforge_engine::{CodecError, LocatorError};
use protoforge_sdk::ObjectId;

/// Error type for load, save, clone, diff and update operations
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Referenced object is neither cached nor loadable
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Package, level or object file does not exist
    #[error("Path not found: {0:?}")]
    PathNotFound(PathBuf),

    /// Required property is missing from a container
    #[error("Property '{property}' missing on object '{object}'")]
    PropertyNotFound { object: ObjectId, property: String },

    /// No reflected type is registered under this type id
    #[error("Unknown object type: {0}")]
    UnknownType(String),

    /// Value or object has a different type than expected
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Container does not have the expected shape
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// Container could not be read or written
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Object id is already present in the target cache
    #[error("Duplicate object id: {0}")]
    DuplicateId(ObjectId),

    /// Prototype references lead back to an object that is still loading
    #[error("Cyclic reference: {}", join_chain(.0))]
    CyclicReference(Vec<ObjectId>),

    /// Operation is not valid for the current context or object
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Buffer or directory IO failed
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for object model operations
pub type ModelResult<T> = Result<T, ModelError>;

fn join_chain(chain: &[ObjectId]) -> String {
    chain
        .iter()
        .map(ObjectId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl From<LocatorError> for ModelError {
    fn from(e: LocatorError) -> Self {
        match e {
            LocatorError::NotFound(path) => ModelError::PathNotFound(path),
        }
    }
}

impl ModelError {
    /// Check if this error means something could not be found
    pub fn is_not_found(&self) -> bool {
        match self {
            ModelError::ObjectNotFound(_)
            | ModelError::PathNotFound(_)
            | ModelError::PropertyNotFound { .. }
            | ModelError::UnknownType(_) => true,
            ModelError::Codec(CodecError::Io { source, .. }) => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// Check if this error means a container had an unexpected shape
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ModelError::MalformedContainer(_) | ModelError::Codec(CodecError::Parse { .. })
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ModelError::Io {
            path: path.into(),
            source,
        }
    }
}
