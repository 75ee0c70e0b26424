//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested key or record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write would violate a uniqueness constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// The backing file could not be read, written or locked.
    #[error("io error on {path}: {message}")]
    Io {
        /// File involved in the failure.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// Another process holds the store's lock.
    #[error("store is locked by another process: {0}")]
    Locked(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The namespace or key is invalid.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
