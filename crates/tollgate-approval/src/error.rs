/// Errors that can occur while classifying, authorizing or brokering approvals.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// Override or settings persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] tollgate_storage::StorageError),

    /// A classifier rule pattern did not compile.
    #[error("invalid {table} pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Which rule table the pattern was destined for.
        table: &'static str,
        /// The rejected pattern.
        pattern: String,
        /// Compiler message.
        message: String,
    },

    /// A response named a request the broker is not waiting on.
    #[error("unknown or already resolved approval request: {0}")]
    UnknownRequest(String),

    /// Internal approval system error.
    #[error("internal approval error: {0}")]
    Internal(String),
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
