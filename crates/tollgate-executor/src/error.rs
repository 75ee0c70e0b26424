//! Executor error types.

use std::io;
use std::path::Path;

use tollgate_core::{ActionId, PlanId};
use tollgate_storage::StorageError;

/// An action payload failed validation when decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The payload does not have the shape its action type requires.
    #[error("invalid {action_type} payload: {message}")]
    Invalid {
        /// The declared action type.
        action_type: String,
        /// What was wrong.
        message: String,
    },

    /// `fs_write` content declared as base64 does not decode.
    #[error("invalid base64 content: {0}")]
    Encoding(String),
}

/// Errors from the quarantine store.
#[derive(Debug, thiserror::Error)]
pub enum QuarantineError {
    /// The file to back up or restore does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path is a directory or other non-regular file.
    #[error("not a regular file: {0}")]
    NotAFile(String),

    /// A filesystem operation failed.
    #[error("io error on {path}: {message}")]
    Io {
        /// Path involved in the failure.
        path: String,
        /// Underlying error message.
        message: String,
    },
}

impl QuarantineError {
    pub(crate) fn io(path: &Path, err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            return Self::NotFound(path.display().to_string());
        }
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Why a single filesystem step failed.
#[derive(Debug, thiserror::Error)]
pub(crate) enum StepError {
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        source: io::Error,
    },

    #[error("move source does not exist: {0}")]
    MissingSource(String),

    #[error(transparent)]
    Quarantine(#[from] QuarantineError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl StepError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.display().to_string(),
            source,
        }
    }
}

/// Errors from plan execution and rollback.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// No plan with this id exists in the ledger.
    #[error("plan not found: {0}")]
    PlanNotFound(PlanId),

    /// Another forward or reverse pass over this plan is in progress.
    #[error("plan {0} is already being executed or undone")]
    PlanBusy(PlanId),

    /// An action failed during forward execution; the plan is now failed.
    #[error("action {action_id} (step {sequence}) failed: {message}")]
    ActionFailed {
        /// The failing action.
        action_id: ActionId,
        /// Its sequence order.
        sequence: u32,
        /// What went wrong.
        message: String,
    },

    /// The ledger rejected a read or write.
    #[error("ledger error: {0}")]
    Ledger(#[from] StorageError),

    /// A payload failed validation.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// A quarantine operation failed outside of a plan pass.
    #[error(transparent)]
    Quarantine(#[from] QuarantineError),
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
