//! Tollgate Executor - transactional action plans with quarantine-backed undo.
//!
//! A plan is an ordered list of filesystem mutations recorded in an
//! [`ActionLedger`]. The [`ActionExecutor`] applies them in order, copying
//! anything it is about to overwrite or remove into a [`QuarantineStore`]
//! first, and can later reverse every applied action in reverse order.
//!
//! Status is recorded durably after each step, so an interrupted pass can be
//! resumed by running the plan again.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

/// Error types and results for the executor crate.
pub mod error;
pub mod executor;
pub mod ledger;
pub mod payload;
pub mod plan;
pub mod quarantine;

pub use error::{ExecutorError, ExecutorResult, PayloadError, QuarantineError};
pub use executor::{ActionExecutor, ExecutionReport, ROLLBACK_FAILED_PREFIX, UndoReport};
pub use ledger::{ActionLedger, KvLedger, MemoryLedger};
pub use payload::{ActionPayload, ContentEncoding};
pub use plan::{ActionItem, ActionPlan, ActionStatus, ActionUpdate, PlanStatus};
pub use quarantine::QuarantineStore;
