//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_executor::prelude::*;` to import all essential types.

// Execution
pub use crate::{ActionExecutor, ExecutionReport, UndoReport};

// Plans
pub use crate::{ActionItem, ActionPayload, ActionPlan, ActionStatus, PlanStatus};

// Persistence
pub use crate::{ActionLedger, KvLedger, MemoryLedger, QuarantineStore};

// Errors
pub use crate::{ExecutorError, ExecutorResult};
