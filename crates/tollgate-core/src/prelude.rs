//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_core::prelude::*;` to import all essential types.

// Identifiers and time
pub use crate::{ActionId, PlanId, RequestId, Timestamp};

// Risk and policy
pub use crate::{AutonomyMode, RiskClassification, RiskLevel};

// Approval flow
pub use crate::{ApprovalDecision, ApprovalRequest, DecisionSource};
