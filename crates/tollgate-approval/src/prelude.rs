//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_approval::prelude::*;` to import all essential types.

// Gate
pub use crate::{ApprovalGate, Authorization, Grant};

// Building blocks
pub use crate::{AuthorizationState, AutonomySettings, RiskClassifier, RuleSet};

// Frontends
pub use crate::ApprovalBroker;

// Errors
pub use crate::{ApprovalError, ApprovalResult};
