//! Tollgate Core - foundation types for the Tollgate agent action gate.
//!
//! This crate provides:
//! - Opaque identifiers for plans, actions and approval requests
//! - Risk levels, classifications and the autonomy mode dial
//! - Approval request/decision types and the [`DecisionSource`] trait that
//!   frontends implement to answer approval prompts
//!
//! It has no knowledge of classification rules, storage or execution; those
//! live in `tollgate-approval`, `tollgate-storage` and `tollgate-executor`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod decision;
pub mod types;
pub mod utils;

pub use decision::{ApprovalDecision, ApprovalRequest, DEFAULT_REQUEST_TTL, DecisionSource};
pub use types::{
    ActionId, AutonomyMode, ParseError, PlanId, RequestId, RiskClassification, RiskLevel,
    Timestamp,
};
pub use utils::truncate_to_boundary;
