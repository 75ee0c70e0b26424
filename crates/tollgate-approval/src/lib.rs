//! Tollgate Approval - risk classification and the human-in-the-loop gate.
//!
//! Every tool call an agent proposes passes through the [`ApprovalGate`]
//! before dispatch:
//!
//! - [`RiskClassifier`] maps `(tool, input)` to a [`RiskLevel`] using the
//!   declarative tables in [`rules`]
//! - [`policy::requires_approval`] applies the autonomy matrix
//! - [`AuthorizationState`] caches TASK (per conversation) and ALWAYS
//!   (persisted) approvals
//! - a [`DecisionSource`] answers whatever is left; [`ApprovalBroker`] is a
//!   channel-backed one that auto-denies expired requests
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use tollgate_approval::{ApprovalGate, AuthorizationState, AutonomySettings, RiskClassifier};
//! use tollgate_core::{ApprovalDecision, ApprovalRequest, AutonomyMode, RiskLevel};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let gate = ApprovalGate::new(
//!     RiskClassifier::new(),
//!     Arc::new(AuthorizationState::in_memory()),
//!     Arc::new(AutonomySettings::fixed(AutonomyMode::Guided)),
//! );
//!
//! let deny = |_request: ApprovalRequest| async { ApprovalDecision::Deny };
//! let outcome = gate
//!     .authorize("shell_exec", &json!({"command": "curl https://example.com"}), "conv-1", &deny)
//!     .await;
//!
//! assert!(!outcome.allowed);
//! assert_eq!(outcome.classification.risk, RiskLevel::Exfil);
//! # });
//! ```
//!
//! [`RiskLevel`]: tollgate_core::RiskLevel
//! [`DecisionSource`]: tollgate_core::DecisionSource

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod broker;
pub mod classifier;
/// Error types and results for the approval crate.
pub mod error;
pub mod gate;
pub mod policy;
pub mod rules;
pub mod settings;
pub mod state;

pub use broker::ApprovalBroker;
pub use classifier::RiskClassifier;
pub use error::{ApprovalError, ApprovalResult};
pub use gate::{ApprovalGate, Authorization, Grant};
pub use policy::requires_approval;
pub use rules::{PatternRule, RuleSet};
pub use settings::AutonomySettings;
pub use state::AuthorizationState;
