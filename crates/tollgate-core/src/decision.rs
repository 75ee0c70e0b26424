//! Approval request and decision types shared between the gate and frontends.
//!
//! The gate builds an [`ApprovalRequest`] when policy requires a live
//! decision, hands it to a [`DecisionSource`], and acts on the returned
//! [`ApprovalDecision`]. Frontends (CLI prompt, chat UI, test mocks) only need
//! this module to participate in the approval flow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::types::{AutonomyMode, RequestId, RiskClassification, RiskLevel, Timestamp};

/// Default lifetime of an approval request before a driver should auto-deny it.
pub const DEFAULT_REQUEST_TTL: Duration = Duration::from_secs(90);

/// A request for a human decision on a risky tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// Tool the agent wants to run.
    pub tool: String,
    /// Classified risk level.
    pub risk: RiskLevel,
    /// Why the call was classified at this level.
    pub reason: String,
    /// What matched.
    pub detail: String,
    /// Autonomy mode in effect when the request was raised.
    pub autonomy_mode: AutonomyMode,
    /// When the request was created.
    pub created_at: Timestamp,
    /// When an unanswered request should be treated as denied.
    ///
    /// Informational for the gate; enforced by whatever drives the decision.
    pub expires_at: Timestamp,
}

impl ApprovalRequest {
    /// Create a request expiring after [`DEFAULT_REQUEST_TTL`].
    #[must_use]
    pub fn new(
        tool: impl Into<String>,
        classification: &RiskClassification,
        autonomy_mode: AutonomyMode,
    ) -> Self {
        Self::with_ttl(tool, classification, autonomy_mode, DEFAULT_REQUEST_TTL)
    }

    /// Create a request expiring after `ttl`.
    #[must_use]
    pub fn with_ttl(
        tool: impl Into<String>,
        classification: &RiskClassification,
        autonomy_mode: AutonomyMode,
        ttl: Duration,
    ) -> Self {
        let created_at = Timestamp::now();
        Self {
            id: RequestId::new(),
            tool: tool.into(),
            risk: classification.risk,
            reason: classification.reason.clone(),
            detail: classification.detail.clone(),
            autonomy_mode,
            created_at,
            expires_at: created_at.saturating_add(ttl),
        }
    }

    /// Whether the request has passed its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_past()
    }
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {}", self.risk, self.tool, self.reason)
    }
}

/// The answer to an [`ApprovalRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    /// Allow this call only.
    Approve,
    /// Allow this risk level for the rest of the conversation.
    Task,
    /// Allow this risk level from now on, across restarts.
    Always,
    /// Refuse the call.
    Deny,
}

impl ApprovalDecision {
    /// Whether this decision lets the call proceed.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        !matches!(self, Self::Deny)
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "APPROVE"),
            Self::Task => write!(f, "TASK"),
            Self::Always => write!(f, "ALWAYS"),
            Self::Deny => write!(f, "DENY"),
        }
    }
}

/// Anything that can answer an approval request.
///
/// Implemented by interactive frontends, by the approval broker, and by test
/// mocks. Any `Fn(ApprovalRequest) -> impl Future<Output = ApprovalDecision>`
/// closure is also a decision source.
///
/// # Example
///
/// ```
/// use tollgate_core::{ApprovalDecision, ApprovalRequest, DecisionSource};
///
/// let deny_all = |_request: ApprovalRequest| async { ApprovalDecision::Deny };
/// fn assert_source<D: DecisionSource>(_: &D) {}
/// assert_source(&deny_all);
/// ```
#[async_trait]
pub trait DecisionSource: Send + Sync {
    /// Present the request and wait for a decision.
    ///
    /// This is the only suspension point of an authorization call.
    async fn request_decision(&self, request: ApprovalRequest) -> ApprovalDecision;
}

#[async_trait]
impl<F, Fut> DecisionSource for F
where
    F: Fn(ApprovalRequest) -> Fut + Send + Sync,
    Fut: Future<Output = ApprovalDecision> + Send,
{
    async fn request_decision(&self, request: ApprovalRequest) -> ApprovalDecision {
        (self)(request).await
    }
}
