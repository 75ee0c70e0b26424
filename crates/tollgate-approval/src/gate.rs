//! The approval gate - orchestrates classification, policy and overrides.
//!
//! # Authorization Flow
//!
//! 1. Classify the tool call
//! 2. If the autonomy policy does not require approval, allow
//! 3. If the conversation has a TASK override for the risk level, allow
//! 4. If the risk level has a global ALWAYS override, allow
//! 5. Otherwise build an [`ApprovalRequest`] and await the [`DecisionSource`]
//! 6. Apply the decision's side effects and return the outcome

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tollgate_core::{
    ApprovalDecision, ApprovalRequest, AutonomyMode, DEFAULT_REQUEST_TTL, DecisionSource,
    RiskClassification,
};
use tollgate_storage::{KvStore, SETTINGS_NAMESPACE, ScopedKvStore};
use tracing::{debug, info, warn};

use crate::classifier::RiskClassifier;
use crate::error::ApprovalResult;
use crate::policy::requires_approval;
use crate::settings::AutonomySettings;
use crate::state::AuthorizationState;

/// Why a call was allowed, or that it was not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The autonomy policy does not require approval for this risk.
    Policy,
    /// The conversation has a TASK approval for this risk.
    TaskOverride,
    /// The risk level has a global ALWAYS approval.
    GlobalOverride,
    /// A live decision approved the call.
    UserApproval(ApprovalDecision),
    /// A live decision refused the call.
    Denied,
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy => write!(f, "policy"),
            Self::TaskOverride => write!(f, "task override"),
            Self::GlobalOverride => write!(f, "global override"),
            Self::UserApproval(decision) => write!(f, "user approval ({decision})"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// The outcome of [`ApprovalGate::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Whether the call may proceed.
    pub allowed: bool,
    /// Refusal message when `allowed` is false.
    pub error: Option<String>,
    /// How the call was classified.
    pub classification: RiskClassification,
    /// How the outcome was reached.
    pub grant: Grant,
}

impl Authorization {
    fn allow(classification: RiskClassification, grant: Grant) -> Self {
        Self {
            allowed: true,
            error: None,
            classification,
            grant,
        }
    }

    fn deny(classification: RiskClassification) -> Self {
        let error = format!(
            "Action denied by user: {} ({})",
            classification.reason, classification.risk
        );
        Self {
            allowed: false,
            error: Some(error),
            classification,
            grant: Grant::Denied,
        }
    }
}

/// Gatekeeper consulted before every tool dispatch.
pub struct ApprovalGate {
    classifier: RiskClassifier,
    state: Arc<AuthorizationState>,
    settings: Arc<AutonomySettings>,
    request_ttl: Duration,
}

impl fmt::Debug for ApprovalGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalGate")
            .field("mode", &self.settings.mode())
            .field("state", &self.state)
            .field("request_ttl", &self.request_ttl)
            .finish_non_exhaustive()
    }
}

impl ApprovalGate {
    /// Create a gate from explicit parts.
    #[must_use]
    pub fn new(
        classifier: RiskClassifier,
        state: Arc<AuthorizationState>,
        settings: Arc<AutonomySettings>,
    ) -> Self {
        Self {
            classifier,
            state,
            settings,
            request_ttl: DEFAULT_REQUEST_TTL,
        }
    }

    /// Create a gate whose mode and global overrides live in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored settings cannot be read.
    pub async fn open(
        store: Arc<dyn KvStore>,
        default_mode: AutonomyMode,
        classifier: RiskClassifier,
    ) -> ApprovalResult<Self> {
        let scoped = ScopedKvStore::new(store, SETTINGS_NAMESPACE)?;
        let state = AuthorizationState::load(scoped.clone()).await?;
        let settings = AutonomySettings::load(scoped, default_mode).await?;
        Ok(Self::new(classifier, Arc::new(state), Arc::new(settings)))
    }

    /// Set how long a raised request stays answerable.
    #[must_use]
    pub fn with_request_ttl(mut self, ttl: Duration) -> Self {
        self.request_ttl = ttl;
        self
    }

    /// Classify a tool call without authorizing it.
    #[must_use]
    pub fn classify(&self, tool: &str, input: &Value) -> RiskClassification {
        self.classifier.classify(tool, input)
    }

    /// The autonomy mode in effect.
    #[must_use]
    pub fn mode(&self) -> AutonomyMode {
        self.settings.mode()
    }

    /// The override state.
    #[must_use]
    pub fn state(&self) -> &AuthorizationState {
        &self.state
    }

    /// The autonomy settings.
    #[must_use]
    pub fn settings(&self) -> &AutonomySettings {
        &self.settings
    }

    /// Decide whether a tool call may proceed.
    ///
    /// `decisions` is only consulted when policy requires approval and no
    /// cached override covers the call. A DENY is reported in the returned
    /// [`Authorization`], not as an error.
    pub async fn authorize<D>(
        &self,
        tool: &str,
        input: &Value,
        conversation_id: &str,
        decisions: &D,
    ) -> Authorization
    where
        D: DecisionSource + ?Sized,
    {
        let classification = self.classifier.classify(tool, input);
        let mode = self.settings.mode();
        let risk = classification.risk;

        info!(
            target: "tollgate::audit",
            mode = %mode,
            tool,
            risk = %risk,
            "Authorizing tool call"
        );

        if !requires_approval(mode, risk) {
            return Authorization::allow(classification, Grant::Policy);
        }

        if self.state.has_task(conversation_id, risk) {
            debug!(tool, conversation_id, risk = %risk, "Allowed by task override");
            return Authorization::allow(classification, Grant::TaskOverride);
        }

        if self.state.is_global(risk).await {
            debug!(tool, risk = %risk, "Allowed by global override");
            return Authorization::allow(classification, Grant::GlobalOverride);
        }

        let request = ApprovalRequest::with_ttl(tool, &classification, mode, self.request_ttl);
        let request_id = request.id;
        let decision = decisions.request_decision(request).await;

        info!(
            target: "tollgate::audit",
            request_id = %request_id,
            tool,
            risk = %risk,
            decision = %decision,
            "Approval decision received"
        );

        match decision {
            ApprovalDecision::Approve => {
                Authorization::allow(classification, Grant::UserApproval(decision))
            },
            ApprovalDecision::Task => {
                self.state.add_task(conversation_id, risk);
                Authorization::allow(classification, Grant::UserApproval(decision))
            },
            ApprovalDecision::Always => match self.state.set_global(risk).await {
                Ok(()) => Authorization::allow(classification, Grant::UserApproval(decision)),
                Err(e) => {
                    warn!(
                        error = %e,
                        risk = %risk,
                        "Failed to persist ALWAYS approval; treating as one-time"
                    );
                    Authorization::allow(
                        classification,
                        Grant::UserApproval(ApprovalDecision::Approve),
                    )
                },
            },
            ApprovalDecision::Deny => Authorization::deny(classification),
        }
    }

    /// Forget every TASK approval of the conversation.
    ///
    /// Returns `true` if the conversation had any.
    pub fn clear_task_approvals(&self, conversation_id: &str) -> bool {
        let cleared = self.state.clear_task(conversation_id);
        if cleared {
            debug!(conversation_id, "Cleared task approvals");
        }
        cleared
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
