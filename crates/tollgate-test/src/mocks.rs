//! Mock decision sources.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tollgate_core::{ApprovalDecision, ApprovalRequest, DecisionSource};

/// Decision source that answers from a queue of scripted decisions.
///
/// Once the queue is exhausted it answers with the fallback decision
/// (`Deny` unless changed). Every request it receives is recorded.
///
/// Uses `std::sync::Mutex` internally so builders work without a runtime.
#[derive(Debug, Clone)]
pub struct ScriptedDecisions {
    script: Arc<Mutex<VecDeque<ApprovalDecision>>>,
    requests: Arc<Mutex<Vec<ApprovalRequest>>>,
    fallback: ApprovalDecision,
}

impl Default for ScriptedDecisions {
    fn default() -> Self {
        Self::new([])
    }
}

impl ScriptedDecisions {
    /// Answer with `decisions` in order, then deny.
    #[must_use]
    pub fn new(decisions: impl IntoIterator<Item = ApprovalDecision>) -> Self {
        Self {
            script: Arc::new(Mutex::new(decisions.into_iter().collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
            fallback: ApprovalDecision::Deny,
        }
    }

    /// Answer every request with `decision`.
    #[must_use]
    pub fn always(decision: ApprovalDecision) -> Self {
        Self::new([]).with_fallback(decision)
    }

    /// Set the decision used once the script runs out.
    #[must_use]
    pub fn with_fallback(mut self, decision: ApprovalDecision) -> Self {
        self.fallback = decision;
        self
    }

    /// Append a decision to the script.
    pub fn push(&self, decision: ApprovalDecision) {
        if let Ok(mut guard) = self.script.lock() {
            guard.push_back(decision);
        }
    }

    /// Number of requests received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ApprovalRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// The most recent request, if any.
    #[must_use]
    pub fn last_request(&self) -> Option<ApprovalRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl DecisionSource for ScriptedDecisions {
    async fn request_decision(&self, request: ApprovalRequest) -> ApprovalDecision {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request);
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or(self.fallback)
    }
}

/// Wraps another decision source and records what passes through it.
#[derive(Debug)]
pub struct RecordingDecisions<D> {
    inner: D,
    log: Mutex<Vec<(ApprovalRequest, ApprovalDecision)>>,
}

impl<D: DecisionSource> RecordingDecisions<D> {
    /// Record around `inner`.
    #[must_use]
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Every request and the decision it received, oldest first.
    #[must_use]
    pub fn log(&self) -> Vec<(ApprovalRequest, ApprovalDecision)> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Number of requests seen.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.log.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// The wrapped source.
    #[must_use]
    pub fn inner(&self) -> &D {
        &self.inner
    }
}

#[async_trait]
impl<D: DecisionSource> DecisionSource for RecordingDecisions<D> {
    async fn request_decision(&self, request: ApprovalRequest) -> ApprovalDecision {
        let decision = self.inner.request_decision(request.clone()).await;
        if let Ok(mut guard) = self.log.lock() {
            guard.push((request, decision));
        }
        decision
    }
}
