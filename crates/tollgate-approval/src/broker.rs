//! Request/response broker between the gate and an asynchronous frontend.
//!
//! The broker is a [`DecisionSource`]. Each request is pushed onto an mpsc
//! channel that a frontend (chat UI, socket, CLI loop) drains; the frontend
//! answers by calling [`ApprovalBroker::respond`] with the request id. The
//! waiting authorization resolves to [`ApprovalDecision::Deny`] when:
//!
//! - the request's `expires_at` passes without an answer
//! - the request is cancelled via [`ApprovalBroker::cancel`]
//! - the frontend's receiver has been dropped

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tollgate_core::{ApprovalDecision, ApprovalRequest, DecisionSource, RequestId};
use tracing::{debug, warn};

use crate::error::{ApprovalError, ApprovalResult};

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<ApprovalDecision>>>>;

/// Channel-backed decision source with driver-side auto-deny.
#[derive(Debug, Clone)]
pub struct ApprovalBroker {
    outbound: mpsc::Sender<ApprovalRequest>,
    pending: PendingMap,
}

/// Removes a pending entry however the waiting future ends.
struct PendingGuard {
    pending: PendingMap,
    id: RequestId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| {
            warn!("Approval broker lock poisoned, recovering");
            e.into_inner()
        });
        pending.remove(&self.id);
    }
}

impl ApprovalBroker {
    /// Create a broker and the receiver a frontend should drain.
    ///
    /// `capacity` bounds how many unanswered requests may queue before
    /// `request_decision` waits for room.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ApprovalRequest>) {
        let (outbound, inbound) = mpsc::channel(capacity.max(1));
        let broker = Self {
            outbound,
            pending: Arc::new(Mutex::new(HashMap::new())),
        };
        (broker, inbound)
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<RequestId, oneshot::Sender<ApprovalDecision>>> {
        self.pending.lock().unwrap_or_else(|e| {
            warn!("Approval broker lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Deliver a decision for a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::UnknownRequest`] if no request with this id is
    /// waiting (never raised, already answered, expired or cancelled).
    pub fn respond(&self, id: RequestId, decision: ApprovalDecision) -> ApprovalResult<()> {
        let sender = self
            .lock()
            .remove(&id)
            .ok_or_else(|| ApprovalError::UnknownRequest(id.to_string()))?;
        sender
            .send(decision)
            .map_err(|_| ApprovalError::UnknownRequest(id.to_string()))?;
        debug!(request_id = %id, decision = %decision, "Approval response delivered");
        Ok(())
    }

    /// Cancel a pending request; its waiter resolves to DENY.
    ///
    /// Returns `true` if the request was pending.
    pub fn cancel(&self, id: RequestId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Ids of requests still awaiting an answer.
    #[must_use]
    pub fn pending(&self) -> Vec<RequestId> {
        self.lock().keys().copied().collect()
    }
}

#[async_trait]
impl DecisionSource for ApprovalBroker {
    async fn request_decision(&self, request: ApprovalRequest) -> ApprovalDecision {
        let id = request.id;
        let wait = request.expires_at.remaining();
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, tx);
        let _guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            id,
        };

        let exchange = async {
            if self.outbound.send(request).await.is_err() {
                warn!(request_id = %id, "Approval frontend is gone; denying");
                return ApprovalDecision::Deny;
            }
            if let Ok(decision) = rx.await {
                decision
            } else {
                debug!(request_id = %id, "Approval request cancelled; denying");
                ApprovalDecision::Deny
            }
        };

        if let Ok(decision) = tokio::time::timeout(wait, exchange).await {
            decision
        } else {
            warn!(request_id = %id, "Approval request expired; denying");
            ApprovalDecision::Deny
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tollgate_core::{AutonomyMode, RiskClassification, RiskLevel};

    use super::*;

    fn request(ttl: Duration) -> ApprovalRequest {
        ApprovalRequest::with_ttl(
            "shell_exec",
            &RiskClassification::new(RiskLevel::Exfil, "egress", "curl"),
            AutonomyMode::Safe,
            ttl,
        )
    }

    #[tokio::test]
    async fn test_response_is_delivered() {
        let (broker, mut inbound) = ApprovalBroker::new(4);
        let frontend = {
            let broker = broker.clone();
            tokio::spawn(async move {
                let req = inbound.recv().await.unwrap();
                assert_eq!(broker.pending(), vec![req.id]);
                broker.respond(req.id, ApprovalDecision::Task).unwrap();
            })
        };

        let decision = broker
            .request_decision(request(Duration::from_secs(5)))
            .await;
        assert_eq!(decision, ApprovalDecision::Task);
        frontend.await.unwrap();
        assert!(broker.pending().is_empty());
    }

    #[tokio::test]
    async fn test_expired_request_denies() {
        let (broker, _inbound) = ApprovalBroker::new(4);
        let decision = broker
            .request_decision(request(Duration::from_millis(50)))
            .await;
        assert_eq!(decision, ApprovalDecision::Deny);
        assert!(broker.pending().is_empty());
    }

    #[tokio::test]
    async fn test_late_response_is_rejected() {
        let (broker, mut inbound) = ApprovalBroker::new(4);
        let decision = broker
            .request_decision(request(Duration::from_millis(20)))
            .await;
        assert_eq!(decision, ApprovalDecision::Deny);

        let stale = inbound.recv().await.unwrap();
        let err = broker
            .respond(stale.id, ApprovalDecision::Approve)
            .unwrap_err();
        assert!(matches!(err, ApprovalError::UnknownRequest(_)));
    }

    #[tokio::test]
    async fn test_dropped_frontend_denies() {
        let (broker, inbound) = ApprovalBroker::new(4);
        drop(inbound);
        let decision = broker
            .request_decision(request(Duration::from_secs(5)))
            .await;
        assert_eq!(decision, ApprovalDecision::Deny);
    }

    #[tokio::test]
    async fn test_cancel_denies() {
        let (broker, mut inbound) = ApprovalBroker::new(4);
        let canceller = {
            let broker = broker.clone();
            tokio::spawn(async move {
                let req = inbound.recv().await.unwrap();
                assert!(broker.cancel(req.id));
                assert!(!broker.cancel(req.id));
            })
        };
        let decision = broker
            .request_decision(request(Duration::from_secs(5)))
            .await;
        assert_eq!(decision, ApprovalDecision::Deny);
        canceller.await.unwrap();
    }

    #[test]
    fn test_unknown_request() {
        let (broker, _inbound) = ApprovalBroker::new(1);
        let err = broker
            .respond(RequestId::new(), ApprovalDecision::Approve)
            .unwrap_err();
        assert!(matches!(err, ApprovalError::UnknownRequest(_)));
    }
}
