//! Interactive decision prompt for `tollgate authorize`.
//!
//! Requests are rendered on stderr so that `--format json` output on stdout
//! stays machine-readable.

use async_trait::async_trait;
use dialoguer::{Select, theme::ColorfulTheme};
use tollgate_core::{ApprovalDecision, ApprovalRequest, DecisionSource};
use tracing::warn;

use crate::theme::Theme;

/// Menu entries, index-aligned with [`DECISIONS`].
const OPTIONS: [&str; 4] = [
    "Approve (once)",
    "Approve (this conversation)",
    "Approve (always)",
    "Deny",
];

const DECISIONS: [ApprovalDecision; 4] = [
    ApprovalDecision::Approve,
    ApprovalDecision::Task,
    ApprovalDecision::Always,
    ApprovalDecision::Deny,
];

/// Asks the operator at the terminal.
///
/// Escape, a closed terminal or an expired request all count as DENY.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TerminalPrompt;

#[async_trait]
impl DecisionSource for TerminalPrompt {
    async fn request_decision(&self, request: ApprovalRequest) -> ApprovalDecision {
        eprintln!();
        eprintln!("{}", render_request(&request));

        let remaining = request.expires_at.remaining();
        let pick = tokio::task::spawn_blocking(|| {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Allow this action?")
                .items(&OPTIONS)
                .default(0)
                .interact_opt()
        });

        match tokio::time::timeout(remaining, pick).await {
            Ok(Ok(Ok(Some(index)))) => decision_at(index),
            Ok(Ok(Ok(None))) => ApprovalDecision::Deny,
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Approval prompt failed");
                ApprovalDecision::Deny
            },
            Ok(Err(e)) => {
                warn!(error = %e, "Approval prompt task failed");
                ApprovalDecision::Deny
            },
            Err(_) => {
                eprintln!("{}", Theme::warning("Approval request expired"));
                ApprovalDecision::Deny
            },
        }
    }
}

fn decision_at(index: usize) -> ApprovalDecision {
    DECISIONS
        .get(index)
        .copied()
        .unwrap_or(ApprovalDecision::Deny)
}

fn render_request(request: &ApprovalRequest) -> String {
    let content = [
        Theme::kv("Tool", &request.tool),
        Theme::kv("Risk", &Theme::risk_level(request.risk)),
        Theme::kv("Reason", &request.reason),
        Theme::kv("Detail", &request.detail),
        Theme::kv("Mode", &Theme::mode(request.autonomy_mode)),
        Theme::kv("Expires", &Theme::timestamp(&request.expires_at)),
    ]
    .join("\n");
    Theme::approval_box("Approval required", &content, request.risk)
}
