//! Action plans and their items.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tollgate_core::{ActionId, ParseError, PlanId, Timestamp};

use crate::payload::ActionPayload;

/// Lifecycle of a plan.
///
/// `draft -> executing -> done | failed`; a fully rolled back plan returns to
/// `draft`, a partially rolled back one stays `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Not yet run, or fully rolled back.
    Draft,
    /// A forward pass is in progress (or crashed mid-way).
    Executing,
    /// Every action executed.
    Done,
    /// An action failed, or a rollback could not be completed.
    Failed,
}

impl PlanStatus {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Executing => "executing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "executing" => Ok(Self::Executing),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseError {
                kind: "plan status",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle of a single action.
///
/// `pending -> executed | failed`; `executed -> rolled_back`, or `failed`
/// when the rollback itself errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Not yet applied.
    Pending,
    /// Applied and durable.
    Executed,
    /// Applying (or rolling back) failed; see the error message.
    Failed,
    /// Reversed by an undo pass.
    RolledBack,
}

impl ActionStatus {
    /// Canonical snake-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of filesystem mutations applied and undone as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    /// Plan identifier.
    pub id: PlanId,
    /// What the plan is for.
    pub description: String,
    /// Current lifecycle state.
    pub status: PlanStatus,
    /// When the plan was created.
    pub created_at: Timestamp,
}

impl ActionPlan {
    /// New draft plan.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: PlanId::new(),
            description: description.into(),
            status: PlanStatus::Draft,
            created_at: Timestamp::now(),
        }
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    /// Action identifier.
    pub id: ActionId,
    /// Owning plan.
    pub plan_id: PlanId,
    /// Position in the plan; unique within it.
    pub sequence_order: u32,
    /// What the action does.
    pub payload: ActionPayload,
    /// Current lifecycle state.
    pub status: ActionStatus,
    /// Quarantined copy of content this action overwrote or removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// When the action was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<Timestamp>,
    /// Why the action (or its rollback) failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ActionItem {
    /// New pending action.
    #[must_use]
    pub fn new(plan_id: PlanId, sequence_order: u32, payload: ActionPayload) -> Self {
        Self {
            id: ActionId::new(),
            plan_id,
            sequence_order,
            payload,
            status: ActionStatus::Pending,
            backup_path: None,
            executed_at: None,
            error_message: None,
        }
    }

    /// The action type string.
    #[must_use]
    pub fn action_type(&self) -> &str {
        self.payload.action_type()
    }
}

/// A status change for an [`ActionItem`].
///
/// `None` fields leave the stored value unchanged. Moving to
/// [`ActionStatus::Executed`] additionally clears a previous error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionUpdate {
    /// New status.
    pub status: ActionStatus,
    /// When the action was applied.
    pub executed_at: Option<Timestamp>,
    /// Failure message.
    pub error_message: Option<String>,
    /// Quarantined backup of overwritten content.
    pub backup_path: Option<PathBuf>,
}

impl ActionUpdate {
    /// Change only the status.
    #[must_use]
    pub fn status(status: ActionStatus) -> Self {
        Self {
            status,
            executed_at: None,
            error_message: None,
            backup_path: None,
        }
    }

    /// Mark executed now, with an optional backup.
    #[must_use]
    pub fn executed(backup_path: Option<PathBuf>) -> Self {
        Self {
            status: ActionStatus::Executed,
            executed_at: Some(Timestamp::now()),
            error_message: None,
            backup_path,
        }
    }

    /// Mark failed with a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Failed,
            executed_at: None,
            error_message: Some(message.into()),
            backup_path: None,
        }
    }

    /// Record the backup taken before the action failed or ran.
    #[must_use]
    pub fn with_backup(mut self, backup_path: Option<PathBuf>) -> Self {
        self.backup_path = backup_path;
        self
    }

    /// Apply this update to `item`.
    pub fn apply(&self, item: &mut ActionItem) {
        item.status = self.status;
        if self.status == ActionStatus::Executed {
            item.error_message = None;
        }
        if let Some(at) = self.executed_at {
            item.executed_at = Some(at);
        }
        if let Some(message) = &self.error_message {
            item.error_message = Some(message.clone());
        }
        if let Some(path) = &self.backup_path {
            item.backup_path = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_plan_is_draft() {
        let plan = ActionPlan::new("tidy downloads");
        assert_eq!(plan.status, PlanStatus::Draft);
        assert_eq!(plan.description, "tidy downloads");
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ActionStatus::RolledBack).unwrap(),
            "\"rolled_back\""
        );
        assert_eq!(
            serde_json::to_string(&PlanStatus::Executing).unwrap(),
            "\"executing\""
        );
        assert_eq!("DONE".parse::<PlanStatus>().unwrap(), PlanStatus::Done);
        assert!("finished".parse::<PlanStatus>().is_err());
    }

    #[test]
    fn test_update_none_leaves_fields() {
        let mut item = ActionItem::new(PlanId::new(), 1, ActionPayload::delete("/tmp/x"));
        ActionUpdate::executed(Some(PathBuf::from("/q/x"))).apply(&mut item);
        let executed_at = item.executed_at;
        assert!(executed_at.is_some());

        ActionUpdate::status(ActionStatus::RolledBack).apply(&mut item);
        assert_eq!(item.status, ActionStatus::RolledBack);
        assert_eq!(item.backup_path, Some(PathBuf::from("/q/x")));
        assert_eq!(item.executed_at, executed_at);
    }

    #[test]
    fn test_executed_clears_previous_error() {
        let mut item = ActionItem::new(PlanId::new(), 1, ActionPayload::delete("/tmp/x"));
        ActionUpdate::failed("disk full").apply(&mut item);
        assert_eq!(item.error_message.as_deref(), Some("disk full"));

        ActionUpdate::executed(None).apply(&mut item);
        assert_eq!(item.status, ActionStatus::Executed);
        assert!(item.error_message.is_none());
    }

    #[test]
    fn test_item_serde() {
        let item = ActionItem::new(PlanId::new(), 3, ActionPayload::move_file("/a", "/b"));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["payload"]["type"], "fs_move");
        assert_eq!(json["status"], "pending");
        assert!(json.get("backup_path").is_none());

        let back: ActionItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
