//! Forward and reverse execution of action plans.
//!
//! # Forward pass ([`ActionExecutor::execute_plan`])
//!
//! Actions run strictly in sequence order. Already `executed` actions are
//! skipped so a crashed pass can be resumed. Content about to be overwritten
//! or removed is quarantined first. The first failure marks the action and
//! the plan `failed` and stops the pass.
//!
//! # Reverse pass ([`ActionExecutor::undo_plan`])
//!
//! `executed` actions are reversed in exact reverse sequence order. A failed
//! reversal is recorded on its action and the pass continues. The plan ends
//! `draft` when everything was reversed, `failed` otherwise.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tollgate_core::{ActionId, PlanId};
use tracing::{debug, error, info, warn};

use crate::error::{ExecutorError, ExecutorResult, StepError};
use crate::ledger::ActionLedger;
use crate::payload::{ActionPayload, write_bytes};
use crate::plan::{ActionItem, ActionStatus, ActionUpdate, PlanStatus};
use crate::quarantine::{QuarantineStore, copy_durable};

/// Prefix of the error message recorded when reversing an action fails.
pub const ROLLBACK_FAILED_PREFIX: &str = "rollback failed: ";

/// Outcome of a successful forward pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// The plan that ran.
    pub plan_id: PlanId,
    /// Actions applied during this pass, in order.
    pub executed: Vec<ActionId>,
    /// Actions skipped because an earlier pass already applied them.
    pub skipped: Vec<ActionId>,
    /// Final plan status.
    pub status: PlanStatus,
}

/// Outcome of a reverse pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoReport {
    /// The plan that was undone.
    pub plan_id: PlanId,
    /// Actions reversed, in the order they were reversed.
    pub rolled_back: Vec<ActionId>,
    /// Actions whose reversal failed, with the recorded message.
    pub failed: Vec<(ActionId, String)>,
    /// Final plan status.
    pub status: PlanStatus,
}

impl UndoReport {
    /// Whether every executed action was reversed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A failed forward step and the backup taken before it.
struct ApplyError {
    source: StepError,
    backup: Option<PathBuf>,
}

impl From<StepError> for ApplyError {
    fn from(source: StepError) -> Self {
        Self {
            source,
            backup: None,
        }
    }
}

/// Releases a plan's in-flight claim on drop.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<PlanId>>,
    plan_id: PlanId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| {
            warn!("In-flight plan set lock poisoned, recovering");
            e.into_inner()
        });
        set.remove(&self.plan_id);
    }
}

/// Applies and reverses action plans recorded in an [`ActionLedger`].
pub struct ActionExecutor {
    ledger: Arc<dyn ActionLedger>,
    quarantine: QuarantineStore,
    in_flight: Mutex<HashSet<PlanId>>,
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("quarantine", &self.quarantine)
            .finish_non_exhaustive()
    }
}

impl ActionExecutor {
    /// Create an executor.
    #[must_use]
    pub fn new(ledger: Arc<dyn ActionLedger>, quarantine: QuarantineStore) -> Self {
        Self {
            ledger,
            quarantine,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// The ledger this executor records into.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn ActionLedger> {
        &self.ledger
    }

    /// The quarantine store holding backups.
    #[must_use]
    pub fn quarantine(&self) -> &QuarantineStore {
        &self.quarantine
    }

    fn claim(&self, plan_id: PlanId) -> ExecutorResult<InFlight<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| {
            warn!("In-flight plan set lock poisoned, recovering");
            e.into_inner()
        });
        if !set.insert(plan_id) {
            return Err(ExecutorError::PlanBusy(plan_id));
        }
        Ok(InFlight {
            set: &self.in_flight,
            plan_id,
        })
    }

    async fn require_plan(&self, plan_id: PlanId) -> ExecutorResult<()> {
        self.ledger
            .get_plan(plan_id)
            .await?
            .map(|_| ())
            .ok_or(ExecutorError::PlanNotFound(plan_id))
    }

    /// Run every not-yet-executed action of the plan in sequence order.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::PlanNotFound`] if the plan does not exist
    /// - [`ExecutorError::PlanBusy`] if another pass over the plan is running
    /// - [`ExecutorError::ActionFailed`] if an action failed; the action and
    ///   the plan are marked `failed` and later actions stay `pending`
    /// - [`ExecutorError::Ledger`] if status could not be recorded
    pub async fn execute_plan(&self, plan_id: PlanId) -> ExecutorResult<ExecutionReport> {
        let _claim = self.claim(plan_id)?;
        self.require_plan(plan_id).await?;

        let actions = self.ledger.get_actions(plan_id).await?;
        self.ledger
            .update_plan_status(plan_id, PlanStatus::Executing)
            .await?;
        info!(plan_id = %plan_id, actions = actions.len(), "Executing plan");

        let (executed, skipped) = match self.run_forward(plan_id, &actions).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // The plan never stays `executing` once the pass stops.
                if let Err(status_err) = self
                    .ledger
                    .update_plan_status(plan_id, PlanStatus::Failed)
                    .await
                {
                    error!(plan_id = %plan_id, error = %status_err, "Failed to mark plan failed");
                }
                return Err(e);
            },
        };

        self.ledger
            .update_plan_status(plan_id, PlanStatus::Done)
            .await?;
        info!(
            plan_id = %plan_id,
            executed = executed.len(),
            skipped = skipped.len(),
            "Plan done"
        );
        Ok(ExecutionReport {
            plan_id,
            executed,
            skipped,
            status: PlanStatus::Done,
        })
    }

    /// Apply pending actions in order, returning executed and skipped ids.
    async fn run_forward(
        &self,
        plan_id: PlanId,
        actions: &[ActionItem],
    ) -> ExecutorResult<(Vec<ActionId>, Vec<ActionId>)> {
        let mut executed = Vec::new();
        let mut skipped = Vec::new();

        for action in actions {
            if action.status == ActionStatus::Executed {
                debug!(action_id = %action.id, "Skipping already executed action");
                skipped.push(action.id);
                continue;
            }

            match self.apply(action).await {
                Ok(backup_path) => {
                    self.ledger
                        .update_action_status(action.id, ActionUpdate::executed(backup_path))
                        .await?;
                    debug!(
                        action_id = %action.id,
                        sequence = action.sequence_order,
                        action_type = action.action_type(),
                        "Action executed"
                    );
                    executed.push(action.id);
                },
                Err(ApplyError { source, backup }) => {
                    let message = source.to_string();
                    error!(
                        plan_id = %plan_id,
                        action_id = %action.id,
                        sequence = action.sequence_order,
                        error = %message,
                        backup = ?backup,
                        "Action failed; stopping plan"
                    );
                    let update = ActionUpdate::failed(message.clone()).with_backup(backup);
                    self.ledger.update_action_status(action.id, update).await?;
                    return Err(ExecutorError::ActionFailed {
                        action_id: action.id,
                        sequence: action.sequence_order,
                        message,
                    });
                },
            }
        }

        Ok((executed, skipped))
    }

    /// Reverse every executed action of the plan, last first.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::PlanNotFound`] if the plan does not exist
    /// - [`ExecutorError::PlanBusy`] if another pass over the plan is running
    /// - [`ExecutorError::Ledger`] if status could not be recorded
    ///
    /// Filesystem failures are not errors here; they are reported in the
    /// returned [`UndoReport`] and leave the plan `failed`.
    pub async fn undo_plan(&self, plan_id: PlanId) -> ExecutorResult<UndoReport> {
        let _claim = self.claim(plan_id)?;
        self.require_plan(plan_id).await?;

        let actions = self.ledger.get_actions(plan_id).await?;
        let to_reverse: Vec<&ActionItem> = actions
            .iter()
            .rev()
            .filter(|a| a.status == ActionStatus::Executed)
            .collect();
        info!(plan_id = %plan_id, actions = to_reverse.len(), "Undoing plan");

        let mut rolled_back = Vec::new();
        let mut failed = Vec::new();

        for action in to_reverse {
            match self.revert(action).await {
                Ok(()) => {
                    self.ledger
                        .update_action_status(
                            action.id,
                            ActionUpdate::status(ActionStatus::RolledBack),
                        )
                        .await?;
                    debug!(action_id = %action.id, "Action rolled back");
                    rolled_back.push(action.id);
                },
                Err(e) => {
                    let message = format!("{ROLLBACK_FAILED_PREFIX}{e}");
                    warn!(
                        plan_id = %plan_id,
                        action_id = %action.id,
                        error = %e,
                        "Rollback of action failed; continuing"
                    );
                    self.ledger
                        .update_action_status(action.id, ActionUpdate::failed(message.clone()))
                        .await?;
                    failed.push((action.id, message));
                },
            }
        }

        let status = if failed.is_empty() {
            PlanStatus::Draft
        } else {
            PlanStatus::Failed
        };
        self.ledger.update_plan_status(plan_id, status).await?;
        if failed.is_empty() {
            info!(plan_id = %plan_id, rolled_back = rolled_back.len(), "Plan rolled back");
        } else {
            error!(
                plan_id = %plan_id,
                failed = failed.len(),
                "Plan partially rolled back; operator intervention required"
            );
        }

        Ok(UndoReport {
            plan_id,
            rolled_back,
            failed,
            status,
        })
    }

    /// Apply one action, returning the backup path if content was displaced.
    async fn apply(&self, action: &ActionItem) -> Result<Option<PathBuf>, ApplyError> {
        match &action.payload {
            ActionPayload::FsWrite {
                path,
                content,
                encoding,
            } => {
                let bytes = write_bytes(content, *encoding).map_err(StepError::from)?;
                let backup = if exists(path).await? {
                    Some(self.backup(path, action).await?)
                } else {
                    None
                };
                let written = async {
                    create_parent(path).await?;
                    write_durable(path, &bytes).await
                }
                .await;
                self.settle(written, path, backup).await
            },
            ActionPayload::FsDelete { path } => {
                if !exists(path).await? {
                    debug!(path = %path.display(), "Delete target absent; nothing to do");
                    return Ok(None);
                }
                let backup = self.backup(path, action).await?;
                let removed = fs::remove_file(path)
                    .await
                    .map_err(|e| StepError::io("remove", path, e));
                self.settle(removed, path, Some(backup)).await
            },
            ActionPayload::FsMove { source, dest } => {
                if !exists(source).await? {
                    return Err(StepError::MissingSource(source.display().to_string()).into());
                }
                if source == dest {
                    return Ok(None);
                }
                let backup = if exists(dest).await? {
                    Some(self.backup(dest, action).await?)
                } else {
                    None
                };
                let moved = async {
                    if backup.is_some() {
                        fs::remove_file(dest)
                            .await
                            .map_err(|e| StepError::io("remove", dest, e))?;
                    }
                    create_parent(dest).await?;
                    move_file(source, dest).await
                }
                .await;
                self.settle(moved, dest, backup).await
            },
            ActionPayload::DbInsert(_) | ActionPayload::Reserved { .. } => {
                debug!(
                    action_type = action.action_type(),
                    "No filesystem effect for action type"
                );
                Ok(None)
            },
        }
    }

    /// Finish a step that ran after `target` was backed up.
    ///
    /// On failure the backup is copied back over `target` and still returned,
    /// so the failed action keeps pointing at it.
    async fn settle(
        &self,
        result: Result<(), StepError>,
        target: &Path,
        backup: Option<PathBuf>,
    ) -> Result<Option<PathBuf>, ApplyError> {
        let Err(source) = result else {
            return Ok(backup);
        };
        if let Some(backup) = &backup {
            match self.quarantine.restore_file(backup, target).await {
                Ok(()) => debug!(path = %target.display(), "Restored backup after failed step"),
                Err(e) => warn!(
                    path = %target.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Could not restore backup after failed step"
                ),
            }
        }
        Err(ApplyError { source, backup })
    }

    /// Reverse one executed action.
    async fn revert(&self, action: &ActionItem) -> Result<(), StepError> {
        let backup = action.backup_path.as_deref();
        match &action.payload {
            ActionPayload::FsWrite { path, .. } => match backup {
                Some(backup) => Ok(self.quarantine.restore_file(backup, path).await?),
                None => match fs::remove_file(path).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(StepError::io("remove", path, e)),
                },
            },
            ActionPayload::FsDelete { path } => match backup {
                Some(backup) => Ok(self.quarantine.restore_file(backup, path).await?),
                None => Ok(()),
            },
            ActionPayload::FsMove { source, dest } => {
                if source == dest {
                    return Ok(());
                }
                if exists(dest).await? {
                    create_parent(source).await?;
                    move_file(dest, source).await?;
                }
                if let Some(backup) = backup {
                    self.quarantine.restore_file(backup, dest).await?;
                }
                Ok(())
            },
            ActionPayload::DbInsert(_) | ActionPayload::Reserved { .. } => Ok(()),
        }
    }

    async fn backup(&self, path: &Path, action: &ActionItem) -> Result<PathBuf, StepError> {
        Ok(self
            .quarantine
            .quarantine_file(path, action.plan_id, action.id)
            .await?)
    }
}

async fn exists(path: &Path) -> Result<bool, StepError> {
    fs::try_exists(path)
        .await
        .map_err(|e| StepError::io("stat", path, e))
}

async fn create_parent(path: &Path) -> Result<(), StepError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StepError::io("create directory", parent, e))?;
    }
    Ok(())
}

async fn write_durable(path: &Path, bytes: &[u8]) -> Result<(), StepError> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| StepError::io("create", path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StepError::io("write", path, e))?;
    file.sync_all()
        .await
        .map_err(|e| StepError::io("sync", path, e))
}

/// Rename, falling back to copy-then-remove across filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<(), StepError> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), to = %to.display(), "Cross-device move; copying");
            copy_durable(from, to).await?;
            fs::remove_file(from)
                .await
                .map_err(|e| StepError::io("remove", from, e))
        },
        Err(e) => Err(StepError::io("rename", from, e)),
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
