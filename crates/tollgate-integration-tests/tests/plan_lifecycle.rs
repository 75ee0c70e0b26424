//! Forward and reverse passes over plans persisted in a file-backed ledger.

use std::sync::Arc;

use serde_json::json;
use tollgate_core::PlanId;
use tollgate_executor::{
    ActionExecutor, ActionLedger, ActionPayload, ActionStatus, ExecutorError, KvLedger,
    PlanStatus, QuarantineStore, ROLLBACK_FAILED_PREFIX,
};
use tollgate_storage::{LEDGER_NAMESPACE, ScopedKvStore, open_shared};
use tollgate_test::{TestWorkspace, init_test_logging};

struct Fixture {
    ws: TestWorkspace,
    executor: ActionExecutor,
}

impl Fixture {
    async fn new() -> Self {
        init_test_logging();
        let ws = TestWorkspace::new();
        let store = open_shared(ws.state_file()).await.unwrap();
        let ledger = KvLedger::new(ScopedKvStore::new(store, LEDGER_NAMESPACE).unwrap());
        let executor = ActionExecutor::new(
            Arc::new(ledger),
            QuarantineStore::new(ws.quarantine_dir()),
        );
        Self { ws, executor }
    }

    fn ledger(&self) -> &dyn ActionLedger {
        self.executor.ledger().as_ref()
    }

    async fn plan(&self, payloads: Vec<ActionPayload>) -> PlanId {
        let plan = self.ledger().create_plan("integration").await.unwrap();
        for (seq, payload) in (1_u32..).zip(payloads) {
            self.ledger().add_action(plan.id, payload, seq).await.unwrap();
        }
        plan.id
    }

    async fn statuses(&self, plan_id: PlanId) -> Vec<ActionStatus> {
        self.ledger()
            .get_actions(plan_id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.status)
            .collect()
    }

    async fn plan_status(&self, plan_id: PlanId) -> PlanStatus {
        self.ledger().get_plan(plan_id).await.unwrap().unwrap().status
    }
}

#[tokio::test]
async fn test_failure_mid_plan_then_undo_restores_everything() {
    let fx = Fixture::new().await;
    fx.ws.write("config.ini", "original");
    let plan_id = fx
        .plan(vec![
            ActionPayload::write(fx.ws.path("config.ini"), "rewritten"),
            ActionPayload::move_file(fx.ws.path("missing.txt"), fx.ws.path("dest.txt")),
            ActionPayload::write(fx.ws.path("never.txt"), "unreached"),
        ])
        .await;

    let err = fx.executor.execute_plan(plan_id).await.unwrap_err();
    assert!(matches!(err, ExecutorError::ActionFailed { sequence: 2, .. }));
    assert_eq!(fx.ws.read("config.ini").as_deref(), Some("rewritten"));
    assert!(!fx.ws.exists("never.txt"));
    assert_eq!(
        fx.statuses(plan_id).await,
        vec![
            ActionStatus::Executed,
            ActionStatus::Failed,
            ActionStatus::Pending
        ]
    );
    assert_eq!(fx.plan_status(plan_id).await, PlanStatus::Failed);

    let report = fx.executor.undo_plan(plan_id).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.status, PlanStatus::Draft);
    assert_eq!(fx.ws.read("config.ini").as_deref(), Some("original"));
    assert_eq!(fx.plan_status(plan_id).await, PlanStatus::Draft);
    assert_eq!(
        fx.statuses(plan_id).await,
        vec![
            ActionStatus::RolledBack,
            ActionStatus::Failed,
            ActionStatus::Pending
        ]
    );
}

#[tokio::test]
async fn test_write_new_file_then_undo_deletes_it() {
    let fx = Fixture::new().await;
    let plan_id = fx
        .plan(vec![ActionPayload::write(
            fx.ws.path("reports/summary.md"),
            "# Summary",
        )])
        .await;

    let report = fx.executor.execute_plan(plan_id).await.unwrap();
    assert_eq!(report.status, PlanStatus::Done);
    assert_eq!(fx.ws.read("reports/summary.md").as_deref(), Some("# Summary"));

    let actions = fx.ledger().get_actions(plan_id).await.unwrap();
    assert!(actions[0].backup_path.is_none());
    assert!(actions[0].executed_at.is_some());

    fx.executor.undo_plan(plan_id).await.unwrap();
    assert!(!fx.ws.exists("reports/summary.md"));
}

#[tokio::test]
async fn test_move_over_existing_file_then_undo_restores_both() {
    let fx = Fixture::new().await;
    fx.ws.write("draft.txt", "new version");
    fx.ws.write("final.txt", "old version");
    let plan_id = fx
        .plan(vec![ActionPayload::move_file(
            fx.ws.path("draft.txt"),
            fx.ws.path("final.txt"),
        )])
        .await;

    fx.executor.execute_plan(plan_id).await.unwrap();
    assert!(!fx.ws.exists("draft.txt"));
    assert_eq!(fx.ws.read("final.txt").as_deref(), Some("new version"));

    let report = fx.executor.undo_plan(plan_id).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(fx.ws.read("draft.txt").as_deref(), Some("new version"));
    assert_eq!(fx.ws.read("final.txt").as_deref(), Some("old version"));
}

#[tokio::test]
async fn test_delete_then_undo_restores_content() {
    let fx = Fixture::new().await;
    fx.ws.write("notes/todo.txt", "buy milk");
    let plan_id = fx
        .plan(vec![ActionPayload::delete(fx.ws.path("notes/todo.txt"))])
        .await;

    fx.executor.execute_plan(plan_id).await.unwrap();
    assert!(!fx.ws.exists("notes/todo.txt"));
    let backup = fx.ledger().get_actions(plan_id).await.unwrap()[0]
        .backup_path
        .clone()
        .unwrap();
    assert!(backup.starts_with(fx.ws.quarantine_dir()));

    fx.executor.undo_plan(plan_id).await.unwrap();
    assert_eq!(fx.ws.read("notes/todo.txt").as_deref(), Some("buy milk"));
}

#[tokio::test]
async fn test_decoded_payloads_run_like_constructed_ones() {
    let fx = Fixture::new().await;
    let payload = ActionPayload::decode(
        "fs_write",
        json!({
            "path": fx.ws.path_str("bin.dat"),
            "content": "aGVsbG8=",
            "encoding": "base64",
        }),
    )
    .unwrap();
    let plan_id = fx.plan(vec![payload]).await;

    fx.executor.execute_plan(plan_id).await.unwrap();
    assert_eq!(fx.ws.read("bin.dat").as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_lost_backup_is_reported_as_failed_rollback() {
    let fx = Fixture::new().await;
    fx.ws.write("a.txt", "keep me");
    let plan_id = fx
        .plan(vec![
            ActionPayload::delete(fx.ws.path("a.txt")),
            ActionPayload::write(fx.ws.path("b.txt"), "b"),
        ])
        .await;
    fx.executor.execute_plan(plan_id).await.unwrap();

    fx.executor.quarantine().purge_plan(plan_id).await.unwrap();

    let report = fx.executor.undo_plan(plan_id).await.unwrap();
    assert!(!report.is_complete());
    assert_eq!(report.rolled_back.len(), 1);
    assert_eq!(report.status, PlanStatus::Failed);
    assert!(!fx.ws.exists("b.txt"));

    let actions = fx.ledger().get_actions(plan_id).await.unwrap();
    assert_eq!(actions[0].status, ActionStatus::Failed);
    assert!(
        actions[0]
            .error_message
            .as_deref()
            .unwrap()
            .starts_with(ROLLBACK_FAILED_PREFIX)
    );
    assert_eq!(actions[1].status, ActionStatus::RolledBack);
}
