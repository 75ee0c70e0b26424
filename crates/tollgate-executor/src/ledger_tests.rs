use std::path::PathBuf;
use std::sync::Arc;

use tollgate_storage::{KvStore, MemoryKvStore};

use super::*;
use crate::plan::ActionStatus;

fn kv_ledger(store: &Arc<dyn KvStore>) -> KvLedger {
    KvLedger::new(ScopedKvStore::new(Arc::clone(store), "ledger").unwrap())
}

fn ledgers() -> Vec<(&'static str, Box<dyn ActionLedger>)> {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    vec![
        ("memory", Box::new(MemoryLedger::new())),
        ("kv", Box::new(kv_ledger(&store))),
    ]
}

#[tokio::test]
async fn test_create_and_get_plan() {
    for (name, ledger) in ledgers() {
        let plan = ledger.create_plan("clean up").await.unwrap();
        let fetched = ledger.get_plan(plan.id).await.unwrap().unwrap();
        assert_eq!(fetched, plan, "{name}");
        assert_eq!(fetched.status, PlanStatus::Draft, "{name}");
        assert!(ledger.get_plan(PlanId::new()).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_actions_sorted_by_sequence() {
    for (name, ledger) in ledgers() {
        let plan = ledger.create_plan("p").await.unwrap();
        for seq in [3, 1, 2] {
            ledger
                .add_action(plan.id, ActionPayload::delete(format!("/tmp/{seq}")), seq)
                .await
                .unwrap();
        }
        let orders: Vec<u32> = ledger
            .get_actions(plan.id)
            .await
            .unwrap()
            .iter()
            .map(|a| a.sequence_order)
            .collect();
        assert_eq!(orders, vec![1, 2, 3], "{name}");
    }
}

#[tokio::test]
async fn test_duplicate_sequence_rejected() {
    for (name, ledger) in ledgers() {
        let plan = ledger.create_plan("p").await.unwrap();
        ledger
            .add_action(plan.id, ActionPayload::delete("/a"), 1)
            .await
            .unwrap();
        let err = ledger
            .add_action(plan.id, ActionPayload::delete("/b"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)), "{name}");
        assert_eq!(ledger.get_actions(plan.id).await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_unknown_plan_rejected() {
    for (name, ledger) in ledgers() {
        let err = ledger
            .add_action(PlanId::new(), ActionPayload::delete("/a"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)), "{name}");
        assert!(ledger.get_actions(PlanId::new()).await.is_err());
    }
}

#[tokio::test]
async fn test_update_action_status() {
    for (name, ledger) in ledgers() {
        let plan = ledger.create_plan("p").await.unwrap();
        let item = ledger
            .add_action(plan.id, ActionPayload::delete("/a"), 1)
            .await
            .unwrap();

        let updated = ledger
            .update_action_status(item.id, ActionUpdate::executed(Some(PathBuf::from("/q/a"))))
            .await
            .unwrap();
        assert_eq!(updated.status, ActionStatus::Executed, "{name}");

        let stored = &ledger.get_actions(plan.id).await.unwrap()[0];
        assert_eq!(stored.backup_path, Some(PathBuf::from("/q/a")), "{name}");
        assert!(stored.executed_at.is_some(), "{name}");

        let err = ledger
            .update_action_status(ActionId::new(), ActionUpdate::failed("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)), "{name}");
    }
}

#[tokio::test]
async fn test_update_plan_status_and_list() {
    for (name, ledger) in ledgers() {
        let first = ledger.create_plan("first").await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ledger.create_plan("second").await.unwrap();
        ledger
            .update_plan_status(second.id, PlanStatus::Done)
            .await
            .unwrap();

        let plans = ledger.list_plans().await.unwrap();
        assert_eq!(plans.len(), 2, "{name}");
        assert_eq!(plans[0].id, first.id, "{name}");
        assert_eq!(plans[1].status, PlanStatus::Done, "{name}");
    }
}

#[tokio::test]
async fn test_kv_ledger_survives_new_instance() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let plan_id = {
        let ledger = kv_ledger(&store);
        let plan = ledger.create_plan("persist me").await.unwrap();
        ledger
            .add_action(plan.id, ActionPayload::write("/a", "x"), 1)
            .await
            .unwrap();
        plan.id
    };

    let ledger = kv_ledger(&store);
    let actions = ledger.get_actions(plan_id).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].payload, ActionPayload::write("/a", "x"));
}
