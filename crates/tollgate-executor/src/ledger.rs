//! Persistence of plans and action status.
//!
//! The executor only talks to the [`ActionLedger`] trait. Two implementations
//! ship with the crate:
//!
//! - [`MemoryLedger`]: for tests and throwaway sessions
//! - [`KvLedger`]: records stored as JSON in a [`ScopedKvStore`]; durable
//!   when the store is a [`FileKvStore`](tollgate_storage::FileKvStore)
//!
//! Every mutating call is durable by the time it returns.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tollgate_core::{ActionId, PlanId};
use tollgate_storage::{ScopedKvStore, StorageError, StorageResult};

use crate::payload::ActionPayload;
use crate::plan::{ActionItem, ActionPlan, ActionUpdate, PlanStatus};

/// Storage of plans and their actions.
#[async_trait]
pub trait ActionLedger: Send + Sync {
    /// Create a draft plan.
    async fn create_plan(&self, description: &str) -> StorageResult<ActionPlan>;

    /// Append a pending action to a plan.
    ///
    /// Fails with [`StorageError::NotFound`] for an unknown plan and
    /// [`StorageError::Conflict`] if `sequence_order` is already taken.
    async fn add_action(
        &self,
        plan_id: PlanId,
        payload: ActionPayload,
        sequence_order: u32,
    ) -> StorageResult<ActionItem>;

    /// Actions of a plan in ascending sequence order.
    async fn get_actions(&self, plan_id: PlanId) -> StorageResult<Vec<ActionItem>>;

    /// Apply a status update to an action, returning the updated item.
    async fn update_action_status(
        &self,
        action_id: ActionId,
        update: ActionUpdate,
    ) -> StorageResult<ActionItem>;

    /// Set a plan's status, returning the updated plan.
    async fn update_plan_status(
        &self,
        plan_id: PlanId,
        status: PlanStatus,
    ) -> StorageResult<ActionPlan>;

    /// Look up a plan.
    async fn get_plan(&self, plan_id: PlanId) -> StorageResult<Option<ActionPlan>>;

    /// Every plan, oldest first.
    async fn list_plans(&self) -> StorageResult<Vec<ActionPlan>>;
}

/// A plan with its actions, kept sorted by sequence order.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlanRecord {
    plan: ActionPlan,
    actions: Vec<ActionItem>,
}

impl PlanRecord {
    fn new(plan: ActionPlan) -> Self {
        Self {
            plan,
            actions: Vec::new(),
        }
    }

    fn add(&mut self, payload: ActionPayload, sequence_order: u32) -> StorageResult<ActionItem> {
        if self
            .actions
            .iter()
            .any(|a| a.sequence_order == sequence_order)
        {
            return Err(StorageError::Conflict(format!(
                "{} already has an action at sequence {sequence_order}",
                self.plan.id
            )));
        }
        let item = ActionItem::new(self.plan.id, sequence_order, payload);
        let pos = self
            .actions
            .partition_point(|a| a.sequence_order < sequence_order);
        self.actions.insert(pos, item.clone());
        Ok(item)
    }

    fn update(&mut self, action_id: ActionId, update: &ActionUpdate) -> StorageResult<ActionItem> {
        let item = self
            .actions
            .iter_mut()
            .find(|a| a.id == action_id)
            .ok_or_else(|| StorageError::NotFound(action_id.to_string()))?;
        update.apply(item);
        Ok(item.clone())
    }
}

fn plan_not_found(plan_id: PlanId) -> StorageError {
    StorageError::NotFound(plan_id.to_string())
}

/// In-memory ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    plans: HashMap<PlanId, PlanRecord>,
    action_index: HashMap<ActionId, PlanId>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActionLedger for MemoryLedger {
    async fn create_plan(&self, description: &str) -> StorageResult<ActionPlan> {
        let plan = ActionPlan::new(description);
        self.inner
            .lock()
            .await
            .plans
            .insert(plan.id, PlanRecord::new(plan.clone()));
        Ok(plan)
    }

    async fn add_action(
        &self,
        plan_id: PlanId,
        payload: ActionPayload,
        sequence_order: u32,
    ) -> StorageResult<ActionItem> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| plan_not_found(plan_id))?;
        let item = record.add(payload, sequence_order)?;
        inner.action_index.insert(item.id, plan_id);
        Ok(item)
    }

    async fn get_actions(&self, plan_id: PlanId) -> StorageResult<Vec<ActionItem>> {
        let inner = self.inner.lock().await;
        inner
            .plans
            .get(&plan_id)
            .map(|r| r.actions.clone())
            .ok_or_else(|| plan_not_found(plan_id))
    }

    async fn update_action_status(
        &self,
        action_id: ActionId,
        update: ActionUpdate,
    ) -> StorageResult<ActionItem> {
        let mut inner = self.inner.lock().await;
        let plan_id = *inner
            .action_index
            .get(&action_id)
            .ok_or_else(|| StorageError::NotFound(action_id.to_string()))?;
        inner
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| plan_not_found(plan_id))?
            .update(action_id, &update)
    }

    async fn update_plan_status(
        &self,
        plan_id: PlanId,
        status: PlanStatus,
    ) -> StorageResult<ActionPlan> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| plan_not_found(plan_id))?;
        record.plan.status = status;
        Ok(record.plan.clone())
    }

    async fn get_plan(&self, plan_id: PlanId) -> StorageResult<Option<ActionPlan>> {
        Ok(self
            .inner
            .lock()
            .await
            .plans
            .get(&plan_id)
            .map(|r| r.plan.clone()))
    }

    async fn list_plans(&self) -> StorageResult<Vec<ActionPlan>> {
        let inner = self.inner.lock().await;
        let mut plans: Vec<ActionPlan> = inner.plans.values().map(|r| r.plan.clone()).collect();
        plans.sort_by_key(|p| p.created_at);
        Ok(plans)
    }
}

/// Ledger stored in a namespaced key-value store.
///
/// Layout: `plan:<uuid>` holds the plan with all its actions;
/// `action:<uuid>` holds the id of the owning plan.
pub struct KvLedger {
    store: ScopedKvStore,
    // Serializes read-modify-write cycles on plan records.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for KvLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvLedger")
            .field("namespace", &self.store.namespace())
            .finish_non_exhaustive()
    }
}

impl KvLedger {
    /// Ledger over `store`.
    #[must_use]
    pub fn new(store: ScopedKvStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self, plan_id: PlanId) -> StorageResult<Option<PlanRecord>> {
        self.store.get_json(&plan_id.to_string()).await
    }

    async fn load_existing(&self, plan_id: PlanId) -> StorageResult<PlanRecord> {
        self.load(plan_id)
            .await?
            .ok_or_else(|| plan_not_found(plan_id))
    }

    async fn save(&self, record: &PlanRecord) -> StorageResult<()> {
        self.store.set_json(&record.plan.id.to_string(), record).await
    }
}

#[async_trait]
impl ActionLedger for KvLedger {
    async fn create_plan(&self, description: &str) -> StorageResult<ActionPlan> {
        let _w = self.write_lock.lock().await;
        let record = PlanRecord::new(ActionPlan::new(description));
        self.save(&record).await?;
        Ok(record.plan)
    }

    async fn add_action(
        &self,
        plan_id: PlanId,
        payload: ActionPayload,
        sequence_order: u32,
    ) -> StorageResult<ActionItem> {
        let _w = self.write_lock.lock().await;
        let mut record = self.load_existing(plan_id).await?;
        let item = record.add(payload, sequence_order)?;
        // The index entry is written before the record that references it.
        self.store
            .set_json(&item.id.to_string(), &plan_id)
            .await?;
        self.save(&record).await?;
        Ok(item)
    }

    async fn get_actions(&self, plan_id: PlanId) -> StorageResult<Vec<ActionItem>> {
        Ok(self.load_existing(plan_id).await?.actions)
    }

    async fn update_action_status(
        &self,
        action_id: ActionId,
        update: ActionUpdate,
    ) -> StorageResult<ActionItem> {
        let _w = self.write_lock.lock().await;
        let plan_id: PlanId = self
            .store
            .get_json(&action_id.to_string())
            .await?
            .ok_or_else(|| StorageError::NotFound(action_id.to_string()))?;
        let mut record = self.load_existing(plan_id).await?;
        let item = record.update(action_id, &update)?;
        self.save(&record).await?;
        Ok(item)
    }

    async fn update_plan_status(
        &self,
        plan_id: PlanId,
        status: PlanStatus,
    ) -> StorageResult<ActionPlan> {
        let _w = self.write_lock.lock().await;
        let mut record = self.load_existing(plan_id).await?;
        record.plan.status = status;
        self.save(&record).await?;
        Ok(record.plan)
    }

    async fn get_plan(&self, plan_id: PlanId) -> StorageResult<Option<ActionPlan>> {
        Ok(self.load(plan_id).await?.map(|r| r.plan))
    }

    async fn list_plans(&self) -> StorageResult<Vec<ActionPlan>> {
        let mut plans = Vec::new();
        for key in self.store.list_keys().await? {
            if !key.starts_with("plan:") {
                continue;
            }
            if let Some(record) = self.store.get_json::<PlanRecord>(&key).await? {
                plans.push(record.plan);
            }
        }
        plans.sort_by_key(|p| p.created_at);
        Ok(plans)
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
