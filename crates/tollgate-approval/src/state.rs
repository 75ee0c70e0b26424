//! Cached approval overrides.
//!
//! Two maps live here:
//!
//! - **Task overrides**: conversation id to the set of risk levels the user
//!   approved with TASK. In memory only; gone on restart.
//! - **Global overrides**: risk level to `true` once the user answered ALWAYS.
//!   Persisted under the `autonomyOverrides` settings key and reloaded at
//!   start-up.
//!
//! The global map sits behind an async mutex that stays held while the new
//! map is written, so two concurrent ALWAYS decisions cannot drop each other.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tokio::sync::Mutex;
use tollgate_core::RiskLevel;
use tollgate_storage::{ScopedKvStore, StorageError};
use tracing::{debug, warn};

use crate::error::ApprovalResult;

/// Settings key holding the persisted global overrides.
pub const OVERRIDES_KEY: &str = "autonomyOverrides";

type GlobalOverrides = HashMap<RiskLevel, bool>;

/// Task-scoped and global approval overrides.
pub struct AuthorizationState {
    task: RwLock<HashMap<String, HashSet<RiskLevel>>>,
    global: Mutex<GlobalOverrides>,
    store: Option<ScopedKvStore>,
}

impl std::fmt::Debug for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationState")
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for AuthorizationState {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl AuthorizationState {
    /// State whose global overrides are never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            task: RwLock::new(HashMap::new()),
            global: Mutex::new(HashMap::new()),
            store: None,
        }
    }

    /// Load global overrides from the settings store.
    ///
    /// A malformed stored value is logged and treated as "no overrides".
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Storage`](crate::ApprovalError::Storage) if
    /// the store cannot be read.
    pub async fn load(store: ScopedKvStore) -> ApprovalResult<Self> {
        let global = match store.get_json::<GlobalOverrides>(OVERRIDES_KEY).await {
            Ok(map) => map.unwrap_or_default(),
            Err(StorageError::Serialization(e)) => {
                warn!(error = %e, "Ignoring malformed autonomy overrides");
                GlobalOverrides::new()
            },
            Err(e) => return Err(e.into()),
        };
        debug!(
            overrides = global.values().filter(|v| **v).count(),
            "Loaded global approval overrides"
        );
        Ok(Self {
            task: RwLock::new(HashMap::new()),
            global: Mutex::new(global),
            store: Some(store),
        })
    }

    /// Whether the conversation has a TASK approval for `risk`.
    #[must_use]
    pub fn has_task(&self, conversation_id: &str, risk: RiskLevel) -> bool {
        let task = self.task.read().unwrap_or_else(|e| {
            warn!("Task override read lock poisoned, recovering");
            e.into_inner()
        });
        task.get(conversation_id)
            .is_some_and(|levels| levels.contains(&risk))
    }

    /// Record a TASK approval for `risk` in the conversation.
    pub fn add_task(&self, conversation_id: &str, risk: RiskLevel) {
        let mut task = self.task.write().unwrap_or_else(|e| {
            warn!("Task override lock poisoned, recovering");
            e.into_inner()
        });
        task.entry(conversation_id.to_string())
            .or_default()
            .insert(risk);
    }

    /// Drop every TASK approval of the conversation.
    ///
    /// Returns `true` if the conversation had any.
    pub fn clear_task(&self, conversation_id: &str) -> bool {
        let mut task = self.task.write().unwrap_or_else(|e| {
            warn!("Task override lock poisoned, recovering");
            e.into_inner()
        });
        task.remove(conversation_id).is_some()
    }

    /// Risk levels approved for the conversation, in canonical order.
    #[must_use]
    pub fn task_levels(&self, conversation_id: &str) -> Vec<RiskLevel> {
        let task = self.task.read().unwrap_or_else(|e| {
            warn!("Task override read lock poisoned, recovering");
            e.into_inner()
        });
        task.get(conversation_id)
            .map(|levels| {
                RiskLevel::ALL
                    .into_iter()
                    .filter(|r| levels.contains(r))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `risk` has a global ALWAYS override.
    pub async fn is_global(&self, risk: RiskLevel) -> bool {
        self.global.lock().await.get(&risk).copied().unwrap_or(false)
    }

    /// Globally approved risk levels, in canonical order.
    pub async fn global_levels(&self) -> Vec<RiskLevel> {
        let global = self.global.lock().await;
        RiskLevel::ALL
            .into_iter()
            .filter(|r| global.get(r).copied().unwrap_or(false))
            .collect()
    }

    /// Set the global override for `risk` and persist it.
    ///
    /// The in-memory map only changes once the write succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Storage`](crate::ApprovalError::Storage) if
    /// persisting fails.
    pub async fn set_global(&self, risk: RiskLevel) -> ApprovalResult<()> {
        self.update_global(|map| {
            map.insert(risk, true);
        })
        .await
    }

    /// Remove the global override for `risk`.
    ///
    /// Returns `true` if it was set.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Storage`](crate::ApprovalError::Storage) if
    /// persisting fails.
    pub async fn revoke_global(&self, risk: RiskLevel) -> ApprovalResult<bool> {
        let mut was_set = false;
        self.update_global(|map| {
            was_set = map.remove(&risk).unwrap_or(false);
        })
        .await?;
        Ok(was_set)
    }

    /// Remove every global override.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Storage`](crate::ApprovalError::Storage) if
    /// persisting fails.
    pub async fn reset_global(&self) -> ApprovalResult<()> {
        self.update_global(HashMap::clear).await
    }

    async fn update_global<F>(&self, apply: F) -> ApprovalResult<()>
    where
        F: FnOnce(&mut GlobalOverrides),
    {
        let mut global = self.global.lock().await;
        let mut next = global.clone();
        apply(&mut next);
        if let Some(store) = &self.store {
            store.set_json(OVERRIDES_KEY, &next).await?;
        }
        *global = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tollgate_storage::{KvStore, MemoryKvStore, StorageResult};

    use super::*;
    use crate::error::ApprovalError;

    fn scoped(store: Arc<dyn KvStore>) -> ScopedKvStore {
        ScopedKvStore::new(store, "settings").unwrap()
    }

    #[test]
    fn test_task_overrides_are_per_conversation() {
        let state = AuthorizationState::in_memory();
        state.add_task("conv-a", RiskLevel::Exfil);

        assert!(state.has_task("conv-a", RiskLevel::Exfil));
        assert!(!state.has_task("conv-a", RiskLevel::SensitiveDomain));
        assert!(!state.has_task("conv-b", RiskLevel::Exfil));
        assert_eq!(state.task_levels("conv-a"), vec![RiskLevel::Exfil]);

        assert!(state.clear_task("conv-a"));
        assert!(!state.clear_task("conv-a"));
        assert!(!state.has_task("conv-a", RiskLevel::Exfil));
    }

    #[tokio::test]
    async fn test_global_persisted_and_reloaded() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());

        let state = AuthorizationState::load(scoped(Arc::clone(&store)))
            .await
            .unwrap();
        assert!(!state.is_global(RiskLevel::Exfil).await);
        state.set_global(RiskLevel::Exfil).await.unwrap();
        assert!(state.is_global(RiskLevel::Exfil).await);

        let reloaded = AuthorizationState::load(scoped(store)).await.unwrap();
        assert!(reloaded.is_global(RiskLevel::Exfil).await);
        assert_eq!(reloaded.global_levels().await, vec![RiskLevel::Exfil]);
    }

    #[tokio::test]
    async fn test_stored_format() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let state = AuthorizationState::load(scoped(Arc::clone(&store)))
            .await
            .unwrap();
        state.set_global(RiskLevel::SensitiveDomain).await.unwrap();

        let raw: serde_json::Value = scoped(store).get_json(OVERRIDES_KEY).await.unwrap().unwrap();
        assert_eq!(raw, serde_json::json!({"SENSITIVE_DOMAIN": true}));
    }

    #[tokio::test]
    async fn test_revoke_and_reset() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let state = AuthorizationState::load(scoped(Arc::clone(&store)))
            .await
            .unwrap();
        state.set_global(RiskLevel::Exfil).await.unwrap();
        state.set_global(RiskLevel::Elevated).await.unwrap();

        assert!(state.revoke_global(RiskLevel::Exfil).await.unwrap());
        assert!(!state.revoke_global(RiskLevel::Exfil).await.unwrap());
        assert_eq!(state.global_levels().await, vec![RiskLevel::Elevated]);

        state.reset_global().await.unwrap();
        let reloaded = AuthorizationState::load(scoped(store)).await.unwrap();
        assert!(reloaded.global_levels().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_overrides_ignored() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        scoped(Arc::clone(&store))
            .set(OVERRIDES_KEY, b"[1,2,3]".to_vec())
            .await
            .unwrap();
        let state = AuthorizationState::load(scoped(store)).await.unwrap();
        assert!(state.global_levels().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_always_decisions_both_persist() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let state = Arc::new(
            AuthorizationState::load(scoped(Arc::clone(&store)))
                .await
                .unwrap(),
        );

        let a = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.set_global(RiskLevel::Exfil).await })
        };
        let b = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.set_global(RiskLevel::SensitiveDomain).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let reloaded = AuthorizationState::load(scoped(store)).await.unwrap();
        assert_eq!(
            reloaded.global_levels().await,
            vec![RiskLevel::Exfil, RiskLevel::SensitiveDomain]
        );
    }

    struct FailingStore;

    #[async_trait]
    impl KvStore for FailingStore {
        async fn get(&self, _: &str, _: &str) -> StorageResult<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn set(&self, _: &str, _: &str, _: Vec<u8>) -> StorageResult<()> {
            Err(StorageError::Internal("disk full".into()))
        }
        async fn delete(&self, _: &str, _: &str) -> StorageResult<bool> {
            Ok(false)
        }
        async fn exists(&self, _: &str, _: &str) -> StorageResult<bool> {
            Ok(false)
        }
        async fn list_keys(&self, _: &str) -> StorageResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn clear_namespace(&self, _: &str) -> StorageResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_map_unchanged() {
        let state = AuthorizationState::load(scoped(Arc::new(FailingStore)))
            .await
            .unwrap();
        let err = state.set_global(RiskLevel::Exfil).await.unwrap_err();
        assert!(matches!(err, ApprovalError::Storage(_)));
        assert!(!state.is_global(RiskLevel::Exfil).await);
    }
}
