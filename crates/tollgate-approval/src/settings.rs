//! The persisted autonomy mode.

use std::sync::RwLock;

use tollgate_core::AutonomyMode;
use tollgate_storage::{ScopedKvStore, StorageError};
use tracing::{info, warn};

use crate::error::ApprovalResult;

/// Settings key holding the autonomy mode.
pub const MODE_KEY: &str = "autonomyMode";

/// Current autonomy mode, optionally backed by the settings store.
pub struct AutonomySettings {
    mode: RwLock<AutonomyMode>,
    store: Option<ScopedKvStore>,
}

impl std::fmt::Debug for AutonomySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutonomySettings")
            .field("mode", &self.mode())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl AutonomySettings {
    /// Fixed mode that is never persisted.
    #[must_use]
    pub fn fixed(mode: AutonomyMode) -> Self {
        Self {
            mode: RwLock::new(mode),
            store: None,
        }
    }

    /// Load the mode from the settings store, falling back to `default` when
    /// nothing (or something unreadable) is stored.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Storage`](crate::ApprovalError::Storage) if
    /// the store cannot be read.
    pub async fn load(store: ScopedKvStore, default: AutonomyMode) -> ApprovalResult<Self> {
        let mode = match store.get_json::<AutonomyMode>(MODE_KEY).await {
            Ok(stored) => stored.unwrap_or(default),
            Err(StorageError::Serialization(e)) => {
                warn!(error = %e, fallback = %default, "Ignoring malformed autonomy mode");
                default
            },
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            mode: RwLock::new(mode),
            store: Some(store),
        })
    }

    /// The mode in effect.
    #[must_use]
    pub fn mode(&self) -> AutonomyMode {
        *self.mode.read().unwrap_or_else(|e| {
            warn!("Autonomy mode lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Change and persist the mode.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::Storage`](crate::ApprovalError::Storage) if
    /// persisting fails; the mode is left unchanged.
    pub async fn set_mode(&self, mode: AutonomyMode) -> ApprovalResult<()> {
        if let Some(store) = &self.store {
            store.set_json(MODE_KEY, &mode).await?;
        }
        let previous = {
            let mut guard = self.mode.write().unwrap_or_else(|e| {
                warn!("Autonomy mode lock poisoned, recovering");
                e.into_inner()
            });
            std::mem::replace(&mut *guard, mode)
        };
        info!(target: "tollgate::audit", from = %previous, to = %mode, "Autonomy mode changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tollgate_storage::{KvStore, MemoryKvStore};

    use super::*;

    fn scoped(store: &Arc<dyn KvStore>) -> ScopedKvStore {
        ScopedKvStore::new(Arc::clone(store), "settings").unwrap()
    }

    #[tokio::test]
    async fn test_default_when_unset() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let settings = AutonomySettings::load(scoped(&store), AutonomyMode::Guided)
            .await
            .unwrap();
        assert_eq!(settings.mode(), AutonomyMode::Guided);
    }

    #[tokio::test]
    async fn test_set_mode_persists() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let settings = AutonomySettings::load(scoped(&store), AutonomyMode::Guided)
            .await
            .unwrap();
        settings.set_mode(AutonomyMode::Safe).await.unwrap();
        assert_eq!(settings.mode(), AutonomyMode::Safe);

        let raw = scoped(&store).get(MODE_KEY).await.unwrap().unwrap();
        assert_eq!(raw, b"\"safe\"".to_vec());

        let reloaded = AutonomySettings::load(scoped(&store), AutonomyMode::Unrestricted)
            .await
            .unwrap();
        assert_eq!(reloaded.mode(), AutonomyMode::Safe);
    }

    #[tokio::test]
    async fn test_malformed_mode_falls_back() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        scoped(&store)
            .set(MODE_KEY, b"\"yolo\"".to_vec())
            .await
            .unwrap();
        let settings = AutonomySettings::load(scoped(&store), AutonomyMode::Safe)
            .await
            .unwrap();
        assert_eq!(settings.mode(), AutonomyMode::Safe);
    }

    #[tokio::test]
    async fn test_fixed_mode_changes_in_memory() {
        let settings = AutonomySettings::fixed(AutonomyMode::Unrestricted);
        settings.set_mode(AutonomyMode::Guided).await.unwrap();
        assert_eq!(settings.mode(), AutonomyMode::Guided);
    }
}
