//! Runtime handles opened from the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tollgate_approval::{ApprovalGate, RiskClassifier};
use tollgate_config::ResolvedConfig;
use tollgate_executor::{ActionExecutor, KvLedger, QuarantineStore};
use tollgate_storage::{KvStore, LEDGER_NAMESPACE, ScopedKvStore, open_shared};
use tracing::debug;

use crate::config_bridge::{self, StoragePaths};

/// Everything a command needs, built once per invocation.
///
/// The state document is locked for the lifetime of the process, so the
/// gate and the ledger share one store handle.
pub(crate) struct CliContext {
    resolved: ResolvedConfig,
    paths: StoragePaths,
    store: Arc<dyn KvStore>,
}

impl CliContext {
    /// Open the state document named by the configuration.
    pub(crate) async fn open(
        resolved: ResolvedConfig,
        state_dir_override: Option<PathBuf>,
    ) -> Result<Self> {
        let paths = config_bridge::to_storage_paths(&resolved, state_dir_override);
        let store = open_shared(paths.state_file.clone()).await.with_context(|| {
            format!("failed to open state file {}", paths.state_file.display())
        })?;
        debug!(
            state_file = %paths.state_file.display(),
            quarantine = %paths.quarantine_dir.display(),
            "Opened state"
        );
        Ok(Self {
            resolved,
            paths,
            store,
        })
    }

    /// Approval gate over the persisted settings.
    pub(crate) async fn gate(&self) -> Result<ApprovalGate> {
        let config = &self.resolved.config;
        let gate = ApprovalGate::open(
            Arc::clone(&self.store),
            config_bridge::to_autonomy_mode(config)?,
            classifier(&self.resolved)?,
        )
        .await
        .context("failed to load autonomy settings")?;
        Ok(gate.with_request_ttl(config_bridge::to_request_ttl(config)))
    }

    /// Plan executor over the persisted ledger.
    pub(crate) fn executor(&self) -> Result<ActionExecutor> {
        let scoped = ScopedKvStore::new(Arc::clone(&self.store), LEDGER_NAMESPACE)
            .context("failed to scope ledger store")?;
        Ok(ActionExecutor::new(
            Arc::new(KvLedger::new(scoped)),
            QuarantineStore::new(self.paths.quarantine_dir.clone()),
        ))
    }
}

/// Classifier for the resolved configuration. Needs no state.
pub(crate) fn classifier(resolved: &ResolvedConfig) -> Result<RiskClassifier> {
    config_bridge::to_classifier(&resolved.config)
}
