//! Copy-based backups of files about to be overwritten or removed.
//!
//! Backups live at `<root>/<plan uuid>/<action uuid>/<file name>`. The source
//! is always copied, never moved, and the copy is flushed to disk before its
//! path is returned.

use std::path::{Path, PathBuf};

use tokio::fs;
use tollgate_core::{ActionId, PlanId};
use tracing::debug;

use crate::error::QuarantineError;

/// File name used when the source path has none (e.g. `/`).
const FALLBACK_FILE_NAME: &str = "backup";

/// Backup area for one executor.
#[derive(Debug, Clone)]
pub struct QuarantineStore {
    root: PathBuf,
}

impl QuarantineStore {
    /// Store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a plan's backups.
    #[must_use]
    pub fn plan_dir(&self, plan_id: PlanId) -> PathBuf {
        self.root.join(plan_id.0.to_string())
    }

    /// Where the backup of `source` for this action would be written.
    #[must_use]
    pub fn backup_path(&self, source: &Path, plan_id: PlanId, action_id: ActionId) -> PathBuf {
        let name = source
            .file_name()
            .map_or_else(|| FALLBACK_FILE_NAME.into(), std::ffi::OsStr::to_os_string);
        self.plan_dir(plan_id)
            .join(action_id.0.to_string())
            .join(name)
    }

    /// Copy `source` into quarantine and return the backup path.
    ///
    /// # Errors
    ///
    /// - [`QuarantineError::NotFound`] if `source` does not exist
    /// - [`QuarantineError::NotAFile`] if `source` is a directory or special file
    /// - [`QuarantineError::Io`] if the copy fails
    pub async fn quarantine_file(
        &self,
        source: &Path,
        plan_id: PlanId,
        action_id: ActionId,
    ) -> Result<PathBuf, QuarantineError> {
        let meta = fs::metadata(source)
            .await
            .map_err(|e| QuarantineError::io(source, &e))?;
        if !meta.is_file() {
            return Err(QuarantineError::NotAFile(source.display().to_string()));
        }

        let backup = self.backup_path(source, plan_id, action_id);
        if let Some(parent) = backup.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| QuarantineError::io(parent, &e))?;
        }
        copy_durable(source, &backup).await?;

        debug!(
            source = %source.display(),
            backup = %backup.display(),
            "Quarantined file"
        );
        Ok(backup)
    }

    /// Copy a backup back to its original location, creating parent
    /// directories. The backup is kept, so restoring is repeatable.
    ///
    /// # Errors
    ///
    /// - [`QuarantineError::NotFound`] if the backup does not exist
    /// - [`QuarantineError::Io`] if the copy fails
    pub async fn restore_file(&self, backup: &Path, original: &Path) -> Result<(), QuarantineError> {
        let meta = fs::metadata(backup)
            .await
            .map_err(|e| QuarantineError::io(backup, &e))?;
        if !meta.is_file() {
            return Err(QuarantineError::NotAFile(backup.display().to_string()));
        }
        if let Some(parent) = original.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| QuarantineError::io(parent, &e))?;
        }
        copy_durable(backup, original).await?;

        debug!(
            backup = %backup.display(),
            original = %original.display(),
            "Restored file"
        );
        Ok(())
    }

    /// Delete every backup of a plan.
    ///
    /// Returns `true` if the plan had a quarantine directory.
    ///
    /// # Errors
    ///
    /// Returns [`QuarantineError::Io`] if the directory cannot be removed.
    pub async fn purge_plan(&self, plan_id: PlanId) -> Result<bool, QuarantineError> {
        let dir = self.plan_dir(plan_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(plan_id = %plan_id, "Purged plan quarantine");
                Ok(true)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(QuarantineError::io(&dir, &e)),
        }
    }
}

/// Copy `from` to `to` and fsync the destination.
pub(crate) async fn copy_durable(from: &Path, to: &Path) -> Result<(), QuarantineError> {
    fs::copy(from, to)
        .await
        .map_err(|e| QuarantineError::io(from, &e))?;
    let file = fs::OpenOptions::new()
        .write(true)
        .open(to)
        .await
        .map_err(|e| QuarantineError::io(to, &e))?;
    file.sync_all()
        .await
        .map_err(|e| QuarantineError::io(to, &e))
}
