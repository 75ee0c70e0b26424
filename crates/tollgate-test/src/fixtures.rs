//! Test fixtures for tool inputs and scratch filesystems.

use std::path::{Path, PathBuf};
use std::sync::Once;

use serde_json::{Value, json};

/// `shell_exec` input running `command`.
#[must_use]
pub fn shell_input(command: &str) -> Value {
    json!({ "command": command })
}

/// Browser tool input navigating to `url`.
#[must_use]
pub fn browser_input(url: &str) -> Value {
    json!({ "url": url })
}

/// File tool input targeting `path`.
#[must_use]
pub fn file_input(path: &str, content: &str) -> Value {
    json!({ "path": path, "content": content })
}

static LOGGING: Once = Once::new();

/// Install a test tracing subscriber honouring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A temporary directory tree for filesystem tests.
///
/// Holds separate `work/` (files the plan touches), `quarantine/` and
/// `state/` directories. Everything is removed on drop.
#[derive(Debug)]
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    /// Create a fresh workspace.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        for sub in ["work", "quarantine", "state"] {
            std::fs::create_dir_all(dir.path().join(sub)).expect("failed to create subdir");
        }
        Self { dir }
    }

    /// Root of the workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Directory for files touched by plans.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Directory for quarantined backups.
    #[must_use]
    pub fn quarantine_dir(&self) -> PathBuf {
        self.dir.path().join("quarantine")
    }

    /// Path of the durable settings/ledger file.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.dir.path().join("state").join("tollgate.json")
    }

    /// Absolute path of `rel` inside `work/`.
    #[must_use]
    pub fn path(&self, rel: &str) -> PathBuf {
        self.work_dir().join(rel)
    }

    /// Absolute path of `rel` inside `work/`, as a string.
    #[must_use]
    pub fn path_str(&self, rel: &str) -> String {
        self.path(rel).display().to_string()
    }

    /// Write `content` to `rel` inside `work/`, creating parents.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[allow(clippy::expect_used)]
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent");
        }
        std::fs::write(&path, content).expect("failed to write fixture");
        path
    }

    /// Read `rel` inside `work/`, or `None` if it does not exist.
    #[must_use]
    pub fn read(&self, rel: &str) -> Option<String> {
        std::fs::read_to_string(self.path(rel)).ok()
    }

    /// Whether `rel` exists inside `work/`.
    #[must_use]
    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
