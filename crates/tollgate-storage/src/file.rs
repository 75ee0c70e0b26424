//! Durable single-file key-value backend.
//!
//! [`FileKvStore`] keeps every namespace in one JSON document on disk. Each
//! mutation is applied to a copy of the in-memory document, written to a
//! temporary file in the same directory, fsynced and atomically renamed over
//! the old document. Only then does the in-memory view change, so a failed
//! write leaves both the file and the cache at the previous state.
//!
//! A sibling `<file>.lock` is held with an exclusive advisory lock for the
//! lifetime of the store; a second process opening the same file gets
//! [`StorageError::Locked`].

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::kv::{KvStore, validate_key, validate_namespace};

const DOCUMENT_VERSION: u32 = 1;

/// On-disk layout: namespace -> key -> base64 value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Document {
    version: u32,
    #[serde(default)]
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
}

impl Document {
    fn empty() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            namespaces: BTreeMap::new(),
        }
    }
}

/// Durable key-value store backed by one JSON file.
pub struct FileKvStore {
    path: PathBuf,
    doc: Mutex<Document>,
    // Held for the lifetime of the store; dropping it releases the lock.
    _lock: File,
}

impl std::fmt::Debug for FileKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKvStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileKvStore {
    /// Open (or create) the store at `path`.
    ///
    /// A missing file is treated as an empty store; it is created on the
    /// first write. Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Locked`] if another process holds the store
    /// - [`StorageError::Io`] if the file or lock cannot be accessed
    /// - [`StorageError::Serialization`] if the existing file is corrupt
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let open_path = path.clone();
        let (lock, doc) = tokio::task::spawn_blocking(move || open_blocking(&open_path))
            .await
            .map_err(|e| StorageError::Internal(format!("open task failed: {e}")))??;

        debug!(path = %path.display(), namespaces = doc.namespaces.len(), "Opened file store");

        Ok(Self {
            path,
            doc: Mutex::new(doc),
            _lock: lock,
        })
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy of the document, persist it, then commit it
    /// to memory. The closure's return value is passed through.
    async fn mutate<T, F>(&self, mutate: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Document) -> T,
    {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        let out = mutate(&mut next);

        let bytes = serde_json::to_vec_pretty(&next)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| StorageError::Internal(format!("write task failed: {e}")))??;

        *doc = next;
        Ok(out)
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn open_blocking(path: &Path) -> StorageResult<(File, Document)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, &e))?;
    }

    let lock_file = lock_path(path);
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_file)
        .map_err(|e| StorageError::io(&lock_file, &e))?;
    lock.try_lock_exclusive()
        .map_err(|_| StorageError::Locked(path.display().to_string()))?;

    let doc = match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Document::empty(),
        Ok(bytes) => serde_json::from_slice::<Document>(&bytes).map_err(|e| {
            StorageError::Serialization(format!("{}: {e}", path.display()))
        })?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Document::empty(),
        Err(e) => return Err(StorageError::io(path, &e)),
    };

    if doc.version > DOCUMENT_VERSION {
        warn!(
            path = %path.display(),
            version = doc.version,
            "Store was written by a newer version; reading anyway"
        );
    }

    Ok((lock, doc))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, &e))?;
    tmp.write_all(bytes)
        .map_err(|e| StorageError::io(tmp.path(), &e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StorageError::io(tmp.path(), &e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::io(path, &e.error))?;

    // Make the rename itself durable.
    #[cfg(unix)]
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
    Ok(())
}

fn decode_value(namespace: &str, key: &str, encoded: &str) -> StorageResult<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|e| StorageError::Serialization(format!("{namespace}/{key}: {e}")))
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let doc = self.doc.lock().await;
        doc.namespaces
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .map(|v| decode_value(namespace, key, v))
            .transpose()
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let encoded = BASE64.encode(value);
        self.mutate(|doc| {
            doc.namespaces
                .entry(namespace.to_string())
                .or_default()
                .insert(key.to_string(), encoded);
        })
        .await
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        {
            let doc = self.doc.lock().await;
            if !doc
                .namespaces
                .get(namespace)
                .is_some_and(|ns| ns.contains_key(key))
            {
                return Ok(false);
            }
        }
        self.mutate(|doc| {
            let removed = doc
                .namespaces
                .get_mut(namespace)
                .is_some_and(|ns| ns.remove(key).is_some());
            if doc.namespaces.get(namespace).is_some_and(BTreeMap::is_empty) {
                doc.namespaces.remove(namespace);
            }
            removed
        })
        .await
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let doc = self.doc.lock().await;
        Ok(doc
            .namespaces
            .get(namespace)
            .is_some_and(|ns| ns.contains_key(key)))
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        let doc = self.doc.lock().await;
        Ok(doc
            .namespaces
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64> {
        validate_namespace(namespace)?;
        {
            let doc = self.doc.lock().await;
            if !doc.namespaces.contains_key(namespace) {
                return Ok(0);
            }
        }
        self.mutate(|doc| {
            let removed = doc.namespaces.remove(namespace).map_or(0, |ns| ns.len());
            u64::try_from(removed).unwrap_or(u64::MAX)
        })
        .await
    }
}

/// Open a [`FileKvStore`] and return it as a shared trait object.
///
/// # Errors
///
/// See [`FileKvStore::open`].
pub async fn open_shared(path: impl Into<PathBuf>) -> StorageResult<Arc<dyn KvStore>> {
    Ok(Arc::new(FileKvStore::open(path).await?))
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
