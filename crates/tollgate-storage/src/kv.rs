//! Namespaced key-value store trait and the in-memory backend.
//!
//! The [`KvStore`] trait provides byte-level `get`/`set`/`delete` operations
//! with namespaced keys. Implementations:
//!
//! - [`MemoryKvStore`]: for tests and ephemeral state
//! - [`FileKvStore`](crate::FileKvStore): a single durable JSON document
//!
//! # Namespacing
//!
//! Tollgate keeps autonomy settings under `settings` and plan records under
//! `ledger`. Callers normally bind a namespace once with [`ScopedKvStore`],
//! which also offers typed [`get_json`](ScopedKvStore::get_json) /
//! [`set_json`](ScopedKvStore::set_json) helpers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

/// Validate that a namespace is safe for use as a key prefix.
///
/// Namespaces must be non-empty and must not contain the null byte
/// (used internally as the namespace/key separator).
pub(crate) fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidKey(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains('\0') {
        return Err(StorageError::InvalidKey(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Validate that a key is safe for storage.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Raw key-value store trait.
///
/// Every mutating call must be durable by the time it returns: callers such
/// as the plan executor treat a successful `set` as committed.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value by namespace and key.
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Set a value for a namespace and key, overwriting any existing value.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Delete a key from a namespace.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Check if a key exists in a namespace.
    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// List all keys in a namespace.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Delete all keys in a namespace, returning how many were removed.
    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64>;
}

/// In-memory key-value store for tests and ephemeral state.
///
/// Nothing survives the process. Use [`FileKvStore`](crate::FileKvStore) for
/// settings that must outlive a restart.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryKvStore {
    /// Create a new empty in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        data.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data
            .get_mut(namespace)
            .is_some_and(|ns| ns.remove(key).is_some()))
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        Ok(self.get(namespace, key).await?.is_some())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear_namespace(&self, namespace: &str) -> StorageResult<u64> {
        validate_namespace(namespace)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let removed = data.remove(namespace).map_or(0, |ns| ns.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

/// A namespace-scoped view into a [`KvStore`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tollgate_storage::{MemoryKvStore, ScopedKvStore};
///
/// # tokio_test_block(async {
/// let store = Arc::new(MemoryKvStore::new());
/// let settings = ScopedKvStore::new(store, "settings").unwrap();
/// settings.set_json("autonomyMode", &"safe").await.unwrap();
/// let mode: Option<String> = settings.get_json("autonomyMode").await.unwrap();
/// assert_eq!(mode.as_deref(), Some("safe"));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl std::fmt::Debug for ScopedKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedKvStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ScopedKvStore {
    /// Create a scoped view into the given store for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the namespace is empty
    /// or contains null bytes.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self {
            inner: store,
            namespace,
        })
    }

    /// The namespace this store is scoped to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get a raw byte value by key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key is empty or invalid.
    pub async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        self.inner.get(&self.namespace, key).await
    }

    /// Set a raw byte value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key is empty or invalid.
    pub async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        self.inner.set(&self.namespace, key, value).await
    }

    /// Delete a key. Returns `true` if the key existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key is empty or invalid.
    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        self.inner.delete(&self.namespace, key).await
    }

    /// Check if a key exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the key is empty or invalid.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        self.inner.exists(&self.namespace, key).await
    }

    /// List all keys in this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store operation fails.
    pub async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.list_keys(&self.namespace).await
    }

    /// Delete all keys in this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store operation fails.
    pub async fn clear(&self) -> StorageResult<u64> {
        self.inner.clear_namespace(&self.namespace).await
    }

    /// Deserialize a JSON value from the store.
    ///
    /// Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if deserialization fails.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let bytes = self.get(key).await?;
        bytes
            .map(|b| {
                serde_json::from_slice(&b).map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .transpose()
    }

    /// Serialize a value as JSON and store it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if serialization fails.
    pub async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set(key, bytes).await
    }
}
