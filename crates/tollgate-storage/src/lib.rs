//! Tollgate Storage - key-value persistence for settings and plan ledgers.
//!
//! Two backends implement the [`KvStore`] trait:
//!
//! - [`MemoryKvStore`]: in-memory, for tests and throwaway sessions
//! - [`FileKvStore`]: a single JSON document on disk, written atomically and
//!   guarded by an exclusive advisory lock
//!
//! Higher layers bind a namespace with [`ScopedKvStore`] and read/write typed
//! values through its JSON helpers.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod file;
mod kv;

pub use error::{StorageError, StorageResult};
pub use file::{FileKvStore, open_shared};
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore};

/// Namespace holding autonomy settings.
pub const SETTINGS_NAMESPACE: &str = "settings";

/// Namespace holding action plans and their items.
pub const LEDGER_NAMESPACE: &str = "ledger";
