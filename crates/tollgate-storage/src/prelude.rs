//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_storage::prelude::*;` to import all essential types.

pub use crate::{FileKvStore, KvStore, MemoryKvStore, ScopedKvStore};
pub use crate::{StorageError, StorageResult};
