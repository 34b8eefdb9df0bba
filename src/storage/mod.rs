//! # Local Persistence Module
//!
//! Whole-blob key-value persistence for the offline core. The store
//! collaborator exposes asynchronous get/set of JSON string blobs keyed by
//! string - no transactions, no partial updates. Everything above it
//! (message caches, the outbox) is read-modify-written as a whole.
//!
//! ## Key Components
//!
//! - `KeyValueStore`: the storage collaborator trait
//! - `memory.rs`: in-memory backend for tests and cold-start fallback
//! - `sqlite.rs`: durable SQLite backend in the platform data directory
//! - `offline.rs`: the fail-soft message cache and outbox built on top
//!
//! ## Usage
//!
//! ```rust,no_run
//! use driftchat::storage::memory::MemoryStore;
//! use driftchat::storage::offline::OfflineStore;
//!
//! # async fn example() {
//! let store = OfflineStore::new(MemoryStore::new());
//! let messages = store.room_messages(&"r1".into()).await;
//! # let _ = messages;
//! # }
//! ```

pub mod memory;
pub mod offline;
pub mod sqlite;

use async_trait::async_trait;

use crate::shared::error::StorageError;

/// Asynchronous whole-blob key-value storage.
///
/// Values are opaque JSON strings; callers own serialization. A backend may
/// fail on any call - layers above treat failures as a cache miss, never as
/// a fatal condition.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the blob stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the blob stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
