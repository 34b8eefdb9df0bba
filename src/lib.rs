//! Driftchat - Offline-First Chat Client Core
//!
//! Driftchat is the offline core of a chat client: a persistent per-room
//! message cache, a durable outbox of unconfirmed sends, and the
//! reconciliation logic that merges locally pending messages with the
//! server-confirmed timeline delivered by a hosted backend.
//!
//! # Overview
//!
//! The crate provides:
//! - Optimistic local inserts with a visible `pending` / `failed` status
//! - A durable outbox replayed against the remote send operation
//! - Signature-based deduplication of pending vs. confirmed messages
//! - Bounded, timestamp-ordered per-room message caches
//! - Merge of incrementally paginated history windows
//!
//! # Module Structure
//!
//! - **`shared`** - Data model and error types
//!   - Room/user/message identities, message bodies, signatures
//!   - Cached room and member directory entries
//!
//! - **`storage`** - Local persistence
//!   - `KeyValueStore`: async whole-blob JSON storage collaborator
//!   - `MemoryStore` and `SqliteStore` backends
//!   - `OfflineStore`: fail-soft message cache and outbox on top of a store
//!
//! - **`offline`** - Reconciliation and sync
//!   - `reconcile`: merge/dedup of server batches against cached state
//!   - `SyncEngine`: optimistic send flow and the guarded outbox drain
//!
//! - **`remote`** - The hosted chat backend collaborator
//!   - `ChatBackend`: remote send, history page query, live feed
//!
//! # Usage
//!
//! ```rust,no_run
//! # use driftchat::offline::SyncEngine;
//! # use driftchat::remote::ChatBackend;
//! # use driftchat::shared::message::{MessageBody, RoomId};
//! # use driftchat::storage::KeyValueStore;
//! # async fn example<S: KeyValueStore, B: ChatBackend>(engine: SyncEngine<S, B>) {
//! let room = RoomId::from("room-1");
//!
//! // Optimistic send: visible immediately, durable until confirmed
//! engine.send_message(&room, MessageBody::text("hello")).await;
//!
//! // Replay unconfirmed sends after a reconnect
//! engine.trigger_drain().await;
//!
//! // Merged, ordered timeline with per-entry pending/failed status
//! let timeline = engine.timeline(&room).await;
//! # let _ = timeline;
//! # }
//! ```
//!
//! # Concurrency
//!
//! The crate targets a single-process async client. Storage blobs are
//! read-modify-written as a whole; at most one outbox drain runs at a time
//! and extra drain triggers are dropped rather than queued.
//!
//! # Error Handling
//!
//! Local persistence is best-effort: failed reads fall back to defaults and
//! failed writes are dropped with a `tracing` diagnostic. Remote send
//! failures become a visible `failed` status on the affected entry instead
//! of propagating upward.

/// Shared data model and error types
pub mod shared;

/// Local persistence: key-value backends and the offline cache
pub mod storage;

/// Reconciliation and the outbox sync engine
pub mod offline;

/// Remote chat backend collaborator traits
pub mod remote;
