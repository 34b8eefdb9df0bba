//! # Offline Messaging Core
//!
//! Reconciliation and sync for offline-first chat: merges locally pending
//! sends with server-confirmed history, and replays the outbox against the
//! remote send operation when connectivity returns.
//!
//! ## Architecture
//!
//! - **Reconciliation**: deduplicates pending vs. confirmed messages by
//!   content signature and produces the canonical time-ordered sequence
//! - **Sync Engine**: optimistic send flow, the guarded outbox drain, and
//!   application of live feed batches and pagination windows
//!
//! ## Key Components
//!
//! - `reconciliation.rs`: the pure merge/dedup function
//! - `sync.rs`: `SyncEngine`, the stateful coordinator

pub mod reconciliation;
pub mod sync;

// Re-export main types
pub use reconciliation::reconcile;
pub use sync::{OutboxStats, SyncEngine};
