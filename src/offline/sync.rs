//! # Sync Engine
//!
//! Coordinates the optimistic send flow, the outbox drain, and the
//! application of server data (live feed batches and pagination windows)
//! to the local caches.
//!
//! ## Drain Semantics
//!
//! At most one drain runs per engine at a time; triggers that arrive while
//! a drain is in flight are dropped, not queued. A drain makes one attempt
//! per outbox entry: confirmed entries are removed from the outbox and
//! their pending cache entries replaced with the confirmed shape, failed
//! entries are marked `failed` in both places and left for a later pass.
//! One entry failing never aborts the rest of the pass.
//!
//! Callers trigger one drain when the owning screen attaches, and again on
//! manual retry or a reconnect signal.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use driftchat::offline::SyncEngine;
//! # use driftchat::remote::ChatBackend;
//! # use driftchat::shared::message::{MessageBody, RoomId};
//! # use driftchat::storage::KeyValueStore;
//! # async fn example<S: KeyValueStore, B: ChatBackend>(engine: SyncEngine<S, B>) {
//! let room = RoomId::from("r1");
//! engine.send_message(&room, MessageBody::text("hello")).await;
//! engine.trigger_drain().await;
//! # }
//! ```

use futures_util::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::offline::reconciliation::reconcile;
use crate::remote::ChatBackend;
use crate::shared::error::BackendError;
use crate::shared::message::{
    CachedMessage, MessageBody, PendingMessage, PendingStatus, RoomId, ServerMessage, Signature,
    UserId,
};
use crate::storage::offline::OfflineStore;
use crate::storage::KeyValueStore;

/// Outbox occupancy, for a retry banner or a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboxStats {
    /// Entries awaiting their first confirmation
    pub pending: usize,
    /// Entries whose last attempt errored
    pub failed: usize,
}

/// Stateful coordinator of the offline send/sync flow for one device.
pub struct SyncEngine<S, B> {
    store: OfflineStore<S>,
    backend: B,
    sender: UserId,
    draining: AtomicBool,
}

/// Clears the in-flight flag even if a drain pass panics.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<S: KeyValueStore, B: ChatBackend> SyncEngine<S, B> {
    /// Create an engine for the signed-in `sender`.
    pub fn new(store: OfflineStore<S>, backend: B, sender: UserId) -> Self {
        Self {
            store,
            backend,
            sender,
            draining: AtomicBool::new(false),
        }
    }

    /// The underlying offline store, for room/user directory caching.
    pub fn store(&self) -> &OfflineStore<S> {
        &self.store
    }

    /// Merged, ordered message sequence for a room, with per-entry
    /// pending/failed status. This is the sequence the UI renders.
    pub async fn timeline(&self, room: &RoomId) -> Vec<CachedMessage> {
        self.store.room_messages(room).await
    }

    /// Outbox occupancy across all rooms.
    pub async fn outbox_stats(&self) -> OutboxStats {
        let items = self.store.outbox().await;
        let failed = items
            .iter()
            .filter(|item| item.status == PendingStatus::Failed)
            .count();
        OutboxStats {
            pending: items.len() - failed,
            failed,
        }
    }

    /// Record a new outgoing message without attempting the network: the
    /// entry becomes visible in the room timeline immediately and is
    /// enqueued durably for the next drain.
    pub async fn queue_message(&self, room: &RoomId, body: MessageBody) -> PendingMessage {
        let pending = PendingMessage::new(room.clone(), self.sender.clone(), body);
        self.enqueue_pending(pending.clone()).await;
        pending
    }

    /// Optimistically insert a caller-built pending entry and enqueue it.
    /// The cache insert and the outbox append happen back to back, so
    /// within a room the timeline reflects user send order.
    pub async fn enqueue_pending(&self, pending: PendingMessage) {
        self.store
            .append_room_messages(&pending.room_id, vec![CachedMessage::Pending(pending.clone())])
            .await;
        self.store.enqueue_outbox(pending).await;
    }

    /// Queue a message and immediately drain the outbox once. The normal
    /// send path while the app believes it is online.
    pub async fn send_message(&self, room: &RoomId, body: MessageBody) -> PendingMessage {
        let pending = self.queue_message(room, body).await;
        self.trigger_drain().await;
        pending
    }

    /// Drain the outbox once. A no-op if a drain is already in flight:
    /// extra intents are dropped rather than queued.
    pub async fn trigger_drain(&self) {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("drain already in flight, dropping trigger");
            return;
        }
        let _guard = DrainGuard(&self.draining);
        self.drain_outbox().await;
    }

    async fn drain_outbox(&self) {
        let outbox = self.store.outbox().await;
        if outbox.is_empty() {
            return;
        }
        tracing::info!(entries = outbox.len(), "draining outbox");

        for item in outbox {
            let signature = item.signature();
            match self.backend.send_message(&item.room_id, &item.body).await {
                Ok(id) => {
                    self.store.remove_from_outbox_by_signature(&signature).await;
                    self.store
                        .prune_pending_by_signature(&item.room_id, &signature)
                        .await;
                    // Confirmed echo so the sender's timeline updates
                    // without waiting for the feed round trip.
                    let confirmed = ServerMessage {
                        id,
                        room_id: item.room_id.clone(),
                        sender_id: item.sender_id.clone(),
                        body: item.body.clone(),
                        created_at: item.created_at,
                    };
                    self.store
                        .append_room_messages(
                            &item.room_id,
                            vec![CachedMessage::Confirmed(confirmed)],
                        )
                        .await;
                }
                Err(err) => {
                    tracing::warn!(temp_id = %item.temp_id, %err, "send failed, leaving for retry");
                    self.store.mark_failed_in_outbox(&item.temp_id).await;
                    self.store
                        .mark_failed_in_room(&item.room_id, &item.temp_id)
                        .await;
                }
            }
        }
    }

    /// Fold a freshly received confirmed batch into the room cache and
    /// drop outbox entries the batch confirms.
    pub async fn apply_server_batch(&self, room: &RoomId, batch: Vec<ServerMessage>) {
        let cached = self.store.room_messages(room).await;
        let merged = reconcile(&batch, &cached);
        self.store.set_room_messages(room, merged).await;

        let confirmed: HashSet<Signature> = batch.iter().map(|m| m.signature()).collect();
        if confirmed.is_empty() {
            return;
        }
        let outbox = self.store.outbox().await;
        let retained: Vec<PendingMessage> = outbox
            .iter()
            .filter(|item| !confirmed.contains(&item.signature()))
            .cloned()
            .collect();
        if retained.len() != outbox.len() {
            self.store.set_outbox(retained).await;
        }
    }

    /// Fetch the latest history window for a room and fold it in. Returns
    /// how many messages the page carried.
    pub async fn refresh_latest(
        &self,
        room: &RoomId,
        limit: usize,
    ) -> Result<usize, BackendError> {
        let page = self.backend.messages_before(room, None, limit).await?;
        let count = page.len();
        self.apply_server_batch(room, page).await;
        Ok(count)
    }

    /// Fetch one older history page (strictly before `before`) and fold it
    /// in. Returns how many messages the page carried; zero means the top
    /// of history was reached.
    pub async fn load_older(
        &self,
        room: &RoomId,
        before: i64,
        limit: usize,
    ) -> Result<usize, BackendError> {
        let page = self
            .backend
            .messages_before(room, Some(before), limit)
            .await?;
        let count = page.len();
        self.apply_server_batch(room, page).await;
        Ok(count)
    }

    /// Consume the live feed for a room, folding in every batch until the
    /// subscription ends.
    pub async fn run_room_feed(&self, room: &RoomId) {
        let mut feed = self.backend.subscribe(room);
        while let Some(batch) = feed.next().await {
            self.apply_server_batch(room, batch).await;
        }
        tracing::debug!(room = %room, "room feed ended");
    }
}
