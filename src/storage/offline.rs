//! # Offline Cache and Outbox
//!
//! Fail-soft persistence for the chat client's offline state: cached room
//! and user directories, a bounded per-room message cache, and the durable
//! outbox of unconfirmed sends.
//!
//! ## Behavior
//!
//! - **Fail-soft**: a failing backend never breaks the caller. Reads fall
//!   back to the supplied default; writes are dropped with a `tracing`
//!   diagnostic. Durability is best-effort, the server remains the source
//!   of truth.
//! - **Bounded caches**: every room cache write re-sorts ascending by
//!   creation time and keeps only the most recent entries, evicting the
//!   oldest first.
//! - **Whole-blob writes**: each cache and the outbox is one JSON blob,
//!   read-modify-written on every mutation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use driftchat::storage::memory::MemoryStore;
//! use driftchat::storage::offline::OfflineStore;
//! use driftchat::shared::message::RoomId;
//!
//! # async fn example() {
//! let store = OfflineStore::new(MemoryStore::new());
//! let room = RoomId::from("r1");
//!
//! let cached = store.room_messages(&room).await;
//! store.set_room_messages(&room, cached).await;
//! # }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::shared::directory::{CachedRoom, CachedUser};
use crate::shared::message::{CachedMessage, PendingMessage, PendingStatus, RoomId, Signature};
use crate::storage::KeyValueStore;

const ROOMS_KEY: &str = "offline:rooms";
const USERS_KEY: &str = "offline:users";
const OUTBOX_KEY: &str = "offline:outbox";

fn messages_key(room: &RoomId) -> String {
    format!("offline:messages:{}", room)
}

/// Retention settings for the per-room message caches.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum entries retained per room; oldest evicted first
    pub max_messages_per_room: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_messages_per_room: 200,
        }
    }
}

/// Sort ascending by creation time (ties broken by entry key, so the order
/// is deterministic) and keep only the most recent `cap` entries.
pub fn sort_and_cap(mut messages: Vec<CachedMessage>, cap: usize) -> Vec<CachedMessage> {
    messages.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.sort_key().cmp(b.sort_key()))
    });
    let len = messages.len();
    if len > cap {
        messages.drain(..len - cap);
    }
    messages
}

/// Fail-soft offline cache and outbox on top of a [`KeyValueStore`].
#[derive(Debug)]
pub struct OfflineStore<S> {
    store: S,
    config: CacheConfig,
}

impl<S: KeyValueStore> OfflineStore<S> {
    /// Wrap a key-value backend with the default retention settings.
    pub fn new(store: S) -> Self {
        Self::with_config(store, CacheConfig::default())
    }

    /// Wrap a key-value backend with explicit retention settings.
    pub fn with_config(store: S, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Retention settings in effect.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(key, %err, "discarding undecodable cache blob");
                    fallback
                }
            },
            Ok(None) => fallback,
            Err(err) => {
                tracing::warn!(key, %err, "cache read failed, using fallback");
                fallback
            }
        }
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, %err, "cache write dropped: encode failed");
                return;
            }
        };
        if let Err(err) = self.store.set(key, &raw).await {
            tracing::warn!(key, %err, "cache write dropped");
        }
    }

    /// Cached room list.
    pub async fn rooms(&self) -> Vec<CachedRoom> {
        self.read_json(ROOMS_KEY, Vec::new()).await
    }

    /// Replace the cached room list.
    pub async fn set_rooms(&self, rooms: &[CachedRoom]) {
        self.write_json(ROOMS_KEY, &rooms).await;
    }

    /// Cached user directory.
    pub async fn users(&self) -> Vec<CachedUser> {
        self.read_json(USERS_KEY, Vec::new()).await
    }

    /// Replace the cached user directory.
    pub async fn set_users(&self, users: &[CachedUser]) {
        self.write_json(USERS_KEY, &users).await;
    }

    /// Cached message sequence for a room, ascending by creation time.
    pub async fn room_messages(&self, room: &RoomId) -> Vec<CachedMessage> {
        self.read_json(&messages_key(room), Vec::new()).await
    }

    /// Replace a room's cached sequence, re-sorting and applying retention.
    pub async fn set_room_messages(&self, room: &RoomId, messages: Vec<CachedMessage>) {
        let trimmed = sort_and_cap(messages, self.config.max_messages_per_room);
        self.write_json(&messages_key(room), &trimmed).await;
    }

    /// Append entries to a room's cached sequence.
    pub async fn append_room_messages(&self, room: &RoomId, new_messages: Vec<CachedMessage>) {
        let mut merged = self.room_messages(room).await;
        merged.extend(new_messages);
        self.set_room_messages(room, merged).await;
    }

    /// Drop cached pending entries whose signature matches.
    pub async fn prune_pending_by_signature(&self, room: &RoomId, signature: &Signature) {
        let messages = self.room_messages(room).await;
        let filtered: Vec<CachedMessage> = messages
            .into_iter()
            .filter(|m| !(m.is_pending() && m.signature() == *signature))
            .collect();
        self.set_room_messages(room, filtered).await;
    }

    /// Flip a cached pending entry to `failed` so the timeline shows the
    /// failure marker in place.
    pub async fn mark_failed_in_room(&self, room: &RoomId, temp_id: &str) {
        let mut messages = self.room_messages(room).await;
        let mut changed = false;
        for entry in &mut messages {
            if let CachedMessage::Pending(pending) = entry {
                if pending.temp_id == temp_id && pending.status != PendingStatus::Failed {
                    pending.status = PendingStatus::Failed;
                    changed = true;
                }
            }
        }
        if changed {
            self.set_room_messages(room, messages).await;
        }
    }

    /// Current outbox contents, all rooms.
    pub async fn outbox(&self) -> Vec<PendingMessage> {
        self.read_json(OUTBOX_KEY, Vec::new()).await
    }

    /// Replace the outbox.
    pub async fn set_outbox(&self, items: Vec<PendingMessage>) {
        self.write_json(OUTBOX_KEY, &items).await;
    }

    /// Append one unconfirmed send to the outbox.
    pub async fn enqueue_outbox(&self, item: PendingMessage) {
        let mut items = self.outbox().await;
        items.push(item);
        self.set_outbox(items).await;
    }

    /// Delete every outbox entry whose signature matches.
    pub async fn remove_from_outbox_by_signature(&self, signature: &Signature) {
        let items = self.outbox().await;
        let filtered: Vec<PendingMessage> = items
            .into_iter()
            .filter(|item| item.signature() != *signature)
            .collect();
        self.set_outbox(filtered).await;
    }

    /// Flip a specific outbox entry to `failed` without removing it, so a
    /// future drain can attempt it again.
    pub async fn mark_failed_in_outbox(&self, temp_id: &str) {
        let mut items = self.outbox().await;
        let mut changed = false;
        for item in &mut items {
            if item.temp_id == temp_id && item.status != PendingStatus::Failed {
                item.status = PendingStatus::Failed;
                changed = true;
            }
        }
        if changed {
            self.set_outbox(items).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::message::{MessageBody, MessageId, ServerMessage, UserId};
    use crate::storage::memory::MemoryStore;
    use async_trait::async_trait;
    use crate::shared::error::StorageError;

    fn confirmed(id: &str, created_at: i64) -> CachedMessage {
        CachedMessage::Confirmed(ServerMessage {
            id: MessageId::from(id),
            room_id: RoomId::from("r1"),
            sender_id: UserId::from("u1"),
            body: MessageBody::text(format!("msg {id}")),
            created_at,
        })
    }

    fn pending(temp_id: &str, created_at: i64, text: &str) -> PendingMessage {
        PendingMessage {
            temp_id: temp_id.to_string(),
            room_id: RoomId::from("r1"),
            sender_id: UserId::from("u1"),
            body: MessageBody::text(text),
            created_at,
            status: PendingStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_set_room_messages_sorts_ascending() {
        let store = OfflineStore::new(MemoryStore::new());
        let room = RoomId::from("r1");

        store
            .set_room_messages(
                &room,
                vec![confirmed("m3", 3000), confirmed("m1", 1000), confirmed("m2", 2000)],
            )
            .await;

        let cached = store.room_messages(&room).await;
        let times: Vec<i64> = cached.iter().map(|m| m.created_at()).collect();
        assert_eq!(times, vec![1000, 2000, 3000]);
    }

    #[tokio::test]
    async fn test_append_caps_at_limit_and_evicts_oldest() {
        let store = OfflineStore::with_config(
            MemoryStore::new(),
            CacheConfig {
                max_messages_per_room: 5,
            },
        );
        let room = RoomId::from("r1");

        for batch in 0..3 {
            let messages: Vec<CachedMessage> = (0..4)
                .map(|i| {
                    let n = batch * 4 + i;
                    confirmed(&format!("m{n:02}"), 1000 + n)
                })
                .collect();
            store.append_room_messages(&room, messages).await;
        }

        let cached = store.room_messages(&room).await;
        assert_eq!(cached.len(), 5);
        let times: Vec<i64> = cached.iter().map(|m| m.created_at()).collect();
        assert_eq!(times, vec![1007, 1008, 1009, 1010, 1011]);
    }

    #[tokio::test]
    async fn test_rooms_and_users_roundtrip() {
        let store = OfflineStore::new(MemoryStore::new());

        let rooms = vec![CachedRoom {
            id: RoomId::from("r1"),
            name: "general".to_string(),
            is_group: true,
            created_by: UserId::from("u1"),
            members: Vec::new(),
        }];
        let users = vec![CachedUser {
            id: UserId::from("u1"),
            display_name: "Sam".to_string(),
            avatar_url: None,
        }];

        store.set_rooms(&rooms).await;
        store.set_users(&users).await;

        assert_eq!(store.rooms().await, rooms);
        assert_eq!(store.users().await, users);
    }

    #[tokio::test]
    async fn test_outbox_enqueue_and_remove_by_signature() {
        let store = OfflineStore::new(MemoryStore::new());

        let first = pending("t1", 1000, "hi");
        let second = pending("t2", 2000, "there");
        store.enqueue_outbox(first.clone()).await;
        store.enqueue_outbox(second.clone()).await;
        assert_eq!(store.outbox().await.len(), 2);

        store
            .remove_from_outbox_by_signature(&first.signature())
            .await;

        let remaining = store.outbox().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].temp_id, "t2");
    }

    #[tokio::test]
    async fn test_mark_failed_keeps_entry_in_outbox() {
        let store = OfflineStore::new(MemoryStore::new());
        store.enqueue_outbox(pending("t1", 1000, "hi")).await;

        store.mark_failed_in_outbox("t1").await;

        let items = store.outbox().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, PendingStatus::Failed);
    }

    #[tokio::test]
    async fn test_mark_failed_in_room_flips_status_in_place() {
        let store = OfflineStore::new(MemoryStore::new());
        let room = RoomId::from("r1");
        store
            .append_room_messages(&room, vec![CachedMessage::Pending(pending("t1", 1000, "hi"))])
            .await;

        store.mark_failed_in_room(&room, "t1").await;

        let cached = store.room_messages(&room).await;
        assert_eq!(cached.len(), 1);
        assert!(cached[0].is_failed());
    }

    #[tokio::test]
    async fn test_prune_pending_leaves_confirmed_untouched() {
        let store = OfflineStore::new(MemoryStore::new());
        let room = RoomId::from("r1");
        let entry = pending("t1", 1000, "hi");
        let signature = entry.signature();

        store
            .append_room_messages(
                &room,
                vec![CachedMessage::Pending(entry), confirmed("m1", 2000)],
            )
            .await;
        store.prune_pending_by_signature(&room, &signature).await;

        let cached = store.room_messages(&room).await;
        assert_eq!(cached.len(), 1);
        assert!(!cached[0].is_pending());
    }

    /// Backend that fails every call, for fail-soft coverage.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[tokio::test]
    async fn test_reads_fall_back_and_writes_drop_on_broken_store() {
        let store = OfflineStore::new(BrokenStore);
        let room = RoomId::from("r1");

        assert!(store.room_messages(&room).await.is_empty());
        assert!(store.outbox().await.is_empty());

        // Writes must not panic or surface the failure
        store
            .set_room_messages(&room, vec![confirmed("m1", 1000)])
            .await;
        store.enqueue_outbox(pending("t1", 1000, "hi")).await;
    }

    #[tokio::test]
    async fn test_undecodable_blob_falls_back_to_empty() {
        let memory = MemoryStore::new();
        memory.set(OUTBOX_KEY, "not json").await.unwrap();

        let store = OfflineStore::new(memory);
        assert!(store.outbox().await.is_empty());
    }
}
