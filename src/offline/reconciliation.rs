//! # Message Reconciliation
//!
//! Merges a batch of server-confirmed messages with a room's cached
//! sequence into one canonical, deduplicated, time-ordered sequence.
//!
//! ## Merge Rules
//!
//! - Confirmed entries are keyed by server id, so overlapping pagination
//!   windows and feed updates collapse to one entry per message; a fresh
//!   batch entry supersedes the cached copy of the same id.
//! - A confirmed entry always supersedes a cached pending entry with the
//!   same content signature - the server is the source of truth.
//! - Pending and failed entries whose signature is not claimed by any
//!   confirmed entry are carried over unchanged, preserving unconfirmed
//!   sends across app restarts and partial syncs.
//! - The result is sorted by creation time with a stable per-entry
//!   tie-break, so reconciling identical inputs is byte-for-byte
//!   idempotent.
//!
//! If the backend assigns its own creation time instead of echoing the
//! client clock, the signature no longer matches and the pending entry
//! survives next to the confirmed one as a visible duplicate. That is
//! accepted behavior; the send operation is expected to echo the client
//! timestamp.

use std::collections::{BTreeMap, HashMap};

use crate::shared::message::{CachedMessage, MessageId, ServerMessage, Signature};

/// Merge `server` (a freshly received confirmed batch) into `cached` (the
/// room's current sequence) and return the canonical ordered result.
pub fn reconcile(server: &[ServerMessage], cached: &[CachedMessage]) -> Vec<CachedMessage> {
    // Confirmed set: cached confirmed entries overlaid by the fresh batch.
    let mut confirmed: BTreeMap<MessageId, ServerMessage> = BTreeMap::new();
    for entry in cached {
        if let CachedMessage::Confirmed(message) = entry {
            confirmed.insert(message.id.clone(), message.clone());
        }
    }
    for message in server {
        confirmed.insert(message.id.clone(), message.clone());
    }

    let mut by_signature: HashMap<Signature, CachedMessage> =
        HashMap::with_capacity(confirmed.len() + cached.len());
    for message in confirmed.into_values() {
        by_signature.insert(message.signature(), CachedMessage::Confirmed(message));
    }

    // Unclaimed pending/failed entries survive the merge unchanged.
    for entry in cached {
        if let CachedMessage::Pending(pending) = entry {
            by_signature
                .entry(pending.signature())
                .or_insert_with(|| CachedMessage::Pending(pending.clone()));
        }
    }

    let mut merged: Vec<CachedMessage> = by_signature.into_values().collect();
    merged.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.sort_key().cmp(b.sort_key()))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::message::{MessageBody, PendingMessage, PendingStatus, RoomId, UserId};

    fn server(id: &str, created_at: i64, text: &str) -> ServerMessage {
        ServerMessage {
            id: MessageId::from(id),
            room_id: RoomId::from("r1"),
            sender_id: UserId::from("u1"),
            body: MessageBody::text(text),
            created_at,
        }
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

    #[test]
    fn test_confirmed_supersedes_pending_with_same_signature() {
        let cached = vec![CachedMessage::Pending(pending("t1", 1000, "hi"))];
        let batch = vec![server("m1", 1000, "hi")];

        let merged = reconcile(&batch, &cached);

        assert_eq!(merged.len(), 1);
        assert!(matches!(&merged[0], CachedMessage::Confirmed(m) if m.id.as_str() == "m1"));
    }

    #[test]
    fn test_unclaimed_pending_survives_merge() {
        let cached = vec![
            CachedMessage::Pending(pending("t1", 3000, "still waiting")),
            CachedMessage::Confirmed(server("m1", 1000, "old")),
        ];
        let batch = vec![server("m2", 2000, "new")];

        let merged = reconcile(&batch, &cached);

        assert_eq!(merged.len(), 3);
        let keys: Vec<&str> = merged.iter().map(|m| m.sort_key()).collect();
        assert_eq!(keys, vec!["m1", "m2", "t1"]);
        assert!(merged[2].is_pending());
    }

    #[test]
    fn test_overlapping_windows_dedup_by_id() {
        let cached = vec![
            CachedMessage::Confirmed(server("m1", 1000, "a")),
            CachedMessage::Confirmed(server("m2", 2000, "b")),
        ];
        // Page overlaps the cached window on m2
        let batch = vec![server("m2", 2000, "b"), server("m3", 3000, "c")];

        let merged = reconcile(&batch, &cached);

        let keys: Vec<&str> = merged.iter().map(|m| m.sort_key()).collect();
        assert_eq!(keys, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let cached = vec![
            CachedMessage::Pending(pending("t1", 2500, "pending")),
            CachedMessage::Confirmed(server("m1", 1000, "a")),
        ];
        let batch = vec![server("m2", 2000, "b"), server("m3", 3000, "c")];

        let once = reconcile(&batch, &cached);
        let twice = reconcile(&batch, &once);

        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn test_server_rewritten_timestamp_leaves_visible_duplicate() {
        let cached = vec![CachedMessage::Pending(pending("t1", 1000, "hi"))];
        // Backend stamped its own clock instead of echoing the client's
        let batch = vec![server("m1", 1042, "hi")];

        let merged = reconcile(&batch, &cached);

        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|m| m.is_pending()));
    }

    #[test]
    fn test_identical_sends_in_same_millisecond_collapse() {
        // Same sender, same clock tick, same payload: one signature, one
        // surviving entry. Accepted limitation of content signatures.
        let cached = vec![
            CachedMessage::Pending(pending("t1", 1000, "hi")),
            CachedMessage::Pending(pending("t2", 1000, "hi")),
        ];

        let merged = reconcile(&[], &cached);

        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_empty_batch_preserves_cache() {
        let cached = vec![
            CachedMessage::Confirmed(server("m1", 1000, "a")),
            CachedMessage::Pending(pending("t1", 2000, "b")),
        ];

        let merged = reconcile(&[], &cached);

        assert_eq!(merged.len(), 2);
    }
}
