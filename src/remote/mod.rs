//! Remote Chat Backend
//!
//! The hosted backend consumed by the offline core: one send mutation, one
//! one-shot history page query, and a live subscription feed per room. The
//! backend authenticates the session itself; the sender identity is ambient
//! on the connection, not a call parameter.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::shared::error::BackendError;
use crate::shared::message::{MessageBody, MessageId, RoomId, ServerMessage};

/// Handle to the hosted chat backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one message to a room. Resolves with the server-assigned
    /// identity; rejects on network, auth, or validation failure.
    async fn send_message(
        &self,
        room: &RoomId,
        body: &MessageBody,
    ) -> Result<MessageId, BackendError>;

    /// Fetch up to `limit` messages for a room, ascending by creation
    /// time. With `before` set, returns the window strictly older than
    /// that timestamp; otherwise the latest window.
    async fn messages_before(
        &self,
        room: &RoomId,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ServerMessage>, BackendError>;

    /// Subscribe to the live confirmed-message feed for a room. Each item
    /// is the backend's current view of the queried window.
    fn subscribe(&self, room: &RoomId) -> BoxStream<'static, Vec<ServerMessage>>;
}
