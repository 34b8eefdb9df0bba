//! Chat Message Data Structures
//!
//! Identities, message bodies, the confirmed/pending message union, and the
//! content signature used to correlate a locally pending send with the
//! confirmed message it eventually becomes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// View the identity as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id! {
    /// Opaque server-assigned room identity.
    RoomId
}

opaque_id! {
    /// Opaque identity of a signed-in user.
    UserId
}

opaque_id! {
    /// Opaque server-assigned message identity.
    MessageId
}

/// Message payload: exactly one variant per message kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    /// Plain text message
    Text { text: String },
    /// Image message carried as a hosted URL
    Image { image_url: String },
}

impl MessageBody {
    /// Build a text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Build an image body.
    pub fn image(image_url: impl Into<String>) -> Self {
        Self::Image {
            image_url: image_url.into(),
        }
    }

    /// Kind discriminator as stored on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
        }
    }

    /// Text payload, if this is a text message.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Image { .. } => None,
        }
    }

    /// Image URL, if this is an image message.
    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Text { .. } => None,
            Self::Image { image_url } => Some(image_url),
        }
    }
}

/// A message acknowledged and identified by the backend. Immutable once
/// created; the eventual source of truth for its signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerMessage {
    /// Server-assigned identity
    pub id: MessageId,
    /// Room the message belongs to
    pub room_id: RoomId,
    /// Sending user
    pub sender_id: UserId,
    /// Payload
    #[serde(flatten)]
    pub body: MessageBody,
    /// Creation time in epoch milliseconds, non-decreasing per room
    pub created_at: i64,
}

impl ServerMessage {
    /// Content signature for pending/confirmed correlation.
    pub fn signature(&self) -> Signature {
        Signature::derive(&self.sender_id, self.created_at, &self.body)
    }
}

/// Delivery status of a locally originated, unconfirmed message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    /// Awaiting confirmation by the backend
    Pending,
    /// The last send attempt errored; eligible for retry
    Failed,
}

/// A locally originated message not yet confirmed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingMessage {
    /// Locally generated temporary token, unique per device per process
    pub temp_id: String,
    /// Room the message belongs to
    pub room_id: RoomId,
    /// Sending user
    pub sender_id: UserId,
    /// Payload
    #[serde(flatten)]
    pub body: MessageBody,
    /// Client clock at send time, epoch milliseconds
    pub created_at: i64,
    /// Current delivery status
    pub status: PendingStatus,
}

impl PendingMessage {
    /// Build a pending message stamped with the client clock and a fresh
    /// temporary token.
    pub fn new(room_id: RoomId, sender_id: UserId, body: MessageBody) -> Self {
        let created_at = Utc::now().timestamp_millis();
        let temp_id = format!("tmp-{}-{}", created_at, Uuid::new_v4().simple());
        Self {
            temp_id,
            room_id,
            sender_id,
            body,
            created_at,
            status: PendingStatus::Pending,
        }
    }

    /// Content signature for pending/confirmed correlation.
    pub fn signature(&self) -> Signature {
        Signature::derive(&self.sender_id, self.created_at, &self.body)
    }
}

/// Union of confirmed and pending messages as stored in a room cache.
///
/// Discriminated structurally on deserialization: confirmed entries carry a
/// server `id`, pending entries carry a `temp_id` and `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CachedMessage {
    /// Acknowledged by the backend
    Confirmed(ServerMessage),
    /// Locally originated, awaiting confirmation or marked failed
    Pending(PendingMessage),
}

impl CachedMessage {
    /// Room the message belongs to.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::Confirmed(m) => &m.room_id,
            Self::Pending(m) => &m.room_id,
        }
    }

    /// Sending user.
    pub fn sender_id(&self) -> &UserId {
        match self {
            Self::Confirmed(m) => &m.sender_id,
            Self::Pending(m) => &m.sender_id,
        }
    }

    /// Payload.
    pub fn body(&self) -> &MessageBody {
        match self {
            Self::Confirmed(m) => &m.body,
            Self::Pending(m) => &m.body,
        }
    }

    /// Creation time in epoch milliseconds.
    pub fn created_at(&self) -> i64 {
        match self {
            Self::Confirmed(m) => m.created_at,
            Self::Pending(m) => m.created_at,
        }
    }

    /// Content signature for pending/confirmed correlation.
    pub fn signature(&self) -> Signature {
        match self {
            Self::Confirmed(m) => m.signature(),
            Self::Pending(m) => m.signature(),
        }
    }

    /// Whether this entry still carries a temporary token.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Whether this entry is a pending entry whose last send attempt failed.
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            Self::Pending(PendingMessage {
                status: PendingStatus::Failed,
                ..
            })
        )
    }

    /// Stable per-entry key used to break creation-time ties when sorting:
    /// the server id for confirmed entries, the temporary token otherwise.
    pub fn sort_key(&self) -> &str {
        match self {
            Self::Confirmed(m) => m.id.as_str(),
            Self::Pending(m) => &m.temp_id,
        }
    }
}

/// Derived correlation key over (sender, creation time, payload).
///
/// For a successful send the confirmed message's signature equals the
/// originating pending message's signature, provided the backend echoes the
/// client timestamp verbatim. Two identical-payload sends from one sender
/// within the same millisecond share a signature; that collision is an
/// accepted limitation of the scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    /// Derive the signature for a sender/timestamp/payload triple.
    pub fn derive(sender: &UserId, created_at: i64, body: &MessageBody) -> Self {
        Self(format!(
            "{}|{}|{}|{}",
            sender.as_str(),
            created_at,
            body.text_content().unwrap_or(""),
            body.image_url().unwrap_or(""),
        ))
    }

    /// View the signature as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
