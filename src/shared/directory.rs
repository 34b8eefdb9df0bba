//! Cached Room and User Directory Entries
//!
//! Snapshot shapes for the room list and member directory, persisted
//! alongside the per-room message caches so both screens render offline.

use serde::{Deserialize, Serialize};

use crate::shared::message::{RoomId, UserId};

/// A user profile snapshot as cached on the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedUser {
    /// Server-assigned identity
    pub id: UserId,
    /// Display name shown in room member lists
    pub display_name: String,
    /// Hosted avatar image, if the user set one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A room snapshot as cached on the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedRoom {
    /// Server-assigned identity
    pub id: RoomId,
    /// Room display name
    pub name: String,
    /// Whether this is a group room or a direct conversation
    pub is_group: bool,
    /// User who created the room
    pub created_by: UserId,
    /// Member snapshots, if the room list query joined them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<CachedUser>,
}
