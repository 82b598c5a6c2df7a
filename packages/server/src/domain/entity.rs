//! Core domain models for the chat relay.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::value_object::{MessageText, RoomId, TravelUserId};

/// A user as known to this system
///
/// Tokens issued by the identity service are verified and cached outside
/// this server; only the stable id is kept here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: TravelUserId,
}

impl Identity {
    pub fn new(id: TravelUserId) -> Self {
        Self { id }
    }
}

/// Represents a chat room and its member set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Room identifier
    pub id: RoomId,
    /// Display name
    pub name: String,
    members: BTreeSet<TravelUserId>,
}

impl Room {
    /// Create a new room with the given initial members.
    ///
    /// Duplicate ids in `members` collapse into one.
    pub fn new(id: RoomId, name: String, members: impl IntoIterator<Item = TravelUserId>) -> Self {
        Self {
            id,
            name,
            members: members.into_iter().collect(),
        }
    }

    /// Add a member. Returns `false` when the identity was already a member.
    pub fn add_member(&mut self, member: TravelUserId) -> bool {
        self.members.insert(member)
    }

    /// Remove a member. Returns `false` when the identity was not a member.
    pub fn remove_member(&mut self, member: &TravelUserId) -> bool {
        self.members.remove(member)
    }

    pub fn is_member(&self, member: &TravelUserId) -> bool {
        self.members.contains(member)
    }

    /// Current members, sorted by id
    pub fn participants(&self) -> Vec<TravelUserId> {
        self.members.iter().copied().collect()
    }
}

/// A persisted chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub room_id: RoomId,
    pub sender: TravelUserId,
    pub text: MessageText,
    /// Server-assigned creation time
    pub created_at: DateTime<Utc>,
}
