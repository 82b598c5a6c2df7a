//! Events carried by the group broadcast fabric.

use chrono::{DateTime, Utc};

use super::value_object::{GroupName, RoomId, TravelUserId};

/// Friendship notices relayed between identity groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendNoticeKind {
    /// Outgoing request, as seen by the requester
    Request,
    /// Incoming request, as seen by the target
    Standby,
    Accept,
    Refuse,
    Block,
}

/// Event published to a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    /// A message was appended to a room
    Message {
        text: String,
        sender: TravelUserId,
        timestamp: DateTime<Utc>,
    },
    /// Full member list after a membership change
    ParticipantsSnapshot { participants: Vec<TravelUserId> },
    /// Something about a room changed; clients refetch it
    RoomUpdate { room_id: RoomId },
    FriendNotice {
        kind: FriendNoticeKind,
        travel_user_id: TravelUserId,
        friend_travel_user_id: TravelUserId,
    },
}

/// A [`GroupEvent`] together with the group it was published to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEnvelope {
    pub group: GroupName,
    pub event: GroupEvent,
}
