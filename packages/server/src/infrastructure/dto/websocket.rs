//! WebSocket message DTOs for the chat relay.
//!
//! Inbound frames are decoded once into a closed enum per endpoint. Frames
//! that are not JSON objects, and kinds an endpoint does not handle, decode to
//! `Ignored` so the session can log and drop them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{FriendNoticeKind, RoomId, TravelUserId};

/// Why an inbound frame was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoredReason {
    /// Not a JSON object, or `type` is not a string
    Malformed,
    /// A `type` this endpoint does not handle
    UnknownKind(String),
}

/// Body of a `message` frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SendPayload {
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub sender_id: Option<TravelUserId>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
}

/// Body of a `leave` frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeavePayload {
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub sender_id: Option<TravelUserId>,
}

/// Body of an `invite` frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InvitePayload {
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub travel_user_id: Option<TravelUserId>,
}

/// Body of every `friend_*` frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FriendPayload {
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub travel_user_id: Option<TravelUserId>,
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub friend_travel_user_id: Option<TravelUserId>,
}

/// Frames accepted on a room connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatClientEvent {
    Message(SendPayload),
    Leave(LeavePayload),
    Invite(InvitePayload),
    Ignored(IgnoredReason),
}

impl ChatClientEvent {
    /// Decode a text frame. A frame without `type` is a `message`.
    pub fn decode(text: &str) -> Self {
        let (kind, value) = match split_kind(text) {
            Ok(parts) => parts,
            Err(reason) => return Self::Ignored(reason),
        };

        let decoded = match kind.as_str() {
            "message" => serde_json::from_value(value).map(Self::Message),
            "leave" => serde_json::from_value(value).map(Self::Leave),
            "invite" => serde_json::from_value(value).map(Self::Invite),
            _ => return Self::Ignored(IgnoredReason::UnknownKind(kind)),
        };
        decoded.unwrap_or(Self::Ignored(IgnoredReason::Malformed))
    }
}

/// Frames accepted on a personal notice connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeClientEvent {
    FriendRequest(FriendPayload),
    FriendAccept(FriendPayload),
    FriendRefuse(FriendPayload),
    FriendBlock(FriendPayload),
    Ignored(IgnoredReason),
}

impl NoticeClientEvent {
    pub fn decode(text: &str) -> Self {
        let (kind, value) = match split_kind(text) {
            Ok(parts) => parts,
            Err(reason) => return Self::Ignored(reason),
        };

        let wrap: fn(FriendPayload) -> Self = match kind.as_str() {
            "friend_request" => Self::FriendRequest,
            "friend_accept" => Self::FriendAccept,
            "friend_refuse" => Self::FriendRefuse,
            "friend_block" => Self::FriendBlock,
            _ => return Self::Ignored(IgnoredReason::UnknownKind(kind)),
        };
        serde_json::from_value(value)
            .map(wrap)
            .unwrap_or(Self::Ignored(IgnoredReason::Malformed))
    }
}

/// Split a frame into its `type` (defaulting to `message`) and the object.
fn split_kind(text: &str) -> Result<(String, Value), IgnoredReason> {
    let value: Value = serde_json::from_str(text).map_err(|_| IgnoredReason::Malformed)?;
    let kind = match value.as_object().map(|obj| obj.get("type")) {
        None => return Err(IgnoredReason::Malformed),
        Some(None) => "message".to_string(),
        Some(Some(Value::String(kind))) => kind.clone(),
        Some(Some(_)) => return Err(IgnoredReason::Malformed),
    };
    Ok((kind, value))
}

/// Accepts `3`, `"3"`; anything else (including `0`) reads as absent.
fn lenient_user_id<'de, D>(deserializer: D) -> Result<Option<TravelUserId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|id| TravelUserId::new(id).ok()),
        Some(Value::String(s)) => TravelUserId::try_from(s.as_str()).ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Public representation of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDto {
    pub travel_user_id: u64,
}

impl From<TravelUserId> for ParticipantDto {
    fn from(id: TravelUserId) -> Self {
        Self {
            travel_user_id: id.value(),
        }
    }
}

/// Frames sent from the server to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Participants {
        participants: Vec<ParticipantDto>,
    },
    Message {
        message: String,
        sender: ParticipantDto,
        /// RFC 3339
        timestamp: String,
    },
    RoomUpdate {
        room_id: u64,
    },
    Left {
        room_id: u64,
    },
    Invite {
        room_id: u64,
    },
    Error {
        error: String,
    },
    FriendRequest {
        travel_user_id: u64,
        friend_travel_user_id: u64,
        status: String,
    },
    FriendAccept {
        travel_user_id: u64,
        friend_travel_user_id: u64,
        status: String,
    },
    FriendRefuse {
        travel_user_id: u64,
        friend_travel_user_id: u64,
        status: String,
    },
    FriendBlock {
        travel_user_id: u64,
        friend_travel_user_id: u64,
        status: String,
    },
}

impl ServerEvent {
    pub fn participants(participants: &[TravelUserId]) -> Self {
        Self::Participants {
            participants: participants.iter().copied().map(ParticipantDto::from).collect(),
        }
    }

    pub fn room_update(room_id: RoomId) -> Self {
        Self::RoomUpdate {
            room_id: room_id.value(),
        }
    }

    pub fn left(room_id: RoomId) -> Self {
        Self::Left {
            room_id: room_id.value(),
        }
    }

    pub fn invite(room_id: RoomId) -> Self {
        Self::Invite {
            room_id: room_id.value(),
        }
    }

    pub fn error(error: impl ToString) -> Self {
        Self::Error {
            error: error.to_string(),
        }
    }

    pub fn friend_notice(
        kind: FriendNoticeKind,
        travel_user_id: TravelUserId,
        friend_travel_user_id: TravelUserId,
    ) -> Self {
        let travel_user_id = travel_user_id.value();
        let friend_travel_user_id = friend_travel_user_id.value();
        match kind {
            FriendNoticeKind::Request | FriendNoticeKind::Standby => Self::FriendRequest {
                travel_user_id,
                friend_travel_user_id,
                status: if kind == FriendNoticeKind::Request {
                    "request"
                } else {
                    "standby"
                }
                .to_string(),
            },
            FriendNoticeKind::Accept => Self::FriendAccept {
                travel_user_id,
                friend_travel_user_id,
                status: "acceptance".to_string(),
            },
            FriendNoticeKind::Refuse => Self::FriendRefuse {
                travel_user_id,
                friend_travel_user_id,
                status: "refusal".to_string(),
            },
            FriendNoticeKind::Block => Self::FriendBlock {
                travel_user_id,
                friend_travel_user_id,
                status: "block".to_string(),
            },
        }
    }

    /// Serialize to the JSON text frame sent over the socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
