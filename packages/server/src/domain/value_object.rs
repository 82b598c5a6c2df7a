//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::error::ValueObjectError;

/// User identifier issued by the external identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TravelUserId(u64);

impl TravelUserId {
    /// Create a new TravelUserId.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::TravelUserIdInvalid` for `0`, which the
    /// identity service never issues.
    pub fn new(id: u64) -> Result<Self, ValueObjectError> {
        if id == 0 {
            return Err(ValueObjectError::TravelUserIdInvalid(id.to_string()));
        }
        Ok(Self(id))
    }

    /// Get the inner numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<&str> for TravelUserId {
    type Error = ValueObjectError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let id = value
            .trim()
            .parse::<u64>()
            .map_err(|_| ValueObjectError::TravelUserIdInvalid(value.to_string()))?;
        Self::new(id)
    }
}

impl fmt::Display for TravelUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier value object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(u64);

impl RoomId {
    /// Create a new RoomId.
    ///
    /// # Errors
    ///
    /// Returns `ValueObjectError::RoomIdInvalid` for `0`.
    pub fn new(id: u64) -> Result<Self, ValueObjectError> {
        if id == 0 {
            return Err(ValueObjectError::RoomIdInvalid(id.to_string()));
        }
        Ok(Self(id))
    }

    /// Get the inner numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<&str> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let id = value
            .trim()
            .parse::<u64>()
            .map_err(|_| ValueObjectError::RoomIdInvalid(value.to_string()))?;
        Self::new(id)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message body value object.
///
/// Represents the text of a chat message with validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageText(String);

impl MessageText {
    /// Create a new MessageText.
    ///
    /// # Errors
    ///
    /// Empty text is rejected. There is no upper length limit.
    pub fn new(text: String) -> Result<Self, ValueObjectError> {
        if text.is_empty() {
            return Err(ValueObjectError::MessageTextEmpty);
        }
        Ok(Self(text))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a broadcast group.
///
/// Room groups are `chat_<room_id>` and identity groups are
/// `user_<travel_user_id>`. Invite notices are addressed by this name, so
/// the format must not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupName(String);

impl GroupName {
    /// Group carrying every event of one room.
    pub fn for_room(room_id: RoomId) -> Self {
        Self(format!("chat_{}", room_id))
    }

    /// Personal group of one identity, for cross-room notices.
    pub fn for_identity(user_id: TravelUserId) -> Self {
        Self(format!("user_{}", user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
