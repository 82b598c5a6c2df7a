//! Persistence collaborator interface.
//!
//! The use case layer depends on this trait only; implementations live in
//! `infrastructure::repository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    entity::{ChatMessage, Identity, Room},
    error::RepositoryError,
    value_object::{MessageText, RoomId, TravelUserId},
};

/// Access to rooms, members, messages and identities.
///
/// Every call may block on storage; implementations must keep that work off
/// the async worker threads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert or replace a room. Identities for its members are created as needed.
    async fn save_room(&self, room: Room) -> Result<(), RepositoryError>;

    async fn room_exists(&self, room_id: RoomId) -> Result<bool, RepositoryError>;

    /// Append a message and return its server-assigned timestamp.
    async fn create_message(
        &self,
        room_id: RoomId,
        sender: TravelUserId,
        text: MessageText,
    ) -> Result<DateTime<Utc>, RepositoryError>;

    /// Messages of a room in creation order.
    async fn list_messages(&self, room_id: RoomId) -> Result<Vec<ChatMessage>, RepositoryError>;

    async fn get_participants(&self, room_id: RoomId) -> Result<Vec<TravelUserId>, RepositoryError>;

    /// Add a member; `Ok(false)` when it already was one.
    async fn add_member(&self, room_id: RoomId, member: TravelUserId)
    -> Result<bool, RepositoryError>;

    /// Remove a member; `Ok(false)` when it was not one.
    async fn remove_member(
        &self,
        room_id: RoomId,
        member: TravelUserId,
    ) -> Result<bool, RepositoryError>;

    async fn is_member(&self, room_id: RoomId, member: TravelUserId)
    -> Result<bool, RepositoryError>;

    async fn get_or_create_identity(&self, id: TravelUserId) -> Result<Identity, RepositoryError>;

    async fn get_identity(&self, id: TravelUserId) -> Result<Identity, RepositoryError>;
}
