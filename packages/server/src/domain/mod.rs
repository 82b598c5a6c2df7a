//! Domain layer for the chat relay.
//!
//! This module contains business types that are independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod event;
pub mod repository;
pub mod value_object;

pub use entity::{ChatMessage, Identity, Room};
pub use error::{RepositoryError, ValueObjectError};
pub use event::{FriendNoticeKind, GroupEnvelope, GroupEvent};
pub use repository::ChatRepository;
pub use value_object::{GroupName, MessageText, RoomId, SessionId, TravelUserId};
