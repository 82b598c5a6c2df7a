//! Domain layer error definitions.

use thiserror::Error;

use super::value_object::{RoomId, TravelUserId};

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// TravelUserId validation error
    #[error("travel_user_id must be a positive integer (got: {0})")]
    TravelUserIdInvalid(String),

    /// RoomId validation error
    #[error("room_id must be a positive integer (got: {0})")]
    RoomIdInvalid(String),

    /// MessageText validation error
    #[error("message cannot be empty")]
    MessageTextEmpty,
}

/// Errors surfaced by the persistence collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("user {0} not found")]
    IdentityNotFound(TravelUserId),

    /// Backend failure (lock poisoning, worker pool shutdown, ...)
    #[error("storage error: {0}")]
    Storage(String),
}
