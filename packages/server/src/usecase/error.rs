//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::RepositoryError;

/// Failures of room and notice operations.
///
/// None of them is fatal to a connection; sessions report them to the
/// requesting client and keep running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// A required field is missing or empty
    #[error("{0}")]
    InvalidInput(String),

    #[error("only room participants can send messages")]
    NotAParticipant,

    /// Room or user does not exist
    #[error("{0}")]
    NotFound(String),

    /// Persistence or identity service failure
    #[error("operation failed: {0}")]
    UpstreamFailure(String),
}

impl From<RepositoryError> for CoordinatorError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::RoomNotFound(_) | RepositoryError::IdentityNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            RepositoryError::Storage(reason) => Self::UpstreamFailure(reason),
        }
    }
}
