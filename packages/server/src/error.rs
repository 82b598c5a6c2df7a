//! Top-level server errors.

use thiserror::Error;

use crate::{config::ConfigError, domain::RepositoryError};

/// Errors that stop the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to seed rooms: {0}")]
    Seed(#[from] RepositoryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
