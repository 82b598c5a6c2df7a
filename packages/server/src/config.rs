//! Command line and environment configuration.

use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

use crate::{
    domain::{Room, ValueObjectError},
    infrastructure::dto::seed::SeedRoomDto,
};

/// Room fan-out chat relay
#[derive(Parser, Debug, Clone)]
#[command(name = "roomcast-server", version, about = "Room fan-out chat relay")]
pub struct Config {
    /// Host to bind
    #[arg(long, env = "ROOMCAST_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "ROOMCAST_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "ROOMCAST_LOG", default_value = "debug")]
    pub log_level: String,

    /// JSON file listing the rooms known at startup
    #[arg(long, env = "ROOMCAST_SEED")]
    pub seed: Option<PathBuf>,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read seed file {path}: {source}")]
    ReadSeed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid seed file: {0}")]
    ParseSeed(#[from] serde_json::Error),

    #[error("invalid room in seed file: {0}")]
    InvalidRoom(#[from] ValueObjectError),
}

/// Read the rooms listed in a seed file.
pub fn load_seed_rooms(path: &Path) -> Result<Vec<Room>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadSeed {
        path: path.to_path_buf(),
        source,
    })?;
    let dtos: Vec<SeedRoomDto> = serde_json::from_str(&raw)?;
    let rooms = dtos
        .into_iter()
        .map(Room::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rooms)
}
