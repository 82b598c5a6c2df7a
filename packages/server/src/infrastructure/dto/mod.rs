//! Data transfer objects exchanged with clients and configuration files.

pub mod seed;
pub mod websocket;
