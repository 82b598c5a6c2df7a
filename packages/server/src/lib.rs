//! Real-time chat relay library.
//!
//! Clients hold one WebSocket per room and receive the room's messages and
//! membership changes through a process-wide group broadcast fabric. A
//! second endpoint binds a connection to a user's personal group for
//! cross-room notices (invitations, friendship events).

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::Config;
pub use ui::run as run_server;
