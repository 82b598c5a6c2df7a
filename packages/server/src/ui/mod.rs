//! WebSocket chat relay server.

mod handler;
mod runner;
pub mod session;
mod signal;
pub mod state;

pub use runner::{build_router, run, serve};
