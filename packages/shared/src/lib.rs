//! Utilities shared by the Roomcast binaries.

pub mod logger;
pub mod time;
