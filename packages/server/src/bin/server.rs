//! Room fan-out chat relay.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomcast-server -- --seed rooms.json
//! ```

use clap::Parser;
use roomcast_server::Config;
use roomcast_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Run the server
    if let Err(e) = roomcast_server::run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
