//! Router construction and server startup.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::{Config, load_seed_rooms},
    domain::ChatRepository,
    error::ServerError,
    infrastructure::repository::InMemoryChatRepository,
};

use super::{
    handler::{chat_websocket_handler, health_check, notice_websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/ws/chat/{room_id}", get(chat_websocket_handler))
        .route("/ws/user/{travel_user_id}", get(notice_websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `listener` until a shutdown signal arrives.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Seed the in-memory store, bind and serve.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let repository = Arc::new(InMemoryChatRepository::new());
    if let Some(path) = &config.seed {
        let rooms = load_seed_rooms(path)?;
        tracing::info!("Loaded {} room(s) from {}", rooms.len(), path.display());
        for room in rooms {
            repository.save_room(room).await?;
        }
    }

    let state = Arc::new(AppState::new(repository));
    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    serve(listener, state).await?;
    tracing::info!("Server stopped");
    Ok(())
}
