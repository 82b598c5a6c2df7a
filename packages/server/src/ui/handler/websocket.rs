//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State, ws::WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    domain::{RoomId, TravelUserId},
    infrastructure::broadcast::session_inbox,
    ui::{
        session::{ChatSession, NoticeSession, drive_socket},
        state::AppState,
    },
};

/// `GET /ws/chat/{room_id}`
///
/// Unknown rooms are rejected before the upgrade.
pub async fn chat_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let room_id = match RoomId::try_from(room_id.as_str()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Invalid room_id '{}': {}", room_id, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    match state.coordinator.room_exists(room_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Room {} not found. Rejecting connection.", room_id);
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            tracing::error!("Failed to look up room {}: {}", room_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    Ok(ws.on_upgrade(move |socket| async move {
        let coordinator = state.coordinator.clone();
        let (inbox_tx, inbox_rx) = session_inbox();
        let mut session = ChatSession::new(room_id, coordinator.clone());
        let greeting = session.bind(inbox_tx).await;
        drive_socket(socket, Some(greeting), session, inbox_rx, coordinator).await;
    }))
}

/// `GET /ws/user/{travel_user_id}`
pub async fn notice_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = match TravelUserId::try_from(user_id.as_str()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Invalid travel_user_id '{}': {}", user_id, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| async move {
        let (inbox_tx, inbox_rx) = session_inbox();
        let session = NoticeSession::new(user_id, state.broadcaster(), inbox_tx);
        tracing::info!("User {} connected for notices", user_id);
        drive_socket(socket, None, session, inbox_rx, state.coordinator.clone()).await;
    }))
}
