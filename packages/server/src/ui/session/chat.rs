//! Session bound to one room group.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{GroupName, RoomId, SessionId},
    infrastructure::{
        broadcast::{EnvelopeSender, Subscription},
        dto::websocket::{ChatClientEvent, ServerEvent},
    },
    usecase::RoomCoordinator,
};

use super::{Flow, InboundHandler, ReplySender, reply_error};

/// Lifecycle of a room connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Bound,
    Closed,
}

/// Server-side state of one room connection.
///
/// Holds at most one room subscription; it is released when the session
/// leaves, closes, or is dropped. Disconnecting never touches the room's
/// member set.
pub struct ChatSession {
    id: SessionId,
    room_id: RoomId,
    state: SessionState,
    subscription: Option<Subscription>,
    coordinator: Arc<RoomCoordinator>,
}

impl ChatSession {
    pub fn new(room_id: RoomId, coordinator: Arc<RoomCoordinator>) -> Self {
        Self {
            id: SessionId::generate(),
            room_id,
            state: SessionState::Connecting,
            subscription: None,
            coordinator,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Subscribe to the room group and return the participant snapshot to
    /// send to this client.
    pub async fn bind(&mut self, inbox: EnvelopeSender) -> ServerEvent {
        let subscription = self.coordinator.broadcaster().subscribe(
            GroupName::for_room(self.room_id),
            self.id,
            inbox,
        );
        self.subscription = Some(subscription);
        self.state = SessionState::Bound;
        tracing::info!("{}: bound", self.describe());

        match self.coordinator.snapshot_participants(self.room_id).await {
            Ok(participants) => ServerEvent::participants(&participants),
            Err(e) => {
                tracing::error!("{}: failed to load participants: {}", self.describe(), e);
                ServerEvent::error(e)
            }
        }
    }

    fn unbind(&mut self) {
        // Dropping the guard unsubscribes.
        self.subscription = None;
        self.state = SessionState::Closed;
    }
}

#[async_trait]
impl InboundHandler for ChatSession {
    fn describe(&self) -> String {
        format!("session '{}' (room {})", self.id, self.room_id)
    }

    async fn on_text(&mut self, text: &str, replies: &ReplySender) -> Flow {
        let who = self.describe();
        match ChatClientEvent::decode(text) {
            ChatClientEvent::Message(payload) => {
                if let Err(e) = self
                    .coordinator
                    .handle_send(self.room_id, payload.sender_id, payload.message)
                    .await
                {
                    reply_error(replies, &who, &e);
                }
            }
            ChatClientEvent::Leave(payload) => {
                match self
                    .coordinator
                    .handle_leave(self.room_id, payload.sender_id)
                    .await
                {
                    Ok(_) => {
                        let _ = replies.send(ServerEvent::left(self.room_id));
                        self.unbind();
                        return Flow::Close;
                    }
                    Err(e) => reply_error(replies, &who, &e),
                }
            }
            ChatClientEvent::Invite(payload) => {
                match self
                    .coordinator
                    .handle_invite(self.room_id, payload.travel_user_id)
                    .await
                {
                    Ok(_) => {
                        let _ = replies.send(ServerEvent::invite(self.room_id));
                    }
                    Err(e) => reply_error(replies, &who, &e),
                }
            }
            ChatClientEvent::Ignored(reason) => {
                tracing::debug!("{}: ignored frame ({:?})", who, reason);
            }
        }
        Flow::Continue
    }

    fn on_closed(&mut self) {
        self.unbind();
        tracing::info!("{}: closed", self.describe());
    }
}
