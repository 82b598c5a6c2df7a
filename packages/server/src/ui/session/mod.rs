//! Live connection sessions.
//!
//! Each upgraded socket runs two tasks: a reader that decodes client frames
//! and dispatches them to the session, and a writer that renders broadcast
//! envelopes and direct replies onto the socket. The writer drains the
//! broadcast inbox before direct replies, so an acknowledgement never
//! overtakes the broadcasts its own request produced.

mod chat;
mod notice;

pub use chat::{ChatSession, SessionState};
pub use notice::NoticeSession;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{sink::SinkExt, stream::StreamExt};
use roomcast_shared::time::to_rfc3339;
use tokio::sync::mpsc;

use crate::{
    domain::{GroupEnvelope, GroupEvent},
    infrastructure::{broadcast::EnvelopeReceiver, dto::websocket::ServerEvent},
    usecase::{CoordinatorError, RoomCoordinator},
};

/// Replies addressed to the session's own client only
pub type ReplySender = mpsc::UnboundedSender<ServerEvent>;

/// What the reader does after a frame was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Inbound side of a session.
#[async_trait]
pub trait InboundHandler: Send + 'static {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Handle one text frame.
    async fn on_text(&mut self, text: &str, replies: &ReplySender) -> Flow;

    /// Called once when the reader stops normally. Dropping the handler
    /// (abort) releases its subscriptions as well.
    fn on_closed(&mut self);
}

/// Send `error` to the requesting client and log it.
pub(crate) fn reply_error(replies: &ReplySender, who: &str, err: &CoordinatorError) {
    match err {
        CoordinatorError::UpstreamFailure(_) => tracing::error!("{}: {}", who, err),
        _ => tracing::warn!("{}: {}", who, err),
    }
    if replies.send(ServerEvent::error(err)).is_err() {
        tracing::debug!("{}: writer already gone, error not delivered", who);
    }
}

/// Render a broadcast envelope into the frame sent to the client.
///
/// Message senders are resolved to their public representation first.
pub async fn render_envelope(coordinator: &RoomCoordinator, envelope: &GroupEnvelope) -> ServerEvent {
    match &envelope.event {
        GroupEvent::Message {
            text,
            sender,
            timestamp,
        } => match coordinator.resolve_identity(*sender).await {
            Ok(identity) => ServerEvent::Message {
                message: text.clone(),
                sender: identity.id.into(),
                timestamp: to_rfc3339(timestamp),
            },
            Err(e) => {
                tracing::error!("Failed to resolve sender '{}': {}", sender, e);
                ServerEvent::error(e)
            }
        },
        GroupEvent::ParticipantsSnapshot { participants } => {
            ServerEvent::participants(participants)
        }
        GroupEvent::RoomUpdate { room_id } => ServerEvent::room_update(*room_id),
        GroupEvent::FriendNotice {
            kind,
            travel_user_id,
            friend_travel_user_id,
        } => ServerEvent::friend_notice(*kind, *travel_user_id, *friend_travel_user_id),
    }
}

/// Run a bound session until either side of the socket ends.
///
/// `greeting` is written before any broadcast.
pub async fn drive_socket<H: InboundHandler>(
    socket: WebSocket,
    greeting: Option<ServerEvent>,
    mut handler: H,
    mut inbox: EnvelopeReceiver,
    coordinator: Arc<RoomCoordinator>,
) {
    let who = handler.describe();
    let (mut sender, mut receiver) = socket.split();

    if let Some(greeting) = greeting {
        let sent = match greeting.to_json() {
            Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
            Err(e) => {
                tracing::error!("{}: failed to encode greeting: {}", who, e);
                true
            }
        };
        if !sent {
            tracing::error!("{}: failed to send greeting, closing", who);
            return;
        }
    }

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let reader_who = who.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("{}: WebSocket error: {}", reader_who, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("{}: received {}", reader_who, text.as_str());
                    if handler.on_text(text.as_str(), &reply_tx).await == Flow::Close {
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::info!("{}: client requested close", reader_who);
                    break;
                }
                _ => {}
            }
        }
        handler.on_closed();
    });

    let writer_who = who.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;
                Some(envelope) = inbox.recv() => render_envelope(&coordinator, &envelope).await,
                reply = reply_rx.recv() => match reply {
                    Some(event) => event,
                    None => break,
                },
            };

            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("{}: failed to encode frame: {}", writer_who, e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                tracing::debug!("{}: socket closed while sending", writer_who);
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // The reader ending lets the writer flush pending replies; the writer
    // ending means the socket is gone, so the reader is aborted.
    tokio::select! {
        _ = &mut recv_task => {
            let _ = (&mut send_task).await;
        }
        _ = &mut send_task => {
            recv_task.abort();
            let _ = (&mut recv_task).await;
        }
    }

    tracing::info!("{}: disconnected", who);
}
