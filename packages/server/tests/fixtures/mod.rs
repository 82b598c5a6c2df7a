//! Test server and WebSocket client helpers shared by integration tests.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use roomcast_server::{
    domain::{ChatRepository, GroupName, Room, RoomId, TravelUserId},
    infrastructure::repository::InMemoryChatRepository,
    ui::{build_router, state::AppState},
};
use serde_json::Value;
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(3);
const SILENCE_WINDOW: Duration = Duration::from_millis(300);

/// Relay running in-process on an ephemeral port
pub struct TestServer {
    addr: SocketAddr,
    pub repository: Arc<InMemoryChatRepository>,
    state: Arc<AppState>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server knowing room 7 with members {1, 2}.
    pub async fn start() -> Self {
        Self::start_with(vec![room(7, &[1, 2])]).await
    }

    pub async fn start_with(rooms: Vec<Room>) -> Self {
        let repository = Arc::new(InMemoryChatRepository::new());
        for room in rooms {
            repository.save_room(room).await.expect("Failed to seed room");
        }

        let state = Arc::new(AppState::new(repository.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");
        let router = build_router(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Server failed");
        });

        Self {
            addr,
            repository,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Connect to a room and consume the initial participants frame.
    pub async fn join_room(&self, room_id: u64) -> (Client, Value) {
        let (mut client, _) = connect_async(self.ws_url(&format!("/ws/chat/{room_id}")))
            .await
            .expect("Failed to connect");
        let greeting = recv_json(&mut client).await;
        assert_eq!(greeting["type"], "participants", "greeting: {greeting}");
        (client, greeting)
    }

    /// Connect to a user's notice group.
    pub async fn listen_user(&self, user_id: u64) -> Client {
        let (client, _) = connect_async(self.ws_url(&format!("/ws/user/{user_id}")))
            .await
            .expect("Failed to connect");
        client
    }

    /// Live sessions subscribed to a room's group.
    pub fn room_subscribers(&self, room_id: u64) -> usize {
        self.state
            .broadcaster()
            .subscriber_count(&GroupName::for_room(RoomId::new(room_id).unwrap()))
    }

    /// Poll until the room has `expected` live sessions. Panics on timeout.
    pub async fn wait_for_room_subscribers(&self, room_id: u64, expected: usize) {
        let polled = tokio::time::timeout(RECV_TIMEOUT, async {
            while self.room_subscribers(room_id) != expected {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(
            polled.is_ok(),
            "room {room_id} has {} subscriber(s), expected {expected}",
            self.room_subscribers(room_id)
        );
    }

    pub async fn participants(&self, room_id: u64) -> Vec<u64> {
        self.repository
            .get_participants(RoomId::new(room_id).unwrap())
            .await
            .expect("Failed to load participants")
            .into_iter()
            .map(|id| id.value())
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn room(id: u64, members: &[u64]) -> Room {
    Room::new(
        RoomId::new(id).unwrap(),
        format!("room {id}"),
        members.iter().map(|m| TravelUserId::new(*m).unwrap()),
    )
}

pub async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("Failed to send frame");
}

/// Next text frame as JSON. Panics on timeout or close.
pub async fn recv_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Connection closed")
            .expect("WebSocket error");
        match frame {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("Frame is not JSON");
            }
            Message::Close(_) => panic!("Connection closed by server"),
            _ => continue,
        }
    }
}

/// Assert no text frame arrives within a short window.
pub async fn assert_silent(client: &mut Client) {
    match tokio::time::timeout(SILENCE_WINDOW, client.next()).await {
        Err(_) => {}
        Ok(Some(Ok(Message::Text(text)))) => panic!("Unexpected frame: {}", text.as_str()),
        Ok(other) => panic!("Unexpected socket event: {other:?}"),
    }
}

/// Wait for the server to close the connection.
pub async fn expect_closed(client: &mut Client) {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("Timed out waiting for close")
        {
            None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
            Some(Ok(Message::Text(text))) => panic!("Unexpected frame: {}", text.as_str()),
            Some(Ok(_)) => continue,
        }
    }
}

pub fn participant_ids(frame: &Value) -> Vec<u64> {
    frame["participants"]
        .as_array()
        .expect("participants must be an array")
        .iter()
        .map(|p| p["travel_user_id"].as_u64().expect("travel_user_id must be a number"))
        .collect()
}
