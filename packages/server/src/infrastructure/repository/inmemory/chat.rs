//! InMemory Chat Repository 実装
//!
//! ドメイン層が定義する ChatRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ストアは同期の `std::sync::Mutex` で保護し、各操作は
//! `tokio::task::spawn_blocking` 上で実行します。RDB 実装に差し替えても
//! ファンアウト側のタスクがストレージ待ちでブロックされない形を保つためです。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roomcast_shared::time::now_utc;

use crate::domain::{
    ChatMessage, ChatRepository, Identity, MessageText, RepositoryError, Room, RoomId,
    TravelUserId,
};

#[derive(Debug, Default)]
struct Store {
    rooms: HashMap<RoomId, Room>,
    messages: HashMap<RoomId, Vec<ChatMessage>>,
    identities: HashMap<TravelUserId, Identity>,
}

impl Store {
    fn room(&self, room_id: RoomId) -> Result<&Room, RepositoryError> {
        self.rooms
            .get(&room_id)
            .ok_or(RepositoryError::RoomNotFound(room_id))
    }

    fn room_mut(&mut self, room_id: RoomId) -> Result<&mut Room, RepositoryError> {
        self.rooms
            .get_mut(&room_id)
            .ok_or(RepositoryError::RoomNotFound(room_id))
    }

    fn ensure_identity(&mut self, id: TravelUserId) -> &Identity {
        self.identities
            .entry(id)
            .or_insert_with(|| Identity::new(id))
    }
}

/// インメモリ Chat Repository 実装
///
/// 全ての部屋のメンバー集合は一つのロックの下で更新されるため、
/// 招待と退出が競合しても更新が失われることはありません。
#[derive(Clone, Default)]
pub struct InMemoryChatRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryChatRepository {
    /// 空の InMemoryChatRepository を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ストアをロックしてブロッキングスレッド上で `f` を実行する
    async fn with_store<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Store) -> Result<T, RepositoryError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut guard = store
                .lock()
                .map_err(|_| RepositoryError::Storage("store lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| RepositoryError::Storage(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn save_room(&self, room: Room) -> Result<(), RepositoryError> {
        self.with_store(move |store| {
            for member in room.participants() {
                store.ensure_identity(member);
            }
            store.messages.entry(room.id).or_default();
            store.rooms.insert(room.id, room);
            Ok(())
        })
        .await
    }

    async fn room_exists(&self, room_id: RoomId) -> Result<bool, RepositoryError> {
        self.with_store(move |store| Ok(store.rooms.contains_key(&room_id)))
            .await
    }

    async fn create_message(
        &self,
        room_id: RoomId,
        sender: TravelUserId,
        text: MessageText,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        self.with_store(move |store| {
            store.room(room_id)?;
            if !store.identities.contains_key(&sender) {
                return Err(RepositoryError::IdentityNotFound(sender));
            }

            let history = store.messages.entry(room_id).or_default();
            // Keep timestamps non-decreasing even if the wall clock steps back.
            let now = now_utc();
            let created_at = match history.last() {
                Some(last) if last.created_at > now => last.created_at,
                _ => now,
            };
            history.push(ChatMessage {
                room_id,
                sender,
                text,
                created_at,
            });
            Ok(created_at)
        })
        .await
    }

    async fn list_messages(&self, room_id: RoomId) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.with_store(move |store| {
            store.room(room_id)?;
            Ok(store.messages.get(&room_id).cloned().unwrap_or_default())
        })
        .await
    }

    async fn get_participants(&self, room_id: RoomId) -> Result<Vec<TravelUserId>, RepositoryError> {
        self.with_store(move |store| Ok(store.room(room_id)?.participants()))
            .await
    }

    async fn add_member(
        &self,
        room_id: RoomId,
        member: TravelUserId,
    ) -> Result<bool, RepositoryError> {
        self.with_store(move |store| {
            store.room(room_id)?;
            store.ensure_identity(member);
            Ok(store.room_mut(room_id)?.add_member(member))
        })
        .await
    }

    async fn remove_member(
        &self,
        room_id: RoomId,
        member: TravelUserId,
    ) -> Result<bool, RepositoryError> {
        self.with_store(move |store| Ok(store.room_mut(room_id)?.remove_member(&member)))
            .await
    }

    async fn is_member(
        &self,
        room_id: RoomId,
        member: TravelUserId,
    ) -> Result<bool, RepositoryError> {
        self.with_store(move |store| Ok(store.room(room_id)?.is_member(&member)))
            .await
    }

    async fn get_or_create_identity(&self, id: TravelUserId) -> Result<Identity, RepositoryError> {
        self.with_store(move |store| Ok(store.ensure_identity(id).clone()))
            .await
    }

    async fn get_identity(&self, id: TravelUserId) -> Result<Identity, RepositoryError> {
        self.with_store(move |store| {
            store
                .identities
                .get(&id)
                .cloned()
                .ok_or(RepositoryError::IdentityNotFound(id))
        })
        .await
    }
}
