//! UseCase: 部屋単位の処理（メッセージ送信・退出・招待）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RoomCoordinator の handle_send / handle_leave / handle_invite / snapshot_participants
//!
//! ### なぜこのテストが必要か
//! - メンバーでないユーザーのメッセージが保存・配信されないことを保証
//! - メンバー変更のたびに、変更後の参加者一覧が一度だけ配信されることを確認
//! - 退出の冪等性（メンバーでない場合もエラーにしない）を保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：送信・招待・退出
//! - 異常系：非メンバーの送信、入力欠落、存在しない部屋、ストレージ障害

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};

use crate::{
    domain::{
        ChatRepository, GroupEvent, GroupName, Identity, MessageText, RoomId, TravelUserId,
    },
    infrastructure::broadcast::GroupBroadcaster,
};

use super::error::CoordinatorError;

const SEND_REQUIRED_FIELDS: &str = "sender_id and message are required";
const LEAVE_REQUIRED_FIELDS: &str = "sender_id is required";
const INVITE_REQUIRED_FIELDS: &str = "travel_user_id is required";

/// Logic shared by every connection bound to a room.
///
/// Sends and membership changes of one room are serialized by a per-room lock
/// held across mutation and publish, so subscribers see messages in history
/// order and snapshots in mutation order.
pub struct RoomCoordinator {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn ChatRepository>,
    broadcaster: GroupBroadcaster,
    room_locks: Mutex<HashMap<RoomId, Arc<tokio::sync::Mutex<()>>>>,
}

impl RoomCoordinator {
    /// 新しい RoomCoordinator を作成
    pub fn new(repository: Arc<dyn ChatRepository>, broadcaster: GroupBroadcaster) -> Self {
        Self {
            repository,
            broadcaster,
            room_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn broadcaster(&self) -> &GroupBroadcaster {
        &self.broadcaster
    }

    pub async fn room_exists(&self, room_id: RoomId) -> Result<bool, CoordinatorError> {
        Ok(self.repository.room_exists(room_id).await?)
    }

    /// メッセージ送信を実行
    ///
    /// Membership is checked on every call, not cached from connect time.
    ///
    /// # Returns
    ///
    /// * `Ok(DateTime<Utc>)` - 保存されたメッセージのタイムスタンプ
    /// * `Err(CoordinatorError)` - 入力欠落・非メンバー・部屋なし・ストレージ障害
    pub async fn handle_send(
        &self,
        room_id: RoomId,
        sender: Option<TravelUserId>,
        text: Option<String>,
    ) -> Result<DateTime<Utc>, CoordinatorError> {
        let (Some(sender), Some(text)) = (sender, text) else {
            return Err(CoordinatorError::InvalidInput(SEND_REQUIRED_FIELDS.to_string()));
        };
        let text = MessageText::new(text)
            .map_err(|_| CoordinatorError::InvalidInput(SEND_REQUIRED_FIELDS.to_string()))?;

        let lock = self.room_lock(room_id);
        let _guard = lock.lock().await;

        if !self.repository.is_member(room_id, sender).await? {
            return Err(CoordinatorError::NotAParticipant);
        }

        let body = text.as_str().to_string();
        let timestamp = self.repository.create_message(room_id, sender, text).await?;

        let delivered = self.broadcaster.publish(
            &GroupName::for_room(room_id),
            GroupEvent::Message {
                text: body,
                sender,
                timestamp,
            },
        );
        tracing::debug!(
            "Message from '{}' in room {} delivered to {} session(s)",
            sender,
            room_id,
            delivered
        );

        Ok(timestamp)
    }

    /// 退出を実行
    ///
    /// Leaving a room one is not in succeeds without changes. The caller
    /// acknowledges the leaver with a `left` frame.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<TravelUserId>)` - 退出後の参加者一覧
    pub async fn handle_leave(
        &self,
        room_id: RoomId,
        leaver: Option<TravelUserId>,
    ) -> Result<Vec<TravelUserId>, CoordinatorError> {
        let Some(leaver) = leaver else {
            return Err(CoordinatorError::InvalidInput(LEAVE_REQUIRED_FIELDS.to_string()));
        };

        let lock = self.room_lock(room_id);
        let _guard = lock.lock().await;

        let removed = self.repository.remove_member(room_id, leaver).await?;
        if !removed {
            tracing::debug!("'{}' was not a member of room {}", leaver, room_id);
        }

        let participants = self.repository.get_participants(room_id).await?;
        let room_group = GroupName::for_room(room_id);
        self.broadcaster.publish(
            &room_group,
            GroupEvent::ParticipantsSnapshot {
                participants: participants.clone(),
            },
        );
        self.broadcaster
            .publish(&room_group, GroupEvent::RoomUpdate { room_id });
        tracing::info!("'{}' left room {}", leaver, room_id);

        Ok(participants)
    }

    /// 招待を実行
    ///
    /// The invitee's personal group gets a `room_update` notice; it may have
    /// no live connection, in which case the notice is lost. The caller is not
    /// required to be a member of the room.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<TravelUserId>)` - 招待後の参加者一覧
    pub async fn handle_invite(
        &self,
        room_id: RoomId,
        invitee: Option<TravelUserId>,
    ) -> Result<Vec<TravelUserId>, CoordinatorError> {
        let Some(invitee) = invitee else {
            return Err(CoordinatorError::InvalidInput(INVITE_REQUIRED_FIELDS.to_string()));
        };

        let lock = self.room_lock(room_id);
        let _guard = lock.lock().await;

        if !self.repository.room_exists(room_id).await? {
            return Err(CoordinatorError::NotFound(format!("room {} not found", room_id)));
        }
        self.repository.get_or_create_identity(invitee).await?;
        self.repository.add_member(room_id, invitee).await?;

        let participants = self.repository.get_participants(room_id).await?;
        self.broadcaster.publish(
            &GroupName::for_room(room_id),
            GroupEvent::ParticipantsSnapshot {
                participants: participants.clone(),
            },
        );
        let reached = self.broadcaster.publish(
            &GroupName::for_identity(invitee),
            GroupEvent::RoomUpdate { room_id },
        );
        tracing::info!(
            "Sent room_update to {} with room_id {} ({} live session(s))",
            GroupName::for_identity(invitee),
            room_id,
            reached
        );

        Ok(participants)
    }

    /// 現在の参加者一覧を取得
    pub async fn snapshot_participants(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<TravelUserId>, CoordinatorError> {
        Ok(self.repository.get_participants(room_id).await?)
    }

    /// Look up the public representation of a message sender.
    pub async fn resolve_identity(&self, id: TravelUserId) -> Result<Identity, CoordinatorError> {
        Ok(self.repository.get_identity(id).await?)
    }

    fn room_lock(&self, room_id: RoomId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .room_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Locks nobody holds or waits on are dropped, so the map only keeps active rooms.
        locks.retain(|id, lock| *id == room_id || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(room_id).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{GroupEnvelope, RepositoryError, Room, SessionId, repository::MockChatRepository},
        infrastructure::{
            broadcast::{EnvelopeReceiver, Subscription, session_inbox},
            repository::InMemoryChatRepository,
        },
    };

    fn user(id: u64) -> TravelUserId {
        TravelUserId::new(id).unwrap()
    }

    fn room7() -> RoomId {
        RoomId::new(7).unwrap()
    }

    async fn create_test_coordinator() -> (RoomCoordinator, Arc<InMemoryChatRepository>) {
        let repository = Arc::new(InMemoryChatRepository::new());
        repository
            .save_room(Room::new(room7(), "Trip".to_string(), [user(1), user(2)]))
            .await
            .unwrap();
        let coordinator = RoomCoordinator::new(repository.clone(), GroupBroadcaster::new());
        (coordinator, repository)
    }

    fn listen(coordinator: &RoomCoordinator, group: GroupName) -> (Subscription, EnvelopeReceiver) {
        let (tx, rx) = session_inbox();
        let subscription = coordinator
            .broadcaster()
            .subscribe(group, SessionId::generate(), tx);
        (subscription, rx)
    }

    fn drain(rx: &mut EnvelopeReceiver) -> Vec<Arc<GroupEnvelope>> {
        let mut events = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            events.push(envelope);
        }
        events
    }

    #[tokio::test]
    async fn test_handle_send_persists_and_broadcasts() {
        // テスト項目: メンバーの送信は保存され、部屋のグループに配信される
        // given (前提条件):
        let (coordinator, repository) = create_test_coordinator().await;
        let (_sub, mut rx) = listen(&coordinator, GroupName::for_room(room7()));

        // when (操作):
        let timestamp = coordinator
            .handle_send(room7(), Some(user(1)), Some("hi".to_string()))
            .await
            .unwrap();

        // then (期待する結果):
        let messages = repository.list_messages(room7()).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, user(1));
        assert_eq!(messages[0].text.as_str(), "hi");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].event,
            GroupEvent::Message {
                text: "hi".to_string(),
                sender: user(1),
                timestamp,
            }
        );
    }

    #[tokio::test]
    async fn test_handle_send_accepts_long_message() {
        // テスト項目: 長いメッセージでもメンバーからの送信は保存・配信される
        // given (前提条件):
        let (coordinator, repository) = create_test_coordinator().await;
        let (_sub, mut rx) = listen(&coordinator, GroupName::for_room(room7()));
        let long = "a".repeat(10_001);

        // when (操作):
        let result = coordinator
            .handle_send(room7(), Some(user(1)), Some(long.clone()))
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        let messages = repository.list_messages(room7()).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text.as_str(), long);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0].event, GroupEvent::Message { text, .. } if *text == long));
    }

    #[tokio::test]
    async fn test_concurrent_sends_are_broadcast_in_history_order() {
        // テスト項目: 並行した送信でも、配信順が保存順（タイムスタンプ順）と一致する
        // given (前提条件):
        let (coordinator, repository) = create_test_coordinator().await;
        let coordinator = Arc::new(coordinator);
        let (_sub, mut rx) = listen(&coordinator, GroupName::for_room(room7()));

        // when (操作):
        let mut handles = Vec::new();
        for i in 0..20u64 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .handle_send(room7(), Some(user(1 + i % 2)), Some(format!("m{i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // then (期待する結果):
        let broadcast: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match &e.event {
                GroupEvent::Message {
                    text, timestamp, ..
                } => Some((text.clone(), *timestamp)),
                _ => None,
            })
            .collect();
        let history: Vec<_> = repository
            .list_messages(room7())
            .await
            .unwrap()
            .into_iter()
            .map(|m| (m.text.as_str().to_string(), m.created_at))
            .collect();
        assert_eq!(broadcast.len(), 20);
        assert_eq!(broadcast, history);
        assert!(broadcast.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[tokio::test]
    async fn test_idle_room_locks_are_pruned() {
        // テスト項目: 使われていない部屋ロックは次のロック取得時に破棄され、使用中のものは残る
        // given (前提条件):
        let (coordinator, _repository) = create_test_coordinator().await;
        coordinator.handle_leave(room7(), Some(user(2))).await.unwrap();
        let room8 = RoomId::new(8).unwrap();
        let room9 = RoomId::new(9).unwrap();

        // when (操作):
        let held = coordinator.room_lock(room8);
        let _other = coordinator.room_lock(room9);

        // then (期待する結果):
        let locks = coordinator.room_locks.lock().unwrap();
        assert_eq!(locks.len(), 2);
        assert!(!locks.contains_key(&room7()));
        assert!(locks.contains_key(&room8));
        drop(held);
    }

    #[tokio::test]
    async fn test_handle_send_from_non_member_fails() {
        // テスト項目: 非メンバーの送信は NotAParticipant になり、保存も配信もされない
        // given (前提条件):
        let (coordinator, repository) = create_test_coordinator().await;
        let (_sub, mut rx) = listen(&coordinator, GroupName::for_room(room7()));

        // when (操作):
        let result = coordinator
            .handle_send(room7(), Some(user(3)), Some("hi".to_string()))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(CoordinatorError::NotAParticipant));
        assert!(repository.list_messages(room7()).await.unwrap().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_handle_send_missing_fields_is_invalid_input() {
        // テスト項目: 送信者・本文の欠落や空文字は InvalidInput になる
        // given (前提条件):
        let (coordinator, _repository) = create_test_coordinator().await;
        let expected = Err(CoordinatorError::InvalidInput(SEND_REQUIRED_FIELDS.to_string()));

        // then (期待する結果):
        assert_eq!(
            coordinator.handle_send(room7(), None, Some("hi".to_string())).await,
            expected
        );
        assert_eq!(coordinator.handle_send(room7(), Some(user(1)), None).await, expected);
        assert_eq!(
            coordinator
                .handle_send(room7(), Some(user(1)), Some(String::new()))
                .await,
            expected
        );
    }

    #[tokio::test]
    async fn test_handle_send_rechecks_membership_after_leave() {
        // テスト項目: 退出後は同じ接続からでも送信できない
        // given (前提条件):
        let (coordinator, _repository) = create_test_coordinator().await;
        coordinator.handle_leave(room7(), Some(user(2))).await.unwrap();

        // when (操作):
        let result = coordinator
            .handle_send(room7(), Some(user(2)), Some("still here?".to_string()))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(CoordinatorError::NotAParticipant));
    }

    #[tokio::test]
    async fn test_handle_send_to_missing_room_is_not_found() {
        // テスト項目: 存在しない部屋への送信は NotFound になる
        // given (前提条件):
        let (coordinator, _repository) = create_test_coordinator().await;

        // when (操作):
        let result = coordinator
            .handle_send(RoomId::new(99).unwrap(), Some(user(1)), Some("hi".to_string()))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(CoordinatorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_handle_invite_updates_room_and_notifies_invitee() {
        // テスト項目: 招待でメンバーが増え、部屋へ参加者一覧、招待先へ room_update が届く
        // given (前提条件):
        let (coordinator, repository) = create_test_coordinator().await;
        let (_room_sub, mut room_rx) = listen(&coordinator, GroupName::for_room(room7()));
        let (_user_sub, mut user_rx) = listen(&coordinator, GroupName::for_identity(user(3)));

        // when (操作):
        let participants = coordinator.handle_invite(room7(), Some(user(3))).await.unwrap();

        // then (期待する結果):
        assert_eq!(participants, vec![user(1), user(2), user(3)]);
        assert!(repository.get_identity(user(3)).await.is_ok());

        let room_events = drain(&mut room_rx);
        assert_eq!(room_events.len(), 1);
        assert_eq!(
            room_events[0].event,
            GroupEvent::ParticipantsSnapshot {
                participants: vec![user(1), user(2), user(3)]
            }
        );

        let user_events = drain(&mut user_rx);
        assert_eq!(user_events.len(), 1);
        assert_eq!(user_events[0].event, GroupEvent::RoomUpdate { room_id: room7() });
    }

    #[tokio::test]
    async fn test_handle_invite_existing_member_keeps_set() {
        // テスト項目: 既存メンバーの招待はメンバー集合を変えない
        // given (前提条件):
        let (coordinator, _repository) = create_test_coordinator().await;

        // when (操作):
        let participants = coordinator.handle_invite(room7(), Some(user(2))).await.unwrap();

        // then (期待する結果):
        assert_eq!(participants, vec![user(1), user(2)]);
    }

    #[tokio::test]
    async fn test_handle_invite_missing_room_creates_nothing() {
        // テスト項目: 存在しない部屋への招待は NotFound で、ユーザーも作られない
        // given (前提条件):
        let (coordinator, repository) = create_test_coordinator().await;

        // when (操作):
        let result = coordinator
            .handle_invite(RoomId::new(99).unwrap(), Some(user(5)))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(CoordinatorError::NotFound(_))));
        assert!(repository.get_identity(user(5)).await.is_err());
    }

    #[tokio::test]
    async fn test_handle_leave_broadcasts_snapshot_then_room_update() {
        // テスト項目: 退出で参加者一覧 → room_update の順に配信される
        // given (前提条件):
        let (coordinator, _repository) = create_test_coordinator().await;
        let (_sub, mut rx) = listen(&coordinator, GroupName::for_room(room7()));

        // when (操作):
        let participants = coordinator.handle_leave(room7(), Some(user(2))).await.unwrap();

        // then (期待する結果):
        assert_eq!(participants, vec![user(1)]);
        let events: Vec<_> = drain(&mut rx).into_iter().map(|e| e.event.clone()).collect();
        assert_eq!(
            events,
            vec![
                GroupEvent::ParticipantsSnapshot {
                    participants: vec![user(1)]
                },
                GroupEvent::RoomUpdate { room_id: room7() },
            ]
        );
    }

    #[tokio::test]
    async fn test_handle_leave_when_not_member_is_noop() {
        // テスト項目: メンバーでないユーザーの退出は成功し、メンバー集合は変わらない
        // given (前提条件):
        let (coordinator, _repository) = create_test_coordinator().await;

        // when (操作):
        let result = coordinator.handle_leave(room7(), Some(user(9))).await;

        // then (期待する結果):
        assert_eq!(result, Ok(vec![user(1), user(2)]));
    }

    #[tokio::test]
    async fn test_handle_leave_missing_sender_is_invalid_input() {
        // テスト項目: sender_id の欠落は InvalidInput になる
        let (coordinator, _repository) = create_test_coordinator().await;
        assert_eq!(
            coordinator.handle_leave(room7(), None).await,
            Err(CoordinatorError::InvalidInput(LEAVE_REQUIRED_FIELDS.to_string()))
        );
    }

    #[tokio::test]
    async fn test_concurrent_membership_changes_publish_one_snapshot_each() {
        // テスト項目: 並行した招待/退出でも、操作ごとに一つずつ参加者一覧が配信され、
        //             最後の一覧が最終的なメンバー集合と一致する
        // given (前提条件):
        let (coordinator, repository) = create_test_coordinator().await;
        let coordinator = Arc::new(coordinator);
        let (_sub, mut rx) = listen(&coordinator, GroupName::for_room(room7()));

        // when (操作):
        let mut handles = Vec::new();
        for id in 10..20u64 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator.handle_invite(room7(), Some(user(id))).await
            }));
        }
        let leaver = coordinator.clone();
        handles.push(tokio::spawn(async move {
            leaver.handle_leave(room7(), Some(user(1))).await
        }));
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // then (期待する結果):
        let snapshots: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match &e.event {
                GroupEvent::ParticipantsSnapshot { participants } => Some(participants.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(snapshots.len(), 11);
        assert_eq!(
            snapshots.last().unwrap(),
            &repository.get_participants(room7()).await.unwrap()
        );
        assert_eq!(snapshots.last().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn test_storage_failure_is_upstream_failure() {
        // テスト項目: ストレージ障害は UpstreamFailure として返され、配信されない
        // given (前提条件):
        let mut repository = MockChatRepository::new();
        repository.expect_is_member().returning(|_, _| Ok(true));
        repository
            .expect_create_message()
            .returning(|_, _, _| Err(RepositoryError::Storage("disk full".to_string())));
        let coordinator = RoomCoordinator::new(Arc::new(repository), GroupBroadcaster::new());
        let (_sub, mut rx) = listen(&coordinator, GroupName::for_room(room7()));

        // when (操作):
        let result = coordinator
            .handle_send(room7(), Some(user(1)), Some("hi".to_string()))
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(CoordinatorError::UpstreamFailure("disk full".to_string()))
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_participants_of_missing_room() {
        // テスト項目: 存在しない部屋の参加者一覧は NotFound になる
        let mut repository = MockChatRepository::new();
        repository
            .expect_get_participants()
            .returning(|room_id| Err(RepositoryError::RoomNotFound(room_id)));
        let coordinator = RoomCoordinator::new(Arc::new(repository), GroupBroadcaster::new());

        let result = coordinator.snapshot_participants(room7()).await;

        assert_eq!(
            result,
            Err(CoordinatorError::NotFound("room 7 not found".to_string()))
        );
    }
}
