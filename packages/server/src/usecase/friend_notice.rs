//! UseCase: 友達関係の通知
//!
//! 友達申請・承認・拒否・ブロックを、各ユーザーの個人グループへ中継します。
//! 永続化は行いません（友達関係そのものは外部の identity サービスが管理します）。

use crate::{
    domain::{FriendNoticeKind, GroupEvent, GroupName, TravelUserId},
    infrastructure::broadcast::GroupBroadcaster,
};

use super::error::CoordinatorError;

/// Friendship action requested by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendAction {
    Request,
    Accept,
    Refuse,
    Block,
}

/// 友達通知のユースケース
pub struct FriendNoticeUseCase {
    broadcaster: GroupBroadcaster,
}

impl FriendNoticeUseCase {
    pub fn new(broadcaster: GroupBroadcaster) -> Self {
        Self { broadcaster }
    }

    /// 通知を配信
    ///
    /// | action  | requester group | target group |
    /// |---------|-----------------|--------------|
    /// | Request | `Request`       | `Standby`    |
    /// | Accept  | `Accept`        | `Accept`     |
    /// | Refuse  | `Refuse`        | `Refuse`     |
    /// | Block   | `Block`         | -            |
    pub fn execute(
        &self,
        action: FriendAction,
        requester: Option<TravelUserId>,
        target: Option<TravelUserId>,
    ) -> Result<(), CoordinatorError> {
        let (Some(requester), Some(target)) = (requester, target) else {
            return Err(CoordinatorError::InvalidInput(
                "travel_user_id and friend_travel_user_id are required".to_string(),
            ));
        };

        let (to_requester, to_target) = match action {
            FriendAction::Request => (FriendNoticeKind::Request, Some(FriendNoticeKind::Standby)),
            FriendAction::Accept => (FriendNoticeKind::Accept, Some(FriendNoticeKind::Accept)),
            FriendAction::Refuse => (FriendNoticeKind::Refuse, Some(FriendNoticeKind::Refuse)),
            FriendAction::Block => (FriendNoticeKind::Block, None),
        };

        self.notify(requester, to_requester, requester, target);
        if let Some(kind) = to_target {
            self.notify(target, kind, requester, target);
        }
        Ok(())
    }

    fn notify(
        &self,
        recipient: TravelUserId,
        kind: FriendNoticeKind,
        travel_user_id: TravelUserId,
        friend_travel_user_id: TravelUserId,
    ) {
        let group = GroupName::for_identity(recipient);
        let reached = self.broadcaster.publish(
            &group,
            GroupEvent::FriendNotice {
                kind,
                travel_user_id,
                friend_travel_user_id,
            },
        );
        tracing::debug!("Sent {:?} notice to '{}' ({} session(s))", kind, group, reached);
    }
}
