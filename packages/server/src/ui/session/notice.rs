//! Session bound to a user's personal group.

use async_trait::async_trait;

use crate::{
    domain::{GroupName, SessionId, TravelUserId},
    infrastructure::{
        broadcast::{EnvelopeSender, GroupBroadcaster, Subscription},
        dto::websocket::NoticeClientEvent,
    },
    usecase::{FriendAction, FriendNoticeUseCase},
};

use super::{Flow, InboundHandler, ReplySender, reply_error};

/// Receives invite notices and relays friendship notices for one user.
pub struct NoticeSession {
    id: SessionId,
    user_id: TravelUserId,
    subscription: Option<Subscription>,
    notices: FriendNoticeUseCase,
}

impl NoticeSession {
    pub fn new(user_id: TravelUserId, broadcaster: &GroupBroadcaster, inbox: EnvelopeSender) -> Self {
        let id = SessionId::generate();
        let subscription = broadcaster.subscribe(GroupName::for_identity(user_id), id, inbox);
        Self {
            id,
            user_id,
            subscription: Some(subscription),
            notices: FriendNoticeUseCase::new(broadcaster.clone()),
        }
    }
}

#[async_trait]
impl InboundHandler for NoticeSession {
    fn describe(&self) -> String {
        format!("session '{}' (user {})", self.id, self.user_id)
    }

    async fn on_text(&mut self, text: &str, replies: &ReplySender) -> Flow {
        let (action, payload) = match NoticeClientEvent::decode(text) {
            NoticeClientEvent::FriendRequest(p) => (FriendAction::Request, p),
            NoticeClientEvent::FriendAccept(p) => (FriendAction::Accept, p),
            NoticeClientEvent::FriendRefuse(p) => (FriendAction::Refuse, p),
            NoticeClientEvent::FriendBlock(p) => (FriendAction::Block, p),
            NoticeClientEvent::Ignored(reason) => {
                tracing::debug!("{}: ignored frame ({:?})", self.describe(), reason);
                return Flow::Continue;
            }
        };

        if let Err(e) =
            self.notices
                .execute(action, payload.travel_user_id, payload.friend_travel_user_id)
        {
            reply_error(replies, &self.describe(), &e);
        }
        Flow::Continue
    }

    fn on_closed(&mut self) {
        self.subscription = None;
        tracing::info!("{}: closed", self.describe());
    }
}
