//! Process-wide group broadcast fabric.
//!
//! Every live connection owns one unbounded inbox and registers a sender for
//! it in each group it follows. `publish` pushes into the inboxes of the
//! group's current subscribers while holding the registry lock, so two
//! publishes issued one after the other reach every shared subscriber in that
//! order. Nothing is buffered for sessions that subscribe later.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use tokio::sync::mpsc;

use crate::domain::{GroupEnvelope, GroupEvent, GroupName, SessionId};

/// Sending half of a session inbox
pub type EnvelopeSender = mpsc::UnboundedSender<Arc<GroupEnvelope>>;
/// Receiving half of a session inbox
pub type EnvelopeReceiver = mpsc::UnboundedReceiver<Arc<GroupEnvelope>>;

/// Create the inbox of a new session.
pub fn session_inbox() -> (EnvelopeSender, EnvelopeReceiver) {
    mpsc::unbounded_channel()
}

type Registry = HashMap<GroupName, HashMap<SessionId, EnvelopeSender>>;

/// Shared publish/subscribe service keyed by group name.
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone, Default)]
pub struct GroupBroadcaster {
    groups: Arc<RwLock<Registry>>,
}

impl GroupBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` in `group`.
    ///
    /// The returned guard unsubscribes when dropped. Subscribing the same
    /// session twice replaces its sender; either guard then removes it.
    pub fn subscribe(
        &self,
        group: GroupName,
        session: SessionId,
        sender: EnvelopeSender,
    ) -> Subscription {
        {
            let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
            groups
                .entry(group.clone())
                .or_default()
                .insert(session, sender);
        }
        tracing::debug!("Session '{}' subscribed to '{}'", session, group);

        Subscription {
            broadcaster: self.clone(),
            group,
            session,
        }
    }

    /// Remove `session` from `group`. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, group: &GroupName, session: SessionId) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let Some(members) = groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(&session).is_some();
        if members.is_empty() {
            groups.remove(group);
        }
        if removed {
            tracing::debug!("Session '{}' unsubscribed from '{}'", session, group);
        }
        removed
    }

    /// Deliver `event` to every session currently subscribed to `group`.
    ///
    /// Returns the number of inboxes the event was pushed into. Inboxes whose
    /// session already went away are skipped.
    pub fn publish(&self, group: &GroupName, event: GroupEvent) -> usize {
        let envelope = Arc::new(GroupEnvelope {
            group: group.clone(),
            event,
        });

        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        let Some(members) = groups.get(group) else {
            tracing::debug!("No subscribers in '{}', event dropped", group);
            return 0;
        };

        let mut delivered = 0;
        for (session, sender) in members {
            if sender.send(Arc::clone(&envelope)).is_ok() {
                delivered += 1;
            } else {
                tracing::warn!("Inbox of session '{}' is closed", session);
            }
        }
        delivered
    }

    /// Number of sessions subscribed to `group`.
    pub fn subscriber_count(&self, group: &GroupName) -> usize {
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        groups.get(group).map_or(0, HashMap::len)
    }

    /// Number of groups with at least one subscriber.
    pub fn group_count(&self) -> usize {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Live binding between a session and a group.
///
/// Dropping the guard releases the binding, on every exit path.
pub struct Subscription {
    broadcaster: GroupBroadcaster,
    group: GroupName,
    session: SessionId,
}

impl Subscription {
    pub fn group(&self) -> &GroupName {
        &self.group
    }

    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(&self.group, self.session);
    }
}
