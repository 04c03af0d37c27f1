//! Session and channel-binding registry.
//!
//! Maps each platform user to at most one relay session, and each of that
//! session's joined channels to the platform thread created for it. All
//! bindings live inside the session entry, so removing a session atomically
//! removes every mapping derived from it.

pub mod error;
pub mod session;

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use chatrelay_common::{ChannelName, ItemId, ThreadAnchor, UserId};

pub use error::{DirectoryError, Result};
pub use session::{ChannelBinding, JoinState, Session, SessionId};

/// Snapshot of the per-session fields callers need outside the map lock.
#[derive(Debug, Clone)]
pub struct SessionInfo<H> {
    pub id: SessionId,
    pub network: String,
    pub nick: String,
    pub handle: H,
}

/// Concurrent user -> session registry. `H` is the connection handle stored
/// per session; it is cloned out of the map so callers never hold a shard
/// lock across an await point.
pub struct Directory<H> {
    sessions: DashMap<UserId, Session<H>>,
}

impl<H> Default for Directory<H> {
    fn default() -> Self {
        Self { sessions: DashMap::new() }
    }
}

impl<H: Clone> Directory<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims the user's session slot. Fails without modifying
    /// the registry if a session already exists, so two concurrent logons
    /// can never both win.
    pub fn insert_session(&self, user_id: UserId, session: Session<H>) -> Result<SessionId> {
        match self.sessions.entry(user_id) {
            Entry::Occupied(occupied) => {
                Err(DirectoryError::SessionExists(occupied.key().clone()))
            }
            Entry::Vacant(vacant) => {
                let id = session.id();
                debug!(user_id = %vacant.key(), session_id = %id, "session registered");
                vacant.insert(session);
                Ok(id)
            }
        }
    }

    pub fn session_for_user(&self, user_id: &UserId) -> Option<SessionInfo<H>> {
        self.sessions.get(user_id).map(|session| SessionInfo {
            id: session.id(),
            network: session.network().to_string(),
            nick: session.nick().to_string(),
            handle: session.handle().clone(),
        })
    }

    /// Records the conversation item the logon command arrived in. Network
    /// notices with no channel of their own are surfaced there.
    pub fn bind_origin(&self, user_id: &UserId, anchor: ThreadAnchor) {
        if let Some(mut session) = self.sessions.get_mut(user_id) {
            session.set_origin(anchor);
        }
    }

    pub fn origin_anchor(&self, user_id: &UserId) -> Option<ThreadAnchor> {
        self.sessions.get(user_id)?.origin().cloned()
    }

    /// Binds a channel to the thread item just created for it. The binding
    /// starts `Pending` and is promoted once the relay confirms the join.
    pub fn bind_channel(&self, user_id: &UserId, channel: ChannelName, anchor: ThreadAnchor) {
        if let Some(mut session) = self.sessions.get_mut(user_id) {
            debug!(user_id = %user_id, channel = %channel, "channel bound");
            session.bind_channel(channel, anchor);
        }
    }

    /// Promotes a pending binding to `Confirmed`, returning its anchor.
    pub fn confirm_channel(&self, user_id: &UserId, channel: &ChannelName) -> Option<ThreadAnchor> {
        self.sessions.get_mut(user_id)?.confirm_channel(channel)
    }

    pub fn channel_state(&self, user_id: &UserId, channel: &ChannelName) -> Option<JoinState> {
        self.sessions
            .get(user_id)?
            .binding(channel)
            .map(|binding| binding.state)
    }

    /// Forward lookup: channel -> platform thread anchor.
    pub fn thread_for_channel(
        &self,
        user_id: &UserId,
        channel: &ChannelName,
    ) -> Option<ThreadAnchor> {
        self.sessions
            .get(user_id)?
            .binding(channel)
            .map(|binding| binding.anchor.clone())
    }

    /// Reverse lookup: platform thread item -> channel. Used to decide
    /// whether a message typed in a thread should go out to the relay.
    pub fn channel_for_thread(&self, user_id: &UserId, item_id: &ItemId) -> Option<ChannelName> {
        self.sessions.get(user_id)?.channel_for_item(item_id)
    }

    /// The channel most recently bound for this user. Fallback for relay
    /// confirmations that do not carry a channel name.
    pub fn most_recent_channel(&self, user_id: &UserId) -> Option<ChannelName> {
        self.sessions.get(user_id)?.last_joined().cloned()
    }

    /// Removes the user's session, but only if it is still the one the
    /// caller holds. A teardown racing with a fresh logon must not destroy
    /// the new session.
    pub fn clear_session(&self, user_id: &UserId, session_id: SessionId) -> bool {
        let removed = self
            .sessions
            .remove_if(user_id, |_, session| session.id() == session_id)
            .is_some();
        if removed {
            debug!(user_id = %user_id, session_id = %session_id, "session cleared");
        }
        removed
    }

    /// Removes every session and returns their handles so the caller can
    /// disconnect them. Used at shutdown.
    pub fn drain(&self) -> Vec<(UserId, H)> {
        let users: Vec<UserId> = self
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        users
            .into_iter()
            .filter_map(|user_id| {
                self.sessions
                    .remove(&user_id)
                    .map(|(user_id, session)| (user_id, session.handle().clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
