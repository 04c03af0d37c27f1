use std::{collections::HashMap, fmt, time::SystemTime};

use uuid::Uuid;

use chatrelay_common::{ChannelName, ThreadAnchor};

/// Identity of one relay login. Used to guard against clearing a newer
/// session with a teardown that belongs to an older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether the relay network has confirmed a join yet. Bindings start out
/// `Pending` because the platform thread is created before the relay
/// confirms membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinState {
    Pending,
    Confirmed,
}

/// Association between a relay channel and the platform thread created to
/// represent it.
#[derive(Debug, Clone)]
pub struct ChannelBinding {
    pub anchor: ThreadAnchor,
    pub joined_at: SystemTime,
    pub state: JoinState,
}

/// One user's relay-network login. Owns the channel bindings made during
/// its lifetime; destroying the session destroys them with it.
pub struct Session<H> {
    id: SessionId,
    network: String,
    nick: String,
    handle: H,
    origin: Option<ThreadAnchor>,
    channels: HashMap<ChannelName, ChannelBinding>,
    last_joined: Option<ChannelName>,
}

impl<H> Session<H> {
    pub fn new(network: impl Into<String>, nick: impl Into<String>, handle: H) -> Self {
        Self {
            id: SessionId::generate(),
            network: network.into(),
            nick: nick.into(),
            handle,
            origin: None,
            channels: HashMap::new(),
            last_joined: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub(crate) fn set_origin(&mut self, anchor: ThreadAnchor) {
        self.origin = Some(anchor);
    }

    pub(crate) fn origin(&self) -> Option<&ThreadAnchor> {
        self.origin.as_ref()
    }

    pub(crate) fn bind_channel(&mut self, channel: ChannelName, anchor: ThreadAnchor) {
        self.last_joined = Some(channel.clone());
        self.channels.insert(channel, ChannelBinding {
            anchor,
            joined_at: SystemTime::now(),
            state: JoinState::Pending,
        });
    }

    pub(crate) fn confirm_channel(&mut self, channel: &ChannelName) -> Option<ThreadAnchor> {
        let binding = self.channels.get_mut(channel)?;
        binding.state = JoinState::Confirmed;
        Some(binding.anchor.clone())
    }

    pub(crate) fn binding(&self, channel: &ChannelName) -> Option<&ChannelBinding> {
        self.channels.get(channel)
    }

    /// Reverse lookup: which channel owns this thread item? Channel names
    /// within one session are unique, so the linear scan resolves to at
    /// most one binding.
    pub(crate) fn channel_for_item(
        &self,
        item_id: &chatrelay_common::ItemId,
    ) -> Option<ChannelName> {
        self.channels
            .iter()
            .find(|(_, binding)| &binding.anchor.item_id == item_id)
            .map(|(channel, _)| channel.clone())
    }

    pub(crate) fn last_joined(&self) -> Option<&ChannelName> {
        self.last_joined.as_ref()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl<H> fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("network", &self.network)
            .field("nick", &self.nick)
            .field("channels", &self.channels.len())
            .finish_non_exhaustive()
    }
}
