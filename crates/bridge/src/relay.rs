//! Seam to the relay (IRC) side.
//!
//! A connector turns a user's saved settings into a live session: a handle
//! for outbound operations plus a stream of events from the network. The
//! handle is what the directory stores per user.

use std::sync::Arc;

use {async_trait::async_trait, secrecy::Secret, tokio::sync::mpsc};

use chatrelay_common::ChannelName;

/// Login parameters for one relay session.
pub struct RelayLogin {
    pub network: String,
    pub nick: String,
    pub password: Secret<String>,
}

/// Events a relay session emits.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// The network accepted the registration. Carries the server welcome
    /// line when one was sent.
    Registered { welcome: Option<String> },
    /// Message of the day.
    Motd { text: String },
    /// A message in a channel the session has joined.
    Message {
        from: String,
        channel: ChannelName,
        text: String,
    },
    /// Someone joined a channel. `channel` is absent only for servers that
    /// omit it from the notification.
    Joined {
        nick: String,
        channel: Option<ChannelName>,
    },
    /// A network-level error report.
    Error { message: String },
}

/// Outbound operations on a live relay session.
#[async_trait]
pub trait RelayHandle: Send + Sync {
    async fn join(&self, channel: &ChannelName) -> anyhow::Result<()>;
    async fn part(&self, channel: &ChannelName) -> anyhow::Result<()>;
    async fn say(&self, channel: &ChannelName, text: &str) -> anyhow::Result<()>;
    async fn disconnect(&self) -> anyhow::Result<()>;
}

/// Shared, cloneable relay session handle.
pub type SharedRelayHandle = Arc<dyn RelayHandle>;

/// Establishes relay sessions.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    /// Connects and registers with the network. The receiver yields session
    /// events until the connection closes.
    async fn connect(
        &self,
        login: RelayLogin,
    ) -> anyhow::Result<(SharedRelayHandle, mpsc::Receiver<RelayEvent>)>;
}
