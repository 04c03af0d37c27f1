//! Seam to the hosted messaging platform.
//!
//! The bridge drives the platform through a bot account: it reads
//! conversation items addressed to it and posts replies and new thread
//! items. The concrete client lives behind [`PlatformClient`] so the
//! controller and router can be exercised without a live tenant.

use {async_trait::async_trait, secrecy::Secret};

use chatrelay_common::{ConvId, ItemId, ThreadAnchor, UserId};

/// Bot account credentials for the platform.
#[derive(Clone)]
pub struct BotCredentials {
    pub domain: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl From<&chatrelay_config::PlatformConfig> for BotCredentials {
    fn from(cfg: &chatrelay_config::PlatformConfig) -> Self {
        Self {
            domain: cfg.domain.clone(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
        }
    }
}

impl std::fmt::Debug for BotCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotCredentials")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// A text item received from a platform conversation.
#[derive(Debug, Clone)]
pub struct InboundItem {
    pub item_id: ItemId,
    pub conv_id: ConvId,
    /// Set when the item was posted inside a thread.
    pub parent_item_id: Option<ItemId>,
    pub creator_id: UserId,
    /// Raw text content. `None` for non-text items.
    pub text: Option<String>,
}

impl InboundItem {
    /// Where replies to this item should attach: its thread root when it
    /// was posted in a thread, otherwise the item itself.
    pub fn reply_anchor(&self) -> ThreadAnchor {
        let item_id = self.parent_item_id.clone().unwrap_or_else(|| self.item_id.clone());
        ThreadAnchor::new(self.conv_id.clone(), item_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Events delivered by the platform client.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    ItemAdded(InboundItem),
    ConnectionStateChanged(ConnectionState),
}

/// Operations the bridge performs against the platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Authenticates the bot account, returning its platform user id.
    async fn authenticate(&self, credentials: &BotCredentials) -> anyhow::Result<UserId>;

    /// Posts a comment into an existing thread.
    async fn post_reply(&self, anchor: &ThreadAnchor, text: &str) -> anyhow::Result<()>;

    /// Posts a new top-level item, returning its id so a thread can be
    /// anchored on it.
    async fn post_item(
        &self,
        conv_id: &ConvId,
        subject: Option<&str>,
        text: &str,
    ) -> anyhow::Result<ItemId>;

    /// Looks up the bot's direct conversation with a user, if one exists.
    async fn direct_conversation(&self, user_id: &UserId) -> anyhow::Result<Option<ConvId>>;

    /// Creates a direct conversation with a user.
    async fn create_direct_conversation(&self, user_id: &UserId) -> anyhow::Result<ConvId>;

    /// Logs the bot account out.
    async fn logout(&self) -> anyhow::Result<()>;
}
