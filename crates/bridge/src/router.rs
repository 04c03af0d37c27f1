//! Entry point for events arriving from the platform and the settings
//! surface. Filters out items the bridge should never act on, reduces
//! item markup to plain text, and keeps the bot account logged on.

use std::sync::{Arc, RwLock};

use tracing::{debug, error, info, warn};

use {chatrelay_common::UserId, chatrelay_settings::SettingsEvent};

use crate::{
    controller::BridgeController,
    platform::{BotCredentials, ConnectionState, InboundItem, PlatformClient, PlatformEvent},
};

pub struct EventRouter {
    controller: BridgeController,
    platform: Arc<dyn PlatformClient>,
    credentials: BotCredentials,
    bot_user_id: RwLock<Option<UserId>>,
}

impl EventRouter {
    pub fn new(
        controller: BridgeController,
        platform: Arc<dyn PlatformClient>,
        credentials: BotCredentials,
    ) -> Self {
        Self {
            controller,
            platform,
            credentials,
            bot_user_id: RwLock::new(None),
        }
    }

    /// Authenticates the bot account. Must complete before events are fed
    /// in, otherwise the bot cannot recognize its own posts.
    pub async fn start(&self) -> anyhow::Result<()> {
        let bot_user_id = self.platform.authenticate(&self.credentials).await?;
        info!(bot_user_id = %bot_user_id, "bot authenticated");
        self.store_bot_user_id(bot_user_id);
        Ok(())
    }

    pub async fn handle_platform_event(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::ItemAdded(item) => self.handle_item_added(item).await,
            PlatformEvent::ConnectionStateChanged(state) => {
                debug!(?state, "platform connection state changed");
                if state == ConnectionState::Disconnected {
                    self.reauthenticate().await;
                }
            },
        }
    }

    pub async fn handle_settings_event(&self, event: SettingsEvent) {
        match event {
            SettingsEvent::EnabledByUser { user_id } => {
                if let Err(e) = self.controller.send_welcome(&user_id).await {
                    error!(user_id = %user_id, error = %e, "could not send welcome message");
                }
            },
            SettingsEvent::TenantSettingsChanged => {
                warn!("tenant settings changed, logging the bot out");
                if let Err(e) = self.platform.logout().await {
                    error!(error = %e, "bot logout failed");
                }
            },
        }
    }

    async fn handle_item_added(&self, item: InboundItem) {
        if self.sent_by_me(&item.creator_id) {
            debug!(item_id = %item.item_id, "skipping item sent by the bot");
            return;
        }
        let Some(raw) = item.text.as_deref() else {
            debug!(item_id = %item.item_id, "skipping item without text");
            return;
        };
        let text = html_to_text(raw);
        let text = text.trim();
        if text.is_empty() {
            debug!(item_id = %item.item_id, "skipping item with empty text");
            return;
        }
        self.controller.handle_item(&item, text).await;
    }

    async fn reauthenticate(&self) {
        info!("logging the bot on again after a disconnect");
        match self.platform.authenticate(&self.credentials).await {
            Ok(bot_user_id) => self.store_bot_user_id(bot_user_id),
            Err(e) => error!(error = %e, "failed to logon after disconnect"),
        }
    }

    fn store_bot_user_id(&self, bot_user_id: UserId) {
        if let Ok(mut guard) = self.bot_user_id.write() {
            *guard = Some(bot_user_id);
        }
    }

    fn sent_by_me(&self, creator_id: &UserId) -> bool {
        self.bot_user_id
            .read()
            .ok()
            .is_some_and(|guard| guard.as_ref() == Some(creator_id))
    }
}

/// Reduces platform item markup to plain text. Block-level tags become
/// newlines, every other tag is dropped, common entities are decoded.
pub fn html_to_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(idx) = rest.find('<') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 1..];
        match rest.find('>') {
            Some(end) => {
                let tag = rest[..end].trim();
                let closing = tag.starts_with('/');
                let name: String = tag
                    .trim_start_matches('/')
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                // Opening block tags and <br> break the line.
                if !closing
                    && matches!(name.as_str(), "br" | "p" | "div" | "li")
                    && !out.is_empty()
                    && !out.ends_with('\n')
                {
                    out.push('\n');
                }
                rest = &rest[end + 1..];
            },
            None => {
                // Unterminated tag, keep it verbatim.
                out.push('<');
                out.push_str(rest);
                rest = "";
            },
        }
    }
    out.push_str(rest);

    decode_entities(&out)
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
