//! Command execution and relay-event handling.
//!
//! The controller owns the user -> session directory and mediates between
//! both sides: platform items become relay operations, relay events become
//! platform posts. All failures are reported to the user or logged; an
//! event that cannot be routed is dropped, never fatal.

use std::sync::Arc;

use {
    secrecy::Secret,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {
    chatrelay_common::{ChannelName, ThreadAnchor, UserId},
    chatrelay_directory::{Directory, Session, SessionId},
    chatrelay_settings::SettingsStore,
    chatrelay_vault::PasswordVault,
};

use crate::{
    commands::{self, Command, CommandSet},
    platform::{InboundItem, PlatformClient},
    relay::{RelayConnector, RelayEvent, RelayLogin, SharedRelayHandle},
    replies,
};

struct Inner {
    directory: Directory<SharedRelayHandle>,
    platform: Arc<dyn PlatformClient>,
    connector: Arc<dyn RelayConnector>,
    settings: Arc<dyn SettingsStore>,
    vault: PasswordVault,
    commands: CommandSet,
    cancel: CancellationToken,
}

/// Bridge state machine. Cheap to clone; clones share one directory.
#[derive(Clone)]
pub struct BridgeController {
    inner: Arc<Inner>,
}

impl BridgeController {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        connector: Arc<dyn RelayConnector>,
        settings: Arc<dyn SettingsStore>,
        vault: PasswordVault,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                directory: Directory::new(),
                platform,
                connector,
                settings,
                vault,
                commands: CommandSet::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn directory(&self) -> &Directory<SharedRelayHandle> {
        &self.inner.directory
    }

    /// Handles one text item from the platform. `text` is the item content
    /// already reduced to plain text.
    pub async fn handle_item(&self, item: &InboundItem, text: &str) {
        if let Some(command) = self.inner.commands.recognize(text) {
            debug!(user_id = %item.creator_id, ?command, "dispatching command");
            match command {
                Command::Help => self.reply(&item.reply_anchor(), replies::HELP).await,
                Command::List => self.reply(&item.reply_anchor(), replies::CHANNEL_LIST).await,
                Command::Logon => self.logon(item).await,
                Command::Logoff => self.logoff(item).await,
                Command::Join => self.join(item, text).await,
                Command::Leave => self.leave(item).await,
                Command::Send => self.send_to_thread_channel(item, text).await,
            }
            // A recognized command consumes the item; it must not also be
            // forwarded by the channel-thread path below.
            return;
        }

        self.forward_channel_thread_message(item, text).await;
    }

    /// Posts the help text into the bot's direct conversation with a user.
    /// Sent when the user enables the extension.
    pub async fn send_welcome(&self, user_id: &UserId) -> anyhow::Result<()> {
        let conv_id = match self.inner.platform.direct_conversation(user_id).await? {
            Some(conv_id) => conv_id,
            None => {
                self.inner
                    .platform
                    .create_direct_conversation(user_id)
                    .await?
            },
        };
        self.inner
            .platform
            .post_item(&conv_id, None, replies::HELP)
            .await?;
        info!(user_id = %user_id, "welcome message sent");
        Ok(())
    }

    /// Stops the relay event pumps and disconnects every live session.
    pub async fn shutdown(&self) {
        info!(sessions = self.inner.directory.len(), "shutting down bridge");
        self.inner.cancel.cancel();
        for (user_id, handle) in self.inner.directory.drain() {
            if let Err(e) = handle.disconnect().await {
                warn!(user_id = %user_id, error = %e, "disconnect failed during shutdown");
            }
        }
    }

    // ── command handlers ────────────────────────────────────────────────

    async fn logon(&self, item: &InboundItem) {
        let user_id = &item.creator_id;
        if self.inner.directory.session_for_user(user_id).is_some() {
            self.reply(&item.reply_anchor(), replies::SESSION_EXISTS).await;
            return;
        }

        let settings = match self.inner.settings.settings_for_user(user_id).await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                self.reply(&item.reply_anchor(), replies::CONFIGURE_EXTENSION).await;
                return;
            },
            Err(e) => {
                error!(user_id = %user_id, error = %e, "could not read user settings");
                self.reply(&item.reply_anchor(), replies::SETTINGS_ERROR).await;
                return;
            },
        };

        let password = match self.inner.vault.decrypt(user_id, &settings.encrypted_password) {
            Ok(password) => password,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "could not decrypt relay password");
                self.reply(&item.reply_anchor(), replies::SETTINGS_ERROR).await;
                return;
            },
        };

        info!(
            user_id = %user_id,
            network = %settings.network,
            nick = %settings.nick,
            "opening relay session"
        );
        let login = RelayLogin {
            network: settings.network.clone(),
            nick: settings.nick.clone(),
            password: Secret::new((*password).clone()),
        };
        let (handle, events) = match self.inner.connector.connect(login).await {
            Ok(session) => session,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "relay connect failed");
                self.reply(&item.reply_anchor(), replies::SETTINGS_ERROR).await;
                return;
            },
        };

        let session = Session::new(settings.network, settings.nick, handle.clone());
        let session_id = match self
            .inner
            .directory
            .insert_session(user_id.clone(), session)
        {
            Ok(id) => id,
            Err(_) => {
                // Lost the race to a concurrent logon. This connection is
                // surplus; the winner's session stays untouched.
                warn!(user_id = %user_id, "concurrent logon, dropping surplus connection");
                if let Err(e) = handle.disconnect().await {
                    warn!(user_id = %user_id, error = %e, "surplus disconnect failed");
                }
                self.reply(&item.reply_anchor(), replies::SESSION_EXISTS).await;
                return;
            },
        };

        self.inner.directory.bind_origin(user_id, item.reply_anchor());
        self.spawn_event_pump(user_id.clone(), session_id, events);
        self.reply(&item.reply_anchor(), replies::LOGGING_IN).await;
    }

    async fn logoff(&self, item: &InboundItem) {
        let user_id = &item.creator_id;
        let Some(info) = self.inner.directory.session_for_user(user_id) else {
            self.reply(&item.reply_anchor(), replies::LOGON_FIRST).await;
            return;
        };

        if let Err(e) = info.handle.disconnect().await {
            warn!(user_id = %user_id, error = %e, "relay disconnect failed");
        }
        self.inner.directory.clear_session(user_id, info.id);
        info!(user_id = %user_id, "session logged off");
        self.reply(&item.reply_anchor(), replies::LOGGED_OFF).await;
    }

    async fn join(&self, item: &InboundItem, text: &str) {
        let Some(channel) = commands::join_argument(text) else {
            self.reply(&item.reply_anchor(), replies::JOIN_USAGE).await;
            return;
        };
        let user_id = &item.creator_id;
        let Some(info) = self.inner.directory.session_for_user(user_id) else {
            self.reply(&item.reply_anchor(), replies::LOGON_FIRST).await;
            return;
        };

        info!(user_id = %user_id, channel = %channel, "joining channel");
        if let Err(e) = info.handle.join(&channel).await {
            error!(user_id = %user_id, channel = %channel, error = %e, "relay join failed");
            self.reply(&item.reply_anchor(), replies::COMMAND_FAILED).await;
            return;
        }

        // The channel gets a thread of its own, anchored on a fresh item
        // whose subject is the channel name.
        match self
            .inner
            .platform
            .post_item(&item.conv_id, Some(channel.as_str()), replies::JOINING)
            .await
        {
            Ok(item_id) => {
                let anchor = ThreadAnchor::new(item.conv_id.clone(), item_id);
                self.inner.directory.bind_channel(user_id, channel, anchor);
            },
            Err(e) => {
                error!(user_id = %user_id, channel = %channel, error = %e, "could not post channel thread item");
                self.reply(&item.reply_anchor(), replies::COMMAND_FAILED).await;
            },
        }
    }

    async fn leave(&self, item: &InboundItem) {
        let user_id = &item.creator_id;
        let Some(info) = self.inner.directory.session_for_user(user_id) else {
            self.reply(&item.reply_anchor(), replies::LOGON_FIRST).await;
            return;
        };
        let Some(parent) = &item.parent_item_id else {
            self.reply(&item.reply_anchor(), replies::LEAVE_FROM_CHANNEL_THREAD).await;
            return;
        };
        let Some(channel) = self.inner.directory.channel_for_thread(user_id, parent) else {
            debug!(user_id = %user_id, "leave in a thread with no channel binding");
            return;
        };

        if let Err(e) = info.handle.part(&channel).await {
            error!(user_id = %user_id, channel = %channel, error = %e, "relay part failed");
            self.reply(&item.reply_anchor(), replies::COMMAND_FAILED).await;
            return;
        }
        self.reply(&item.reply_anchor(), &replies::left_channel(&channel)).await;
    }

    async fn send_to_thread_channel(&self, item: &InboundItem, text: &str) {
        let user_id = &item.creator_id;
        let Some(info) = self.inner.directory.session_for_user(user_id) else {
            self.reply(&item.reply_anchor(), replies::LOGON_FIRST).await;
            return;
        };
        let Some(parent) = &item.parent_item_id else {
            self.reply(&item.reply_anchor(), replies::SEND_FROM_CHANNEL_THREAD).await;
            return;
        };
        let Some(channel) = self.inner.directory.channel_for_thread(user_id, parent) else {
            debug!(user_id = %user_id, "send in a thread with no channel binding");
            return;
        };

        let body = commands::send_body(text).unwrap_or(text);
        if let Err(e) = info.handle.say(&channel, body).await {
            error!(user_id = %user_id, channel = %channel, error = %e, "relay say failed");
            self.reply(&item.reply_anchor(), replies::COMMAND_FAILED).await;
        }
    }

    /// Forwards a plain message typed in a channel thread to that channel.
    /// Quietly does nothing when the item is not in a bound channel thread.
    async fn forward_channel_thread_message(&self, item: &InboundItem, text: &str) {
        let Some(parent) = &item.parent_item_id else {
            return;
        };
        let user_id = &item.creator_id;
        let Some(info) = self.inner.directory.session_for_user(user_id) else {
            return;
        };
        let Some(channel) = self.inner.directory.channel_for_thread(user_id, parent) else {
            return;
        };

        debug!(user_id = %user_id, channel = %channel, "forwarding channel thread message");
        if let Err(e) = info.handle.say(&channel, text).await {
            error!(user_id = %user_id, channel = %channel, error = %e, "relay say failed");
        }
    }

    // ── relay events ────────────────────────────────────────────────────

    async fn handle_relay_event(&self, user_id: &UserId, session_id: SessionId, event: RelayEvent) {
        let Some(info) = self.inner.directory.session_for_user(user_id) else {
            debug!(user_id = %user_id, "relay event for cleared session, dropped");
            return;
        };
        if info.id != session_id {
            debug!(user_id = %user_id, "relay event from a stale session, dropped");
            return;
        }

        match event {
            RelayEvent::Registered { welcome } => {
                let text = welcome.as_deref().unwrap_or(replies::REGISTERED);
                self.reply_to_origin(user_id, text).await;
            },
            RelayEvent::Motd { text } => {
                self.reply_to_origin(user_id, &text).await;
            },
            RelayEvent::Message { from, channel, text } => {
                let Some(anchor) = self.inner.directory.thread_for_channel(user_id, &channel)
                else {
                    warn!(user_id = %user_id, channel = %channel, "message for unbound channel, dropped");
                    return;
                };
                self.reply(&anchor, &replies::relay_line(&from, &text)).await;
            },
            RelayEvent::Joined { nick, channel } => {
                if nick != info.nick {
                    debug!(user_id = %user_id, nick = %nick, "join by someone else, ignored");
                    return;
                }
                self.confirm_join(user_id, &nick, channel).await;
            },
            RelayEvent::Error { message } => {
                error!(user_id = %user_id, message = %message, "relay error");
            },
        }
    }

    /// Marks a join as confirmed and announces it in the channel thread.
    /// When the event carries a channel name it is authoritative: a name
    /// with no binding is dropped, never reattributed. Only an event
    /// without a channel falls back to the most recently joined one.
    async fn confirm_join(&self, user_id: &UserId, nick: &str, channel: Option<ChannelName>) {
        let channel = match channel {
            Some(channel) => {
                if self.inner.directory.channel_state(user_id, &channel).is_none() {
                    warn!(
                        user_id = %user_id,
                        channel = %channel,
                        "join confirmation for unbound channel, dropped"
                    );
                    return;
                }
                channel
            },
            None => {
                let Some(channel) = self.inner.directory.most_recent_channel(user_id) else {
                    warn!(user_id = %user_id, "join confirmation with no matching channel, dropped");
                    return;
                };
                channel
            },
        };
        let Some(anchor) = self.inner.directory.confirm_channel(user_id, &channel) else {
            warn!(user_id = %user_id, channel = %channel, "no binding to confirm, dropped");
            return;
        };
        debug!(user_id = %user_id, channel = %channel, "join confirmed");
        self.reply(&anchor, &replies::relay_line(nick, "joined")).await;
    }

    fn spawn_event_pump(
        &self,
        user_id: UserId,
        session_id: SessionId,
        mut events: mpsc::Receiver<RelayEvent>,
    ) {
        let controller = self.clone();
        let cancel = self.inner.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            controller
                                .handle_relay_event(&user_id, session_id, event)
                                .await;
                        },
                        None => {
                            info!(user_id = %user_id, "relay session closed");
                            controller.inner.directory.clear_session(&user_id, session_id);
                            break;
                        },
                    },
                }
            }
        });
    }

    // ── posting helpers ─────────────────────────────────────────────────

    async fn reply(&self, anchor: &ThreadAnchor, text: &str) {
        if let Err(e) = self.inner.platform.post_reply(anchor, text).await {
            warn!(error = %e, "could not post reply");
        }
    }

    async fn reply_to_origin(&self, user_id: &UserId, text: &str) {
        let Some(anchor) = self.inner.directory.origin_anchor(user_id) else {
            warn!(user_id = %user_id, "no logon thread for session notice, dropped");
            return;
        };
        self.reply(&anchor, text).await;
    }
}
