#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Hand-rolled collaborator fakes for controller and router tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    tokio::sync::mpsc,
};

use {
    chatrelay_common::{ChannelName, ConvId, ItemId, ThreadAnchor, UserId},
    chatrelay_settings::{self as settings, SettingsStore, UserSettings},
    chatrelay_vault::PasswordVault,
};

use crate::{
    platform::{BotCredentials, PlatformClient},
    relay::{RelayConnector, RelayEvent, RelayHandle, RelayLogin, SharedRelayHandle},
};

pub(crate) fn test_vault() -> PasswordVault {
    PasswordVault::from_base64_key(&BASE64.encode([0x42u8; 32])).unwrap()
}

// ── platform ────────────────────────────────────────────────────────────

/// Records every post made through the platform seam.
#[derive(Default)]
pub(crate) struct MockPlatform {
    replies: Mutex<Vec<(ThreadAnchor, String)>>,
    items: Mutex<Vec<(ConvId, Option<String>, String, String)>>,
    direct: Mutex<HashMap<UserId, ConvId>>,
    created: Mutex<Vec<UserId>>,
    auth_count: AtomicUsize,
    logged_out: AtomicBool,
    item_counter: AtomicUsize,
    fail_posts: AtomicBool,
}

impl MockPlatform {
    pub(crate) fn replies(&self) -> Vec<(ThreadAnchor, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub(crate) fn reply_texts(&self) -> Vec<String> {
        self.replies().into_iter().map(|(_, text)| text).collect()
    }

    /// Posted top-level items as `(conv, subject, text, generated item id)`.
    pub(crate) fn posted_items(&self) -> Vec<(ConvId, Option<String>, String, String)> {
        self.items.lock().unwrap().clone()
    }

    pub(crate) fn created_conversations(&self) -> Vec<UserId> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn auth_count(&self) -> usize {
        self.auth_count.load(Ordering::SeqCst)
    }

    pub(crate) fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    pub(crate) fn clear_recorded(&self) {
        self.replies.lock().unwrap().clear();
        self.items.lock().unwrap().clear();
        self.created.lock().unwrap().clear();
    }

    /// Makes every subsequent `post_item` fail. Replies still go through.
    pub(crate) fn fail_posted_items(&self) {
        self.fail_posts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    async fn authenticate(&self, _credentials: &BotCredentials) -> anyhow::Result<UserId> {
        self.auth_count.fetch_add(1, Ordering::SeqCst);
        Ok(UserId::new("bot-user"))
    }

    async fn post_reply(&self, anchor: &ThreadAnchor, text: &str) -> anyhow::Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((anchor.clone(), text.to_string()));
        Ok(())
    }

    async fn post_item(
        &self,
        conv_id: &ConvId,
        subject: Option<&str>,
        text: &str,
    ) -> anyhow::Result<ItemId> {
        if self.fail_posts.load(Ordering::SeqCst) {
            anyhow::bail!("post rejected");
        }
        let n = self.item_counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("posted-{n}");
        self.items.lock().unwrap().push((
            conv_id.clone(),
            subject.map(str::to_string),
            text.to_string(),
            id.clone(),
        ));
        Ok(ItemId::new(id))
    }

    async fn direct_conversation(&self, user_id: &UserId) -> anyhow::Result<Option<ConvId>> {
        Ok(self.direct.lock().unwrap().get(user_id).cloned())
    }

    async fn create_direct_conversation(&self, user_id: &UserId) -> anyhow::Result<ConvId> {
        let conv_id = ConvId::new(format!("dm-{user_id}"));
        self.direct
            .lock()
            .unwrap()
            .insert(user_id.clone(), conv_id.clone());
        self.created.lock().unwrap().push(user_id.clone());
        Ok(conv_id)
    }

    async fn logout(&self) -> anyhow::Result<()> {
        self.logged_out.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ── relay ───────────────────────────────────────────────────────────────

/// Records outbound relay operations.
#[derive(Default)]
pub(crate) struct MockRelayHandle {
    joins: Mutex<Vec<ChannelName>>,
    parts: Mutex<Vec<ChannelName>>,
    says: Mutex<Vec<(ChannelName, String)>>,
    disconnected: AtomicBool,
    fail_ops: AtomicBool,
}

impl MockRelayHandle {
    /// Makes every subsequent `join`/`part`/`say` fail.
    pub(crate) fn fail_operations(&self) {
        self.fail_ops.store(true, Ordering::SeqCst);
    }

    pub(crate) fn joins(&self) -> Vec<ChannelName> {
        self.joins.lock().unwrap().clone()
    }

    pub(crate) fn parts(&self) -> Vec<ChannelName> {
        self.parts.lock().unwrap().clone()
    }

    pub(crate) fn says(&self) -> Vec<(ChannelName, String)> {
        self.says.lock().unwrap().clone()
    }

    pub(crate) fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayHandle for MockRelayHandle {
    async fn join(&self, channel: &ChannelName) -> anyhow::Result<()> {
        if self.fail_ops.load(Ordering::SeqCst) {
            anyhow::bail!("join rejected");
        }
        self.joins.lock().unwrap().push(channel.clone());
        Ok(())
    }

    async fn part(&self, channel: &ChannelName) -> anyhow::Result<()> {
        if self.fail_ops.load(Ordering::SeqCst) {
            anyhow::bail!("part rejected");
        }
        self.parts.lock().unwrap().push(channel.clone());
        Ok(())
    }

    async fn say(&self, channel: &ChannelName, text: &str) -> anyhow::Result<()> {
        if self.fail_ops.load(Ordering::SeqCst) {
            anyhow::bail!("say rejected");
        }
        self.says
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        Ok(())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

type ConnectHook = Box<dyn Fn() + Send + Sync>;

/// Hands out one shared [`MockRelayHandle`] per connect and keeps the event
/// sender so tests can inject relay traffic.
pub(crate) struct MockConnector {
    handle: Arc<MockRelayHandle>,
    logins: Mutex<Vec<(String, String)>>,
    events_tx: Mutex<Option<mpsc::Sender<RelayEvent>>>,
    on_connect: Mutex<Option<ConnectHook>>,
}

impl MockConnector {
    pub(crate) fn new() -> (Self, Arc<MockRelayHandle>) {
        let handle = Arc::new(MockRelayHandle::default());
        let connector = Self {
            handle: handle.clone(),
            logins: Mutex::new(Vec::new()),
            events_tx: Mutex::new(None),
            on_connect: Mutex::new(None),
        };
        (connector, handle)
    }

    /// Installs a hook that runs inside `connect`, before it returns. Used
    /// to simulate a competing logon winning the race.
    pub(crate) fn on_connect(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_connect.lock().unwrap() = Some(Box::new(hook));
    }

    pub(crate) fn login_count(&self) -> usize {
        self.logins.lock().unwrap().len()
    }

    /// Injects a relay event into the most recent session.
    pub(crate) async fn emit(&self, event: RelayEvent) {
        let tx = self
            .events_tx
            .lock()
            .unwrap()
            .clone()
            .expect("no relay session connected");
        tx.send(event).await.unwrap();
    }

    /// Drops the event sender, ending the session's event stream.
    pub(crate) fn close_events(&self) {
        self.events_tx.lock().unwrap().take();
    }

    /// Lets the spawned event pump catch up with injected events.
    pub(crate) async fn settle(&self) {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl RelayConnector for MockConnector {
    async fn connect(
        &self,
        login: RelayLogin,
    ) -> anyhow::Result<(SharedRelayHandle, mpsc::Receiver<RelayEvent>)> {
        if let Some(hook) = self.on_connect.lock().unwrap().as_ref() {
            hook();
        }
        self.logins
            .lock()
            .unwrap()
            .push((login.network, login.nick));
        let (tx, rx) = mpsc::channel(16);
        *self.events_tx.lock().unwrap() = Some(tx);
        Ok((self.handle.clone(), rx))
    }
}

// ── settings ────────────────────────────────────────────────────────────

/// In-memory [`SettingsStore`].
#[derive(Default)]
pub(crate) struct MemorySettings {
    rows: Mutex<HashMap<UserId, UserSettings>>,
}

impl MemorySettings {
    pub(crate) fn insert(&self, settings: UserSettings) {
        self.rows
            .lock()
            .unwrap()
            .insert(settings.user_id.clone(), settings);
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn settings_for_user(&self, user_id: &UserId) -> settings::Result<Option<UserSettings>> {
        Ok(self.rows.lock().unwrap().get(user_id).cloned())
    }
}
