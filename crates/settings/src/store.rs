use std::path::Path;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    sqlx::SqlitePool,
    tracing::debug,
};

use chatrelay_common::UserId;

use crate::error::Result;

/// Per-user relay configuration as saved from the extension's settings
/// page. The password is stored as a vault blob, never in the clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: UserId,
    pub network: String,
    pub nick: String,
    pub encrypted_password: String,
}

/// Read side of the settings surface the bridge consumes.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns the user's saved relay settings, or `None` if they never
    /// configured the extension.
    async fn settings_for_user(&self, user_id: &UserId) -> Result<Option<UserSettings>>;
}

/// SQLite-backed settings store.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&url).await?;
        Self::with_pool(pool).await
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_settings (
                user_id            TEXT PRIMARY KEY,
                network            TEXT NOT NULL,
                nick               TEXT NOT NULL,
                encrypted_password TEXT NOT NULL,
                updated_at         TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    /// Inserts or replaces a user's settings row.
    pub async fn upsert(&self, settings: &UserSettings) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_settings (user_id, network, nick, encrypted_password)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 network = excluded.network,
                 nick = excluded.nick,
                 encrypted_password = excluded.encrypted_password,
                 updated_at = datetime('now')",
        )
        .bind(settings.user_id.as_str())
        .bind(&settings.network)
        .bind(&settings.nick)
        .bind(&settings.encrypted_password)
        .execute(&self.pool)
        .await?;
        debug!(user_id = %settings.user_id, "settings saved");
        Ok(())
    }

    pub async fn remove(&self, user_id: &UserId) -> Result<()> {
        sqlx::query("DELETE FROM user_settings WHERE user_id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn settings_for_user(&self, user_id: &UserId) -> Result<Option<UserSettings>> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT user_id, network, nick, encrypted_password
             FROM user_settings WHERE user_id = ?",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, network, nick, encrypted_password)| UserSettings {
            user_id: UserId::new(user_id),
            network,
            nick,
            encrypted_password,
        }))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn sample(user: &str) -> UserSettings {
        UserSettings {
            user_id: UserId::new(user),
            network: "irc.libera.chat".to_string(),
            nick: "alice".to_string(),
            encrypted_password: "blob".to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_user_has_no_settings() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        let found = store.settings_for_user(&UserId::new("ghost")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn upsert_then_read_back() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.upsert(&sample("u1")).await.unwrap();

        let found = store
            .settings_for_user(&UserId::new("u1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.network, "irc.libera.chat");
        assert_eq!(found.nick, "alice");
        assert_eq!(found.encrypted_password, "blob");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.upsert(&sample("u1")).await.unwrap();

        let mut updated = sample("u1");
        updated.nick = "alice2".to_string();
        store.upsert(&updated).await.unwrap();

        let found = store
            .settings_for_user(&UserId::new("u1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.nick, "alice2");
    }

    #[tokio::test]
    async fn remove_deletes_the_row() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.upsert(&sample("u1")).await.unwrap();
        store.remove(&UserId::new("u1")).await.unwrap();
        assert!(
            store
                .settings_for_user(&UserId::new("u1"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
