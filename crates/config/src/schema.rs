use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Top-level bridge configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub platform: PlatformConfig,
    pub vault: VaultConfig,
    pub settings: SettingsConfig,
    /// Extension type tag reported to the platform alongside replies.
    #[serde(default = "default_ext_type")]
    pub ext_type: String,
}

/// Hosted messaging platform credentials for the bot account.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformConfig {
    pub domain: String,
    pub client_id: String,
    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: Secret<String>,
}

/// Master key for the password vault, base64 encoded.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    #[serde(serialize_with = "serialize_secret")]
    pub master_key: Secret<String>,
}

/// Settings database location.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsConfig {
    pub database_path: PathBuf,
}

fn default_ext_type() -> String {
    "irc".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            platform: PlatformConfig::default(),
            vault: VaultConfig::default(),
            settings: SettingsConfig::default(),
            ext_type: default_ext_type(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            client_id: String::new(),
            client_secret: Secret::new(String::new()),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            master_key: Secret::new(String::new()),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("chatrelay.db"),
        }
    }
}

impl BridgeConfig {
    /// Checks that the fields with no usable default are present.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.platform.domain.is_empty() {
            anyhow::bail!("platform.domain is not set");
        }
        if self.platform.client_id.is_empty() {
            anyhow::bail!("platform.client_id is not set");
        }
        if self.platform.client_secret.expose_secret().is_empty() {
            anyhow::bail!("platform.client_secret is not set");
        }
        if self.vault.master_key.expose_secret().is_empty() {
            anyhow::bail!("vault.master_key is not set");
        }
        Ok(())
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
