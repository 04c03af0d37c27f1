//! Bridge configuration: schema and TOML loading with `${ENV_VAR}`
//! expansion.

pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{BridgeConfig, PlatformConfig, SettingsConfig, VaultConfig},
};
