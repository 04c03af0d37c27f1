//! Per-user extension settings: storage and administrative events.

pub mod error;
pub mod events;
pub mod store;

pub use {
    error::{Result, SettingsError},
    events::SettingsEvent,
    store::{SettingsStore, SqliteSettingsStore, UserSettings},
};
