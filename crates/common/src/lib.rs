//! Shared identifier types used across all chatrelay crates.

pub mod types;

pub use types::{ChannelName, ConvId, ItemId, ThreadAnchor, UserId};
