//! Bridge between a hosted messaging platform and IRC-style relay
//! networks.
//!
//! Platform users drive a relay identity with slash commands (`/logon`,
//! `/join`, ...); each joined channel gets a conversation thread of its
//! own, and relay traffic is mirrored into it.

pub mod commands;
pub mod controller;
pub mod platform;
pub mod relay;
pub mod replies;
pub mod router;

#[cfg(test)]
pub(crate) mod testutil;

pub use {
    commands::{Command, CommandSet},
    controller::BridgeController,
    platform::{
        BotCredentials, ConnectionState, InboundItem, PlatformClient, PlatformEvent,
    },
    relay::{RelayConnector, RelayEvent, RelayHandle, RelayLogin, SharedRelayHandle},
    router::EventRouter,
};
