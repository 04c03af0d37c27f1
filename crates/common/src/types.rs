use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque platform user identity. The bridge references users, it never
/// creates or destroys them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Platform conversation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConvId(String);

/// Platform conversation item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

string_id!(UserId);
string_id!(ConvId);
string_id!(ItemId);

/// Relay-network channel name, case-normalized on construction so that
/// `#News` and `#news` resolve to the same binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reply-chain anchor within a platform conversation: the item that replies
/// attach to, plus the conversation it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadAnchor {
    pub conv_id: ConvId,
    pub item_id: ItemId,
}

impl ThreadAnchor {
    pub fn new(conv_id: ConvId, item_id: ItemId) -> Self {
        Self { conv_id, item_id }
    }
}
