//! Canned reply texts posted back to the platform user.

use chatrelay_common::ChannelName;

pub const SESSION_EXISTS: &str = "logon session exists";
pub const LOGGING_IN: &str = "logging in ...";
pub const REGISTERED: &str = "logged in";
pub const JOIN_USAGE: &str = "use /join channel";
pub const LOGON_FIRST: &str = "please login before joining a channel";
pub const JOINING: &str = "joining ...";
pub const CONFIGURE_EXTENSION: &str =
    "please configure the extension in settings under the extensions tab";
pub const LEAVE_FROM_CHANNEL_THREAD: &str = "please leave a channel from the channel thread";
pub const SEND_FROM_CHANNEL_THREAD: &str = "please send a message from a channel thread";
pub const LOGGED_OFF: &str = "logged off";
pub const SETTINGS_ERROR: &str = "error: could not read user settings";
pub const COMMAND_FAILED: &str = "error: irc command failed";

pub const HELP: &str = "\
irc bridge commands:
/logon - log on to the irc network configured in your settings
/join channel - join an irc channel (replies arrive in the channel thread)
/send message - send a message to the channel of the current thread
/leave - leave the channel of the current thread
/list - show a few popular channels
/logoff - disconnect from the irc network
/help - show this help";

pub const CHANNEL_LIST: &str = "\
popular channels:
#linux
#python
#music
#chat
#help";

pub fn left_channel(channel: &ChannelName) -> String {
    format!("left channel {channel}")
}

/// Relay traffic is rendered as `sender : message` in the channel thread.
pub fn relay_line(from: &str, message: &str) -> String {
    format!("{from} : {message}")
}
