//! Slash-command recognition and argument parsing.
//!
//! A command is a leading `/` followed by word characters, anywhere after
//! optional whitespace. Text that merely contains a slash, or whose verb is
//! not registered, is not a command and falls through to the implicit
//! channel-thread send path.

use std::collections::HashMap;

use chatrelay_common::ChannelName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Logon,
    Logoff,
    Join,
    Leave,
    Send,
    List,
}

/// Registry of recognized command verbs.
pub struct CommandSet {
    verbs: HashMap<&'static str, Command>,
}

impl CommandSet {
    pub fn new() -> Self {
        let verbs = HashMap::from([
            ("help", Command::Help),
            ("logon", Command::Logon),
            ("logoff", Command::Logoff),
            ("join", Command::Join),
            ("leave", Command::Leave),
            ("send", Command::Send),
            ("list", Command::List),
        ]);
        Self { verbs }
    }

    /// Returns the command the text starts with, if its verb is registered.
    pub fn recognize(&self, text: &str) -> Option<Command> {
        let verb = leading_verb(text)?;
        self.verbs.get(verb).copied()
    }
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::new()
    }
}

fn is_verb_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_channel_char(c: char) -> bool {
    is_verb_char(c) || matches!(c, '+' | '-' | '#' | '.')
}

/// Extracts the verb of a leading slash command, e.g. `"  /join #rust"`
/// yields `"join"`.
pub fn leading_verb(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix('/')?;
    let end = rest.find(|c| !is_verb_char(c)).unwrap_or(rest.len());
    if end == 0 { None } else { Some(&rest[..end]) }
}

/// Extracts the channel argument of a `/join` command. The verb and the
/// argument must be separated by whitespace; the argument is the longest
/// leading run of channel characters (`#`, `+`, `-`, `.`, word chars).
pub fn join_argument(text: &str) -> Option<ChannelName> {
    let rest = text.trim_start().strip_prefix('/')?;
    let after_verb = rest.trim_start_matches(is_verb_char);
    let arg = after_verb.trim_start();
    if arg.len() == after_verb.len() {
        return None; // no whitespace between verb and argument
    }
    let end = arg.find(|c| !is_channel_char(c)).unwrap_or(arg.len());
    if end == 0 {
        None
    } else {
        Some(ChannelName::new(&arg[..end]))
    }
}

/// The message body of a `/send` command. `None` when nothing follows the
/// verb.
pub fn send_body(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix('/')?;
    let rest = rest.strip_prefix("send")?;
    if rest.chars().next().is_some_and(is_verb_char) {
        return None; // a longer verb such as /sendx
    }
    let body = rest.trim();
    if body.is_empty() { None } else { Some(body) }
}
