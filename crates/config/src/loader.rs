use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::BridgeConfig;

/// Standard config file name.
const CONFIG_FILENAME: &str = "chatrelay.toml";

/// Load config from the given TOML file. `${ENV_VAR}` placeholders in the
/// raw text are expanded before parsing.
pub fn load_config(path: &Path) -> anyhow::Result<BridgeConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = expand_env(&raw);
    Ok(toml::from_str(&raw)?)
}

/// Expands `${NAME}` placeholders against the process environment. Unknown
/// and malformed placeholders are kept as written.
fn expand_env(input: &str) -> String {
    expand_env_with(input, |name| std::env::var(name).ok())
}

fn expand_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            // No closing brace anywhere, keep the remainder as-is.
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &tail[..end];
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            },
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chatrelay.toml` (project-local)
/// 2. `~/.config/chatrelay/chatrelay.toml` (user-global)
///
/// Returns `BridgeConfig::default()` if no config file is found.
pub fn discover_and_load() -> BridgeConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    BridgeConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "chatrelay") {
        let p = dirs.config_dir().join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/chatrelay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatrelay").map(|d| d.config_dir().to_path_buf())
}
