// src/config.rs

//! Configuration loading utilities.
//!
//! Reads `config.toml` and layers secrets from the environment on top:
//!
//! | variable | field |
//! |---|---|
//! | `RATE_WATCHER_DATABASE_URL` | `storage.database_url` |
//! | `RATE_WATCHER_TELEGRAM_TOKEN` | `notify.telegram_token` |
//! | `RATE_WATCHER_TELEGRAM_CHAT_ID` | `notify.telegram_chat_id` |
//! | `RATE_WATCHER_NOTIFY_ENDPOINT` | `notify.endpoint` |

use std::path::Path;

use crate::error::Result;
use crate::models::Config;

pub const ENV_DATABASE_URL: &str = "RATE_WATCHER_DATABASE_URL";
pub const ENV_TELEGRAM_TOKEN: &str = "RATE_WATCHER_TELEGRAM_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "RATE_WATCHER_TELEGRAM_CHAT_ID";
pub const ENV_NOTIFY_ENDPOINT: &str = "RATE_WATCHER_NOTIFY_ENDPOINT";

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    File,
    /// The file was missing
    Defaults,
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// A missing file falls back to defaults. A file that exists but does not
/// parse is an error. Callers report the origin.
pub fn load_config(path: &Path) -> Result<(Config, ConfigOrigin)> {
    let (config, origin) = if path.exists() {
        (Config::load(path)?, ConfigOrigin::File)
    } else {
        (Config::default(), ConfigOrigin::Defaults)
    };
    Ok((apply_env(config), origin))
}

/// Apply overrides from the process environment.
pub fn apply_env(config: Config) -> Config {
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from `lookup`; empty values are ignored.
pub fn apply_env_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_DATABASE_URL) {
        config.storage.database_url = url;
    }
    if let Some(token) = get(ENV_TELEGRAM_TOKEN) {
        config.notify.telegram_token = token;
    }
    if let Some(chat_id) = get(ENV_TELEGRAM_CHAT_ID) {
        config.notify.telegram_chat_id = chat_id;
    }
    if let Some(endpoint) = get(ENV_NOTIFY_ENDPOINT) {
        config.notify.endpoint = endpoint;
    }
    config
}
