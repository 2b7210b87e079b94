//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// The Telegram markdown dialect the digest is written in.
pub const MARKDOWN_V2: &str = "MarkdownV2";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where and how the listing is observed
    #[serde(default)]
    pub source: SourceConfig,

    /// Persistent rate storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification delivery
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Cycle periods and shutdown behavior
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.storage.validate()?;
        self.notify.validate()?;
        self.schedule.validate()?;

        if self.notify.timeout() >= self.schedule.detection_period() {
            return Err(AppError::validation(
                "notify.timeout_secs must be shorter than schedule.detection_period_secs",
            ));
        }
        Ok(())
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Listing page acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Listing pages, fetched in order; `file://` URLs are read from disk
    #[serde(default = "defaults::urls")]
    pub urls: Vec<String>,

    /// CSS selector matching one offer card
    #[serde(default = "defaults::card_selector")]
    pub card_selector: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Deadline for one whole acquisition, in seconds
    #[serde(default = "defaults::source_timeout")]
    pub timeout_secs: u64,

    /// Maximum pages fetched at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(AppError::validation("source.urls is empty"));
        }
        for raw in &self.urls {
            url::Url::parse(raw)
                .map_err(|e| AppError::validation(format!("source.urls entry '{raw}': {e}")))?;
        }
        scraper::Selector::parse(&self.card_selector)
            .map_err(|e| AppError::selector(&self.card_selector, format!("{e:?}")))?;
        if self.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.max_concurrent == 0 {
            return Err(AppError::validation("source.max_concurrent must be > 0"));
        }
        Ok(())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            urls: defaults::urls(),
            card_selector: defaults::card_selector(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::source_timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Memory,
    Postgres,
}

/// Persistent store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::storage_backend")]
    pub backend: StorageBackend,

    /// Directory holding `rates.json` for the local backend
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// Connection string for the postgres backend
    #[serde(default)]
    pub database_url: String,

    /// Deadline for a single read or upsert, in seconds
    #[serde(default = "defaults::storage_timeout")]
    pub timeout_secs: u64,
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(AppError::validation("storage.timeout_secs must be > 0"));
        }
        match self.backend {
            StorageBackend::Local if self.data_dir.as_os_str().is_empty() => {
                Err(AppError::validation("storage.data_dir is empty"))
            }
            StorageBackend::Postgres if self.database_url.trim().is_empty() => Err(
                AppError::validation("storage.database_url is required for postgres"),
            ),
            StorageBackend::Postgres if !cfg!(feature = "postgres") => Err(AppError::config(
                "storage.backend = \"postgres\" needs the `postgres` feature",
            )),
            _ => Ok(()),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: defaults::storage_backend(),
            data_dir: defaults::data_dir(),
            database_url: String::new(),
            timeout_secs: defaults::storage_timeout(),
        }
    }
}

/// Notification channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyBackend {
    /// JSON request to a notification service
    Http,
    /// Telegram Bot API, called directly
    Telegram,
    /// Messages are only written to the log
    Log,
}

/// Notification delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "defaults::notify_backend")]
    pub backend: NotifyBackend,

    /// Notification service endpoint for the http backend
    #[serde(default = "defaults::notify_endpoint")]
    pub endpoint: String,

    /// Channel type sent with every request
    #[serde(default = "defaults::channel_type")]
    pub channel_type: String,

    /// Destination; empty when the service has a single implicit one
    #[serde(default)]
    pub target: String,

    /// Deadline for one delivery, in seconds
    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub telegram_token: String,

    /// Chat used when `target` is empty
    #[serde(default)]
    pub telegram_chat_id: String,

    /// Telegram `parse_mode` for markdown messages (the digest); empty
    /// sends them as plain text. Change messages are always plain.
    #[serde(default = "defaults::parse_mode")]
    pub parse_mode: String,
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(AppError::validation("notify.timeout_secs must be > 0"));
        }
        if self.channel_type.trim().is_empty() {
            return Err(AppError::validation("notify.channel_type is empty"));
        }
        match self.backend {
            NotifyBackend::Http => {
                url::Url::parse(&self.endpoint).map_err(|e| {
                    AppError::validation(format!("notify.endpoint '{}': {e}", self.endpoint))
                })?;
            }
            NotifyBackend::Telegram => {
                if self.telegram_token.trim().is_empty() {
                    return Err(AppError::validation("notify.telegram_token is empty"));
                }
                if !matches!(self.parse_mode.as_str(), "" | MARKDOWN_V2) {
                    return Err(AppError::validation(format!(
                        "notify.parse_mode '{}' is not supported, use \"{MARKDOWN_V2}\" or \"\"",
                        self.parse_mode
                    )));
                }
                if self.target.trim().is_empty() && self.telegram_chat_id.trim().is_empty() {
                    return Err(AppError::validation(
                        "notify.target or notify.telegram_chat_id is required for telegram",
                    ));
                }
            }
            NotifyBackend::Log => {}
        }
        Ok(())
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            backend: defaults::notify_backend(),
            endpoint: defaults::notify_endpoint(),
            channel_type: defaults::channel_type(),
            target: String::new(),
            timeout_secs: defaults::notify_timeout(),
            telegram_token: String::new(),
            telegram_chat_id: String::new(),
            parse_mode: defaults::parse_mode(),
        }
    }
}

/// Cycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "defaults::detection_period")]
    pub detection_period_secs: u64,

    #[serde(default = "defaults::analytics_period")]
    pub analytics_period_secs: u64,

    /// Run a change-detection pass right away instead of after one period
    #[serde(default = "defaults::detection_on_start")]
    pub detection_on_start: bool,

    /// Send a digest right away instead of after one period
    #[serde(default)]
    pub analytics_on_start: bool,

    /// How long in-flight passes may run after a shutdown request
    #[serde(default = "defaults::shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl ScheduleConfig {
    pub fn detection_period(&self) -> Duration {
        Duration::from_secs(self.detection_period_secs)
    }

    pub fn analytics_period(&self) -> Duration {
        Duration::from_secs(self.analytics_period_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.detection_period_secs == 0 {
            return Err(AppError::validation(
                "schedule.detection_period_secs must be > 0",
            ));
        }
        if self.analytics_period_secs <= self.detection_period_secs {
            return Err(AppError::validation(
                "schedule.analytics_period_secs must be longer than the detection period",
            ));
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            detection_period_secs: defaults::detection_period(),
            analytics_period_secs: defaults::analytics_period(),
            detection_on_start: defaults::detection_on_start(),
            analytics_on_start: false,
            shutdown_grace_secs: defaults::shutdown_grace(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::{NotifyBackend, StorageBackend};

    pub fn log_level() -> String {
        "info".into()
    }

    // Source defaults
    pub fn urls() -> Vec<String> {
        vec!["https://www.sravni.ru/vklady/".into()]
    }
    pub fn card_selector() -> String {
        r#"div[class*="DepositCard_wrapper"]"#.into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; rate-watcher/0.1)".into()
    }
    pub fn source_timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        2
    }

    // Storage defaults
    pub fn storage_backend() -> StorageBackend {
        StorageBackend::Local
    }
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn storage_timeout() -> u64 {
        10
    }

    // Notify defaults
    pub fn notify_backend() -> NotifyBackend {
        NotifyBackend::Http
    }
    pub fn notify_endpoint() -> String {
        "http://localhost:8080/notify".into()
    }
    pub fn channel_type() -> String {
        "telegram".into()
    }
    pub fn notify_timeout() -> u64 {
        5
    }
    pub fn parse_mode() -> String {
        super::MARKDOWN_V2.into()
    }

    // Schedule defaults
    pub fn detection_period() -> u64 {
        15
    }
    pub fn analytics_period() -> u64 {
        24 * 60 * 60
    }
    pub fn detection_on_start() -> bool {
        true
    }
    pub fn shutdown_grace() -> u64 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [schedule]
            detection_period_secs = 600

            [notify]
            backend = "log"
            "#,
        )
        .unwrap();

        assert_eq!(config.schedule.detection_period(), Duration::from_secs(600));
        assert_eq!(config.schedule.analytics_period(), Duration::from_secs(86_400));
        assert_eq!(config.notify.backend, NotifyBackend::Log);
        assert_eq!(config.notify.channel_type, "telegram");
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_slow_notify_timeout() {
        let mut config = Config::default();
        config.notify.timeout_secs = config.schedule.detection_period_secs;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_urls() {
        let mut config = Config::default();
        config.source.urls.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.source.card_selector = "[[invalid".into();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn validate_rejects_telegram_without_token() {
        let mut config = Config::default();
        config.notify.backend = NotifyBackend::Telegram;
        config.notify.telegram_chat_id = "42".into();
        assert!(config.validate().is_err());

        config.notify.telegram_token = "123:abc".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unsupported_parse_mode() {
        let mut config = Config::default();
        config.notify.backend = NotifyBackend::Telegram;
        config.notify.telegram_token = "123:abc".into();
        config.notify.telegram_chat_id = "42".into();
        assert_eq!(config.notify.parse_mode, MARKDOWN_V2);

        config.notify.parse_mode = "HTML".into();
        assert!(config.validate().is_err());

        config.notify.parse_mode.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_analytics_period() {
        let mut config = Config::default();
        config.schedule.analytics_period_secs = config.schedule.detection_period_secs;
        assert!(config.validate().is_err());
    }
}
