//! Notification dispatch.
//!
//! A [`NotificationChannel`] carries one request to the outside world.
//! The [`Notifier`] wraps a channel with the request envelope and a
//! deadline, and turns every kind of failure into an error.
//!
//! Delivery is at least once from the pipeline's point of view: there is
//! no retry inside a cycle, and a lost notification is not replayed.

pub mod format;
mod http;
mod logging;
mod telegram;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, with_deadline};
use crate::models::{NotifyBackend, NotifyConfig};

pub use self::http::HttpChannel;
pub use self::logging::LogChannel;
pub use self::telegram::TelegramChannel;

/// One outgoing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Delivery medium understood by the notification service
    #[serde(rename = "type")]
    pub channel_type: String,
    /// Recipient; empty means the service's default recipient
    pub target: String,
    pub message: String,
    /// `message` is Telegram MarkdownV2 rather than plain text
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub markdown: bool,
}

/// Outcome reported by a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub success: bool,
    #[serde(default)]
    pub error: String,
}

impl NotificationResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: String::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Transport for notification requests.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResponse>;
}

/// Sends messages through a channel under a deadline.
#[derive(Clone)]
pub struct Notifier {
    channel: Arc<dyn NotificationChannel>,
    channel_type: String,
    target: String,
    timeout: Duration,
}

impl Notifier {
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        channel_type: impl Into<String>,
        target: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            channel,
            channel_type: channel_type.into(),
            target: target.into(),
            timeout,
        }
    }

    /// Build the notifier described by `config`.
    ///
    /// With `dry_run` set, messages go to the log whatever backend is configured.
    pub fn from_config(config: &NotifyConfig, dry_run: bool) -> Result<Self> {
        let channel: Arc<dyn NotificationChannel> = match (dry_run, config.backend) {
            (true, _) | (false, NotifyBackend::Log) => Arc::new(LogChannel),
            (false, NotifyBackend::Http) => Arc::new(HttpChannel::new(&config.endpoint, config.timeout())?),
            (false, NotifyBackend::Telegram) => Arc::new(TelegramChannel::new(config)?),
        };
        Ok(Self::new(
            channel,
            &config.channel_type,
            &config.target,
            config.timeout(),
        ))
    }

    pub fn request(&self, message: &str) -> NotificationRequest {
        NotificationRequest {
            channel_type: self.channel_type.clone(),
            target: self.target.clone(),
            message: message.to_string(),
            markdown: false,
        }
    }

    /// Deliver one plain-text message.
    ///
    /// A transport error, a timeout and a response with `success == false`
    /// are all failures.
    pub async fn deliver(&self, message: &str) -> Result<()> {
        self.send(self.request(message)).await
    }

    /// Deliver one message written in Telegram MarkdownV2.
    pub async fn deliver_markdown(&self, message: &str) -> Result<()> {
        let mut request = self.request(message);
        request.markdown = true;
        self.send(request).await
    }

    async fn send(&self, request: NotificationRequest) -> Result<()> {
        let response = with_deadline("notify", self.timeout, self.channel.send(&request)).await?;
        if response.success {
            Ok(())
        } else {
            Err(AppError::dispatch(if response.error.is_empty() {
                "channel reported failure".to_string()
            } else {
                response.error
            }))
        }
    }
}
