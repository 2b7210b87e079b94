//! Telegram Bot API channel.
//!
//! Calls `sendMessage` directly, for deployments without a separate
//! notification service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::NotifyConfig;
use crate::notify::{NotificationChannel, NotificationRequest, NotificationResponse};

const API_BASE: &str = "https://api.telegram.org";

/// Sends messages with the Bot API.
pub struct TelegramChannel {
    client: Client,
    api_base: String,
    token: String,
    default_chat_id: String,
    parse_mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl From<ApiReply> for NotificationResponse {
    fn from(reply: ApiReply) -> Self {
        if reply.ok {
            NotificationResponse::ok()
        } else {
            NotificationResponse::failed(
                reply
                    .description
                    .unwrap_or_else(|| "telegram rejected the message".to_string()),
            )
        }
    }
}

impl TelegramChannel {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        if config.telegram_token.trim().is_empty() {
            return Err(AppError::config("notify.telegram_token is empty"));
        }
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            token: config.telegram_token.clone(),
            default_chat_id: config.telegram_chat_id.clone(),
            parse_mode: Some(config.parse_mode.clone()).filter(|m| !m.is_empty()),
        })
    }

    fn chat_id<'a>(&'a self, request: &'a NotificationRequest) -> &'a str {
        if request.target.is_empty() {
            &self.default_chat_id
        } else {
            &request.target
        }
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base.trim_end_matches('/'), self.token)
    }

    /// Only markdown requests carry the parse mode.
    fn body<'a>(&'a self, request: &'a NotificationRequest) -> SendMessage<'a> {
        SendMessage {
            chat_id: self.chat_id(request),
            text: &request.message,
            parse_mode: self.parse_mode.as_deref().filter(|_| request.markdown),
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResponse> {
        let body = self.body(request);

        // Error replies carry a JSON body too, so the status is not checked.
        let reply: ApiReply = self
            .client
            .post(self.send_url())
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        Ok(reply.into())
    }
}
