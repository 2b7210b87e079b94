//! Log-only channel for dry runs.

use async_trait::async_trait;

use crate::error::Result;
use crate::notify::{NotificationChannel, NotificationRequest, NotificationResponse};

/// Writes every message to the log and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResponse> {
        log::info!(
            "[notification] type={} target={:?}\n{}",
            request.channel_type,
            request.target,
            request.message
        );
        Ok(NotificationResponse::ok())
    }
}
