//! Notification service client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::notify::{NotificationChannel, NotificationRequest, NotificationResponse};

/// POSTs requests as JSON to a notification service.
pub struct HttpChannel {
    client: Client,
    endpoint: Url,
}

impl HttpChannel {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }
}

#[async_trait]
impl NotificationChannel for HttpChannel {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResponse> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::dispatch(format!(
                "{} returned {status}: {}",
                self.endpoint,
                body.trim()
            )));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_endpoint() {
        assert!(matches!(
            HttpChannel::new("localhost notify", Duration::from_secs(5)),
            Err(AppError::Url(_))
        ));
        assert!(HttpChannel::new("http://localhost:8080/notify", Duration::from_secs(5)).is_ok());
    }
}
