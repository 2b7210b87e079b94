//! Analytics digest pass.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, with_deadline};
use crate::notify::Notifier;
use crate::notify::format::format_digest;
use crate::storage::RateStore;

/// What a digest pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    Sent { banks: usize },
    /// The store was empty, nothing was sent
    SkippedEmpty,
}

/// Sends a summary of every stored record.
pub struct DigestReporter {
    store: Arc<dyn RateStore>,
    notifier: Notifier,
    store_timeout: Duration,
}

impl DigestReporter {
    pub fn new(store: Arc<dyn RateStore>, notifier: Notifier, store_timeout: Duration) -> Self {
        Self {
            store,
            notifier,
            store_timeout,
        }
    }

    /// Read the store and deliver the digest.
    pub async fn run_pass(&self) -> Result<DigestOutcome> {
        let records = with_deadline("store read", self.store_timeout, self.store.read_all()).await?;

        let Some(message) = format_digest(&records) else {
            log::info!("No stored rates, digest skipped");
            return Ok(DigestOutcome::SkippedEmpty);
        };

        self.notifier.deliver_markdown(&message).await?;
        log::info!("Digest sent for {} banks", records.len());
        Ok(DigestOutcome::Sent {
            banks: records.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::models::RateRecord;
    use crate::notify::{NotificationChannel, NotificationRequest, NotificationResponse};
    use crate::storage::MemoryStorage;

    #[derive(Default)]
    struct CapturingChannel {
        requests: Mutex<Vec<NotificationRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationChannel for CapturingChannel {
        async fn send(&self, request: &NotificationRequest) -> Result<NotificationResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                Ok(NotificationResponse::failed("bot was blocked by the user"))
            } else {
                Ok(NotificationResponse::ok())
            }
        }
    }

    fn reporter(records: Vec<RateRecord>, channel: Arc<CapturingChannel>) -> DigestReporter {
        DigestReporter::new(
            Arc::new(MemoryStorage::with_records(records)),
            Notifier::new(channel, "telegram", "", Duration::from_secs(5)),
            Duration::from_secs(10),
        )
    }

    fn record(bank: &str, rate: &str) -> RateRecord {
        RateRecord::new(bank, "Saver", rate.parse().unwrap())
    }

    #[tokio::test]
    async fn test_empty_store_sends_nothing() {
        let channel = Arc::new(CapturingChannel::default());
        let outcome = reporter(Vec::new(), channel.clone()).run_pass().await.unwrap();

        assert_eq!(outcome, DigestOutcome::SkippedEmpty);
        assert!(channel.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_digest_covers_every_bank() {
        let channel = Arc::new(CapturingChannel::default());
        let records = vec![record("Alpha Bank", "7.5"), record("Beta Bank", "9")];
        let outcome = reporter(records, channel.clone()).run_pass().await.unwrap();

        assert_eq!(outcome, DigestOutcome::Sent { banks: 2 });
        let requests = channel.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].markdown);
        assert!(requests[0].message.contains("Alpha Bank"));
        assert!(requests[0].message.ends_with("Total banks: 2"));
    }

    #[tokio::test]
    async fn test_rejected_digest_is_error() {
        let channel = Arc::new(CapturingChannel {
            fail: true,
            ..CapturingChannel::default()
        });
        let result = reporter(vec![record("Alpha Bank", "7.5")], channel).run_pass().await;
        assert!(matches!(result, Err(AppError::Dispatch(_))));
    }
}
