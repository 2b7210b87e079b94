// src/services/snapshot.rs

//! Snapshot builder.
//!
//! Runs acquisition under a deadline, parses each block and keeps only
//! records that can be stored.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, with_deadline};
use crate::models::RateRecord;
use crate::services::parser;
use crate::services::PageSource;

/// The valid records observed in one acquisition, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub records: Vec<RateRecord>,
    /// Blocks returned by the source
    pub blocks_seen: usize,
    /// Blocks that did not yield a valid record
    pub discarded: usize,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Builds a [`Snapshot`] from a page source.
pub struct SnapshotBuilder {
    source: Arc<dyn PageSource>,
    timeout: Duration,
}

impl SnapshotBuilder {
    pub fn new(source: Arc<dyn PageSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Acquire the listing and parse it.
    ///
    /// An acquisition failure or timeout is returned as an error and the
    /// caller must treat it as "nothing observed", never as an empty listing.
    pub async fn build(&self) -> Result<Snapshot> {
        let blocks = with_deadline("acquisition", self.timeout, self.source.fetch_raw_blocks()).await?;
        Ok(Self::from_blocks(&blocks))
    }

    /// Parse already acquired blocks.
    pub fn from_blocks(blocks: &[String]) -> Snapshot {
        let mut snapshot = Snapshot {
            blocks_seen: blocks.len(),
            ..Snapshot::default()
        };

        for block in blocks {
            let record = parser::parse(block);
            if record.is_valid() {
                snapshot.records.push(record);
            } else {
                snapshot.discarded += 1;
                log::debug!("Discarded card without bank or rate: {:?}", block);
            }
        }

        log::info!(
            "Snapshot: {} records from {} cards ({} discarded)",
            snapshot.records.len(),
            snapshot.blocks_seen,
            snapshot.discarded
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::AppError;
    use crate::services::StaticPageSource;

    struct FailingSource;

    #[async_trait]
    impl PageSource for FailingSource {
        async fn fetch_raw_blocks(&self) -> Result<Vec<String>> {
            Err(AppError::acquisition("connection refused"))
        }
    }

    struct StalledSource;

    #[async_trait]
    impl PageSource for StalledSource {
        async fn fetch_raw_blocks(&self) -> Result<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    fn builder(source: impl PageSource + 'static) -> SnapshotBuilder {
        SnapshotBuilder::new(Arc::new(source), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_build_keeps_valid_records_in_order() {
        let source = StaticPageSource::new(vec![
            "Alpha Bank\nSaver\n7.5%".to_string(),
            "Beta Bank\nFlex\n8%".to_string(),
        ]);
        let snapshot = builder(source).build().await.unwrap();

        let banks: Vec<_> = snapshot.records.iter().map(|r| r.bank_name.as_str()).collect();
        assert_eq!(banks, ["Alpha Bank", "Beta Bank"]);
        assert_eq!(snapshot.discarded, 0);
    }

    #[tokio::test]
    async fn test_build_discards_invalid_blocks() {
        let source = StaticPageSource::new(vec![
            "Alpha Bank\nSaver\n7.5%".to_string(),
            "7.5%\n1 000 ₽".to_string(),
            "Gamma Bank\nMax\nno rate %".to_string(),
            String::new(),
        ]);
        let snapshot = builder(source).build().await.unwrap();

        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.blocks_seen, 4);
        assert_eq!(snapshot.discarded, 3);
        assert!(snapshot.records.iter().all(|r| r.rate > Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_empty_listing_is_an_empty_snapshot() {
        let snapshot = builder(StaticPageSource::default()).build().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_acquisition_failure_is_an_error() {
        let result = builder(FailingSource).build().await;
        assert!(matches!(result, Err(AppError::Acquisition(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_timeout() {
        let result = builder(StalledSource).build().await;
        assert!(result.unwrap_err().is_timeout());
    }
}
