//! In-memory storage for tests and dry runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::RateRecord;
use crate::storage::{RateStore, upsert_in_place};

/// Process-local store. State does not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RwLock<Vec<RateRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing records, later duplicates overwriting earlier ones.
    pub fn with_records(records: impl IntoIterator<Item = RateRecord>) -> Self {
        let mut stored = Vec::new();
        for record in records {
            upsert_in_place(&mut stored, &record);
        }
        Self {
            records: RwLock::new(stored),
        }
    }
}

#[async_trait]
impl RateStore for MemoryStorage {
    async fn read_all(&self) -> Result<Vec<RateRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn upsert(&self, record: &RateRecord) -> Result<()> {
        upsert_in_place(&mut *self.records.write().await, record);
        Ok(())
    }
}
