//! Storage abstractions for rate persistence.
//!
//! The store holds at most one record per bank name. An upsert overwrites
//! the previous record for that bank; there is no history.
//!
//! ## Backends
//!
//! ```text
//! local     {data_dir}/rates.json     JSON document, atomic rewrite
//! memory    process memory            tests and dry runs
//! postgres  bank_rates table          feature "postgres"
//! ```

pub mod local;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{RateRecord, StorageBackend, StorageConfig};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStorage;

/// On-disk layout of `rates.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesFile {
    /// ISO 8601 timestamp of last update
    pub updated_at: DateTime<Utc>,
    /// Number of stored banks
    pub count: usize,
    /// Stored records, first-seen order
    pub records: Vec<RateRecord>,
}

impl RatesFile {
    pub fn new(records: Vec<RateRecord>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: records.len(),
            records,
        }
    }
}

/// Trait for rate storage backends.
///
/// Both scheduler cycles share one store without further locking, so
/// `upsert` must be atomic per call.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Every stored record, one per bank.
    async fn read_all(&self) -> Result<Vec<RateRecord>>;

    /// Insert or overwrite the record for `record.bank_name`.
    async fn upsert(&self, record: &RateRecord) -> Result<()>;
}

/// Insert or overwrite `record` in a bank-keyed list, keeping first-seen order.
pub(crate) fn upsert_in_place(records: &mut Vec<RateRecord>, record: &RateRecord) {
    match records.iter_mut().find(|r| r.bank_name == record.bank_name) {
        Some(existing) => *existing = record.clone(),
        None => records.push(record.clone()),
    }
}

/// Open the backend selected by `config`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn RateStore>> {
    match config.backend {
        StorageBackend::Local => {
            log::info!("Using local store at {}", config.data_dir.display());
            Ok(Arc::new(LocalStorage::new(&config.data_dir)))
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory store; state is lost on exit");
            Ok(Arc::new(MemoryStorage::new()))
        }
        #[cfg(feature = "postgres")]
        StorageBackend::Postgres => {
            let store = PostgresStorage::connect(&config.database_url).await?;
            log::info!("Using postgres store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        StorageBackend::Postgres => Err(crate::error::AppError::config(
            "storage.backend = \"postgres\" needs the `postgres` feature",
        )),
    }
}
