//! Local filesystem storage implementation.
//!
//! Keeps every bank's latest record in one JSON document.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── rates.json            # { updated_at, count, records: [...] }
//! ```
//!
//! Writes go to a temporary file that is then renamed over `rates.json`,
//! so readers only ever see a complete document. Upserts are serialized
//! by a mutex, which makes each read-modify-write atomic.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::RateRecord;
use crate::storage::{RateStore, RatesFile, upsert_in_place};

const RATES_KEY: &str = "rates.json";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_records(&self) -> Result<Vec<RateRecord>> {
        let file: Option<RatesFile> = self
            .read_json(RATES_KEY)
            .await
            .map_err(|e| AppError::store(format!("reading {}: {e}", self.path(RATES_KEY).display())))?;
        Ok(file.map(|f| f.records).unwrap_or_default())
    }
}

#[async_trait]
impl RateStore for LocalStorage {
    async fn read_all(&self) -> Result<Vec<RateRecord>> {
        self.load_records().await
    }

    async fn upsert(&self, record: &RateRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_records().await?;
        upsert_in_place(&mut records, record);

        self.write_json(RATES_KEY, &RatesFile::new(records))
            .await
            .map_err(|e| AppError::store(format!("writing {}: {e}", self.path(RATES_KEY).display())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::*;

    fn record(bank: &str, rate: &str) -> RateRecord {
        RateRecord::new(bank, "Saver", rate.parse::<Decimal>().unwrap())
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("not-yet-created"));

        assert!(storage.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_bank() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.upsert(&record("Alpha Bank", "7.5")).await.unwrap();
        storage.upsert(&record("Beta Bank", "9.0")).await.unwrap();
        storage.upsert(&record("Alpha Bank", "8.0")).await.unwrap();

        let records = storage.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record("Alpha Bank", "8.0"));
        assert_eq!(records[1].bank_name, "Beta Bank");

        // A fresh handle on the same directory sees the same state.
        let reopened = LocalStorage::new(tmp.path());
        assert_eq!(reopened.read_all().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_rates_file_shape() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.upsert(&record("Alpha Bank", "7.50")).await.unwrap();

        let file: RatesFile = storage.read_json(RATES_KEY).await.unwrap().unwrap();
        assert_eq!(file.count, 1);
        assert_eq!(file.records[0].rate.to_string(), "7.50");
        assert!(!tmp.path().join("rates.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage.write_bytes(RATES_KEY, b"{ not json").await.unwrap();

        assert!(matches!(storage.read_all().await, Err(AppError::Store(_))));
        assert!(matches!(
            storage.upsert(&record("Alpha Bank", "7")).await,
            Err(AppError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_are_not_lost() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path()));

        let tasks: Vec<_> = (1..=8)
            .map(|i| {
                let storage = Arc::clone(&storage);
                tokio::spawn(async move {
                    storage
                        .upsert(&record(&format!("Bank {i}"), &i.to_string()))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(storage.read_all().await.unwrap().len(), 8);
    }
}
