// src/pipeline/detect.rs

//! Change-detection pass.
//!
//! One pass: build a snapshot, read stored records, diff, then for each
//! event upsert the record and deliver its message. The upsert for a bank
//! always completes before that bank's message is sent, so stored state is
//! never older than what has been announced.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, with_deadline};
use crate::notify::Notifier;
use crate::notify::format::format_event;
use crate::pipeline::diff::{count_by_kind, diff};
use crate::services::SnapshotBuilder;
use crate::storage::RateStore;

/// Outcome of one change-detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Valid records in the snapshot
    pub observed: usize,
    pub added: usize,
    pub changed: usize,
    /// Events whose upsert failed; their messages were not sent
    pub store_failures: usize,
    /// Events stored but not delivered
    pub delivery_failures: usize,
}

impl PassReport {
    pub fn events(&self) -> usize {
        self.added + self.changed
    }

    pub fn delivered(&self) -> usize {
        self.events() - self.store_failures - self.delivery_failures
    }
}

/// Runs change-detection passes.
pub struct ChangeDetector {
    builder: SnapshotBuilder,
    store: Arc<dyn RateStore>,
    notifier: Notifier,
    store_timeout: Duration,
}

impl ChangeDetector {
    pub fn new(
        builder: SnapshotBuilder,
        store: Arc<dyn RateStore>,
        notifier: Notifier,
        store_timeout: Duration,
    ) -> Self {
        Self {
            builder,
            store,
            notifier,
            store_timeout,
        }
    }

    /// Run one pass.
    ///
    /// Acquisition and store read failures abort the pass and are returned.
    /// Per-event failures are isolated: a failed upsert skips that bank's
    /// message, a failed delivery is logged, and the remaining events go on.
    pub async fn run_pass(&self) -> Result<PassReport> {
        let snapshot = self.builder.build().await?;
        let previous = with_deadline("store read", self.store_timeout, self.store.read_all()).await?;

        let events = diff(&snapshot.records, &previous);
        let (added, changed) = count_by_kind(&events);
        let mut report = PassReport {
            observed: snapshot.records.len(),
            added,
            changed,
            ..PassReport::default()
        };

        if events.is_empty() {
            log::debug!("No rate changes in {} records", report.observed);
            return Ok(report);
        }
        log::info!("Diff: {} added, {} changed", added, changed);

        for event in &events {
            let record = event.record();

            let upsert = with_deadline("store upsert", self.store_timeout, self.store.upsert(record)).await;
            if let Err(e) = upsert {
                report.store_failures += 1;
                log::error!("Upsert failed bank={:?}: {}", record.bank_name, e);
                continue;
            }

            if let Err(e) = self.notifier.deliver(&format_event(event)).await {
                report.delivery_failures += 1;
                log::error!("Notification failed bank={:?}: {}", record.bank_name, e);
            }
        }

        Ok(report)
    }
}
