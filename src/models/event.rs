//! Change events produced by the diff engine.

use rust_decimal::Decimal;
use serde::Serialize;

use super::RateRecord;

/// Kind of a detected change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Added,
    Changed,
}

/// A classified difference between an observed record and stored state.
///
/// Unchanged records never produce an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChangeEvent {
    /// The bank was not in stored state.
    Added { record: RateRecord },
    /// The bank was stored with a different rate.
    Changed {
        record: RateRecord,
        previous_rate: Decimal,
    },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Added { .. } => ChangeKind::Added,
            ChangeEvent::Changed { .. } => ChangeKind::Changed,
        }
    }

    /// The newly observed state.
    pub fn record(&self) -> &RateRecord {
        match self {
            ChangeEvent::Added { record } | ChangeEvent::Changed { record, .. } => record,
        }
    }

    /// Rate held in the store before this change, if there was one.
    pub fn previous_rate(&self) -> Option<Decimal> {
        match self {
            ChangeEvent::Added { .. } => None,
            ChangeEvent::Changed { previous_rate, .. } => Some(*previous_rate),
        }
    }
}
