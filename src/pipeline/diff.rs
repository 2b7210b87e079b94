//! Diff calculation for change notifications.
//!
//! Compares a freshly observed snapshot with the stored records and
//! classifies each observed bank as added, changed or unchanged. Only
//! added and changed banks produce a [`ChangeEvent`].
//!
//! Rates compare numerically, so `7.50` and `7.5` are the same rate.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::{ChangeEvent, ChangeKind, RateRecord};

/// Classify every record in `current` against `previous`.
///
/// Events come out in the order of `current`. When `previous` holds the
/// same bank twice the later entry wins. The function is pure: the same
/// inputs always give the same events and nothing is written.
pub fn diff(current: &[RateRecord], previous: &[RateRecord]) -> Vec<ChangeEvent> {
    let known: HashMap<&str, Decimal> = previous
        .iter()
        .map(|r| (r.bank_name.as_str(), r.rate))
        .collect();

    current
        .iter()
        .filter_map(|record| match known.get(record.bank_name.as_str()) {
            None => Some(ChangeEvent::Added {
                record: record.clone(),
            }),
            Some(&previous_rate) if previous_rate != record.rate => Some(ChangeEvent::Changed {
                record: record.clone(),
                previous_rate,
            }),
            Some(_) => None,
        })
        .collect()
}

/// Number of added and changed events, in that order.
pub fn count_by_kind(events: &[ChangeEvent]) -> (usize, usize) {
    let added = events.iter().filter(|e| e.kind() == ChangeKind::Added).count();
    (added, events.len() - added)
}
