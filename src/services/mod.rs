//! Service layer for the rate watcher.
//!
//! This module turns the public listing into records:
//! - Page acquisition (`PageSource`, `HttpPageSource`)
//! - Card parsing (`parser`)
//! - Snapshot building (`SnapshotBuilder`)

mod acquisition;
pub mod parser;
mod snapshot;

pub use acquisition::{HttpPageSource, PageSource, StaticPageSource, extract_blocks};
pub use snapshot::{Snapshot, SnapshotBuilder};
