//! Pipeline entry points for the rate watcher.
//!
//! - `ChangeDetector`: snapshot, diff, upsert and notify
//! - `DigestReporter`: periodic summary of stored rates
//! - `Scheduler`: runs both on independent intervals

pub mod detect;
pub mod diff;
pub mod digest;
pub mod scheduler;

pub use detect::{ChangeDetector, PassReport};
pub use diff::diff;
pub use digest::{DigestOutcome, DigestReporter};
pub use scheduler::{Cycle, Scheduler, SchedulerHandle};
