// src/models/mod.rs

//! Domain models for the rate watcher.

mod config;
mod event;
mod rate;

// Re-export all public types
pub use config::{
    Config, LoggingConfig, MARKDOWN_V2, NotifyBackend, NotifyConfig, ScheduleConfig, SourceConfig,
    StorageBackend, StorageConfig,
};
pub use event::{ChangeEvent, ChangeKind};
pub use rate::RateRecord;
