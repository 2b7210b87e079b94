// src/lib.rs

//! Deposit rate watcher library.
//!
//! Observes a public listing of bank deposit offers, detects new banks and
//! rate changes against stored state, and sends notifications. A second,
//! slower cycle sends a digest of everything stored.

pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
