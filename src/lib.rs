//! Agent Resilience - a bounded expiring cache and a resilient execution engine
//!
//! Provides a byte-bounded TTL/LRU cache with persistence, snapshots of
//! caller-named files, and an engine that retries, rolls back and applies
//! pattern-driven recovery to failing operations.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod recovery;
pub mod runner;
pub mod snapshot;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheStore;
pub use config::Config;
pub use error::{CacheError, RecoveryError, SnapshotError};
pub use recovery::{RecoveryContext, RecoveryEngine};
pub use runner::TaskRunner;
pub use snapshot::SnapshotStore;
pub use tasks::{spawn_cleanup_task, spawn_persist_task};
