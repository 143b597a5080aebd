//! Snapshot Module
//!
//! Point-in-time capture of caller-named files and an optional external
//! checkpoint, restorable by id.

mod checkpoint;
mod store;

pub use checkpoint::{ExternalCheckpoint, GitStashCheckpoint, NoopCheckpoint};
pub use store::{CapturedFile, Snapshot, SnapshotStore};
