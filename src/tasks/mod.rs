//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Auto-Persist: Writes the cache to its durable sink at configured intervals

mod cleanup;
mod persist;

pub use cleanup::spawn_cleanup_task;
pub use persist::spawn_persist_task;
