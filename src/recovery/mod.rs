//! Recovery Module
//!
//! Resilient execution of caller-supplied operations: error classification,
//! the error-pattern table, corrective actions, statistics, the recovery log
//! and the engine that ties them to snapshots.

mod classify;
mod context;
mod engine;
mod fix;
mod log;
mod pattern;
mod stats;

pub use classify::{classify, describe, ErrorKind, OperationError};
pub use context::RecoveryContext;
pub use engine::RecoveryEngine;
pub use fix::{apply_fix, CommandRunner, FixAction, ShellCommandRunner};
pub use log::RecoveryLog;
pub use pattern::{default_patterns, ErrorPattern, ErrorPatternStore, Strategy, StrategyKind};
pub use stats::{RecoveryStats, RecoveryStatsSnapshot};
