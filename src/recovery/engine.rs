//! Recovery Engine
//!
//! Runs caller-supplied operations with a snapshot, bounded retries with
//! backoff, and pattern-driven recovery when retries are exhausted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::config::RecoveryConfig;
use crate::error::{FailureReason, RecoveryError};
use crate::recovery::{
    apply_fix, classify, describe, CommandRunner, ErrorPattern, ErrorPatternStore,
    RecoveryContext, RecoveryLog, RecoveryStats, RecoveryStatsSnapshot, ShellCommandRunner,
    Strategy,
};
use crate::snapshot::{ExternalCheckpoint, GitStashCheckpoint, NoopCheckpoint, SnapshotStore};

/// Coordinates snapshots, retries and recovery strategies.
pub struct RecoveryEngine {
    config: RecoveryConfig,
    snapshots: SnapshotStore,
    patterns: RwLock<ErrorPatternStore>,
    stats: Arc<RecoveryStats>,
    log: RecoveryLog,
    commands: Option<Arc<dyn CommandRunner>>,
}

impl RecoveryEngine {
    /// Creates an engine, loading its pattern table from the configured file.
    pub async fn new(config: RecoveryConfig) -> Self {
        let checkpoint: Arc<dyn ExternalCheckpoint> = if config.git_checkpoint {
            Arc::new(GitStashCheckpoint::new("."))
        } else {
            Arc::new(NoopCheckpoint)
        };
        let patterns = ErrorPatternStore::load(&config.error_patterns_file).await;

        Self {
            snapshots: SnapshotStore::new(&config.snapshot_dir, checkpoint),
            patterns: RwLock::new(patterns),
            stats: Arc::new(RecoveryStats::new()),
            log: RecoveryLog::new(&config.recovery_log_file),
            commands: Some(Arc::new(ShellCommandRunner::default())),
            config,
        }
    }

    pub fn with_checkpoint(mut self, checkpoint: Arc<dyn ExternalCheckpoint>) -> Self {
        self.snapshots = SnapshotStore::new(&self.config.snapshot_dir, checkpoint);
        self
    }

    /// Replaces the runner used by `run_command` fixes; None disables them.
    pub fn with_command_runner(mut self, runner: Option<Arc<dyn CommandRunner>>) -> Self {
        self.commands = runner;
        self
    }

    /// Shares an existing counter set with this engine.
    pub fn with_stats(mut self, stats: Arc<RecoveryStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    // == Execute With Recovery ==
    /// Runs `operation` under a snapshot with retries and pattern recovery.
    ///
    /// Returns the operation's value, a strategy's value, or a single error
    /// carrying the original cause and whether rollback was attempted.
    pub async fn execute_with_recovery<T, F, Fut>(
        &self,
        mut operation: F,
        context: RecoveryContext,
    ) -> Result<T, RecoveryError>
    where
        T: DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let started = Instant::now();
        let snapshot_id = self.snapshots.create_snapshot(&context).await?;

        let outcome = self.run(&mut operation, &context, &snapshot_id).await;

        self.log
            .log_completion(&context, started.elapsed(), &self.stats.snapshot())
            .await;
        outcome
    }

    async fn run<T, F, Fut>(
        &self,
        operation: &mut F,
        context: &RecoveryContext,
        snapshot_id: &str,
    ) -> Result<T, RecoveryError>
    where
        T: DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let cause = match self.try_execute(operation).await {
            Ok(value) => {
                self.discard_snapshot(context, snapshot_id).await;
                return Ok(value);
            }
            Err(cause) => cause,
        };

        self.stats.record_error();
        self.log.log_error(&cause, context).await;

        let kind = classify(&cause);
        if !kind.is_retryable() {
            self.stats.record_failed();
            error!("Unretryable {}: {:#}", kind, cause);
            let rollback_attempted = self.safety_rollback(context, snapshot_id).await;
            return Err(RecoveryError::Unretryable {
                kind,
                cause,
                rollback_attempted,
                snapshot_id: snapshot_id.to_string(),
            });
        }

        match self.attempt_recovery(&cause, operation, snapshot_id).await {
            Ok(value) => {
                self.stats.record_recovered();
                self.discard_snapshot(context, snapshot_id).await;
                Ok(value)
            }
            Err(reason) => {
                self.stats.record_failed();
                error!("Recovery failed for '{:#}': {}", cause, reason);
                let rollback_attempted = self.safety_rollback(context, snapshot_id).await;
                Err(RecoveryError::RecoveryFailed {
                    cause,
                    reason,
                    rollback_attempted,
                    snapshot_id: snapshot_id.to_string(),
                })
            }
        }
    }

    /// Attempts the operation up to `max_retries` times, stopping early on
    /// unretryable errors.
    async fn try_execute<T, F, Fut>(&self, operation: &mut F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            attempt += 1;

            if !classify(&err).is_retryable() || attempt >= attempts {
                return Err(err);
            }

            let delay = self.config.backoff_delay(attempt as usize - 1);
            warn!(
                "Attempt {}/{} failed: {}; retrying in {:?}",
                attempt,
                attempts,
                describe(&err),
                delay
            );
            sleep(delay).await;
        }
    }

    // == Pattern Recovery ==
    async fn attempt_recovery<T, F, Fut>(
        &self,
        cause: &anyhow::Error,
        operation: &mut F,
        snapshot_id: &str,
    ) -> Result<T, FailureReason>
    where
        T: DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let description = describe(cause);
        let pattern = {
            let patterns = self.patterns.read().await;
            patterns.find(&description, classify(cause)).cloned()
        };

        let Some(pattern) = pattern else {
            warn!("No error pattern matches '{}'", description);
            return Err(FailureReason::NoMatchingPattern);
        };

        let strategy = pattern.strategy.kind();
        info!("Applying {} strategy ({})", strategy, pattern.label());

        self.apply_strategy(&pattern, cause, operation, snapshot_id)
            .await
            .map_err(|e| {
                warn!("{} strategy failed: {:#}", strategy, e);
                FailureReason::StrategyFailed {
                    strategy,
                    message: format!("{:#}", e),
                }
            })
    }

    async fn apply_strategy<T, F, Fut>(
        &self,
        pattern: &ErrorPattern,
        cause: &anyhow::Error,
        operation: &mut F,
        snapshot_id: &str,
    ) -> anyhow::Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match &pattern.strategy {
            Strategy::Retry { wait_ms } => {
                let wait = wait_ms
                    .map(Duration::from_millis)
                    .unwrap_or(self.config.default_retry_wait);
                sleep(wait).await;
                operation().await
            }
            Strategy::Rollback => {
                if !self.snapshots.rollback(snapshot_id).await {
                    warn!("Rollback to snapshot {} was incomplete", snapshot_id);
                }
                self.stats.record_rollback();
                operation().await
            }
            Strategy::Fix { fix } => {
                if let Some(fix) = fix {
                    apply_fix(fix, self.commands.as_deref()).await?;
                    self.stats.record_fix();
                }
                operation().await
            }
            Strategy::Skip { default_value } => serde_json::from_value(default_value.clone())
                .context("Skip default does not fit the operation's result type"),
            Strategy::Manual => {
                let message = pattern
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{:#}", cause));
                Err(anyhow!("Manual intervention required: {}", message))
            }
        }
    }

    async fn safety_rollback(&self, context: &RecoveryContext, snapshot_id: &str) -> bool {
        if !context.auto_rollback {
            return false;
        }
        if !self.snapshots.rollback(snapshot_id).await {
            error!("Safety rollback to snapshot {} failed", snapshot_id);
        }
        true
    }

    async fn discard_snapshot(&self, context: &RecoveryContext, snapshot_id: &str) {
        if !context.keep_snapshot {
            self.snapshots.cleanup(snapshot_id).await;
        }
    }

    // == Patterns & Stats ==
    /// Validates and appends an error pattern, persisting the table.
    pub async fn add_error_pattern(&self, pattern: ErrorPattern) -> Result<(), RecoveryError> {
        self.patterns.write().await.add(pattern).await
    }

    pub async fn patterns(&self) -> Vec<ErrorPattern> {
        self.patterns.read().await.patterns()
    }

    pub fn stats(&self) -> RecoveryStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}
