//! Recovery Log
//!
//! Append-only newline-delimited JSON file with one error event per failed
//! call and one completion event per call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::recovery::{classify, RecoveryContext, RecoveryStatsSnapshot};

#[derive(Debug, Serialize)]
struct ErrorEvent<'a> {
    timestamp: DateTime<Utc>,
    error: ErrorDetails,
    context: &'a RecoveryContext,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    stack: String,
    name: &'static str,
}

#[derive(Debug, Serialize)]
struct CompletionEvent<'a> {
    timestamp: DateTime<Utc>,
    context: &'a RecoveryContext,
    /// Elapsed milliseconds
    duration: u64,
    stats: &'a RecoveryStatsSnapshot,
}

/// Writer for the recovery log.
///
/// Write failures are logged and swallowed; the log never fails a call.
#[derive(Debug, Clone)]
pub struct RecoveryLog {
    path: PathBuf,
}

impl RecoveryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records a failed call with its full error chain.
    pub async fn log_error(&self, err: &anyhow::Error, context: &RecoveryContext) {
        let event = ErrorEvent {
            timestamp: Utc::now(),
            error: ErrorDetails {
                message: format!("{:#}", err),
                stack: format!("{:?}", err),
                name: classify(err).name(),
            },
            context,
        };
        self.append(&event).await;
    }

    /// Records the end of a call.
    pub async fn log_completion(
        &self,
        context: &RecoveryContext,
        duration: Duration,
        stats: &RecoveryStatsSnapshot,
    ) {
        let event = CompletionEvent {
            timestamp: Utc::now(),
            context,
            duration: duration.as_millis() as u64,
            stats,
        };
        self.append(&event).await;
    }

    async fn append<T: Serialize>(&self, event: &T) {
        if let Err(e) = self.try_append(event).await {
            warn!("Failed to write recovery log {}: {:#}", self.path.display(), e);
        }
    }

    async fn try_append<T: Serialize>(&self, event: &T) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
