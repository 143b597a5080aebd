//! External Checkpoints
//!
//! Best-effort markers of state outside the captured files. Implementations
//! report failure through their return values and never error.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Creates and restores a best-effort external state marker.
#[async_trait]
pub trait ExternalCheckpoint: Send + Sync {
    /// Records a checkpoint, returning its reference, or None when nothing
    /// was recorded.
    async fn create(&self, label: &str) -> Option<String>;

    /// Restores a checkpoint; false when it could not be restored.
    async fn restore(&self, reference: &str) -> bool;
}

/// Checkpoint that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCheckpoint;

#[async_trait]
impl ExternalCheckpoint for NoopCheckpoint {
    async fn create(&self, _label: &str) -> Option<String> {
        None
    }

    async fn restore(&self, _reference: &str) -> bool {
        true
    }
}

// == Git Stash ==
/// Records uncommitted changes as a git stash commit.
///
/// Uses `git stash create` and `git stash store`, which leave the working
/// tree untouched; restoring applies the stash commit.
#[derive(Debug, Clone)]
pub struct GitStashCheckpoint {
    repo_dir: PathBuf,
}

impl GitStashCheckpoint {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .context("Failed to execute git")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ExternalCheckpoint for GitStashCheckpoint {
    async fn create(&self, label: &str) -> Option<String> {
        let commit = match self.git(&["stash", "create"]).await {
            Ok(commit) if !commit.is_empty() => commit,
            Ok(_) => {
                debug!("No local changes to checkpoint");
                return None;
            }
            Err(e) => {
                debug!("Git checkpoint unavailable: {:#}", e);
                return None;
            }
        };

        let message = format!("auto-snapshot-{}", label);
        if let Err(e) = self.git(&["stash", "store", "-m", &message, &commit]).await {
            // The commit is still reachable by hash for this process
            debug!("Could not store stash {}: {:#}", commit, e);
        }

        Some(commit)
    }

    async fn restore(&self, reference: &str) -> bool {
        match self.git(&["stash", "apply", reference]).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Git checkpoint restore failed: {:#}", e);
                false
            }
        }
    }
}
