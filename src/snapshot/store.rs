//! Snapshot Store
//!
//! Captures named files plus an optional external checkpoint under an opaque
//! id, and restores them on rollback.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::SnapshotError;
use crate::recovery::RecoveryContext;
use crate::snapshot::{ExternalCheckpoint, NoopCheckpoint};

// == Records ==
/// One captured file: its content, or why it could not be read.
///
/// UTF-8 files keep their text in `content`; anything else is stored
/// hex-encoded in `binary_content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedFile {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CapturedFile {
    async fn capture(path: &Path) -> Self {
        let mut file = Self {
            path: path.to_path_buf(),
            content: None,
            binary_content: None,
            error: None,
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => file.content = Some(text),
                Err(e) => file.binary_content = Some(hex::encode(e.as_bytes())),
            },
            Err(e) => file.error = Some(e.to_string()),
        }
        file
    }

    /// Captured bytes, or None when the file could not be read.
    pub fn bytes(&self) -> Option<std::result::Result<Vec<u8>, hex::FromHexError>> {
        match (&self.content, &self.binary_content) {
            (Some(text), _) => Some(Ok(text.clone().into_bytes())),
            (None, Some(encoded)) => Some(hex::decode(encoded)),
            (None, None) => None,
        }
    }
}

/// Durable snapshot record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub context: RecoveryContext,
    /// Captured files in the order they were listed
    pub files: Vec<CapturedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
}

// == Snapshot Store ==
/// File-backed store of snapshot records, one JSON file per id.
#[derive(Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    checkpoint: Arc<dyn ExternalCheckpoint>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, checkpoint: Arc<dyn ExternalCheckpoint>) -> Self {
        Self {
            dir: dir.into(),
            checkpoint,
        }
    }

    /// Creates a store that records no external checkpoint.
    pub fn without_checkpoint(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, Arc::new(NoopCheckpoint))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("snapshot-{}.json", id))
    }

    // == Create ==
    /// Captures `context.files` and the external checkpoint, then writes the
    /// record. Unreadable files are recorded with their error.
    pub async fn create_snapshot(&self, context: &RecoveryContext) -> Result<String, SnapshotError> {
        let id = Uuid::new_v4().simple().to_string();

        let mut files = Vec::with_capacity(context.files.len());
        for path in &context.files {
            files.push(CapturedFile::capture(path).await);
        }

        let snapshot = Snapshot {
            checkpoint: self.checkpoint.create(&id).await,
            id: id.clone(),
            timestamp: Utc::now(),
            context: context.clone(),
            files,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| io_error(&self.dir, source))?;
        let path = self.record_path(&id);
        tokio::fs::write(&path, serde_json::to_vec_pretty(&snapshot)?)
            .await
            .map_err(|source| io_error(&path, source))?;

        debug!("Created snapshot {} with {} files", id, snapshot.files.len());
        Ok(id)
    }

    /// Reads a snapshot record.
    pub async fn load(&self, id: &str) -> Result<Snapshot, SnapshotError> {
        let path = self.record_path(id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| io_error(&path, source))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // == Rollback ==
    /// Restores the external checkpoint and every captured file.
    ///
    /// Returns false when the record cannot be loaded or a file could not be
    /// rewritten; the remaining files are still restored.
    pub async fn rollback(&self, id: &str) -> bool {
        let snapshot = match self.load(id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Rollback to snapshot {} failed: {}", id, e);
                return false;
            }
        };

        if let Some(reference) = &snapshot.checkpoint {
            if !self.checkpoint.restore(reference).await {
                warn!("External checkpoint {} was not restored", reference);
            }
        }

        let mut complete = true;
        for file in &snapshot.files {
            let content = match file.bytes() {
                Some(Ok(content)) => content,
                Some(Err(e)) => {
                    error!("Corrupt capture of {}: {}", file.path.display(), e);
                    complete = false;
                    continue;
                }
                None => continue,
            };
            if let Err(e) = tokio::fs::write(&file.path, content).await {
                error!("Failed to restore {}: {}", file.path.display(), e);
                complete = false;
            }
        }

        if complete {
            info!("Rolled back to snapshot {}", id);
        }
        complete
    }

    // == Cleanup ==
    /// Deletes a snapshot record. Idempotent.
    pub async fn cleanup(&self, id: &str) {
        let path = self.record_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed snapshot {}", id),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove snapshot {}: {}", path.display(), e),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SnapshotError {
    SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    }
}
