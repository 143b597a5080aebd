//! Error types for the cache and recovery engine
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::recovery::{ErrorKind, StrategyKind};

// == Cache Error Enum ==
/// Errors raised by the cache store.
///
/// A miss is not an error: lookups return `Option`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Serialized value is larger than the whole cache
    #[error("Cache item too large: {size} bytes exceeds maximum of {max} bytes")]
    ItemTooLarge { size: usize, max: usize },

    /// Value or durable record could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable sink could not be read or written
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid request parameters on the HTTP surface
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == Snapshot Error Enum ==
/// Errors raised while creating or reading snapshot records.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot record is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Failure Reason ==
/// Why pattern-based recovery could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No configured pattern matched the error
    NoMatchingPattern,
    /// A pattern matched but its strategy failed
    StrategyFailed {
        strategy: StrategyKind,
        message: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoMatchingPattern => write!(f, "no matching error pattern"),
            FailureReason::StrategyFailed { strategy, message } => {
                write!(f, "{} strategy failed: {}", strategy, message)
            }
        }
    }
}

// == Recovery Error Enum ==
/// Failure surfaced by the recovery engine.
///
/// Every variant raised by `execute_with_recovery` carries the original cause
/// and whether the rollback safety net ran.
#[derive(Error, Debug)]
pub enum RecoveryError {
    /// Malformed-input-class error; never retried, never pattern-matched
    #[error("Unretryable {kind}: {cause:#} ({})", rollback_note(.rollback_attempted))]
    Unretryable {
        kind: ErrorKind,
        cause: anyhow::Error,
        rollback_attempted: bool,
        snapshot_id: String,
    },

    /// Retries were exhausted and pattern recovery did not succeed
    #[error(
        "Recovery failed: {cause:#} ({reason}; {})",
        rollback_note(.rollback_attempted)
    )]
    RecoveryFailed {
        cause: anyhow::Error,
        reason: FailureReason,
        rollback_attempted: bool,
        snapshot_id: String,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Invalid error pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RecoveryError {
    /// Whether the auto-rollback safety net was invoked before failing.
    pub fn rollback_attempted(&self) -> bool {
        match self {
            RecoveryError::Unretryable {
                rollback_attempted, ..
            }
            | RecoveryError::RecoveryFailed {
                rollback_attempted, ..
            } => *rollback_attempted,
            _ => false,
        }
    }

    /// Id of the snapshot retained for a manual rollback, if any.
    pub fn snapshot_id(&self) -> Option<&str> {
        match self {
            RecoveryError::Unretryable { snapshot_id, .. }
            | RecoveryError::RecoveryFailed { snapshot_id, .. } => Some(snapshot_id),
            _ => None,
        }
    }
}

fn rollback_note(rollback_attempted: &bool) -> &'static str {
    if *rollback_attempted {
        "rollback attempted"
    } else {
        "no rollback"
    }
}

// == IntoResponse Implementations ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::ItemTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::Serialization(_) | CacheError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error_response(status, self.to_string())
    }
}

impl IntoResponse for RecoveryError {
    fn into_response(self) -> Response {
        let status = match &self {
            RecoveryError::InvalidPattern { .. } | RecoveryError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error_response(status, self.to_string())
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_too_large_message() {
        let err = CacheError::ItemTooLarge { size: 20, max: 10 };
        assert_eq!(
            err.to_string(),
            "Cache item too large: 20 bytes exceeds maximum of 10 bytes"
        );
    }

    #[test]
    fn test_item_too_large_status() {
        let response = CacheError::ItemTooLarge { size: 20, max: 10 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_recovery_failed_message_includes_cause_and_reason() {
        let err = RecoveryError::RecoveryFailed {
            cause: anyhow::anyhow!("ECONNREFUSED 127.0.0.1:5432"),
            reason: FailureReason::NoMatchingPattern,
            rollback_attempted: true,
            snapshot_id: "abc".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("ECONNREFUSED"));
        assert!(message.contains("no matching error pattern"));
        assert!(message.contains("rollback attempted"));
        assert!(err.rollback_attempted());
        assert_eq!(err.snapshot_id(), Some("abc"));
    }

    #[test]
    fn test_unretryable_message_reports_skipped_rollback() {
        let err = RecoveryError::Unretryable {
            kind: ErrorKind::Syntax,
            cause: anyhow::anyhow!("unexpected token"),
            rollback_attempted: false,
            snapshot_id: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unretryable SyntaxError: unexpected token (no rollback)"
        );
    }

    #[test]
    fn test_invalid_pattern_status() {
        let err = RecoveryError::InvalidPattern {
            pattern: "(".to_string(),
            reason: "unclosed group".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
