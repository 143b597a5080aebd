//! Response DTOs for the status API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, Remediation};
use crate::recovery::{ErrorPattern, RecoveryStatsSnapshot};

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    pub recovery: RecoveryStatsSnapshot,
}

/// Response body for POST /cache/cleanup
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    /// Number of expired entries removed
    pub removed: usize,
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Cleared category, absent when the whole cache was cleared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(category: Option<String>, removed: usize) -> Self {
        let message = match &category {
            Some(category) => format!("Cleared {} entries from '{}'", removed, category),
            None => format!("Cleared all {} entries", removed),
        };
        Self {
            message,
            category,
            removed,
        }
    }
}

/// Response body for POST /cache/persist
#[derive(Debug, Clone, Serialize)]
pub struct PersistResponse {
    /// Number of entries written
    pub persisted: usize,
    pub path: String,
}

/// Response body for POST /cache/remediate
#[derive(Debug, Clone, Serialize)]
pub struct RemediateResponse {
    pub threshold_percent: f64,
    #[serde(flatten)]
    pub outcome: Remediation,
}

/// Response body for GET /patterns and POST /patterns
#[derive(Debug, Clone, Serialize)]
pub struct PatternsResponse {
    pub patterns: Vec<ErrorPattern>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
