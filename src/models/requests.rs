//! Request DTOs for the status API
//!
//! Defines the structure of incoming query strings and request bodies.

use serde::Deserialize;

use crate::cache::DEFAULT_REMEDIATION_THRESHOLD;

/// Query string for DELETE /cache
///
/// Without a category the whole cache is cleared and counters reset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearQuery {
    #[serde(default)]
    pub category: Option<String>,
}

impl ClearQuery {
    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match &self.category {
            Some(category) if category.trim().is_empty() => {
                Some("Category cannot be empty".to_string())
            }
            _ => None,
        }
    }
}

/// Request body for POST /cache/remediate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemediateRequest {
    /// Utilization percentage above which responses are cleared
    #[serde(default)]
    pub threshold_percent: Option<f64>,
}

impl RemediateRequest {
    pub fn threshold(&self) -> f64 {
        self.threshold_percent
            .unwrap_or(DEFAULT_REMEDIATION_THRESHOLD)
    }

    pub fn validate(&self) -> Option<String> {
        match self.threshold_percent {
            Some(t) if !(0.0..=100.0).contains(&t) => {
                Some("threshold_percent must be between 0 and 100".to_string())
            }
            _ => None,
        }
    }
}
