//! Recovery Context
//!
//! Caller-supplied data describing one `execute_with_recovery` call.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-call options plus opaque caller data.
///
/// Serialized into snapshot records and recovery log lines; `data` is
/// flattened so arbitrary caller keys sit next to the known ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryContext {
    /// Files captured by the call's snapshot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
    /// Keep the snapshot record after a successful call
    #[serde(default)]
    pub keep_snapshot: bool,
    /// Roll back to the snapshot when recovery fails
    #[serde(default = "default_auto_rollback")]
    pub auto_rollback: bool,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

fn default_auto_rollback() -> bool {
    true
}

impl Default for RecoveryContext {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            keep_snapshot: false,
            auto_rollback: default_auto_rollback(),
            data: Map::new(),
        }
    }
}

impl RecoveryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn keep_snapshot(mut self) -> Self {
        self.keep_snapshot = true;
        self
    }

    pub fn without_auto_rollback(mut self) -> Self {
        self.auto_rollback = false;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_enable_auto_rollback() {
        let context = RecoveryContext::new();
        assert!(context.auto_rollback);
        assert!(!context.keep_snapshot);

        let parsed: RecoveryContext = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed, context);
    }

    #[test]
    fn test_caller_data_is_flattened() {
        let context = RecoveryContext::new()
            .with_files(["src/main.rs"])
            .with_data("agent", "builder");

        let value = serde_json::to_value(&context).unwrap();
        assert_eq!(value["agent"], json!("builder"));
        assert_eq!(value["files"], json!(["src/main.rs"]));
        assert_eq!(value["autoRollback"], json!(true));

        let back: RecoveryContext = serde_json::from_value(value).unwrap();
        assert_eq!(back.data["agent"], json!("builder"));
    }
}
