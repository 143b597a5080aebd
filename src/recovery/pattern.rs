//! Error Pattern Table
//!
//! Ordered error-pattern to strategy bindings, loaded from and saved to a
//! `{"patterns": [...]}` JSON file. First match in list order wins.

use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::RecoveryError;
use crate::recovery::{ErrorKind, FixAction};

// == Strategy ==
/// Recovery strategy bound to a pattern, tagged by `strategy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum Strategy {
    /// Wait, then re-invoke the operation once
    Retry {
        #[serde(
            default,
            rename = "waitMs",
            skip_serializing_if = "Option::is_none"
        )]
        wait_ms: Option<u64>,
    },
    /// Roll back to the call's snapshot, then re-invoke once
    Rollback,
    /// Apply a corrective action, then re-invoke once
    Fix {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fix: Option<FixAction>,
    },
    /// Return `defaultValue` without re-invoking
    Skip {
        #[serde(default, rename = "defaultValue")]
        default_value: Value,
    },
    /// Automated recovery is not possible
    Manual,
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Retry { .. } => StrategyKind::Retry,
            Strategy::Rollback => StrategyKind::Rollback,
            Strategy::Fix { .. } => StrategyKind::Fix,
            Strategy::Skip { .. } => StrategyKind::Skip,
            Strategy::Manual => StrategyKind::Manual,
        }
    }
}

/// Discriminant of `Strategy`, used in reports and failure reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Retry,
    Rollback,
    Fix,
    Skip,
    Manual,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Retry => "retry",
            StrategyKind::Rollback => "rollback",
            StrategyKind::Fix => "fix",
            StrategyKind::Skip => "skip",
            StrategyKind::Manual => "manual",
        };
        f.write_str(name)
    }
}

// == Error Pattern ==
/// One binding from an error matcher to a recovery strategy.
///
/// A pattern with a `kind` matches errors of that classified kind; otherwise
/// `pattern` is a case-insensitive regex over the stringified error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPattern {
    #[serde(default)]
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Free-form label, e.g. `connection_error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorPattern {
    /// Creates a regex-matched pattern.
    pub fn new(pattern: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            pattern: pattern.into(),
            kind: None,
            category: None,
            strategy,
            message: None,
        }
    }

    /// Creates a pattern matched on the classified error kind.
    pub fn for_kind(kind: ErrorKind, strategy: Strategy) -> Self {
        Self {
            kind: Some(kind),
            ..Self::new(String::new(), strategy)
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Short name for log lines.
    pub fn label(&self) -> String {
        match self.kind {
            Some(kind) => format!("kind:{}", kind.name()),
            None => self.pattern.clone(),
        }
    }

    fn compile(&self) -> Result<Option<Regex>, RecoveryError> {
        if self.kind.is_some() {
            return Ok(None);
        }
        if self.pattern.is_empty() {
            return Err(RecoveryError::InvalidPattern {
                pattern: self.pattern.clone(),
                reason: "a pattern needs a match expression or a kind".to_string(),
            });
        }

        RegexBuilder::new(&self.pattern)
            .case_insensitive(true)
            .build()
            .map(Some)
            .map_err(|e| RecoveryError::InvalidPattern {
                pattern: self.pattern.clone(),
                reason: e.to_string(),
            })
    }
}

// == Built-in Patterns ==
/// Patterns installed when no configuration file exists.
pub fn default_patterns() -> Vec<ErrorPattern> {
    vec![
        ErrorPattern::new(
            r"ENOENT.*package\.json",
            Strategy::Fix {
                fix: Some(FixAction::CreateFile {
                    file: PathBuf::from("package.json"),
                    content: r#"{"name": "project", "version": "1.0.0"}"#.to_string(),
                }),
            },
        )
        .with_category("missing_file"),
        ErrorPattern::new(
            "npm.*E404",
            Strategy::Skip {
                default_value: Value::Null,
            },
        )
        .with_category("package_not_found")
        .with_message("Package not found in registry"),
        ErrorPattern::new(
            "ECONNREFUSED",
            Strategy::Retry {
                wait_ms: Some(5000),
            },
        )
        .with_category("connection_error")
        .with_message("Connection refused, will retry"),
        ErrorPattern::new(
            "ETIMEDOUT",
            Strategy::Retry {
                wait_ms: Some(3000),
            },
        )
        .with_category("timeout")
        .with_message("Operation timed out"),
        ErrorPattern::new("ENOMEM", Strategy::Manual)
            .with_category("memory_error")
            .with_message("Out of memory"),
        ErrorPattern::for_kind(
            ErrorKind::Network,
            Strategy::Retry {
                wait_ms: Some(5000),
            },
        )
        .with_category("connection_error")
        .with_message("Connection failed, will retry"),
        ErrorPattern::for_kind(
            ErrorKind::Timeout,
            Strategy::Retry {
                wait_ms: Some(3000),
            },
        )
        .with_category("timeout")
        .with_message("Operation timed out"),
    ]
}

// == Pattern Store ==
#[derive(Debug, Clone)]
struct CompiledPattern {
    pattern: ErrorPattern,
    regex: Option<Regex>,
}

impl CompiledPattern {
    fn matches(&self, description: &str, kind: ErrorKind) -> bool {
        match (&self.regex, self.pattern.kind) {
            (_, Some(expected)) => expected == kind,
            (Some(regex), None) => regex.is_match(description),
            (None, None) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PatternFile {
    #[serde(default)]
    patterns: Vec<Value>,
}

/// Ordered pattern table backed by a JSON file.
#[derive(Debug, Clone)]
pub struct ErrorPatternStore {
    path: PathBuf,
    entries: Vec<CompiledPattern>,
}

impl ErrorPatternStore {
    /// Creates a table from explicit patterns without touching the file.
    pub fn from_patterns(
        path: impl Into<PathBuf>,
        patterns: Vec<ErrorPattern>,
    ) -> Result<Self, RecoveryError> {
        let entries = patterns
            .into_iter()
            .map(|pattern| {
                let regex = pattern.compile()?;
                Ok(CompiledPattern { pattern, regex })
            })
            .collect::<Result<Vec<_>, RecoveryError>>()?;

        Ok(Self {
            path: path.into(),
            entries,
        })
    }

    /// Loads the table from `path`.
    ///
    /// A missing file installs and writes the built-in defaults. An unreadable
    /// or corrupt file falls back to the defaults in memory and is left as is.
    /// Individual invalid patterns are skipped.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                let store = Self::with_defaults(path);
                match store.save().await {
                    Ok(()) => info!("Wrote default error patterns to {}", store.path.display()),
                    Err(e) => warn!("Could not write default error patterns: {}", e),
                }
                return store;
            }
            Err(e) => {
                warn!(
                    "Could not read error patterns from {}: {}; using defaults",
                    path.display(),
                    e
                );
                return Self::with_defaults(path);
            }
        };

        let file: PatternFile = match serde_json::from_slice(&bytes) {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    "Error pattern file {} is malformed: {}; using defaults",
                    path.display(),
                    e
                );
                return Self::with_defaults(path);
            }
        };

        let mut entries = Vec::with_capacity(file.patterns.len());
        for raw in file.patterns {
            let parsed = serde_json::from_value::<ErrorPattern>(raw.clone())
                .map_err(RecoveryError::from)
                .and_then(|pattern| {
                    let regex = pattern.compile()?;
                    Ok(CompiledPattern { pattern, regex })
                });

            match parsed {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping error pattern {}: {}", raw, e),
            }
        }

        debug!("Loaded {} error patterns from {}", entries.len(), path.display());
        Self { path, entries }
    }

    fn with_defaults(path: PathBuf) -> Self {
        let entries = default_patterns()
            .into_iter()
            .filter_map(|pattern| {
                let regex = pattern.compile().ok()?;
                Some(CompiledPattern { pattern, regex })
            })
            .collect();
        Self { path, entries }
    }

    /// Writes the whole table to its file.
    pub async fn save(&self) -> Result<(), RecoveryError> {
        let body = json!({ "patterns": self.patterns() });
        let bytes = serde_json::to_vec_pretty(&body)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
        }
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|source| io_error(&self.path, source))
    }

    /// Validates and appends a pattern, then rewrites the file.
    pub async fn add(&mut self, pattern: ErrorPattern) -> Result<(), RecoveryError> {
        let regex = pattern.compile()?;
        info!("Adding error pattern {}", pattern.label());
        self.entries.push(CompiledPattern { pattern, regex });
        self.save().await
    }

    /// Returns the first pattern matching the error, in list order.
    pub fn find(&self, description: &str, kind: ErrorKind) -> Option<&ErrorPattern> {
        self.entries
            .iter()
            .find(|entry| entry.matches(description, kind))
            .map(|entry| &entry.pattern)
    }

    pub fn patterns(&self) -> Vec<ErrorPattern> {
        self.entries.iter().map(|e| e.pattern.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RecoveryError {
    RecoveryError::Io {
        path: path.to_path_buf(),
        source,
    }
}
