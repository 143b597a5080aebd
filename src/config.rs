//! Configuration Module
//!
//! Handles loading and managing cache, recovery and server configuration
//! from environment variables.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CATEGORY_DOCS, CATEGORY_MEMORY, CATEGORY_PATTERNS, CATEGORY_RESPONSES};

// == Defaults ==
/// Default cache capacity in bytes (100 MiB)
pub const DEFAULT_MAX_SIZE: usize = 100 * 1024 * 1024;

const DEFAULT_TTL_SECS: u64 = 3600;
const DEFAULT_BACKOFF_MS: [u64; 3] = [1000, 3000, 9000];

// == TTL Policy ==
/// Per-category time-to-live with a fallback for unknown categories.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    /// TTL applied to categories without an explicit entry
    pub default: Duration,
    /// Category-specific TTLs
    pub per_category: HashMap<String, Duration>,
}

impl TtlPolicy {
    /// Creates a policy with only a default TTL.
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            per_category: HashMap::new(),
        }
    }

    /// Sets the TTL for a category, returning the updated policy.
    pub fn with_category(mut self, category: impl Into<String>, ttl: Duration) -> Self {
        self.per_category.insert(category.into(), ttl);
        self
    }

    /// Returns the TTL for a category, falling back to the default.
    pub fn ttl_for(&self, category: &str) -> Duration {
        self.per_category
            .get(category)
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS))
            .with_category(CATEGORY_RESPONSES, Duration::from_secs(3600))
            .with_category(CATEGORY_DOCS, Duration::from_secs(86_400))
            .with_category(CATEGORY_PATTERNS, Duration::from_secs(7200))
            .with_category(CATEGORY_MEMORY, Duration::from_secs(1800))
    }
}

// == Cache Config ==
/// Cache store parameters.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum total serialized size of all entries, in bytes
    pub max_size: usize,
    /// Category TTLs
    pub ttl: TtlPolicy,
    /// Durable sink for `persist()` / `load()`
    pub persist_path: PathBuf,
    /// Whether the binary runs the periodic persistence task
    pub auto_persist: bool,
    /// Interval between automatic persistence cycles
    pub persist_interval: Duration,
    /// Interval between background TTL sweeps
    pub cleanup_interval: Duration,
    /// Optional JSON file of warmup items applied at startup
    pub warmup_path: Option<PathBuf>,
}

impl CacheConfig {
    /// Creates a config with the given capacity and default everything else.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: TtlPolicy::default(),
            persist_path: PathBuf::from("persistent-cache.json"),
            auto_persist: true,
            persist_interval: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
            warmup_path: None,
        }
    }
}

// == Recovery Config ==
/// Recovery engine parameters.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of attempts before pattern recovery kicks in
    pub max_retries: u32,
    /// Backoff delays between attempts; the last one repeats
    pub backoff: Vec<Duration>,
    /// Wait used by retry patterns that do not specify `waitMs`
    pub default_retry_wait: Duration,
    /// Directory holding snapshot records
    pub snapshot_dir: PathBuf,
    /// Error pattern configuration file
    pub error_patterns_file: PathBuf,
    /// Append-only recovery log
    pub recovery_log_file: PathBuf,
    /// Record a git stash checkpoint with every snapshot
    pub git_checkpoint: bool,
}

impl RecoveryConfig {
    /// Creates a config rooted at `dir`, useful for tests and embedding.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            snapshot_dir: dir.join("snapshots"),
            error_patterns_file: dir.join("error-patterns.json"),
            recovery_log_file: dir.join("logs").join("recovery.log"),
            ..Self::default()
        }
    }

    /// Returns the backoff delay before retry number `attempt` (0-based).
    ///
    /// Attempts past the end of the sequence reuse the last delay.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        self.backoff
            .get(attempt)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or_default()
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: DEFAULT_BACKOFF_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            default_retry_wait: Duration::from_millis(2000),
            snapshot_dir: PathBuf::from("snapshots"),
            error_patterns_file: PathBuf::from("error-patterns.json"),
            recovery_log_file: PathBuf::from("logs").join("recovery.log"),
            git_checkpoint: false,
        }
    }
}

// == Config ==
/// Top-level configuration for the service.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Cache store settings
    pub cache: CacheConfig,
    /// Recovery engine settings
    pub recovery: RecoveryConfig,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Cache capacity in bytes (default: 100 MiB)
    /// - `CACHE_DEFAULT_TTL` - Fallback TTL in seconds (default: 3600)
    /// - `CACHE_TTL_RESPONSES`, `CACHE_TTL_DOCS`, `CACHE_TTL_PATTERNS`,
    ///   `CACHE_TTL_MEMORY` - Category TTLs in seconds
    /// - `CACHE_PERSIST_PATH` - Durable cache file (default: persistent-cache.json)
    /// - `CACHE_AUTO_PERSIST` - Periodic persistence on/off (default: true)
    /// - `CACHE_PERSIST_INTERVAL` - Persistence interval in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - TTL sweep interval in seconds (default: 60)
    /// - `CACHE_WARMUP_FILE` - Optional warmup items file
    /// - `RECOVERY_MAX_RETRIES` - Attempts per operation (default: 3)
    /// - `RECOVERY_BACKOFF_MS` - Comma-separated delays (default: 1000,3000,9000)
    /// - `RECOVERY_RETRY_WAIT_MS` - Default retry-pattern wait (default: 2000)
    /// - `SNAPSHOT_DIR`, `ERROR_PATTERNS_FILE`, `RECOVERY_LOG_FILE` - Paths
    /// - `SNAPSHOT_GIT_CHECKPOINT` - Record git stash checkpoints (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = TtlPolicy::default();
        let ttl_secs = |name: &str, category: &str| {
            Duration::from_secs(env_or(name, defaults.ttl_for(category).as_secs()))
        };
        let ttl = TtlPolicy::new(Duration::from_secs(env_or(
            "CACHE_DEFAULT_TTL",
            DEFAULT_TTL_SECS,
        )))
        .with_category(CATEGORY_RESPONSES, ttl_secs("CACHE_TTL_RESPONSES", CATEGORY_RESPONSES))
        .with_category(CATEGORY_DOCS, ttl_secs("CACHE_TTL_DOCS", CATEGORY_DOCS))
        .with_category(CATEGORY_PATTERNS, ttl_secs("CACHE_TTL_PATTERNS", CATEGORY_PATTERNS))
        .with_category(CATEGORY_MEMORY, ttl_secs("CACHE_TTL_MEMORY", CATEGORY_MEMORY));

        let cache_defaults = CacheConfig::default();
        let cache = CacheConfig {
            max_size: env_or("CACHE_MAX_SIZE", DEFAULT_MAX_SIZE),
            ttl,
            persist_path: env_or("CACHE_PERSIST_PATH", cache_defaults.persist_path),
            auto_persist: env_or("CACHE_AUTO_PERSIST", true),
            persist_interval: Duration::from_secs(env_or("CACHE_PERSIST_INTERVAL", 300)),
            cleanup_interval: Duration::from_secs(env_or("CLEANUP_INTERVAL", 60)),
            warmup_path: env::var("CACHE_WARMUP_FILE").ok().map(PathBuf::from),
        };

        let recovery_defaults = RecoveryConfig::default();
        let recovery = RecoveryConfig {
            max_retries: env_or("RECOVERY_MAX_RETRIES", recovery_defaults.max_retries),
            backoff: env::var("RECOVERY_BACKOFF_MS")
                .ok()
                .and_then(|v| parse_backoff(&v))
                .unwrap_or(recovery_defaults.backoff),
            default_retry_wait: Duration::from_millis(env_or("RECOVERY_RETRY_WAIT_MS", 2000)),
            snapshot_dir: env_or("SNAPSHOT_DIR", recovery_defaults.snapshot_dir),
            error_patterns_file: env_or("ERROR_PATTERNS_FILE", recovery_defaults.error_patterns_file),
            recovery_log_file: env_or("RECOVERY_LOG_FILE", recovery_defaults.recovery_log_file),
            git_checkpoint: env_or("SNAPSHOT_GIT_CHECKPOINT", false),
        };

        Self {
            cache,
            recovery,
            server_port: env_or("SERVER_PORT", 3000),
        }
    }
}

/// Reads and parses an environment variable, falling back to `default`.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses a comma-separated list of millisecond delays.
///
/// Returns None when the list is empty or any element is not a number.
fn parse_backoff(raw: &str) -> Option<Vec<Duration>> {
    let delays = raw
        .split(',')
        .map(|part| part.trim().parse::<u64>().map(Duration::from_millis))
        .collect::<std::result::Result<Vec<_>, _>>()
        .ok()?;
    (!delays.is_empty()).then_some(delays)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache.max_size, DEFAULT_MAX_SIZE);
        assert_eq!(config.recovery.max_retries, 3);
        assert_eq!(
            config.recovery.backoff,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(9)
            ]
        );
        assert!(config.cache.auto_persist);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_MAX_SIZE");
        env::remove_var("RECOVERY_MAX_RETRIES");
        env::remove_var("RECOVERY_BACKOFF_MS");
        env::remove_var("SERVER_PORT");

        let config = Config::from_env();
        assert_eq!(config.cache.max_size, DEFAULT_MAX_SIZE);
        assert_eq!(config.recovery.max_retries, 3);
        assert_eq!(config.recovery.backoff.len(), 3);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_ttl_policy_fallback() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for(CATEGORY_DOCS), Duration::from_secs(86_400));
        assert_eq!(policy.ttl_for(CATEGORY_MEMORY), Duration::from_secs(1800));
        assert_eq!(policy.ttl_for("unknown"), Duration::from_secs(DEFAULT_TTL_SECS));
    }

    #[test]
    fn test_backoff_delay_repeats_last() {
        let config = RecoveryConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(9));
        assert_eq!(config.backoff_delay(7), Duration::from_secs(9));
    }

    #[test]
    fn test_backoff_delay_empty_sequence() {
        let config = RecoveryConfig {
            backoff: Vec::new(),
            ..RecoveryConfig::default()
        };
        assert_eq!(config.backoff_delay(0), Duration::ZERO);
    }

    #[test]
    fn test_parse_backoff() {
        assert_eq!(
            parse_backoff("10, 20,30"),
            Some(vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(30)
            ])
        );
        assert_eq!(parse_backoff("10,abc"), None);
        assert_eq!(parse_backoff(""), None);
    }
}
