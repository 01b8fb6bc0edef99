//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Hard ceiling on the batch worker pool
pub const MAX_WORKERS: usize = 32;

/// Result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for cached results in seconds
    pub ttl_secs: u64,

    /// Interval between background sweeps of stale entries
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 1800,           // 30 minutes
            sweep_interval_secs: 300, // 5 minutes
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Retry policy configuration for caption fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt in seconds
    pub base_delay_secs: u64,

    /// Upper bound for any single delay in seconds
    pub max_delay_secs: u64,

    /// Per-attempt timeout in seconds (0 disables it)
    pub attempt_timeout_secs: u64,

    /// Randomize delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 2,
            max_delay_secs: 10,
            attempt_timeout_secs: 120,
            jitter: false,
        }
    }
}

/// Artifact directories and their retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Durable directory the caption source writes into
    pub subtitle_dir: PathBuf,

    /// Scratch directory for intermediate files
    pub temp_dir: PathBuf,

    /// Files older than this are deleted by the retention sweep
    pub retention_hours: u64,

    /// Interval between retention sweeps in seconds
    pub cleanup_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            subtitle_dir: PathBuf::from("subtitles"),
            temp_dir: PathBuf::from("temp"),
            retention_hours: 24,
            cleanup_interval_secs: 3600,
        }
    }
}

impl StorageConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }
}

/// Batch orchestrator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker pool size; derived from available parallelism when unset
    pub max_concurrent: Option<usize>,
}

impl BatchConfig {
    /// Effective worker pool size, always within `1..=MAX_WORKERS`
    pub fn workers(&self) -> usize {
        let n = self.max_concurrent.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get() * 2)
                .unwrap_or(4)
        });
        n.clamp(1, MAX_WORKERS)
    }
}

/// Caption source (yt-dlp) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path or name of the yt-dlp binary
    pub ytdlp_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,

    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub batch: BatchConfig,
    pub source: SourceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_enabled: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            storage: StorageConfig::default(),
            batch: BatchConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparsable numeric
    /// values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("API_HOST") {
            self.host = v;
        }
        if let Some(v) = parse_var(&lookup, "API_PORT") {
            self.port = v;
        }
        if let Some(v) = lookup("SUBTITLE_DIR") {
            self.storage.subtitle_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TEMP_DIR") {
            self.storage.temp_dir = PathBuf::from(v);
        }
        if let Some(v) = parse_var(&lookup, "MAX_CONCURRENT_DOWNLOADS") {
            self.batch.max_concurrent = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "CLEANUP_INTERVAL") {
            self.storage.cleanup_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "FILE_RETENTION_HOURS") {
            self.storage.retention_hours = v;
        }
        if let Some(v) = parse_var(&lookup, "CACHE_TTL") {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }
        if let Some(v) = lookup("LOG_FORMAT") {
            self.log_format = v.to_lowercase();
        }
        if let Some(v) = lookup("YTDLP_PATH") {
            self.source.ytdlp_path = v;
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}
