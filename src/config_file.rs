//! Configuration file support
//!
//! Loads server configuration from TOML files. Every section except
//! `[server]` is optional and falls back to the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{
    BatchConfig, CacheConfig, RetryConfig, ServerConfig, SourceConfig, StorageConfig,
};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Result cache settings
    pub cache: Option<CacheSettings>,
    /// Retry settings
    pub retry: Option<RetrySettings>,
    /// Storage settings
    pub storage: Option<StorageSettings>,
    /// Batch settings
    pub batch: Option<BatchSettings>,
    /// Caption source settings
    pub source: Option<SourceSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// TTL for cached results in seconds
    pub ttl_secs: u64,
    /// Sweep interval in seconds
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: Option<u32>,
    pub base_delay_secs: Option<u64>,
    pub max_delay_secs: Option<u64>,
    pub attempt_timeout_secs: Option<u64>,
    pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub subtitle_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub retention_hours: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Maximum concurrent caption fetches
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Path to the yt-dlp binary
    pub ytdlp_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = ServerConfig::default();
        Self {
            server: ServerSettings {
                host: defaults.host,
                port: defaults.port,
                cors_enabled: Some(true),
            },
            cache: Some(CacheSettings {
                ttl_secs: defaults.cache.ttl_secs,
                sweep_interval_secs: Some(defaults.cache.sweep_interval_secs),
            }),
            retry: Some(RetrySettings {
                max_attempts: Some(defaults.retry.max_attempts),
                base_delay_secs: Some(defaults.retry.base_delay_secs),
                max_delay_secs: Some(defaults.retry.max_delay_secs),
                attempt_timeout_secs: Some(defaults.retry.attempt_timeout_secs),
                jitter: Some(defaults.retry.jitter),
            }),
            storage: Some(StorageSettings {
                subtitle_dir: Some(defaults.storage.subtitle_dir),
                temp_dir: Some(defaults.storage.temp_dir),
                retention_hours: Some(defaults.storage.retention_hours),
                cleanup_interval_secs: Some(defaults.storage.cleanup_interval_secs),
            }),
            batch: Some(BatchSettings {
                max_concurrent: None,
            }),
            source: Some(SourceSettings {
                ytdlp_path: Some(defaults.source.ytdlp_path),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let cache_defaults = CacheConfig::default();
        let retry_defaults = RetryConfig::default();
        let storage_defaults = StorageConfig::default();

        let cache = match self.cache {
            Some(c) => CacheConfig {
                ttl_secs: c.ttl_secs,
                sweep_interval_secs: c
                    .sweep_interval_secs
                    .unwrap_or(cache_defaults.sweep_interval_secs),
            },
            None => cache_defaults,
        };

        let retry = match self.retry {
            Some(r) => RetryConfig {
                max_attempts: r.max_attempts.unwrap_or(retry_defaults.max_attempts),
                base_delay_secs: r.base_delay_secs.unwrap_or(retry_defaults.base_delay_secs),
                max_delay_secs: r.max_delay_secs.unwrap_or(retry_defaults.max_delay_secs),
                attempt_timeout_secs: r
                    .attempt_timeout_secs
                    .unwrap_or(retry_defaults.attempt_timeout_secs),
                jitter: r.jitter.unwrap_or(retry_defaults.jitter),
            },
            None => retry_defaults,
        };

        let storage = match self.storage {
            Some(s) => StorageConfig {
                subtitle_dir: s.subtitle_dir.unwrap_or(storage_defaults.subtitle_dir),
                temp_dir: s.temp_dir.unwrap_or(storage_defaults.temp_dir),
                retention_hours: s.retention_hours.unwrap_or(storage_defaults.retention_hours),
                cleanup_interval_secs: s
                    .cleanup_interval_secs
                    .unwrap_or(storage_defaults.cleanup_interval_secs),
            },
            None => storage_defaults,
        };

        let (log_level, log_format) = match self.logging {
            Some(l) => (l.level, l.format.unwrap_or_else(|| "pretty".to_string())),
            None => ("info".to_string(), "pretty".to_string()),
        };

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            cors_enabled: self.server.cors_enabled.unwrap_or(true),
            log_level,
            log_format,
            cache,
            retry,
            storage,
            batch: BatchConfig {
                max_concurrent: self.batch.and_then(|b| b.max_concurrent),
            },
            source: SourceConfig {
                ytdlp_path: self
                    .source
                    .and_then(|s| s.ytdlp_path)
                    .unwrap_or_else(|| SourceConfig::default().ytdlp_path),
            },
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
