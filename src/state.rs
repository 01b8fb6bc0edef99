//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Batch processor and quick-path processor
//! - Result cache (shared with the processor for the sweep task)
//! - Error counters
//! - Server configuration

use std::sync::atomic::{AtomicBool, Ordering};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::cache::{CacheStats, ResultCache};
use crate::config::ServerConfig;
use crate::processor::{FetchedSubtitle, SubtitleProcessor};
use crate::quick::QuickProcessor;
use crate::source::{CaptionSource, YtDlpSource};
use crate::stats::{ErrorSnapshot, ErrorStats};

/// Global application state
pub struct AppState {
    pub processor: Arc<SubtitleProcessor>,
    pub quick: QuickProcessor,
    pub cache: Arc<ResultCache<FetchedSubtitle>>,
    pub stats: Arc<ErrorStats>,
    /// Server shutdown flag
    pub shutdown: AtomicBool,
    pub started_at: Instant,
    /// Wall-clock start time, reported by `/version`
    pub started_at_utc: DateTime<Utc>,
    pub config: ServerConfig,
}

impl AppState {
    /// Wire every component around the given caption source.
    pub fn new(config: ServerConfig, source: Arc<dyn CaptionSource>) -> Self {
        let cache = Arc::new(ResultCache::from_config(&config.cache));
        let stats = Arc::new(ErrorStats::new());
        let processor = Arc::new(SubtitleProcessor::from_config(
            &config,
            source.clone(),
            cache.clone(),
            stats.clone(),
        ));
        let quick = QuickProcessor::from_config(&config, source);

        Self {
            processor,
            quick,
            cache,
            stats,
            shutdown: AtomicBool::new(false),
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
            config,
        }
    }

    /// State backed by the yt-dlp binary
    pub fn with_ytdlp(config: ServerConfig) -> Self {
        let source = Arc::new(YtDlpSource::from_config(&config.source, &config.storage));
        Self::new(config, source)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn error_stats(&self) -> ErrorSnapshot {
        self.stats.snapshot()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown is requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run `task` every `period` until shutdown is signalled. The first
    /// run happens immediately.
    pub fn spawn_periodic<F, Fut>(
        self: &Arc<Self>,
        period: Duration,
        mut task: F,
    ) -> tokio::task::JoinHandle<()>
    where
        F: FnMut(Arc<AppState>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period.max(Duration::from_secs(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if state.is_shutdown() {
                    break;
                }
                task(Arc::clone(&state)).await;
            }
        })
    }
}
