//! Job processing and the batch orchestrator
//!
//! A job walks through: cache lookup, validation, retried fetch, optional
//! conversion, cache store. Every failure along the way becomes a
//! [`JobResult::Failure`]; nothing here returns `Err` to the caller.
//!
//! Batches fan out to at most `workers` concurrent tasks and come back in
//! completion order, one result per job.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::cache::{CacheKey, ResultCache};
use crate::config::ServerConfig;
use crate::error::ErrorCode;
use crate::retry::RetryPolicy;
use crate::source::{CaptionKind, CaptionRequest, CaptionSource, CaptionTrack};
use crate::stats::{ErrorCategory, ErrorStats};
use crate::subtitle::{self, ConversionTarget, Dialect};
use crate::validator;

/// Dialect asked of the caption source. YouTube serves TTML for both
/// uploaded and automatic captions but never SubRip.
const FETCH_DIALECT: Dialect = Dialect::Ttml;

/// One unit of batch work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub identifier: String,
    pub language: String,
    pub conversion: Option<ConversionTarget>,
}

impl Job {
    pub fn new(
        identifier: impl Into<String>,
        language: impl Into<String>,
        conversion: Option<ConversionTarget>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            language: language.into(),
            conversion,
        }
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.identifier, &self.language, self.conversion)
    }
}

/// A fetched caption file, with the conversion outcome if one was asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedSubtitle {
    pub url: String,
    pub video_id: String,
    pub title: String,
    pub path: String,
    pub content: String,
    pub caption_kind: CaptionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub url: String,
    pub code: ErrorCode,
    pub message: String,
}

/// Outcome of one job, self-describing on the wire via `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobResult {
    Success(FetchedSubtitle),
    #[serde(rename = "error")]
    Failure(JobFailure),
}

impl JobResult {
    fn failure(url: &str, code: ErrorCode, message: impl Into<String>) -> Self {
        JobResult::Failure(JobFailure {
            url: url.to_string(),
            code,
            message: message.into(),
        })
    }

    pub fn url(&self) -> &str {
        match self {
            JobResult::Success(s) => &s.url,
            JobResult::Failure(f) => &f.url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success(_))
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            JobResult::Success(_) => None,
            JobResult::Failure(f) => Some(f.code),
        }
    }
}

/// Progress after a job completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

pub struct SubtitleProcessor {
    source: Arc<dyn CaptionSource>,
    cache: Arc<ResultCache<FetchedSubtitle>>,
    stats: Arc<ErrorStats>,
    retry: RetryPolicy,
    workers: usize,
    /// Where converted artifacts are written, if anywhere
    temp_dir: Option<PathBuf>,
}

impl SubtitleProcessor {
    pub fn new(
        source: Arc<dyn CaptionSource>,
        cache: Arc<ResultCache<FetchedSubtitle>>,
        stats: Arc<ErrorStats>,
        retry: RetryPolicy,
        workers: usize,
    ) -> Self {
        Self {
            source,
            cache,
            stats,
            retry,
            workers: workers.clamp(1, crate::config::MAX_WORKERS),
            temp_dir: None,
        }
    }

    pub fn from_config(
        config: &ServerConfig,
        source: Arc<dyn CaptionSource>,
        cache: Arc<ResultCache<FetchedSubtitle>>,
        stats: Arc<ErrorStats>,
    ) -> Self {
        Self::new(
            source,
            cache,
            stats,
            RetryPolicy::from(&config.retry),
            config.batch.workers(),
        )
        .with_temp_dir(config.storage.temp_dir.clone())
    }

    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = Some(dir);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn stats(&self) -> &ErrorStats {
        &self.stats
    }

    fn fail(&self, url: &str, code: ErrorCode, message: impl Into<String>) -> JobResult {
        self.stats.record(ErrorCategory::from(code));
        JobResult::failure(url, code, message)
    }

    /// Run one job to completion.
    pub async fn process_single(&self, job: &Job) -> JobResult {
        let key = job.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(url = %job.identifier, lang = %job.language, "Cache hit");
            return JobResult::Success(cached);
        }

        if !validator::validate(&job.identifier) {
            return self.fail(&job.identifier, ErrorCode::ValidationError, "Invalid video URL");
        }

        let request = CaptionRequest::new(&job.identifier, &job.language).format(FETCH_DIALECT);
        let track = match self.retry.run(|_| self.source.fetch(&request)).await {
            Ok(track) => track,
            Err(e) => {
                tracing::warn!(url = %job.identifier, source = self.source.name(), error = %e, "Caption fetch failed");
                return self.fail(&job.identifier, e.code(), e.to_string());
            }
        };

        let content = match tokio::fs::read_to_string(&track.path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(path = %track.path.display(), error = %e, "Caption file unreadable");
                return self.fail(
                    &job.identifier,
                    ErrorCode::UnknownError,
                    format!("caption file {} unreadable: {}", track.path.display(), e),
                );
            }
        };

        let mut fetched = FetchedSubtitle {
            url: job.identifier.clone(),
            video_id: track.video_id.clone(),
            title: track.title.clone(),
            path: track.path.display().to_string(),
            content,
            caption_kind: track.kind,
            converted_content: None,
            converted_path: None,
            convert_error: None,
        };

        if let Some(target) = job.conversion {
            self.apply_conversion(&mut fetched, &track, target).await;
        }

        // Stored even when conversion failed; the fetch itself was fine.
        self.cache.put(key, fetched.clone());
        JobResult::Success(fetched)
    }

    async fn apply_conversion(
        &self,
        fetched: &mut FetchedSubtitle,
        track: &CaptionTrack,
        target: ConversionTarget,
    ) {
        let dialect = Dialect::detect(&track.path, &fetched.content);
        match subtitle::convert(&fetched.content, dialect, target) {
            Ok(converted) => {
                if let Some(dir) = &self.temp_dir {
                    fetched.converted_path = write_artifact(dir, &track.path, target, &converted).await;
                }
                fetched.converted_content = Some(converted);
            }
            Err(e) => {
                self.stats.record(ErrorCategory::Convert);
                tracing::error!(url = %fetched.url, target = %target, error = %e, "Conversion failed");
                fetched.convert_error = Some(e.to_string());
            }
        }
    }

    /// Process every job, at most `workers` at a time.
    pub async fn process_batch(self: &Arc<Self>, jobs: Vec<Job>) -> Vec<JobResult> {
        self.process_batch_with_progress(jobs, |_| {}).await
    }

    /// Like [`process_batch`](Self::process_batch), calling `on_progress`
    /// after each job completes.
    pub async fn process_batch_with_progress<P>(
        self: &Arc<Self>,
        jobs: Vec<Job>,
        on_progress: P,
    ) -> Vec<JobResult>
    where
        P: Fn(BatchProgress),
    {
        let total = jobs.len();
        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let completed = AtomicUsize::new(0);

        tracing::info!(%batch_id, total, workers = self.workers, "Batch started");

        let results: Vec<JobResult> = stream::iter(jobs)
            .map(|job| {
                let processor = Arc::clone(self);
                let url = job.identifier.clone();
                let handle = tokio::spawn(async move { processor.process_single(&job).await });
                async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::error!(%url, error = %e, "Worker failed");
                            self.fail(&url, ErrorCode::ProcessFailed, worker_failure_message(e))
                        }
                    }
                }
            })
            .buffer_unordered(self.workers)
            .inspect(|result| {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                let progress = BatchProgress { completed: done, total };
                tracing::info!(
                    %batch_id,
                    url = %result.url(),
                    ok = result.is_success(),
                    "Progress: {}/{} ({:.0}%)",
                    done,
                    total,
                    progress.percent()
                );
                on_progress(progress);
            })
            .collect()
            .await;

        tracing::info!(
            %batch_id,
            total,
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );
        results
    }
}

fn worker_failure_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            return format!("worker panicked: {}", msg);
        }
        if let Some(msg) = payload.downcast_ref::<String>() {
            return format!("worker panicked: {}", msg);
        }
        "worker panicked".to_string()
    } else {
        "worker cancelled".to_string()
    }
}

/// Write a converted document next to nothing else in the scratch dir.
/// Failure is logged and leaves the result without a path.
async fn write_artifact(
    dir: &Path,
    source_path: &Path,
    target: ConversionTarget,
    converted: &str,
) -> Option<String> {
    let stem = source_path.file_stem()?.to_string_lossy();
    let path = dir.join(format!("{}.{}", stem, target.as_str()));
    match tokio::fs::write(&path, converted).await {
        Ok(()) => Some(path.display().to_string()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not write converted file");
            None
        }
    }
}
