//! Caption source seam
//!
//! The processor only sees [`CaptionSource`]: give it a video address and a
//! language, get back the location of a caption file or a classified
//! failure. [`ytdlp::YtDlpSource`] is the production implementation.

pub mod ytdlp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::error::ErrorCode;
use crate::retry::IsRetryable;
use crate::subtitle::Dialect;

pub use ytdlp::YtDlpSource;

/// Whether captions were authored or generated by speech recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionKind {
    Normal,
    Auto,
}

/// What to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionRequest {
    pub url: String,
    pub language: String,
    /// Ask for automatic captions instead of authored ones
    pub want_auto: bool,
    /// Dialect the caption file should be written in
    pub format: Dialect,
    /// Language to fall back to when `language` has no captions
    pub fallback_language: Option<String>,
}

impl CaptionRequest {
    pub fn new(url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            language: language.into(),
            want_auto: false,
            format: Dialect::SubRip,
            fallback_language: None,
        }
    }

    pub fn auto(mut self, want_auto: bool) -> Self {
        self.want_auto = want_auto;
        self
    }

    pub fn format(mut self, format: Dialect) -> Self {
        self.format = format;
        self
    }

    pub fn fallback_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if language != self.language {
            self.fallback_language = Some(language);
        }
        self
    }

    /// Languages to look for, in order of preference
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.language.as_str()).chain(self.fallback_language.as_deref())
    }

    pub fn kind(&self) -> CaptionKind {
        if self.want_auto {
            CaptionKind::Auto
        } else {
            CaptionKind::Normal
        }
    }
}

/// A caption file the source produced on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub video_id: String,
    pub title: String,
    /// Thumbnail URLs, lowest to highest quality
    pub thumbnails: Vec<String>,
    pub path: PathBuf,
    pub kind: CaptionKind,
}

impl CaptionTrack {
    /// Highest quality thumbnail, if any
    pub fn best_thumbnail(&self) -> Option<&str> {
        self.thumbnails.last().map(String::as_str)
    }
}

/// Caption source failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The video has no captions for the requested language
    #[error("No subtitles available: {0}")]
    NotFound(String),

    /// The video cannot be accessed
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// Network or extractor failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// A single attempt ran past its deadline
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Anything unclassified
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Error code reported once the retry policy gives up
    pub fn code(&self) -> ErrorCode {
        match self {
            SourceError::NotFound(_) => ErrorCode::SubNotFound,
            SourceError::Unavailable(_) | SourceError::Transport(_) | SourceError::Timeout(_) => {
                ErrorCode::DownloadFailed
            }
            SourceError::Other(_) => ErrorCode::UnknownError,
        }
    }
}

impl IsRetryable for SourceError {
    fn is_retryable(&self) -> bool {
        // Missing captions are deterministic; everything else may be transient.
        !matches!(self, SourceError::NotFound(_))
    }

    fn timed_out(after: Duration) -> Self {
        SourceError::Timeout(after)
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Other(err.to_string())
    }
}

/// Something that can produce caption files
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn fetch(&self, request: &CaptionRequest) -> Result<CaptionTrack, SourceError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
