//! Single-video quick path
//!
//! Fetches authored captions as TTML, falls back to automatic captions,
//! and returns the plain text with the video's title and best thumbnail.
//! One attempt per caption kind, no cache.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::retry::RetryPolicy;
use crate::source::{CaptionKind, CaptionRequest, CaptionSource, CaptionTrack};
use crate::subtitle::{self, ConversionTarget, Dialect};
use crate::validator;

/// Language tried when the requested one has no captions
const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum QuickResult {
    Success {
        text: String,
        thumbnail: String,
        title: String,
        #[serde(rename = "type")]
        kind: CaptionKind,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
    },
}

impl QuickResult {
    fn error(message: impl Into<String>) -> Self {
        QuickResult::Error {
            error: message.into(),
            title: None,
            thumbnail: None,
        }
    }
}

pub struct QuickProcessor {
    source: Arc<dyn CaptionSource>,
    retry: RetryPolicy,
}

impl QuickProcessor {
    pub fn new(source: Arc<dyn CaptionSource>, retry: RetryPolicy) -> Self {
        Self {
            source,
            retry: RetryPolicy {
                max_attempts: 1,
                ..retry
            },
        }
    }

    pub fn from_config(config: &ServerConfig, source: Arc<dyn CaptionSource>) -> Self {
        Self::new(source, RetryPolicy::from(&config.retry))
    }

    async fn fetch(&self, url: &str, lang: &str, want_auto: bool) -> Result<CaptionTrack, String> {
        let request = CaptionRequest::new(url, lang)
            .auto(want_auto)
            .format(Dialect::Ttml)
            .fallback_language(FALLBACK_LANGUAGE);
        self.retry
            .run(|_| self.source.fetch(&request))
            .await
            .map_err(|e| e.to_string())
    }

    async fn extract_text(track: &CaptionTrack) -> Result<String, String> {
        subtitle::convert_file(&track.path, ConversionTarget::Text)
            .await
            .map_err(|e| format!("text extraction failed: {}", e))
    }

    pub async fn process(&self, url: &str, lang: &str) -> QuickResult {
        if !validator::validate(url) {
            return QuickResult::error("Invalid video URL");
        }

        tracing::info!(%url, %lang, "Trying uploaded captions");
        match self.fetch(url, lang, false).await {
            Ok(track) => match Self::extract_text(&track).await {
                Ok(text) => return success(&track, text),
                Err(e) => tracing::info!(%url, error = %e, "Uploaded captions unusable, trying automatic"),
            },
            Err(e) => tracing::info!(%url, error = %e, "No uploaded captions, trying automatic"),
        }

        let track = match self.fetch(url, lang, true).await {
            Ok(track) => track,
            Err(e) => {
                tracing::error!(%url, error = %e, "Caption download failed");
                return QuickResult::error(e);
            }
        };

        match Self::extract_text(&track).await {
            Ok(text) => success(&track, text),
            Err(e) => {
                tracing::error!(%url, error = %e, "Automatic captions unusable");
                QuickResult::Error {
                    error: e,
                    title: Some(track.title.clone()),
                    thumbnail: Some(track.best_thumbnail().unwrap_or_default().to_string()),
                }
            }
        }
    }
}

fn success(track: &CaptionTrack, text: String) -> QuickResult {
    QuickResult::Success {
        text,
        thumbnail: track.best_thumbnail().unwrap_or_default().to_string(),
        title: track.title.clone(),
        kind: track.kind,
    }
}
