//! Test fixtures for integration tests
//!
//! A scripted [`CaptionSource`] that writes canned caption documents into a
//! scratch directory instead of talking to the network.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::source::{CaptionKind, CaptionRequest, CaptionSource, CaptionTrack, SourceError};
use crate::subtitle::Dialect;
use crate::validator;

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";

pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:02,500
Never gonna give you up

2
00:00:02,500 --> 00:00:04,000
Never gonna let you down

3
00:00:04,000 --> 00:00:05,000


4
00:00:05,000 --> 00:00:07,250
Never gonna run around
and desert you
";

pub const SAMPLE_TTML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<tt xmlns="http://www.w3.org/ns/ttml" xml:lang="en">
  <body>
    <div>
      <p begin="00:00:01.000" end="00:00:02.500">Never gonna give you up</p>
      <p begin="00:00:02.500" end="00:00:04.000">Never gonna let you down</p>
      <p begin="00:00:04.000" end="00:00:05.000"></p>
      <p begin="00:00:05.000" end="00:00:07.250">Never gonna run around<br/>and desert you</p>
    </div>
  </body>
</tt>"#;

/// What the fake does for a given (video, auto) pair
#[derive(Debug, Clone)]
pub enum Outcome {
    Captions { dialect: Dialect, content: String },
    Fail(SourceError),
    Panic,
}

impl Outcome {
    pub fn captions(dialect: Dialect, content: impl Into<String>) -> Self {
        Outcome::Captions {
            dialect,
            content: content.into(),
        }
    }
}

pub struct FakeSource {
    dir: tempfile::TempDir,
    outcomes: DashMap<(String, bool), Outcome>,
    fallback: Outcome,
    calls: AtomicUsize,
    requested: Mutex<Vec<Dialect>>,
}

impl FakeSource {
    /// Every request succeeds with [`SAMPLE_SRT`].
    pub fn new() -> Self {
        Self::with_fallback(Outcome::captions(Dialect::SubRip, SAMPLE_SRT))
    }

    /// Every request fails with `err`.
    pub fn failing(err: SourceError) -> Self {
        Self::with_fallback(Outcome::Fail(err))
    }

    fn with_fallback(fallback: Outcome) -> Self {
        Self {
            dir: tempfile::tempdir().expect("create fixture dir"),
            outcomes: DashMap::new(),
            fallback,
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Script the outcome for one video and caption kind.
    pub fn with(self, video_id: &str, want_auto: bool, outcome: Outcome) -> Self {
        self.outcomes.insert((video_id.to_string(), want_auto), outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Caption formats asked for, in call order
    pub fn requested_formats(&self) -> Vec<Dialect> {
        self.requested.lock().clone()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

#[async_trait]
impl CaptionSource for FakeSource {
    async fn fetch(&self, request: &CaptionRequest) -> Result<CaptionTrack, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(request.format);

        let video_id = validator::video_id(&request.url)
            .unwrap_or(&request.url)
            .to_string();
        let outcome = self
            .outcomes
            .get(&(video_id.clone(), request.want_auto))
            .map(|o| o.value().clone())
            .unwrap_or_else(|| self.fallback.clone());

        match outcome {
            Outcome::Captions { dialect, content } => {
                let path = self.dir().join(format!(
                    "{}.{}.{}",
                    video_id,
                    request.language,
                    dialect.extension()
                ));
                std::fs::write(&path, content)?;
                Ok(CaptionTrack {
                    title: format!("Fixture video {}", video_id),
                    thumbnails: vec![
                        format!("https://i.ytimg.com/vi/{}/default.jpg", video_id),
                        format!("https://i.ytimg.com/vi/{}/maxresdefault.jpg", video_id),
                    ],
                    video_id,
                    path,
                    kind: if request.want_auto {
                        CaptionKind::Auto
                    } else {
                        CaptionKind::Normal
                    },
                })
            }
            Outcome::Fail(err) => Err(err),
            Outcome::Panic => panic!("scripted source panic for {}", video_id),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::{self, ConversionTarget};

    #[test]
    fn test_samples_agree() {
        let from_srt = subtitle::convert(SAMPLE_SRT, Dialect::SubRip, ConversionTarget::Text).unwrap();
        let from_ttml = subtitle::convert(SAMPLE_TTML, Dialect::Ttml, ConversionTarget::Text).unwrap();
        assert_eq!(from_srt, from_ttml);
        assert_eq!(from_srt.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_fake_source_scripting() {
        let source = FakeSource::new().with(
            VIDEO_ID,
            false,
            Outcome::Fail(SourceError::NotFound("none".into())),
        );
        let url = format!("https://youtu.be/{}", VIDEO_ID);

        let normal = source.fetch(&CaptionRequest::new(&url, "en")).await;
        assert!(matches!(normal, Err(SourceError::NotFound(_))));

        let auto = source
            .fetch(&CaptionRequest::new(&url, "en").auto(true))
            .await
            .unwrap();
        assert_eq!(auto.kind, CaptionKind::Auto);
        assert_eq!(std::fs::read_to_string(&auto.path).unwrap(), SAMPLE_SRT);
        assert_eq!(source.calls(), 2);
    }
}
