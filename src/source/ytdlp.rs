//! yt-dlp backed caption source
//!
//! Runs the external `yt-dlp` binary with `--skip-download` so only the
//! caption file lands on disk, and reads video metadata from its
//! `--dump-json` output.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::config::{SourceConfig, StorageConfig};
use crate::subtitle::Dialect;
use crate::validator;

use super::{CaptionRequest, CaptionSource, CaptionTrack, SourceError};

/// Subset of the metadata yt-dlp prints with `--dump-json`
#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

pub struct YtDlpSource {
    binary_path: PathBuf,
    subtitle_dir: PathBuf,
    temp_dir: PathBuf,
}

impl YtDlpSource {
    pub fn new(binary_path: PathBuf, subtitle_dir: PathBuf, temp_dir: PathBuf) -> Self {
        Self {
            binary_path,
            subtitle_dir,
            temp_dir,
        }
    }

    /// Build from configuration, resolving the binary through `PATH`.
    /// A missing binary is only warned about; each fetch then fails with
    /// an unclassified error.
    pub fn from_config(source: &SourceConfig, storage: &StorageConfig) -> Self {
        let binary_path = match which::which(&source.ytdlp_path) {
            Ok(path) => {
                tracing::info!("Using yt-dlp at {}", path.display());
                path
            }
            Err(e) => {
                tracing::warn!(
                    binary = %source.ytdlp_path,
                    error = %e,
                    "yt-dlp not found in PATH, caption fetches will fail"
                );
                PathBuf::from(&source.ytdlp_path)
            }
        };
        Self::new(
            binary_path,
            storage.subtitle_dir.clone(),
            storage.temp_dir.clone(),
        )
    }

    fn command(&self, request: &CaptionRequest) -> Command {
        let ext = request.format.extension();
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--skip-download")
            .arg(if request.want_auto {
                "--write-auto-subs"
            } else {
                "--write-subs"
            })
            .arg("--sub-langs")
            .arg(request.languages().collect::<Vec<_>>().join(","))
            .arg("--sub-format")
            .arg(format!("{}/best", ext))
            .arg("--dump-json")
            .arg("--no-simulate")
            .arg("--no-warnings")
            .arg("--no-progress")
            .arg("-o")
            .arg(self.subtitle_dir.join("%(id)s.%(ext)s"))
            .arg("-P")
            .arg(format!("temp:{}", self.temp_dir.display()))
            .arg("--")
            .arg(&request.url)
            .kill_on_drop(true);
        cmd
    }
}

/// Map yt-dlp's stderr onto a failure category.
pub(crate) fn classify_failure(stderr: &str) -> SourceError {
    let lower = stderr.to_ascii_lowercase();
    let message = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("yt-dlp failed")
        .trim()
        .to_string();

    if lower.contains("no subtitles") || lower.contains("no automatic captions") {
        SourceError::NotFound(message)
    } else if lower.contains("unavailable") || lower.contains("private video") {
        SourceError::Unavailable(message)
    } else {
        SourceError::Transport(message)
    }
}

/// Find the caption file yt-dlp wrote for `video_id`. Prefers the exact
/// `<id>.<lang>.<ext>` name, then regional variants of the language
/// (`en-US`, `en-orig`) in any dialect we can parse.
pub(crate) async fn locate_caption(
    dir: &Path,
    video_id: &str,
    language: &str,
    format: Dialect,
) -> std::io::Result<Option<PathBuf>> {
    let exact = dir.join(format!("{}.{}.{}", video_id, language, format.extension()));
    if tokio::fs::metadata(&exact).await.is_ok_and(|m| m.is_file()) {
        return Ok(Some(exact));
    }

    let prefix = format!("{}.{}", video_id, language);
    let mut candidates = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(&prefix) && Dialect::from_path(&path).is_some() {
            candidates.push(path);
        }
    }
    candidates.sort();
    let preferred = candidates
        .iter()
        .position(|p| Dialect::from_path(p) == Some(format))
        .unwrap_or(0);
    Ok(candidates.into_iter().nth(preferred))
}

fn parse_info(stdout: &[u8]) -> VideoInfo {
    // One JSON object per line; the last one belongs to the video.
    String::from_utf8_lossy(stdout)
        .lines()
        .rev()
        .find_map(|line| serde_json::from_str::<VideoInfo>(line).ok())
        .unwrap_or_default()
}

#[async_trait]
impl CaptionSource for YtDlpSource {
    async fn fetch(&self, request: &CaptionRequest) -> Result<CaptionTrack, SourceError> {
        let output = self.command(request).output().await.map_err(|e| {
            SourceError::Other(format!(
                "Failed to execute {}: {}",
                self.binary_path.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(url = %request.url, stderr = %stderr, "yt-dlp exited with {}", output.status);
            return Err(classify_failure(&stderr));
        }

        let info = parse_info(&output.stdout);
        let video_id = validator::video_id(&request.url)
            .map(str::to_string)
            .unwrap_or(info.id);

        let mut path = None;
        for language in request.languages() {
            path = locate_caption(&self.subtitle_dir, &video_id, language, request.format).await?;
            if path.is_some() {
                break;
            }
        }
        let path = path.ok_or_else(|| {
            SourceError::NotFound(format!(
                "no {} captions in language {} for {}",
                if request.want_auto { "automatic" } else { "uploaded" },
                request.language,
                video_id
            ))
        })?;

        Ok(CaptionTrack {
            video_id,
            title: info.title,
            thumbnails: info.thumbnails.into_iter().map(|t| t.url).collect(),
            path,
            kind: request.kind(),
        })
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
