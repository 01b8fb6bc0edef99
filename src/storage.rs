//! Artifact directories
//!
//! Caption files land in the subtitle directory, converted documents and
//! yt-dlp scratch files in the temp directory. Both are swept of files
//! older than the retention window.

use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::config::StorageConfig;
use crate::error::Result;

/// Create both directories if missing.
pub async fn ensure_dirs(config: &StorageConfig) -> Result<()> {
    for dir in [&config.subtitle_dir, &config.temp_dir] {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}

/// Delete regular files in `dir` last modified more than `retention` ago.
/// Subdirectories are left alone. Returns the number of files removed.
pub async fn clean_old_files(dir: &Path, retention: Duration) -> Result<usize> {
    let cutoff = SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    remove_files(dir, Some(cutoff)).await
}

/// Remove every file in `dir`, keeping the directory itself.
pub async fn clear_dir(dir: &Path) -> Result<usize> {
    remove_files(dir, None).await
}

async fn remove_files(dir: &Path, cutoff: Option<SystemTime>) -> Result<usize> {
    let mut removed = 0;
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let expired = match cutoff {
            Some(cutoff) => metadata.modified()? < cutoff,
            None => true,
        };
        if expired {
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "Failed to remove old file"
                ),
            }
        }
    }
    Ok(removed)
}

/// Run one retention sweep over both directories.
pub async fn sweep(config: &StorageConfig) -> usize {
    let mut removed = 0;
    for dir in [&config.subtitle_dir, &config.temp_dir] {
        match clean_old_files(dir, config.retention()).await {
            Ok(n) => removed += n,
            Err(e) => tracing::error!(dir = %dir.display(), error = %e, "Retention sweep failed"),
        }
    }
    if removed > 0 {
        tracing::info!("Retention sweep removed {} files", removed);
    }
    removed
}
