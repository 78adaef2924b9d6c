use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::path::Path;
use tracing::{debug, warn};

/// Delete rolled log files under `log_dir` older than `retention_days`.
///
/// Only files whose name starts with `file_prefix` are touched.
/// Returns the number of files removed.
pub async fn prune_old_logs(
    log_dir: impl AsRef<Path>,
    file_prefix: &str,
    retention_days: u32,
) -> Result<usize> {
    let log_dir = log_dir.as_ref();
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
    let mut deleted = 0;

    let mut entries = tokio::fs::read_dir(log_dir)
        .await
        .with_context(|| format!("failed to read log directory {}", log_dir.display()))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .context("failed to read directory entry")?
    {
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(file_prefix));
        if !is_log {
            continue;
        }

        let metadata = entry.metadata().await.context("failed to stat log file")?;
        if !metadata.is_file() {
            continue;
        }
        let modified: chrono::DateTime<Utc> = metadata
            .modified()
            .context("file modification time unavailable")?
            .into();

        if modified < cutoff {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "removed expired log file");
                    deleted += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove log file"),
            }
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_dir_is_noop() {
        let dir = TempDir::new().unwrap();
        let removed = prune_old_logs(dir.path().join("nope"), "commander.log", 1)
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_zero_retention_prunes_only_matching_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("commander.log.2026-01-01"), "old").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let removed = prune_old_logs(dir.path(), "commander.log", 0).await.unwrap();

        assert_eq!(removed, 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_recent_files_are_kept() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("commander.log.today"), "fresh").unwrap();

        let removed = prune_old_logs(dir.path(), "commander.log", 30).await.unwrap();
        assert_eq!(removed, 0);
    }
}
