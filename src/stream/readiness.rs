//! Manifest readiness polling
//!
//! The transcoder signals readiness by writing its manifest file; the
//! gateway has no other channel to it. This module polls for the file at a
//! fixed interval up to a bounded number of attempts. The wait is a plain
//! `async fn`: every sleep is an ordinary suspend point, so a caller that
//! drops the future (upstream timeout, client disconnect) aborts the wait.

use std::path::Path;
use std::time::Duration;

/// Poll for `path` to exist, up to `max_attempts` checks spaced `interval`
/// apart. Returns `true` on the first successful check, `false` once the
/// budget is exhausted.
pub async fn wait_for_artifact(path: &Path, max_attempts: u32, interval: Duration) -> bool {
    for attempt in 1..=max_attempts {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), attempt = attempt, "Artifact observed");
            return true;
        }

        tracing::trace!(
            path = %path.display(),
            attempt = attempt,
            max_attempts = max_attempts,
            "Artifact not yet present"
        );

        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_existing_artifact_is_immediate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.m3u8");
        std::fs::write(&path, "#EXTM3U").unwrap();

        assert!(wait_for_artifact(&path, 1, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_late_artifact_is_caught() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.m3u8");

        let writer_path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tokio::fs::write(&writer_path, "#EXTM3U").await.unwrap();
        });

        assert!(wait_for_artifact(&path, 20, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_missing_artifact_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.m3u8");

        assert!(!wait_for_artifact(&path, 3, Duration::from_millis(10)).await);
    }
}
