//! Session registry implementation
//!
//! The central registry that maps cameras to live transcoder sessions and
//! owns their creation, mutation and destruction.
//!
//! The map `RwLock` is held only to look up, insert or remove entries.
//! Spawning and the manifest readiness wait run under the per-session
//! `Mutex` alone: concurrent joins for one camera serialize behind that
//! lock (at most one spawn in flight per camera) while other cameras are
//! unaffected. Removal drops the session guard first, then revalidates
//! under the map write lock with `Arc::ptr_eq` and a non-blocking
//! `try_lock`, so the map lock never waits on a busy session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::config::ManagerConfig;
use super::error::SessionError;
use super::process::TranscoderProcess;
use super::readiness;
use super::session::{CameraId, Session, SessionState, SessionStats};

/// Registry of active per-camera transcoder sessions
pub struct SessionRegistry {
    /// Map of camera id to session entry
    sessions: RwLock<HashMap<CameraId, Arc<Mutex<Session>>>>,

    /// Configuration
    config: ManagerConfig,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Add a viewer to a camera's session, spawning the transcoder if needed
    ///
    /// The fast path (session exists and its process is alive) records the
    /// viewer and returns immediately. Otherwise the viewer set is reset, a
    /// fresh transcoder is spawned and the call blocks until the manifest
    /// appears or the readiness budget is exhausted. On timeout the process
    /// is killed and the entry removed; no orphan survives a failed join.
    pub async fn join(
        &self,
        camera: CameraId,
        stream_url: &str,
        viewer: &str,
    ) -> Result<(), SessionError> {
        loop {
            let entry = {
                let mut sessions = self.sessions.write().await;
                Arc::clone(
                    sessions
                        .entry(camera)
                        .or_insert_with(|| Arc::new(Mutex::new(Session::new()))),
                )
            };

            let mut session = entry.lock().await;
            if session.retired {
                // The entry was removed while we waited for its lock; retry
                // against the map instead of reviving an unregistered session.
                continue;
            }

            let process_alive = match session.process.as_mut() {
                Some(process) => process.is_alive(),
                None => false,
            };

            if process_alive {
                if session.viewers.insert(viewer.to_string()) {
                    tracing::info!(
                        camera,
                        viewer,
                        viewers = session.viewers.len(),
                        "Viewer joined live session"
                    );
                } else {
                    tracing::debug!(camera, viewer, "Viewer already in session");
                }
                return Ok(());
            }

            if let Some(stale) = session.process.take() {
                tracing::info!(camera, "Transcoder exited unexpectedly, restarting");
                if let Err(e) = stale.shutdown() {
                    tracing::warn!(camera, error = %e, "Failed to discard stale transcoder");
                }
            }

            session.viewers.clear();
            session.state = SessionState::Starting;

            let dir = self.config.artifact_dir(camera);
            if let Err(source) = tokio::fs::create_dir_all(&dir).await {
                drop(session);
                self.remove_if_idle(camera, &entry).await;
                return Err(SessionError::Io { camera, source });
            }

            let manifest = self.config.manifest_path(camera);
            let args = self.config.transcoder.resolve_args(stream_url, &manifest);
            tracing::info!(camera, viewer, "Starting transcoder");

            let process =
                match TranscoderProcess::spawn(camera, &self.config.transcoder.program, &args) {
                    Ok(process) => process,
                    Err(e) => {
                        drop(session);
                        self.remove_if_idle(camera, &entry).await;
                        return Err(e);
                    }
                };
            session.process = Some(process);
            session.viewers.insert(viewer.to_string());

            // The readiness wait runs under the session lock only: a second
            // join for this camera queues behind it instead of spawning a
            // second transcoder, and no other camera is blocked.
            let ready = readiness::wait_for_artifact(
                &manifest,
                self.config.readiness_attempts,
                self.config.readiness_interval,
            )
            .await;

            if !ready {
                tracing::warn!(camera, manifest = %manifest.display(), "Manifest never appeared");
                if let Some(process) = session.process.take() {
                    if let Err(e) = process.shutdown() {
                        tracing::warn!(camera, error = %e, "Failed to kill transcoder after timeout");
                    }
                }
                session.viewers.clear();
                drop(session);
                self.remove_if_idle(camera, &entry).await;
                if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(camera, error = %e, "Failed to remove artifact dir after timeout");
                    }
                }
                return Err(SessionError::ReadinessTimeout { manifest });
            }

            session.state = SessionState::Active;
            tracing::info!(camera, viewer, "Transcoder ready, session active");
            return Ok(());
        }
    }

    /// Remove a viewer from a camera's session
    ///
    /// When the last viewer leaves, the transcoder is killed and the entry
    /// and artifact directory are removed. Kill and directory-removal
    /// failures are surfaced to the caller, but only after the in-memory
    /// entry is gone; a cleanup error must not leave a ghost session
    /// blocking future restarts.
    pub async fn leave(&self, camera: CameraId, viewer: &str) -> Result<(), SessionError> {
        let entry = {
            let sessions = self.sessions.read().await;
            sessions.get(&camera).cloned()
        }
        .ok_or(SessionError::NotActive(camera))?;

        let mut session = entry.lock().await;
        if session.retired {
            return Err(SessionError::NotActive(camera));
        }

        if !session.viewers.remove(viewer) {
            tracing::warn!(camera, viewer, "Stop for a viewer that is not watching");
            return Err(SessionError::ViewerNotFound {
                camera,
                viewer: viewer.to_string(),
            });
        }

        if !session.viewers.is_empty() {
            tracing::info!(
                camera,
                viewer,
                viewers = session.viewers.len(),
                "Viewer left, session stays up"
            );
            return Ok(());
        }

        tracing::info!(camera, viewer, "Last viewer left, stopping transcoder");
        let kill_result = match session.process.take() {
            Some(process) => process.shutdown(),
            None => Ok(()),
        };
        drop(session);
        self.remove_if_idle(camera, &entry).await;

        let dir = self.config.artifact_dir(camera);
        let removal = match tokio::fs::remove_dir_all(&dir).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        };

        kill_result
            .and(removal)
            .map_err(|source| SessionError::Io { camera, source })
    }

    /// Get statistics for a camera's session
    pub async fn session_stats(&self, camera: CameraId) -> Option<SessionStats> {
        let entry = {
            let sessions = self.sessions.read().await;
            sessions.get(&camera).cloned()
        }?;

        let session = entry.lock().await;
        Some(SessionStats {
            viewer_count: session.viewers.len(),
            state: session.state,
            pid: session.process.as_ref().and_then(|p| p.pid()),
        })
    }

    /// Number of cameras with a registered session
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether a session entry exists for the camera
    pub async fn is_active(&self, camera: CameraId) -> bool {
        self.sessions.read().await.contains_key(&camera)
    }

    /// Tear down every session: kill processes, remove artifact directories
    ///
    /// Used on graceful service shutdown. Failures are logged, not returned;
    /// there is nobody left to retry.
    pub async fn shutdown(&self) {
        let drained: Vec<(CameraId, Arc<Mutex<Session>>)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };

        for (camera, entry) in drained {
            let mut session = entry.lock().await;
            session.retired = true;
            session.viewers.clear();
            if let Some(process) = session.process.take() {
                if let Err(e) = process.shutdown() {
                    tracing::warn!(camera, error = %e, "Failed to kill transcoder during shutdown");
                }
            }
            drop(session);

            let dir = self.config.artifact_dir(camera);
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(camera, error = %e, "Failed to remove artifact dir during shutdown");
                }
            }
            tracing::info!(camera, "Session torn down");
        }
    }

    /// Remove the entry for `camera` if it is quiescent
    ///
    /// Revalidates under the map write lock: the entry must still be the
    /// installed one (`Arc::ptr_eq`), must not be mid-operation
    /// (non-blocking `try_lock`) and must hold no viewers and no process.
    /// Removed entries are marked retired so a join racing on a stale
    /// handle retries against the map.
    async fn remove_if_idle(&self, camera: CameraId, entry: &Arc<Mutex<Session>>) {
        let mut sessions = self.sessions.write().await;
        let Some(current) = sessions.get(&camera) else {
            return;
        };
        if !Arc::ptr_eq(current, entry) {
            return;
        }
        let Ok(mut session) = current.try_lock() else {
            // Another task is operating on the session (likely a respawn);
            // it is responsible for the entry now.
            return;
        };
        if session.viewers.is_empty() && session.process.is_none() {
            session.retired = true;
            drop(session);
            sessions.remove(&camera);
            tracing::debug!(camera, "Session entry removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::stream::config::TranscoderCommand;

    /// Config with a harmless long-running fake transcoder
    fn sleep_config(root: &Path) -> ManagerConfig {
        ManagerConfig::default()
            .streams_root(root)
            .readiness(5, Duration::from_millis(10))
            .transcoder(TranscoderCommand::new("sleep", vec!["30".to_string()]))
    }

    /// Fake transcoder that appends one line to `log` per spawn, then idles
    fn logging_config(root: &Path, log: &Path, then: &str) -> ManagerConfig {
        let script = format!("echo spawned >> {}; exec {}", log.display(), then);
        ManagerConfig::default()
            .streams_root(root)
            .readiness(5, Duration::from_millis(10))
            .transcoder(TranscoderCommand::new(
                "sh",
                vec!["-c".to_string(), script],
            ))
    }

    fn place_manifest(config: &ManagerConfig, camera: CameraId) {
        let dir = config.artifact_dir(camera);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(config.manifest_path(camera), "#EXTM3U").unwrap();
    }

    fn spawn_count(log: &Path) -> usize {
        std::fs::read_to_string(log)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_join_leave_lifecycle() {
        let root = tempfile::tempdir().unwrap();
        let config = sleep_config(root.path());
        place_manifest(&config, 7);
        let registry = SessionRegistry::new(config.clone());

        // First viewer spawns and waits for the (pre-placed) manifest
        registry.join(7, "rtsp://cam/7", "u1").await.unwrap();
        let stats = registry.session_stats(7).await.unwrap();
        assert_eq!(stats.viewer_count, 1);
        assert_eq!(stats.state, SessionState::Active);
        assert!(stats.pid.is_some());

        // Second viewer takes the fast path
        registry.join(7, "rtsp://cam/7", "u2").await.unwrap();
        assert_eq!(registry.session_stats(7).await.unwrap().viewer_count, 2);

        // First leave keeps the process up
        registry.leave(7, "u1").await.unwrap();
        let stats = registry.session_stats(7).await.unwrap();
        assert_eq!(stats.viewer_count, 1);
        assert!(stats.pid.is_some());

        // Last leave kills the process and removes entry + artifacts
        registry.leave(7, "u2").await.unwrap();
        assert_eq!(registry.session_count().await, 0);
        assert!(!config.artifact_dir(7).exists());
    }

    #[tokio::test]
    async fn test_join_is_idempotent_per_viewer() {
        let root = tempfile::tempdir().unwrap();
        let config = sleep_config(root.path());
        place_manifest(&config, 1);
        let registry = SessionRegistry::new(config);

        registry.join(1, "rtsp://cam/1", "u1").await.unwrap();
        registry.join(1, "rtsp://cam/1", "u1").await.unwrap();

        assert_eq!(registry.session_stats(1).await.unwrap().viewer_count, 1);
    }

    #[tokio::test]
    async fn test_leave_unknown_camera() {
        let root = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(sleep_config(root.path()));

        let result = registry.leave(42, "u1").await;
        assert!(matches!(result, Err(SessionError::NotActive(42))));
    }

    #[tokio::test]
    async fn test_double_leave_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let config = sleep_config(root.path());
        place_manifest(&config, 1);
        let registry = SessionRegistry::new(config);

        registry.join(1, "rtsp://cam/1", "u1").await.unwrap();
        registry.join(1, "rtsp://cam/1", "u2").await.unwrap();

        registry.leave(1, "u1").await.unwrap();
        let result = registry.leave(1, "u1").await;
        assert!(matches!(
            result,
            Err(SessionError::ViewerNotFound { camera: 1, .. })
        ));

        // The session survives for the remaining viewer
        assert_eq!(registry.session_stats(1).await.unwrap().viewer_count, 1);
    }

    #[tokio::test]
    async fn test_no_duplicate_spawns_under_concurrency() {
        let root = tempfile::tempdir().unwrap();
        let log = root.path().join("spawn.log");
        let config = logging_config(root.path(), &log, "sleep 30");
        place_manifest(&config, 5);
        let registry = Arc::new(SessionRegistry::new(config));

        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.join(5, "rtsp://cam/5", &format!("viewer-{i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(spawn_count(&log), 1);
        assert_eq!(registry.session_stats(5).await.unwrap().viewer_count, 8);
    }

    #[tokio::test]
    async fn test_readiness_timeout_cleanup() {
        let root = tempfile::tempdir().unwrap();
        let config = sleep_config(root.path()).readiness(2, Duration::from_millis(10));
        let registry = SessionRegistry::new(config.clone());

        let result = registry.join(3, "rtsp://cam/3", "u1").await;
        match result {
            Err(SessionError::ReadinessTimeout { manifest }) => {
                assert_eq!(manifest, config.manifest_path(3));
            }
            other => panic!("expected readiness timeout, got {other:?}"),
        }

        // No lingering session entry and no artifact directory
        assert_eq!(registry.session_count().await, 0);
        assert!(!config.artifact_dir(3).exists());
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_no_entry() {
        let root = tempfile::tempdir().unwrap();
        let config = ManagerConfig::default()
            .streams_root(root.path())
            .readiness(2, Duration::from_millis(10))
            .transcoder(TranscoderCommand::new("definitely-not-a-real-binary", vec![]));
        let registry = SessionRegistry::new(config);

        let result = registry.join(2, "rtsp://cam/2", "u1").await;
        assert!(matches!(result, Err(SessionError::SpawnFailed { camera: 2, .. })));
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_dead_process_recovery() {
        let root = tempfile::tempdir().unwrap();
        let log = root.path().join("spawn.log");
        // The fake transcoder exits immediately, simulating a crash
        let config = logging_config(root.path(), &log, "true");
        place_manifest(&config, 9);
        let registry = SessionRegistry::new(config);

        registry.join(9, "rtsp://cam/9", "u1").await.unwrap();

        // Let the process die, then join again: the dead handle must be
        // detected and a fresh transcoder spawned with a reset viewer set
        tokio::time::sleep(Duration::from_millis(200)).await;
        registry.join(9, "rtsp://cam/9", "u2").await.unwrap();

        assert_eq!(spawn_count(&log), 2);
        assert_eq!(registry.session_stats(9).await.unwrap().viewer_count, 1);
    }

    #[tokio::test]
    async fn test_late_manifest_scenario() {
        let root = tempfile::tempdir().unwrap();
        let config = sleep_config(root.path()).readiness(30, Duration::from_millis(10));
        let registry = SessionRegistry::new(config.clone());

        // The "transcoder" writes its manifest only after a delay
        let dir = config.artifact_dir(7);
        let manifest = config.manifest_path(7);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            tokio::fs::create_dir_all(&dir).await.unwrap();
            tokio::fs::write(&manifest, "#EXTM3U").await.unwrap();
        });

        registry.join(7, "rtsp://cam/7", "u1").await.unwrap();
        assert_eq!(
            registry.session_stats(7).await.unwrap().state,
            SessionState::Active
        );
    }

    #[tokio::test]
    async fn test_shutdown_tears_down_everything() {
        let root = tempfile::tempdir().unwrap();
        let config = sleep_config(root.path());
        place_manifest(&config, 1);
        place_manifest(&config, 2);
        let registry = SessionRegistry::new(config.clone());

        registry.join(1, "rtsp://cam/1", "u1").await.unwrap();
        registry.join(2, "rtsp://cam/2", "u1").await.unwrap();

        registry.shutdown().await;

        assert_eq!(registry.session_count().await, 0);
        assert!(!config.artifact_dir(1).exists());
        assert!(!config.artifact_dir(2).exists());
    }
}
