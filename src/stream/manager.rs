//! Stream manager façade
//!
//! Composes the session registry and the viewer admission policy into the
//! two operations the HTTP layer consumes: start watching, stop watching.

use super::admission::ViewerAdmission;
use super::config::ManagerConfig;
use super::error::SessionError;
use super::session::CameraId;
use super::store::SessionRegistry;

/// Multi-camera, multi-viewer stream session manager
pub struct StreamManager {
    registry: SessionRegistry,
    admission: ViewerAdmission,
}

impl StreamManager {
    /// Create a manager with the given configuration
    pub fn new(config: ManagerConfig) -> Self {
        let admission = ViewerAdmission::new(config.max_cameras_per_viewer);
        Self {
            registry: SessionRegistry::new(config),
            admission,
        }
    }

    /// Get a reference to the session registry
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Get a reference to the admission policy
    pub fn admission(&self) -> &ViewerAdmission {
        &self.admission
    }

    /// Start watching a camera
    ///
    /// If the viewer is at their concurrent-camera cap, their oldest watch
    /// is evicted first. Eviction is best-effort: a failed stop of the
    /// victim is logged and the new join proceeds, since either way the
    /// victim camera is no longer held by this viewer. The watch record for
    /// the new camera is written only after the join succeeds, so a failed
    /// join leaves no phantom record.
    pub async fn start_watching(
        &self,
        camera: CameraId,
        viewer: &str,
        stream_url: &str,
    ) -> Result<(), SessionError> {
        if let Some(victim) = self.admission.eviction_victim(viewer, camera).await {
            tracing::info!(
                camera = victim,
                viewer,
                replacement = camera,
                "Concurrent-camera cap reached, evicting oldest watch"
            );
            self.admission.remove(viewer, victim).await;
            if let Err(e) = self.registry.leave(victim, viewer).await {
                tracing::warn!(camera = victim, viewer, error = %e, "Eviction stop failed");
            }
        }

        self.registry.join(camera, stream_url, viewer).await?;
        self.admission.record(viewer, camera).await;
        Ok(())
    }

    /// Stop watching a camera
    ///
    /// The watch record is removed unconditionally, mirroring the policy's
    /// idempotent bookkeeping; the registry result is surfaced as-is.
    pub async fn stop_watching(&self, camera: CameraId, viewer: &str) -> Result<(), SessionError> {
        let result = self.registry.leave(camera, viewer).await;
        self.admission.remove(viewer, camera).await;
        result
    }

    /// Tear down all sessions and watch records (graceful shutdown)
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down stream manager");
        self.admission.clear().await;
        self.registry.shutdown().await;
    }
}
