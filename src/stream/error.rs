//! Session manager error types

use std::path::PathBuf;

use thiserror::Error;

use super::session::CameraId;

/// Error type for session registry and manager operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// No active session exists for the camera
    #[error("camera {0} is not active")]
    NotActive(CameraId),

    /// The viewer is not in the camera's viewer set (double-stop included)
    #[error("viewer {viewer} is not watching camera {camera}")]
    ViewerNotFound { camera: CameraId, viewer: String },

    /// The transcoder executable could not be started
    #[error("failed to spawn transcoder for camera {camera}: {source}")]
    SpawnFailed {
        camera: CameraId,
        #[source]
        source: std::io::Error,
    },

    /// The transcoder never produced its manifest within the readiness budget
    #[error("timed out waiting for manifest {}", .manifest.display())]
    ReadinessTimeout { manifest: PathBuf },

    /// Artifact directory or process cleanup failure, surfaced to the caller
    #[error("i/o failure for camera {camera}: {source}")]
    Io {
        camera: CameraId,
        #[source]
        source: std::io::Error,
    },
}
