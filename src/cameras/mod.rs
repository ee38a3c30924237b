//! Camera directory
//!
//! Camera metadata lookup and viewer entitlement checks against the
//! relational store. The `stream_url` column holds the encrypted address;
//! decryption lives in [`crate::crypto`].

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::stream::CameraId;

/// One camera row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Camera {
    pub id: CameraId,
    pub name: String,
    /// Encrypted stream address (base64, IV-prefixed AES-256-CBC)
    pub stream_url: String,
    pub location: String,
}

/// Camera directory failure
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera {0} not found")]
    NotFound(CameraId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read-only view of the camera tables
#[derive(Clone)]
pub struct CameraDirectory {
    pool: PgPool,
}

impl CameraDirectory {
    /// Create a directory over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch one camera's metadata
    pub async fn get(&self, id: CameraId) -> Result<Camera, CameraError> {
        sqlx::query_as::<_, Camera>(
            "SELECT id, name, stream_url, location FROM cameras WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CameraError::NotFound(id))
    }

    /// Whether the viewer is entitled to this camera
    pub async fn viewer_has_access(
        &self,
        camera: CameraId,
        viewer: &str,
    ) -> Result<bool, CameraError> {
        let row: Option<CameraId> = sqlx::query_scalar(
            "SELECT camera_id FROM user_cameras WHERE camera_id = $1 AND user_id = $2",
        )
        .bind(camera)
        .bind(viewer)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }
}
