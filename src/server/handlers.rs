//! Request handlers
//!
//! Start/stop watching a camera, plus the liveness probe. Entitlement is
//! checked before any camera data is fetched; the session manager is only
//! reached with a decrypted address in hand.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::auth::Claims;
use crate::stream::CameraId;

use super::error::ApiError;
use super::routes::AppState;

/// Body returned by the start/stop endpoints
#[derive(Debug, Serialize)]
pub struct StreamResponse {
    pub message: String,
}

/// Handler for `GET /health`
pub async fn health() -> &'static str {
    "OK"
}

/// Handler for `POST /start/:camera_id`
pub async fn start_stream(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(camera_id): Path<String>,
) -> Result<Json<StreamResponse>, ApiError> {
    let viewer = claims.sub;
    let camera: CameraId = camera_id.parse().map_err(|_| {
        tracing::warn!(viewer = %viewer, camera = %camera_id, "Invalid camera id");
        ApiError::InvalidCamera(camera_id.clone())
    })?;

    // Entitlement first: a viewer who may not see the camera learns nothing
    // else about it. A lookup failure counts as "not entitled".
    let entitled = match state.cameras.viewer_has_access(camera, &viewer).await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(camera, viewer = %viewer, error = %e, "Entitlement check failed");
            false
        }
    };
    if !entitled {
        tracing::warn!(camera, viewer = %viewer, "Viewer not entitled to camera");
        return Err(ApiError::Forbidden);
    }

    let record = state.cameras.get(camera).await?;
    let stream_url = state.decryptor.decrypt(&record.stream_url)?;

    state.manager.start_watching(camera, &viewer, &stream_url).await?;

    tracing::info!(camera, viewer = %viewer, "Stream started");
    Ok(Json(StreamResponse {
        message: format!("Started streaming camera {}", record.location),
    }))
}

/// Handler for `POST /stop/:camera_id`
pub async fn stop_stream(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(camera_id): Path<String>,
) -> Result<Json<StreamResponse>, ApiError> {
    let viewer = claims.sub;
    let camera: CameraId = camera_id.parse().map_err(|_| {
        tracing::warn!(viewer = %viewer, camera = %camera_id, "Invalid camera id");
        ApiError::InvalidCamera(camera_id.clone())
    })?;

    state.manager.stop_watching(camera, &viewer).await?;

    tracing::info!(camera, viewer = %viewer, "Stream stopped");
    Ok(Json(StreamResponse {
        message: format!("Stopped streaming camera {camera}"),
    }))
}
