//! API error type
//!
//! Every error leaving a handler maps to an HTTP status here. Internal
//! detail is logged server-side; response bodies carry a short message in
//! the `{"error": "..."}` shape clients already parse.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::cameras::CameraError;
use crate::crypto::CryptoError;
use crate::stream::SessionError;

/// Gateway API error
///
/// Status mapping:
/// - `InvalidCamera`: 400
/// - `Unauthorized`: 401
/// - `Forbidden`: 403
/// - `NotFound`: 404
/// - `StreamTimeout`: 504
/// - `Internal`: 500
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid camera identifier: {0}")]
    InvalidCamera(String),

    #[error("missing or invalid credentials")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    StreamTimeout(String),

    #[error("internal error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidCamera(id) => (
                StatusCode::BAD_REQUEST,
                format!("invalid camera identifier: {id}"),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or invalid credentials".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "insufficient permissions".to_string(),
            ),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::StreamTimeout(message) => (StatusCode::GATEWAY_TIMEOUT, message),
            ApiError::Internal(detail) => {
                // Log the detail, return a generic message
                tracing::error!(error = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotActive(_) | SessionError::ViewerNotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
            SessionError::ReadinessTimeout { .. } => ApiError::StreamTimeout(err.to_string()),
            SessionError::SpawnFailed { .. } | SessionError::Io { .. } => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<CameraError> for ApiError {
    fn from(err: CameraError) -> Self {
        match err {
            CameraError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CameraError::Database(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        ApiError::Internal(format!("address decryption failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_mapping() {
        let not_active: ApiError = SessionError::NotActive(3).into();
        assert!(matches!(not_active, ApiError::NotFound(_)));

        let timeout: ApiError = SessionError::ReadinessTimeout {
            manifest: "streams/camera_3/index.m3u8".into(),
        }
        .into();
        assert!(matches!(timeout, ApiError::StreamTimeout(_)));

        let spawn: ApiError = SessionError::SpawnFailed {
            camera: 3,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no ffmpeg"),
        }
        .into();
        assert!(matches!(spawn, ApiError::Internal(_)));
    }

    #[test]
    fn test_camera_error_mapping() {
        let missing: ApiError = CameraError::NotFound(9).into();
        assert!(matches!(missing, ApiError::NotFound(_)));
    }
}
