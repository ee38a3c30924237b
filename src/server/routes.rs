//! HTTP routes
//!
//! Defines the axum router and the application state shared by handlers.

use std::path::Path;
use std::sync::Arc;

use axum::{middleware, routing::get, routing::post, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{require_auth, TokenValidator};
use crate::cameras::CameraDirectory;
use crate::crypto::AddressDecryptor;
use crate::stream::StreamManager;

use super::handlers;

/// Application state shared across all handlers
pub struct AppState {
    /// The stream session manager
    pub manager: Arc<StreamManager>,

    /// Camera metadata and entitlement lookups
    pub cameras: CameraDirectory,

    /// Stored stream address decryption
    pub decryptor: AddressDecryptor,
}

/// Build the application router
///
/// - `GET /health`: liveness probe (public)
/// - `POST /start/:camera_id`: start watching (authenticated)
/// - `POST /stop/:camera_id`: stop watching (authenticated)
/// - `GET /streams/*`: the HLS artifact tree, served statically
pub fn build_routes(
    state: Arc<AppState>,
    validator: Arc<TokenValidator>,
    streams_root: &Path,
) -> Router {
    let public = Router::new().route("/health", get(handlers::health));

    let protected = Router::new()
        .route("/start/:camera_id", post(handlers::start_stream))
        .route("/stop/:camera_id", post(handlers::stop_stream))
        .route_layer(middleware::from_fn_with_state(validator, require_auth))
        .with_state(state);

    public
        .merge(protected)
        .nest_service("/streams", ServeDir::new(streams_root))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::Claims;
    use crate::stream::ManagerConfig;

    const SECRET: &[u8] = b"route-test-secret";

    fn make_token(sub: &str) -> String {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;
        let claims = Claims {
            sub: sub.to_string(),
            exp: now + 3600,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn test_router(streams_root: &Path) -> Router {
        // Lazy pool: no connection is made until a query runs, so routes
        // that never reach the database are testable offline
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://gateway:x@127.0.0.1:1/cams")
            .unwrap();

        let state = Arc::new(AppState {
            manager: Arc::new(StreamManager::new(
                ManagerConfig::default().streams_root(streams_root),
            )),
            cameras: CameraDirectory::new(pool),
            decryptor: AddressDecryptor::new(&[0u8; 32]).unwrap(),
        });
        build_routes(state, Arc::new(TokenValidator::new(SECRET)), streams_root)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let root = tempfile::tempdir().unwrap();
        let app = test_router(root.path());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_start_requires_auth() {
        let root = tempfile::tempdir().unwrap();
        let app = test_router(root.path());

        let response = app
            .oneshot(Request::post("/start/1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let app = test_router(root.path());

        let response = app
            .oneshot(
                Request::post("/stop/1")
                    .header("authorization", "Bearer not.a.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_camera_id_is_bad_request() {
        let root = tempfile::tempdir().unwrap();
        let app = test_router(root.path());

        let response = app
            .oneshot(
                Request::post("/start/not-a-number")
                    .header("authorization", format!("Bearer {}", make_token("u1")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stop_for_inactive_camera_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let app = test_router(root.path());

        // Stop never touches the database; only the (empty) registry
        let response = app
            .oneshot(
                Request::post("/stop/5")
                    .header("authorization", format!("Bearer {}", make_token("u1")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
