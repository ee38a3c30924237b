//! HTTP layer
//!
//! The axum router, request handlers, API error mapping and environment
//! configuration. The HTTP layer owns nothing interesting: it authenticates
//! the caller, checks entitlement, decrypts the stored address and hands
//! the request to [`crate::stream::StreamManager`]. The HLS artifact tree
//! is served as plain static files.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::{build_routes, AppState};
