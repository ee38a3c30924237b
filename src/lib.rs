//! RTSP-to-HLS streaming gateway
//!
//! Turns a shared pool of external ffmpeg transcoder processes into a
//! multi-viewer, multi-camera live-streaming service. Many HTTP clients can
//! watch the same camera concurrently; the gateway starts at most one
//! transcoder per camera, keeps it alive while at least one viewer remains,
//! and tears it down when the last viewer leaves.
//!
//! # Architecture
//!
//! ```text
//!   POST /start/:id ──► auth ──► entitlement ──► decrypt address
//!                                                      │
//!                                                      ▼
//!                                             StreamManager
//!                                  ┌───────────────┴───────────────┐
//!                                  ▼                               ▼
//!                          ViewerAdmission                 SessionRegistry
//!                      (per-viewer camera cap,        (camera ─► Session:
//!                       oldest-watch eviction)         ffmpeg process +
//!                                                      viewer set)
//!                                                              │
//!                                                              ▼
//!                                                  streams/camera_<id>/
//!                                                  index.m3u8 + segments
//! ```
//!
//! The transcoder itself is opaque: the gateway spawns it, polls for its
//! manifest to appear, and kills it. Serving the HLS output is plain static
//! file serving.

pub mod auth;
pub mod cameras;
pub mod crypto;
pub mod server;
pub mod stream;

pub use server::GatewayConfig;
pub use stream::{ManagerConfig, StreamManager};
