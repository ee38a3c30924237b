//! Stream session manager
//!
//! The in-memory registry of active per-camera transcoder sessions: viewer
//! reference counting, process lifecycle (spawn, readiness wait, kill,
//! cleanup) and the per-viewer concurrent-camera admission policy.
//!
//! # Architecture
//!
//! ```text
//!                        StreamManager
//!                  ┌───────────┴────────────┐
//!                  ▼                        ▼
//!          ViewerAdmission           SessionRegistry
//!     ┌──────────────────────┐  ┌─────────────────────────────┐
//!     │ viewer ─► {camera ─► │  │ sessions: HashMap<CameraId, │
//!     │           started_at}│  │   Arc<Mutex<Session {       │
//!     │ cap + LRU eviction   │  │     process, viewers, state │
//!     └──────────────────────┘  │   }>>                       │
//!                               └─────────────────────────────┘
//!                                            │
//!                                   one ffmpeg per camera,
//!                                   shared by all its viewers
//! ```
//!
//! # Locking
//!
//! The registry `RwLock` guards only the map itself and is held briefly.
//! Spawning and the manifest readiness wait happen under the per-session
//! `Mutex` alone, so concurrent joins for one camera serialize (at most one
//! spawn in flight) while other cameras are unaffected. Entry removal drops
//! the session guard first, then revalidates under the map write lock with
//! `Arc::ptr_eq` + `try_lock`, so the map lock never waits on a busy
//! session. The admission table has its own lock, never held across
//! registry calls.

pub mod admission;
pub mod config;
pub mod error;
pub mod manager;
pub mod process;
pub mod readiness;
pub mod session;
pub mod store;

pub use admission::ViewerAdmission;
pub use config::{ManagerConfig, TranscoderCommand};
pub use error::SessionError;
pub use manager::StreamManager;
pub use process::TranscoderProcess;
pub use session::{CameraId, Session, SessionState, SessionStats, ViewerId};
pub use store::SessionRegistry;
