//! Per-camera session state
//!
//! This module defines the per-camera state stored in the registry: the
//! transcoder process handle plus the set of viewers currently watching.

use std::collections::HashSet;
use std::time::Instant;

use super::process::TranscoderProcess;

/// Stable external camera identifier
pub type CameraId = i32;

/// Authenticated viewer identity (JWT subject)
pub type ViewerId = String;

/// State of a session entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transcoder launched, manifest not yet observed
    Starting,
    /// Manifest observed, stream servable
    Active,
}

/// Entry for a single camera in the registry
pub struct Session {
    /// Current session state
    pub(super) state: SessionState,

    /// The one transcoder process owned by this session, if spawned
    pub(super) process: Option<TranscoderProcess>,

    /// Viewers currently watching this camera
    pub(super) viewers: HashSet<ViewerId>,

    /// Set when the entry has been removed from the registry; a join racing
    /// on a stale handle must retry instead of reviving it
    pub(super) retired: bool,

    /// When the session was created
    pub(super) created_at: Instant,
}

impl Session {
    /// Create a new, empty session in the `Starting` state
    pub(super) fn new() -> Self {
        Self {
            state: SessionState::Starting,
            process: None,
            viewers: HashSet::new(),
            retired: false,
            created_at: Instant::now(),
        }
    }

    /// Number of viewers currently watching
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// Whether the given viewer is in the viewer set
    pub fn is_watching(&self, viewer: &str) -> bool {
        self.viewers.contains(viewer)
    }

    /// How long the session has existed
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

/// Statistics for a session
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Number of viewers currently watching
    pub viewer_count: usize,
    /// Current session state
    pub state: SessionState,
    /// OS pid of the transcoder process, if one is attached
    pub pid: Option<u32>,
}
