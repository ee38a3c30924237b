//! Viewer admission policy
//!
//! Caps how many distinct cameras a single viewer may watch concurrently
//! and selects the eviction victim (the watch with the earliest start) when
//! the cap would be exceeded. Watch records are bookkeeping only; the
//! registry owns the sessions themselves.
//!
//! The table has its own lock, independent of every session lock. Callers
//! must not invoke registry operations while holding it; the manager reads
//! the victim out, drops the lock, then calls `leave`.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::Mutex;

use super::session::{CameraId, ViewerId};

/// Per-viewer watch-record table with a concurrent-camera cap
pub struct ViewerAdmission {
    /// viewer -> camera -> when that viewer joined that camera
    watches: Mutex<HashMap<ViewerId, HashMap<CameraId, Instant>>>,

    /// Maximum distinct cameras one viewer may watch at once
    max_cameras: usize,
}

impl ViewerAdmission {
    /// Create a policy with the given concurrent-camera cap
    pub fn new(max_cameras: usize) -> Self {
        Self {
            watches: Mutex::new(HashMap::new()),
            max_cameras,
        }
    }

    /// Select the eviction victim for a prospective join, if any
    ///
    /// Returns `None` when the viewer already watches `camera` (a re-join is
    /// not growth) or is under the cap. Otherwise returns the camera with
    /// the earliest `started_at`. The victim's record is *not* removed here;
    /// the caller evicts and then calls [`remove`](Self::remove).
    pub async fn eviction_victim(&self, viewer: &str, camera: CameraId) -> Option<CameraId> {
        let watches = self.watches.lock().await;
        let cameras = watches.get(viewer)?;

        if cameras.contains_key(&camera) || cameras.len() < self.max_cameras {
            return None;
        }

        cameras
            .iter()
            .min_by_key(|(_, started_at)| **started_at)
            .map(|(camera, _)| *camera)
    }

    /// Record a watch for `(viewer, camera)` starting now
    ///
    /// Called only after a successful join so a failed join never leaves a
    /// phantom record. A re-join refreshes the start time, pushing the
    /// camera to the back of the eviction order.
    pub async fn record(&self, viewer: &str, camera: CameraId) {
        self.insert_record(viewer, camera, Instant::now()).await;
    }

    async fn insert_record(&self, viewer: &str, camera: CameraId, started_at: Instant) {
        let mut watches = self.watches.lock().await;
        watches
            .entry(viewer.to_string())
            .or_default()
            .insert(camera, started_at);
    }

    /// Remove the watch record for `(viewer, camera)`; idempotent
    pub async fn remove(&self, viewer: &str, camera: CameraId) {
        let mut watches = self.watches.lock().await;
        if let Some(cameras) = watches.get_mut(viewer) {
            cameras.remove(&camera);
            if cameras.is_empty() {
                watches.remove(viewer);
            }
        }
    }

    /// Cameras the viewer currently watches
    pub async fn active_cameras(&self, viewer: &str) -> Vec<CameraId> {
        let watches = self.watches.lock().await;
        watches
            .get(viewer)
            .map(|cameras| cameras.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every watch record (service shutdown)
    pub async fn clear(&self) {
        self.watches.lock().await.clear();
    }
}
