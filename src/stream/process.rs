//! Transcoder process handle
//!
//! Thin wrapper around one external transcoder process: start it, poll
//! whether it is still running, kill it. Liveness is always polled, never
//! assumed from having spawned the process earlier.

use std::process::Stdio;

use tokio::process::{Child, Command};

use super::error::SessionError;
use super::session::CameraId;

/// Handle to one running transcoder process
pub struct TranscoderProcess {
    child: Child,
    pid: Option<u32>,
}

impl std::fmt::Debug for TranscoderProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscoderProcess")
            .field("pid", &self.pid)
            .finish()
    }
}

impl TranscoderProcess {
    /// Launch the external transcoder
    ///
    /// stdout/stderr are discarded: the transcoder communicates through the
    /// files it writes. `kill_on_drop` backstops paths that lose the handle
    /// without an explicit [`shutdown`](Self::shutdown).
    pub fn spawn(
        camera: CameraId,
        program: &str,
        args: &[String],
    ) -> Result<Self, SessionError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::SpawnFailed { camera, source })?;

        let pid = child.id();
        tracing::debug!(camera = camera, pid = ?pid, program = program, "Transcoder spawned");

        Ok(Self { child, pid })
    }

    /// OS pid, if the process was running when spawned
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the process has not been observed to exit
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Request termination
    ///
    /// Issues the kill signal synchronously; an already-exited process is
    /// not an error. The child is reaped in a background task so the caller
    /// never blocks on the OS collecting it.
    pub fn shutdown(mut self) -> std::io::Result<()> {
        let result = match self.child.start_kill() {
            Ok(()) => Ok(()),
            Err(e) => {
                // Tolerate a process that exited on its own before the signal
                if self.is_alive() {
                    Err(e)
                } else {
                    Ok(())
                }
            }
        };

        let pid = self.pid;
        tokio::spawn(async move {
            match self.child.wait().await {
                Ok(status) => {
                    tracing::debug!(pid = ?pid, status = %status, "Transcoder reaped")
                }
                Err(e) => tracing::warn!(pid = ?pid, error = %e, "Failed to reap transcoder"),
            }
        });

        result
    }
}
