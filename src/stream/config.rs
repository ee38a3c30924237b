//! Session manager configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::session::CameraId;

/// Manifest file the transcoder writes once the stream is servable.
/// Its appearance is the sole readiness signal.
pub const MANIFEST_FILE: &str = "index.m3u8";

/// Configuration for the stream session manager
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Root directory for per-camera artifact directories
    pub streams_root: PathBuf,

    /// Maximum number of manifest existence checks before giving up
    pub readiness_attempts: u32,

    /// Fixed delay between manifest existence checks
    pub readiness_interval: Duration,

    /// How many distinct cameras one viewer may watch concurrently
    pub max_cameras_per_viewer: usize,

    /// Transcoder invocation template
    pub transcoder: TranscoderCommand,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            streams_root: PathBuf::from("streams"),
            readiness_attempts: 30,
            readiness_interval: Duration::from_secs(1),
            max_cameras_per_viewer: 4,
            transcoder: TranscoderCommand::default(),
        }
    }
}

impl ManagerConfig {
    /// Set the streams root directory
    pub fn streams_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.streams_root = root.into();
        self
    }

    /// Set the readiness polling budget
    pub fn readiness(mut self, attempts: u32, interval: Duration) -> Self {
        self.readiness_attempts = attempts;
        self.readiness_interval = interval;
        self
    }

    /// Set the per-viewer concurrent camera cap
    pub fn max_cameras_per_viewer(mut self, cap: usize) -> Self {
        self.max_cameras_per_viewer = cap;
        self
    }

    /// Set the transcoder command template
    pub fn transcoder(mut self, transcoder: TranscoderCommand) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Artifact directory for one camera (`<root>/camera_<id>`)
    pub fn artifact_dir(&self, camera: CameraId) -> PathBuf {
        self.streams_root.join(format!("camera_{camera}"))
    }

    /// Manifest path for one camera (`<root>/camera_<id>/index.m3u8`)
    pub fn manifest_path(&self, camera: CameraId) -> PathBuf {
        self.artifact_dir(camera).join(MANIFEST_FILE)
    }
}

/// Transcoder invocation template
///
/// `{input}` is replaced with the clear stream address and `{output}` with
/// the manifest path. The default template is the ffmpeg HLS pipeline the
/// gateway was built around; tests substitute a harmless command.
#[derive(Debug, Clone)]
pub struct TranscoderCommand {
    /// Executable to launch
    pub program: String,

    /// Argument template, `{input}`/`{output}` placeholders substituted per spawn
    pub args: Vec<String>,
}

impl Default for TranscoderCommand {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            args: [
                "-i",
                "{input}",
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-b:v",
                "500k",
                "-s",
                "640x360",
                "-f",
                "hls",
                "-hls_time",
                "2",
                "-hls_list_size",
                "10",
                "-hls_flags",
                "delete_segments",
                "{output}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl TranscoderCommand {
    /// Create a custom command template
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Resolve the template into concrete arguments for one spawn
    pub fn resolve_args(&self, input: &str, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", input)
                    .replace("{output}", output.as_ref())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();

        assert_eq!(config.streams_root, PathBuf::from("streams"));
        assert_eq!(config.readiness_attempts, 30);
        assert_eq!(config.readiness_interval, Duration::from_secs(1));
        assert_eq!(config.max_cameras_per_viewer, 4);
        assert_eq!(config.transcoder.program, "ffmpeg");
    }

    #[test]
    fn test_artifact_paths() {
        let config = ManagerConfig::default().streams_root("/tmp/hls");

        assert_eq!(config.artifact_dir(7), PathBuf::from("/tmp/hls/camera_7"));
        assert_eq!(
            config.manifest_path(7),
            PathBuf::from("/tmp/hls/camera_7/index.m3u8")
        );
    }

    #[test]
    fn test_builder_chaining() {
        let config = ManagerConfig::default()
            .streams_root("out")
            .readiness(5, Duration::from_millis(100))
            .max_cameras_per_viewer(2);

        assert_eq!(config.streams_root, PathBuf::from("out"));
        assert_eq!(config.readiness_attempts, 5);
        assert_eq!(config.readiness_interval, Duration::from_millis(100));
        assert_eq!(config.max_cameras_per_viewer, 2);
    }

    #[test]
    fn test_resolve_args_substitutes_placeholders() {
        let cmd = TranscoderCommand::default();
        let args = cmd.resolve_args("rtsp://cam.local/live", Path::new("streams/camera_3/index.m3u8"));

        assert_eq!(args[1], "rtsp://cam.local/live");
        assert_eq!(args.last().map(String::as_str), Some("streams/camera_3/index.m3u8"));
        // No placeholder survives substitution
        assert!(args.iter().all(|a| !a.contains("{input}") && !a.contains("{output}")));
    }

    #[test]
    fn test_resolve_args_without_placeholders() {
        let cmd = TranscoderCommand::new("sleep", vec!["30".to_string()]);
        let args = cmd.resolve_args("rtsp://ignored", Path::new("ignored"));

        assert_eq!(args, vec!["30".to_string()]);
    }
}
