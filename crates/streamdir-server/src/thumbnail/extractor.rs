//! Frame extraction backends.

use std::path::{Path, PathBuf};
use std::time::Duration;

use streamdir_common::{Error, Result};

use crate::command::{ToolCommand, DEFAULT_TIMEOUT};

/// Something that can write a single still frame of a video to disk.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait::async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Human-readable name of the backend.
    fn name(&self) -> &'static str;

    /// Write the frame at `seek` (`HH:MM:SS`) of `source` to `output` as a
    /// JPEG.
    ///
    /// Succeeding does not by itself promise a non-empty file; callers check.
    async fn extract_frame(&self, source: &Path, seek: &str, output: &Path) -> Result<()>;
}

/// Frame extraction through the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    program: Option<PathBuf>,
    timeout: Duration,
}

impl FfmpegExtractor {
    /// Locate ffmpeg, preferring `custom_path` when it exists and falling
    /// back to `PATH`. A missing binary is not an error here; every
    /// extraction attempt will report it instead.
    pub fn discover(custom_path: Option<&Path>, timeout: Duration) -> Self {
        let program = match custom_path {
            Some(p) if p.exists() => Some(p.to_path_buf()),
            _ => which::which("ffmpeg").ok(),
        };

        match &program {
            Some(p) => tracing::debug!("Using ffmpeg at {}", p.display()),
            None => tracing::warn!("ffmpeg not found; thumbnails will be unavailable"),
        }

        Self { program, timeout }
    }

    /// Use a specific executable without probing.
    pub fn with_program(program: PathBuf, timeout: Duration) -> Self {
        Self {
            program: Some(program),
            timeout,
        }
    }

    /// Resolved executable, if any.
    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::discover(None, DEFAULT_TIMEOUT)
    }
}

#[async_trait::async_trait]
impl FrameExtractor for FfmpegExtractor {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn extract_frame(&self, source: &Path, seek: &str, output: &Path) -> Result<()> {
        let program = self
            .program
            .clone()
            .ok_or_else(|| Error::ThumbnailToolUnavailable("ffmpeg not found in PATH".into()))?;

        ToolCommand::new(program)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-ss", seek, "-i"])
            .arg(source.to_string_lossy())
            .args(["-frames:v", "1", "-q:v", "3"])
            .arg(output.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await
            .map(|_| ())
    }
}
