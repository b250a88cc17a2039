//! Resolution of the external ffmpeg/ffprobe binaries.
//!
//! Resolution order:
//! 1) Environment variable override (`FFMPEG_PATH`, `FFPROBE_PATH`)
//! 2) `PATH` lookup

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{MediaError, Result};

/// Environment variable overriding the ffmpeg binary.
pub const FFMPEG_ENV: &str = "FFMPEG_PATH";

/// Environment variable overriding the ffprobe binary.
pub const FFPROBE_ENV: &str = "FFPROBE_PATH";

/// Located transcoder and prober binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Toolchain {
    /// Uses explicit binary paths without checking them.
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Locates both binaries.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::ToolNotFound` naming the first missing tool.
    pub fn discover() -> Result<Self> {
        let ffmpeg = resolve_tool(FFMPEG_ENV, "ffmpeg")?;
        let ffprobe = resolve_tool(FFPROBE_ENV, "ffprobe")?;
        debug!(ffmpeg = %ffmpeg.display(), ffprobe = %ffprobe.display(), "media tools found");
        Ok(Self { ffmpeg, ffprobe })
    }

    /// Path to ffmpeg.
    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Path to ffprobe.
    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }
}

fn resolve_tool(env_key: &str, name: &str) -> Result<PathBuf> {
    if let Ok(v) = env::var(env_key) {
        let p = PathBuf::from(&v);
        if p.exists() {
            return Ok(p);
        }
        debug!(env = env_key, path = %v, "override does not exist, searching PATH");
    }

    which::which(name).map_err(|_| MediaError::ToolNotFound(name.to_string()))
}

/// Runs `program` with `args` and returns its stdout.
///
/// A non-zero exit becomes `MediaError::CommandFailed` carrying the
/// captured stderr.
pub(crate) async fn run_checked<S: AsRef<std::ffi::OsStr>>(
    program: &Path,
    args: &[S],
) -> Result<String> {
    trace!(program = %program.display(), "running media tool");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await?;

    trace!(
        status = %output.status,
        stdout_len = output.stdout.len(),
        stderr_len = output.stderr.len(),
        "media tool completed"
    );

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let tool = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| program.display().to_string());
        Err(MediaError::CommandFailed {
            tool,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
