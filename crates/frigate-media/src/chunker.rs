//! Size-bounded clip splitting.
//!
//! A clip larger than the chat attachment ceiling is cut into consecutive
//! parts with `ffmpeg -c copy`. The per-part duration assumes a constant
//! bitrate (`duration * max / size`); ffmpeg's `-fs` cap keeps every part
//! under the ceiling even when the bitrate is uneven.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{MediaError, Result};
use crate::files::TempFiles;
use crate::tools::{run_checked, Toolchain};

/// Shortest part the planner will produce, in seconds.
pub const MIN_PART_SECONDS: f64 = 1.0;

/// Upper bound on the number of parts for one clip.
pub const MAX_PARTS: usize = 64;

/// Default per-part budget: 49 MiB, just under the 50 MiB upload limit.
pub const DEFAULT_MAX_PART_BYTES: u64 = 49 * 1024 * 1024;

/// Absorbs float noise when the size ratio is an exact integer.
const PLAN_EPSILON: f64 = 1e-9;

/// Options for one split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOptions {
    /// Hard size cap for every part.
    pub max_size_bytes: u64,
    /// Container extension of the parts.
    pub output_format: String,
    /// Directory the parts are written to.
    pub output_dir: PathBuf,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_PART_BYTES,
            output_format: "mp4".to_string(),
            output_dir: std::env::temp_dir(),
        }
    }
}

impl ChunkOptions {
    /// Sets the per-part size cap.
    pub fn with_max_size_bytes(mut self, max: u64) -> Self {
        self.max_size_bytes = max;
        self
    }

    /// Sets the output container extension.
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    /// Sets the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// Time range of one planned part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// 1-based position.
    pub index: usize,
    /// Offset into the source, in seconds.
    pub start: f64,
    /// Length, in seconds.
    pub duration: f64,
}

impl Segment {
    /// End offset, in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// One produced part.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPart {
    /// 1-based position.
    pub index: usize,
    /// Path of the part file.
    pub path: PathBuf,
    /// Size of the part file.
    pub size_bytes: u64,
    /// Time range the part was cut from.
    pub segment: Segment,
}

/// Plans the parts for a clip of `total_duration` seconds and `total_size`
/// bytes so each holds at most `max_size` bytes at a constant bitrate.
///
/// The segments are contiguous and cover `[0, total_duration]` exactly.
///
/// # Errors
///
/// - `NotOversized` if the clip already fits
/// - `InvalidDuration` for a non-positive or non-finite duration
/// - `TooManyParts` if more than `MAX_PARTS` parts would be needed
pub fn plan_segments(total_duration: f64, total_size: u64, max_size: u64) -> Result<Vec<Segment>> {
    if max_size == 0 {
        return Err(MediaError::InvalidOptions("max_size_bytes must be positive".to_string()));
    }
    if total_size <= max_size {
        return Err(MediaError::NotOversized {
            size: total_size,
            max: max_size,
        });
    }
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(MediaError::InvalidDuration(total_duration));
    }

    let part_duration =
        (total_duration * max_size as f64 / total_size as f64).max(MIN_PART_SECONDS);
    let count = ((total_duration / part_duration) - PLAN_EPSILON).ceil().max(1.0) as usize;

    if count > MAX_PARTS {
        return Err(MediaError::TooManyParts {
            count,
            max: MAX_PARTS,
        });
    }

    let segments = (0..count)
        .map(|i| {
            let start = i as f64 * part_duration;
            let end = if i + 1 == count {
                total_duration
            } else {
                ((i + 1) as f64 * part_duration).min(total_duration)
            };
            Segment {
                index: i + 1,
                start,
                duration: end - start,
            }
        })
        .collect();

    Ok(segments)
}

/// File name of part `index` of a clip whose stem is `stem`.
pub fn part_file_name(stem: &str, index: usize, format: &str) -> String {
    format!("{}_part{}.{}", stem, index, format)
}

/// Splits clips with ffmpeg.
#[derive(Debug, Clone)]
pub struct MediaChunker {
    tools: Toolchain,
}

impl MediaChunker {
    /// Creates a chunker, verifying that ffmpeg and ffprobe are available.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::ToolNotFound` if either binary is missing.
    pub fn new() -> Result<Self> {
        Ok(Self {
            tools: Toolchain::discover()?,
        })
    }

    /// Creates a chunker around an already resolved toolchain.
    pub fn with_toolchain(tools: Toolchain) -> Self {
        Self { tools }
    }

    /// Returns the toolchain in use.
    pub fn toolchain(&self) -> &Toolchain {
        &self.tools
    }

    /// Reads the container duration of `path`, in seconds.
    pub async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_owned());

        let stdout = run_checked(self.tools.ffprobe(), &args).await?;

        let text = stdout.trim();
        text.parse::<f64>()
            .map_err(|_| MediaError::DurationParse(text.to_string()))
    }

    /// Splits `source` into parts no larger than `options.max_size_bytes`.
    ///
    /// Parts are returned in playback order. On failure every part already
    /// written is removed. Removing the returned parts is up to the caller.
    pub async fn split(&self, source: &Path, options: &ChunkOptions) -> Result<Vec<MediaPart>> {
        if options.output_format.is_empty() {
            return Err(MediaError::InvalidOptions("output_format is empty".to_string()));
        }

        let total_size = fs::metadata(source).await?.len();
        if total_size <= options.max_size_bytes {
            return Err(MediaError::NotOversized {
                size: total_size,
                max: options.max_size_bytes,
            });
        }

        let total_duration = self.probe_duration(source).await?;
        let segments = plan_segments(total_duration, total_size, options.max_size_bytes)?;

        info!(
            source = %source.display(),
            size = total_size,
            duration = total_duration,
            parts = segments.len(),
            "splitting clip"
        );

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "clip".to_string());

        fs::create_dir_all(&options.output_dir).await?;

        // Dropped on the error path; defused by `keep` on success.
        let mut produced = TempFiles::new();
        let mut parts = Vec::with_capacity(segments.len());

        for segment in segments {
            let output = options
                .output_dir
                .join(part_file_name(&stem, segment.index, &options.output_format));
            produced.track(&output);

            self.cut(source, &segment, options.max_size_bytes, &output)
                .await?;

            let size_bytes = fs::metadata(&output).await?.len();
            if size_bytes > options.max_size_bytes {
                warn!(
                    part = segment.index,
                    size = size_bytes,
                    max = options.max_size_bytes,
                    "part exceeds size cap"
                );
            }
            debug!(part = segment.index, start = segment.start, size = size_bytes, "part written");

            parts.push(MediaPart {
                index: segment.index,
                path: output,
                size_bytes,
                segment,
            });
        }

        produced.keep();
        Ok(parts)
    }

    async fn cut(&self, source: &Path, segment: &Segment, max_size: u64, output: &Path) -> Result<()> {
        let args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            source.as_os_str().to_owned(),
            "-ss".into(),
            format!("{:.3}", segment.start).into(),
            "-t".into(),
            format!("{:.3}", segment.duration).into(),
            "-c".into(),
            "copy".into(),
            "-fs".into(),
            max_size.to_string().into(),
            output.as_os_str().to_owned(),
        ];

        run_checked(self.tools.ffmpeg(), &args).await?;
        Ok(())
    }
}
