//! Media handling for the Frigate relay.
//!
//! - `MediaChunker` - splits an oversized clip into ordered parts that each
//!   fit under the chat attachment ceiling, using `ffprobe` and `ffmpeg`
//! - `save_thumbnail` - decodes the base64 thumbnail carried in an event
//! - `TempFiles` - removes per-event scratch files once delivery is done
//!
//! # Example
//!
//! ```no_run
//! use frigate_media::{ChunkOptions, MediaChunker};
//! use std::path::Path;
//!
//! # async fn demo() -> frigate_media::Result<()> {
//! let chunker = MediaChunker::new()?;
//! let options = ChunkOptions::default().with_max_size_bytes(49 * 1024 * 1024);
//! let parts = chunker.split(Path::new("/tmp/abc123.mp4"), &options).await?;
//! for part in &parts {
//!     println!("part {} of {}: {}", part.index, parts.len(), part.path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod error;
pub mod files;
pub mod thumbnail;
pub mod tools;

pub use chunker::{
    part_file_name, plan_segments, ChunkOptions, MediaChunker, MediaPart, Segment,
    DEFAULT_MAX_PART_BYTES, MAX_PARTS, MIN_PART_SECONDS,
};
pub use error::{MediaError, Result};
pub use files::{clip_path, safe_file_stem, thumbnail_path, TempFiles};
pub use thumbnail::save_thumbnail;
pub use tools::Toolchain;
