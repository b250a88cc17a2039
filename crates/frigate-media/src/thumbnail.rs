//! Thumbnail decoding.

use std::path::{Path, PathBuf};

use base64::Engine;
use tokio::fs;
use tracing::debug;

use crate::error::{MediaError, Result};
use crate::files::thumbnail_path;

/// Decodes the base64 thumbnail of `event_id` and writes it under `dir`.
///
/// Returns the path of the written JPEG.
pub async fn save_thumbnail(dir: &Path, event_id: &str, encoded: &str) -> Result<PathBuf> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
    if bytes.is_empty() {
        return Err(MediaError::EmptyThumbnail);
    }

    fs::create_dir_all(dir).await?;
    let path = thumbnail_path(dir, event_id);
    fs::write(&path, &bytes).await?;

    debug!(event_id = %event_id, path = %path.display(), size = bytes.len(), "thumbnail saved");
    Ok(path)
}
