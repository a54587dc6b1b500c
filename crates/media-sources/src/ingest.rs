//! Image asset ingestion.

use std::path::{Path, PathBuf};

use slidecut_common::error::{SlidecutError, SlidecutResult};
use slidecut_project_model::{EditorState, MediaAsset, MediaBytes, Overlay};

/// Natural pixel size of encoded image bytes, read from the header only.
pub fn image_dimensions(bytes: &[u8]) -> SlidecutResult<(u32, u32)> {
    let reader = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| SlidecutError::decode(format!("Failed to read image: {e}")))?;
    reader
        .into_dimensions()
        .map_err(|e| SlidecutError::decode(format!("Failed to read image size: {e}")))
}

/// Read an image file into a new asset named after the file.
///
/// Files whose content is not a recognizable image are rejected with
/// `Unsupported`, whatever their extension.
pub fn ingest_image_file(path: &Path) -> SlidecutResult<MediaAsset> {
    if !path.exists() {
        return Err(SlidecutError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes).map_err(|_| {
        SlidecutError::unsupported(format!("{} is not an image", path.display()))
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    tracing::debug!(path = %path.display(), format = ?format, "Ingested image");
    Ok(MediaAsset::image(
        name,
        MediaBytes::new(format.to_mime_type(), bytes),
    ))
}

/// Add every image among `paths` to the editor, skipping non-image files.
/// Returns the new asset ids in input order.
pub fn ingest_images(state: &mut EditorState, paths: &[PathBuf]) -> SlidecutResult<Vec<String>> {
    let mut ids = Vec::with_capacity(paths.len());
    for path in paths {
        match ingest_image_file(path) {
            Ok(asset) => ids.push(state.add_asset(asset)),
            Err(SlidecutError::Unsupported { message }) => {
                tracing::warn!(path = %path.display(), "Skipping file: {message}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(ids)
}

/// Fill in missing natural sizes on overlays from their image headers.
/// Returns how many overlays were updated.
pub fn fill_natural_sizes(state: &mut EditorState) -> usize {
    let mut pending: Vec<(String, Overlay)> = Vec::new();
    for clip in &state.timeline.clips {
        for overlay in &clip.overlays {
            if overlay.width > 0.0 && overlay.height > 0.0 {
                continue;
            }
            match image_dimensions(overlay.data.as_bytes()) {
                Ok((w, h)) => pending.push((
                    clip.id.clone(),
                    Overlay {
                        width: if overlay.width > 0.0 { overlay.width } else { w as f64 },
                        height: if overlay.height > 0.0 { overlay.height } else { h as f64 },
                        ..overlay.clone()
                    },
                )),
                Err(err) => {
                    tracing::warn!(overlay = %overlay.id, error = %err, "Cannot read overlay size");
                }
            }
        }
    }

    let mut updated = 0;
    for (clip_id, overlay) in pending {
        if state.update_overlay(&clip_id, overlay).is_ok() {
            updated += 1;
        }
    }
    updated
}
