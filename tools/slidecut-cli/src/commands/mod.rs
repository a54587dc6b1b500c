pub mod check;
pub mod export;
pub mod frame;
pub mod info;
pub mod validate;

use std::path::Path;

use slidecut_common::config::AppConfig;
use slidecut_project_model::LoadedManifest;

/// Load a manifest and fill in overlay natural sizes from the image data.
pub fn load_manifest(path: &Path) -> anyhow::Result<LoadedManifest> {
    let mut loaded = LoadedManifest::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load composition: {e}"))?;
    let filled = slidecut_media_sources::fill_natural_sizes(&mut loaded.state);
    if filled > 0 {
        tracing::debug!(overlays = filled, "Read overlay sizes from image data");
    }
    Ok(loaded)
}

/// Canvas declared by the manifest, else the configured preview size.
pub fn canvas_size(loaded: &LoadedManifest, config: &AppConfig) -> (u32, u32) {
    match loaded.manifest.canvas {
        Some(spec) => (spec.width, spec.height),
        None => (config.preview.canvas_width, config.preview.canvas_height),
    }
}
