//! Composition manifests.
//!
//! A manifest (`manifest.json`) describes a timeline in terms of files on
//! disk: image assets, clips referencing them, overlays, and narration audio.
//! Loading resolves every path relative to the manifest's directory and
//! produces a ready-to-use [`EditorState`]. Manifests are an input format
//! only; the editor never writes them back.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::asset::{AssetRegistry, MediaAsset, MediaBytes};
use crate::clip::{AudioTrack, Clip, Overlay, DEFAULT_CLIP_DURATION_SECS, DEFAULT_OVERLAY_SCALE};
use crate::geometry::CanvasSize;
use crate::state::EditorState;
use crate::timeline::Timeline;

/// Top-level manifest file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Preview/export canvas size. Falls back to the configured default.
    #[serde(default)]
    pub canvas: Option<CanvasSpec>,

    /// Image assets.
    pub assets: Vec<AssetEntry>,

    /// Clips in timeline order.
    pub clips: Vec<ClipEntry>,
}

/// Canvas dimensions in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
}

impl CanvasSpec {
    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.width as f64, self.height as f64)
    }
}

/// An image asset on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    pub id: String,

    /// Display name; defaults to the file name.
    #[serde(default)]
    pub name: Option<String>,

    /// Path relative to the manifest directory.
    pub path: String,
}

/// A clip referencing an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipEntry {
    #[serde(default)]
    pub id: Option<String>,

    /// Asset id.
    pub asset: String,

    #[serde(default = "default_duration")]
    pub duration: f64,

    /// Narration audio file.
    #[serde(default)]
    pub narration: Option<String>,

    #[serde(default)]
    pub tts_text: Option<String>,

    #[serde(default)]
    pub overlays: Vec<OverlayEntry>,
}

/// An overlay image with its transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayEntry {
    #[serde(default)]
    pub id: Option<String>,

    /// Image file.
    pub path: String,

    #[serde(default = "half")]
    pub x: f64,

    #[serde(default = "half")]
    pub y: f64,

    #[serde(default = "default_scale")]
    pub scale: f64,

    #[serde(default)]
    pub rotation: f64,

    /// Natural size; zero means "probe the image".
    #[serde(default)]
    pub width: f64,

    #[serde(default)]
    pub height: f64,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_duration() -> f64 {
    DEFAULT_CLIP_DURATION_SECS
}

fn half() -> f64 {
    0.5
}

fn default_scale() -> f64 {
    DEFAULT_OVERLAY_SCALE
}

/// A manifest with all referenced files read into memory.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// Path of the manifest file.
    pub path: PathBuf,

    /// Parsed manifest.
    pub manifest: Manifest,

    /// Editor state built from the manifest.
    pub state: EditorState,
}

impl LoadedManifest {
    /// Load a manifest file (or `manifest.json` inside a directory).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let mut path = path.as_ref().to_path_buf();
        if path.is_dir() {
            path = path.join("manifest.json");
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ProjectError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| ProjectError::ParseError {
                path: path.clone(),
                source: e,
            })?;

        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let state = build_state(&root, &manifest)?;
        tracing::debug!(
            manifest = %path.display(),
            assets = state.assets.len(),
            clips = state.timeline.len(),
            "Loaded manifest"
        );

        Ok(Self {
            path,
            manifest,
            state,
        })
    }

    /// Directory relative paths are resolved against.
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Canvas size declared by the manifest, if any.
    pub fn canvas(&self) -> Option<CanvasSize> {
        self.manifest.canvas.map(|c| c.size())
    }

    /// Check a manifest on disk without building state: returns a list of
    /// human-readable problems (missing files, dangling references, bad
    /// durations). An empty list means the manifest is usable.
    pub fn validate(path: impl AsRef<Path>) -> Result<Vec<String>, ProjectError> {
        let mut path = path.as_ref().to_path_buf();
        if path.is_dir() {
            path = path.join("manifest.json");
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ProjectError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| ProjectError::ParseError {
                path: path.clone(),
                source: e,
            })?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(validate_sources(&root, &manifest))
    }
}

/// Problems with the files and references of a manifest.
pub fn validate_sources(root: &Path, manifest: &Manifest) -> Vec<String> {
    let mut errors = vec![];

    // Images are cached by id, so ids must be unique across the manifest.
    let mut asset_ids = HashSet::new();
    for asset in &manifest.assets {
        if !asset_ids.insert(asset.id.as_str()) {
            errors.push(format!("Duplicate asset id '{}'", asset.id));
        }
    }
    let mut clip_ids = HashSet::new();
    let mut overlay_ids = HashSet::new();
    for clip in &manifest.clips {
        if let Some(id) = &clip.id {
            if !clip_ids.insert(id.as_str()) {
                errors.push(format!("Duplicate clip id '{id}'"));
            }
        }
        for id in clip.overlays.iter().filter_map(|o| o.id.as_deref()) {
            if !overlay_ids.insert(id) {
                errors.push(format!("Duplicate overlay id '{id}'"));
            }
        }
    }

    for asset in &manifest.assets {
        if !root.join(&asset.path).exists() {
            errors.push(format!("Asset '{}' source missing: {}", asset.id, asset.path));
        }
    }

    for (index, clip) in manifest.clips.iter().enumerate() {
        if !manifest.assets.iter().any(|a| a.id == clip.asset) {
            errors.push(format!(
                "Clip #{index} references unknown asset '{}'",
                clip.asset
            ));
        }
        if !(clip.duration.is_finite() && clip.duration > 0.0) {
            errors.push(format!(
                "Clip #{index} has non-positive duration {}",
                clip.duration
            ));
        }
        if let Some(narration) = &clip.narration {
            if !root.join(narration).exists() {
                errors.push(format!("Clip #{index} narration missing: {narration}"));
            }
        }
        for overlay in &clip.overlays {
            if !root.join(&overlay.path).exists() {
                errors.push(format!("Clip #{index} overlay missing: {}", overlay.path));
            }
            if overlay.scale < 0.0 {
                errors.push(format!(
                    "Clip #{index} overlay {} has negative scale",
                    overlay.path
                ));
            }
        }
    }

    errors
}

fn build_state(root: &Path, manifest: &Manifest) -> Result<EditorState, ProjectError> {
    let problems = validate_sources(root, manifest);
    if !problems.is_empty() {
        return Err(ProjectError::ValidationError {
            message: problems.join("; "),
        });
    }

    let read = |relative: &str| -> Result<MediaBytes, ProjectError> {
        let path = root.join(relative);
        MediaBytes::from_path(&path).map_err(|e| ProjectError::IoError { path, source: e })
    };

    let mut assets = AssetRegistry::new();
    for entry in &manifest.assets {
        let name = entry.name.clone().unwrap_or_else(|| {
            Path::new(&entry.path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| entry.path.clone())
        });
        assets.add(MediaAsset {
            id: entry.id.clone(),
            kind: Default::default(),
            data: read(&entry.path)?,
            name,
        });
    }

    let mut clips = Vec::with_capacity(manifest.clips.len());
    for entry in &manifest.clips {
        let id = entry.id.clone().unwrap_or_else(crate::new_id);
        let audio = match &entry.narration {
            Some(path) => Some(AudioTrack {
                name: format!("Narration {id}"),
                url: path.clone(),
                data: read(path)?,
            }),
            None => None,
        };
        let mut overlays = Vec::with_capacity(entry.overlays.len());
        for o in &entry.overlays {
            overlays.push(Overlay {
                id: o.id.clone().unwrap_or_else(crate::new_id),
                data: read(&o.path)?,
                x: o.x,
                y: o.y,
                scale: o.scale.max(0.0),
                rotation: o.rotation,
                width: o.width,
                height: o.height,
            });
        }
        clips.push(Clip {
            id,
            asset_id: entry.asset.clone(),
            duration: entry.duration,
            audio,
            tts_text: entry.tts_text.clone(),
            overlays,
        });
    }

    Ok(EditorState::with_timeline(assets, Timeline::from_clips(clips)))
}

/// Errors that can occur when loading manifests.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid manifest: {message}")]
    ValidationError { message: String },
}

impl From<ProjectError> for slidecut_common::error::SlidecutError {
    fn from(err: ProjectError) -> Self {
        slidecut_common::error::SlidecutError::project(err.to_string())
    }
}
