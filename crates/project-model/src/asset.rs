//! Media assets and the registry that owns them.
//!
//! Binary payloads are shared, immutable byte buffers. On the wire they are
//! `data:` URLs (`data:image/png;base64,...`), which keeps a whole timeline
//! self-contained in a single JSON document.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Shared immutable bytes with a MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBytes {
    mime: String,
    bytes: Arc<[u8]>,
}

impl MediaBytes {
    pub fn new(mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Parse a base64 `data:` URL.
    pub fn from_data_url(url: &str) -> Result<Self, MediaBytesError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or(MediaBytesError::NotADataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(MediaBytesError::NotADataUrl)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(MediaBytesError::NotBase64)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| MediaBytesError::Payload(e.to_string()))?;
        Ok(Self::new(
            if mime.is_empty() {
                "application/octet-stream"
            } else {
                mime
            },
            bytes,
        ))
    }

    /// Encode as a base64 `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Read a file, guessing the MIME type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(mime_from_extension(path), bytes))
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for MediaBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBytes")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Serialize for MediaBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl<'de> Deserialize<'de> for MediaBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        MediaBytes::from_data_url(&url).map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaBytesError {
    #[error("not a data URL")]
    NotADataUrl,

    #[error("only base64 data URLs are supported")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    Payload(String),
}

/// MIME type for common image and audio extensions.
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "webm" => "audio/webm",
        "ogg" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}

/// Kind of media asset. Only still images are supported as clip sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    Image,
}

/// An imported media file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Unique asset identifier.
    pub id: String,

    /// Asset kind.
    #[serde(rename = "type", default)]
    pub kind: AssetKind,

    /// Encoded image bytes.
    pub data: MediaBytes,

    /// Display name (usually the source file name).
    pub name: String,
}

impl MediaAsset {
    /// Create an image asset with a fresh id.
    pub fn image(name: impl Into<String>, data: MediaBytes) -> Self {
        Self {
            id: crate::new_id(),
            kind: AssetKind::Image,
            data,
            name: name.into(),
        }
    }
}

/// Read-only lookup from asset id to asset.
pub trait AssetLookup {
    fn asset(&self, id: &str) -> Option<&MediaAsset>;
}

impl AssetLookup for [MediaAsset] {
    fn asset(&self, id: &str) -> Option<&MediaAsset> {
        self.iter().find(|a| a.id == id)
    }
}

impl AssetLookup for Vec<MediaAsset> {
    fn asset(&self, id: &str) -> Option<&MediaAsset> {
        self.as_slice().asset(id)
    }
}

/// Additive, insertion-ordered registry of assets.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: Vec<MediaAsset>,
    index: HashMap<String, usize>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset. An asset whose id is already present is ignored,
    /// since assets never change after creation.
    pub fn add(&mut self, asset: MediaAsset) -> &MediaAsset {
        let idx = match self.index.get(&asset.id) {
            Some(&idx) => idx,
            None => {
                let idx = self.assets.len();
                self.index.insert(asset.id.clone(), idx);
                self.assets.push(asset);
                idx
            }
        };
        &self.assets[idx]
    }

    pub fn get(&self, id: &str) -> Option<&MediaAsset> {
        self.index.get(id).map(|&i| &self.assets[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaAsset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetLookup for AssetRegistry {
    fn asset(&self, id: &str) -> Option<&MediaAsset> {
        self.get(id)
    }
}
