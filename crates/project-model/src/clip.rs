//! Timeline entries: clips, their overlays, and narration tracks.

use serde::{Deserialize, Serialize};

use crate::asset::MediaBytes;

/// Duration given to a clip when it is first added to the timeline.
pub const DEFAULT_CLIP_DURATION_SECS: f64 = 5.0;

/// Default placement of a freshly generated overlay.
pub const DEFAULT_OVERLAY_CENTER: (f64, f64) = (0.5, 0.5);
pub const DEFAULT_OVERLAY_SCALE: f64 = 0.25;

/// A positioned, scaled, rotated image layer drawn over a clip.
///
/// Overlays are replaced wholesale on every edit; there is no partial
/// mutation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: String,

    /// Encoded image bytes.
    pub data: MediaBytes,

    /// Center X, normalized to canvas width. Usually in `[0, 1]` but not clamped.
    pub x: f64,

    /// Center Y, normalized to canvas height.
    pub y: f64,

    /// Multiplier applied to the natural size. Never negative.
    pub scale: f64,

    /// Clockwise rotation in degrees (screen space, y-down). Any real value.
    pub rotation: f64,

    /// Natural pixel width of the source image.
    pub width: f64,

    /// Natural pixel height of the source image.
    pub height: f64,
}

impl Overlay {
    /// A new overlay with default placement: centered, quarter scale, upright.
    pub fn generated(data: MediaBytes, natural_width: u32, natural_height: u32) -> Self {
        Self {
            id: crate::new_id(),
            data,
            x: DEFAULT_OVERLAY_CENTER.0,
            y: DEFAULT_OVERLAY_CENTER.1,
            scale: DEFAULT_OVERLAY_SCALE,
            rotation: 0.0,
            width: natural_width as f64,
            height: natural_height as f64,
        }
    }

    /// Copy with a new center.
    pub fn with_center(&self, x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..self.clone()
        }
    }

    /// Copy with a new scale, clamped to be non-negative.
    pub fn with_scale(&self, scale: f64) -> Self {
        Self {
            scale: if scale.is_finite() { scale.max(0.0) } else { 0.0 },
            ..self.clone()
        }
    }

    /// Copy with a new rotation in degrees.
    pub fn with_rotation(&self, rotation: f64) -> Self {
        Self {
            rotation,
            ..self.clone()
        }
    }
}

/// A narration track attached to a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Display name.
    pub name: String,

    /// Where the audio came from (file path, capture id, ...). Informational.
    pub url: String,

    /// Encoded audio bytes, decoded only at export time.
    pub data: MediaBytes,
}

/// One timeline entry showing a single image asset for a fixed duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,

    /// Referenced asset; the clip never owns it.
    pub asset_id: String,

    /// Seconds on the timeline. Always positive.
    pub duration: f64,

    /// Optional narration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTrack>,

    /// Narration script used for speech synthesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_text: Option<String>,

    /// Overlays in z-order: later entries draw on top.
    #[serde(default)]
    pub overlays: Vec<Overlay>,
}

impl Clip {
    /// A new clip for `asset_id` with the default duration.
    pub fn for_asset(asset_id: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            asset_id: asset_id.into(),
            duration: DEFAULT_CLIP_DURATION_SECS,
            audio: None,
            tts_text: None,
            overlays: Vec::new(),
        }
    }

    pub fn overlay(&self, overlay_id: &str) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == overlay_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> MediaBytes {
        MediaBytes::new("image/png", vec![1, 2, 3])
    }

    #[test]
    fn test_generated_overlay_defaults() {
        let overlay = Overlay::generated(png(), 640, 480);
        assert_eq!((overlay.x, overlay.y), (0.5, 0.5));
        assert_eq!(overlay.scale, 0.25);
        assert_eq!(overlay.rotation, 0.0);
        assert_eq!((overlay.width, overlay.height), (640.0, 480.0));
        assert!(!overlay.id.is_empty());
    }

    #[test]
    fn test_scale_never_negative() {
        let overlay = Overlay::generated(png(), 10, 10);
        assert_eq!(overlay.with_scale(-2.0).scale, 0.0);
        assert_eq!(overlay.with_scale(f64::NAN).scale, 0.0);
        assert_eq!(overlay.with_scale(1.5).scale, 1.5);
    }

    #[test]
    fn test_clip_defaults() {
        let clip = Clip::for_asset("asset-1");
        assert_eq!(clip.duration, DEFAULT_CLIP_DURATION_SECS);
        assert!(clip.overlays.is_empty());
        assert!(clip.audio.is_none());
    }

    #[test]
    fn test_clip_deserializes_without_overlays() {
        let clip: Clip =
            serde_json::from_str(r#"{"id":"c1","assetId":"a1","duration":3.0}"#).unwrap();
        assert_eq!(clip.asset_id, "a1");
        assert!(clip.overlays.is_empty());
        assert!(clip.tts_text.is_none());
    }
}
