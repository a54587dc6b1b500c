//! Editor state shared by the compositor, the interaction state machine,
//! and the playback drivers.
//!
//! All mutation happens on one logical thread; callers pass the state by
//! reference to whichever component handles the current event.

use slidecut_common::error::{SlidecutError, SlidecutResult};

use crate::asset::{AssetRegistry, MediaAsset};
use crate::clip::{Clip, Overlay};
use crate::timeline::Timeline;

/// Playback cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackState {
    /// Current time in seconds, always within `[0, total_duration]`.
    pub time: f64,
    pub playing: bool,
}

/// Current selection. The overlay id is only meaningful for the selected clip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub clip_id: Option<String>,
    pub overlay_id: Option<String>,
}

impl Selection {
    /// The selected overlay id if `clip_id` is the selected clip.
    pub fn overlay_in(&self, clip_id: &str) -> Option<&str> {
        match (&self.clip_id, &self.overlay_id) {
            (Some(selected), Some(overlay)) if selected == clip_id => Some(overlay.as_str()),
            _ => None,
        }
    }
}

/// Complete editor state.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub assets: AssetRegistry,
    pub timeline: Timeline,
    pub playback: PlaybackState,
    pub selection: Selection,
    pub exporting: bool,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeline(assets: AssetRegistry, timeline: Timeline) -> Self {
        Self {
            assets,
            timeline,
            ..Self::default()
        }
    }

    pub fn total_duration(&self) -> f64 {
        self.timeline.total_duration()
    }

    /// Register an imported asset.
    pub fn add_asset(&mut self, asset: MediaAsset) -> String {
        self.assets.add(asset).id.clone()
    }

    /// Append a default-length clip showing `asset_id`.
    pub fn add_clip_for_asset(&mut self, asset_id: &str) -> SlidecutResult<String> {
        if self.assets.get(asset_id).is_none() {
            return Err(SlidecutError::project(format!("Unknown asset: {asset_id}")));
        }
        let clip = Clip::for_asset(asset_id);
        let id = clip.id.clone();
        self.timeline.push_clip(clip)?;
        Ok(id)
    }

    /// Select a clip (or none). Always clears the overlay selection.
    pub fn select_clip(&mut self, clip_id: Option<&str>) {
        self.selection.clip_id = clip_id.map(str::to_string);
        self.selection.overlay_id = None;
    }

    /// Select an overlay of the selected clip (or none).
    pub fn select_overlay(&mut self, overlay_id: Option<&str>) {
        self.selection.overlay_id = overlay_id.map(str::to_string);
    }

    pub fn selected_clip(&self) -> Option<&Clip> {
        self.selection
            .clip_id
            .as_deref()
            .and_then(|id| self.timeline.clip(id))
    }

    pub fn selected_overlay(&self) -> Option<&Overlay> {
        let clip = self.selected_clip()?;
        let overlay_id = self.selection.overlay_in(&clip.id)?;
        clip.overlay(overlay_id)
    }

    /// The clip shown at the current playback time.
    pub fn active_clip(&self) -> Option<&Clip> {
        self.timeline.active_clip(self.playback.time)
    }

    /// Start playback. Does nothing on an empty timeline.
    pub fn play(&mut self) {
        if self.timeline.is_empty() {
            return;
        }
        self.selection.overlay_id = None;
        self.playback.playing = true;
    }

    pub fn pause(&mut self) {
        self.playback.playing = false;
    }

    /// Move the playback cursor, pausing first if playing.
    pub fn seek(&mut self, time: f64) {
        if self.playback.playing {
            self.pause();
        }
        self.playback.time = self.timeline.clamp_time(time);
    }

    /// Append an overlay to a clip.
    pub fn add_overlay(&mut self, clip_id: &str, overlay: Overlay) -> SlidecutResult<()> {
        self.timeline.add_overlay(clip_id, overlay)
    }

    /// Replace an overlay with a full new record.
    pub fn update_overlay(&mut self, clip_id: &str, overlay: Overlay) -> SlidecutResult<()> {
        self.timeline.replace_overlay(clip_id, overlay)
    }

    /// Delete an overlay and clear the overlay selection.
    pub fn delete_overlay(&mut self, clip_id: &str, overlay_id: &str) -> SlidecutResult<bool> {
        let removed = self.timeline.remove_overlay(clip_id, overlay_id)?;
        self.selection.overlay_id = None;
        Ok(removed)
    }
}
