//! The ordered clip sequence and playback-time resolution.
//!
//! A clip's extent is the half-open interval
//! `[sum of preceding durations, + own duration)`. Times at or past the end
//! of the sequence resolve to the last clip so the final frame of playback
//! and export still shows content.

use serde::{Deserialize, Serialize};

use slidecut_common::error::{SlidecutError, SlidecutResult};

use crate::clip::{AudioTrack, Clip, Overlay};

/// Ordered sequence of clips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub clips: Vec<Clip>,
}

/// Half-open time interval occupied by a clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipExtent {
    pub start: f64,
    pub end: f64,
}

impl ClipExtent {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clips(clips: Vec<Clip>) -> Self {
        Self { clips }
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Sum of all clip durations.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration).sum()
    }

    /// Clamp a time into `[0, total_duration]`.
    pub fn clamp_time(&self, time: f64) -> f64 {
        if time.is_nan() {
            return 0.0;
        }
        time.clamp(0.0, self.total_duration())
    }

    /// Start offset of the clip at `index`.
    pub fn clip_start(&self, index: usize) -> Option<f64> {
        if index >= self.clips.len() {
            return None;
        }
        Some(self.clips[..index].iter().map(|c| c.duration).sum())
    }

    /// Extent of the clip at `index`.
    pub fn extent(&self, index: usize) -> Option<ClipExtent> {
        let start = self.clip_start(index)?;
        Some(ClipExtent {
            start,
            end: start + self.clips[index].duration,
        })
    }

    /// Index of the clip shown at `time`.
    ///
    /// Returns `None` only for an empty timeline. Times before zero resolve
    /// to the first clip; times at or past the end resolve to the last.
    pub fn active_clip_index(&self, time: f64) -> Option<usize> {
        if self.clips.is_empty() {
            return None;
        }
        let mut accumulated = 0.0;
        for (index, clip) in self.clips.iter().enumerate() {
            if time < accumulated + clip.duration {
                return Some(index);
            }
            accumulated += clip.duration;
        }
        Some(self.clips.len() - 1)
    }

    /// The clip shown at `time`.
    pub fn active_clip(&self, time: f64) -> Option<&Clip> {
        self.active_clip_index(time).map(|i| &self.clips[i])
    }

    pub fn clip(&self, clip_id: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    fn clip_mut(&mut self, clip_id: &str) -> SlidecutResult<&mut Clip> {
        self.clips
            .iter_mut()
            .find(|c| c.id == clip_id)
            .ok_or_else(|| SlidecutError::project(format!("Unknown clip: {clip_id}")))
    }

    /// Append a clip to the end of the sequence.
    pub fn push_clip(&mut self, clip: Clip) -> SlidecutResult<()> {
        validate_duration(clip.duration)?;
        self.clips.push(clip);
        Ok(())
    }

    /// Replace the clip with the same id.
    pub fn replace_clip(&mut self, clip: Clip) -> SlidecutResult<()> {
        validate_duration(clip.duration)?;
        let slot = self.clip_mut(&clip.id)?;
        *slot = clip;
        Ok(())
    }

    pub fn set_duration(&mut self, clip_id: &str, duration: f64) -> SlidecutResult<()> {
        validate_duration(duration)?;
        self.clip_mut(clip_id)?.duration = duration;
        Ok(())
    }

    /// Attach (or replace) the narration of a clip.
    pub fn set_audio(&mut self, clip_id: &str, audio: Option<AudioTrack>) -> SlidecutResult<()> {
        self.clip_mut(clip_id)?.audio = audio;
        Ok(())
    }

    pub fn set_tts_text(&mut self, clip_id: &str, text: Option<String>) -> SlidecutResult<()> {
        self.clip_mut(clip_id)?.tts_text = text;
        Ok(())
    }

    /// Append an overlay on top of the clip's existing overlays.
    pub fn add_overlay(&mut self, clip_id: &str, overlay: Overlay) -> SlidecutResult<()> {
        self.clip_mut(clip_id)?.overlays.push(overlay);
        Ok(())
    }

    /// Replace the overlay with the same id, keeping its z-order.
    pub fn replace_overlay(&mut self, clip_id: &str, overlay: Overlay) -> SlidecutResult<()> {
        let clip = self.clip_mut(clip_id)?;
        let slot = clip
            .overlays
            .iter_mut()
            .find(|o| o.id == overlay.id)
            .ok_or_else(|| SlidecutError::project(format!("Unknown overlay: {}", overlay.id)))?;
        *slot = overlay;
        Ok(())
    }

    /// Remove an overlay by id. Returns whether anything was removed.
    pub fn remove_overlay(&mut self, clip_id: &str, overlay_id: &str) -> SlidecutResult<bool> {
        let clip = self.clip_mut(clip_id)?;
        let before = clip.overlays.len();
        clip.overlays.retain(|o| o.id != overlay_id);
        Ok(clip.overlays.len() != before)
    }

    /// Narration tracks with their timeline start offsets, in order.
    pub fn audio_schedule(&self) -> Vec<(f64, &AudioTrack)> {
        let mut start = 0.0;
        let mut schedule = Vec::new();
        for clip in &self.clips {
            if let Some(audio) = &clip.audio {
                schedule.push((start, audio));
            }
            start += clip.duration;
        }
        schedule
    }
}

fn validate_duration(duration: f64) -> SlidecutResult<()> {
    if duration.is_finite() && duration > 0.0 {
        Ok(())
    } else {
        Err(SlidecutError::precondition(format!(
            "Clip duration must be a positive number of seconds (got {duration})"
        )))
    }
}
