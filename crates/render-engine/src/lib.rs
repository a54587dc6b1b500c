//! Slidecut Render Engine
//!
//! Turns editor state into pixels and pixels into video files.
//!
//! # Pipeline Architecture
//!
//! ```text
//! timeline ──┐
//!            ├── active clip at t ── Compositor ── Canvas (RGBA)
//! assets ────┘        ▲                               │
//!                     │                               ├── preview
//!        PlaybackClock (wall clock | fixed step)      │
//!                                                     ▼
//! narration ── MixdownPlan ── AudioMixer ──► EncodingBackend (ffmpeg)
//!                                                     │
//!                                                     ▼
//!                                                output.webm
//! ```

pub mod compositor;
pub mod export;
pub mod image_cache;
pub mod mixdown;

pub use compositor::{Canvas, Compositor, FrameStatus};
pub use export::*;
pub use image_cache::{decode_image, DecodedImage, ImageCache, ImageKey, ImageState};
pub use mixdown::{AudioMixer, FfmpegMixer, MixdownPlan, MixdownTrack, MixedAudio};
