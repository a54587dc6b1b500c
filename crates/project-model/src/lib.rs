//! Slidecut Project Model
//!
//! Defines the core data contracts for Slidecut timelines:
//! - **Assets:** Imported images held in an additive registry
//! - **Clips:** Timed entries with overlays and optional narration
//! - **Timeline:** Clip ordering, extents, and active-clip resolution
//! - **Geometry:** Overlay quads, hit testing, and contain-fit
//! - **State:** Selection and playback cursor shared by all components
//!
//! Overlay positions are normalized to `[0.0, 1.0]` relative to the canvas
//! so the same timeline renders at any output resolution.

pub mod asset;
pub mod clip;
pub mod event;
pub mod geometry;
pub mod project;
pub mod state;
pub mod timeline;

pub use asset::*;
pub use clip::*;
pub use event::*;
pub use geometry::*;
pub use project::*;
pub use state::*;
pub use timeline::*;

/// Generate a fresh random identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
