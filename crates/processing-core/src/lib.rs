//! Slidecut Processing Core
//!
//! Editor-side logic that sits between pointer/timer input and the editor
//! state:
//! - **Interaction:** Move, resize and rotate overlays with the pointer
//! - **Playback:** Advance the playback cursor in real time for preview
//!
//! Nothing here touches pixels or files. All inputs are events and
//! instants; all outputs are edits to `EditorState`.

pub mod interaction;
pub mod playback;

pub use interaction::{
    CursorHint, DragStart, InteractionEffect, InteractionMode, OverlayInteraction,
    DEFAULT_HANDLE_SIZE,
};
pub use playback::{run_preview, FrameScheduler, IntervalScheduler, PreviewPlayer};
