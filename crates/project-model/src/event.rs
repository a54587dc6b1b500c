//! Pointer events delivered to the preview canvas.
//!
//! Coordinates are canvas pixels relative to the canvas origin (top-left),
//! already corrected for any on-screen scaling of the canvas element.

use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

/// A single pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: PointerEventKind,

    /// Canvas X in pixels.
    pub x: f64,

    /// Canvas Y in pixels.
    pub y: f64,
}

/// Pointer event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerEventKind {
    /// Primary button pressed.
    Down,
    /// Pointer moved (button state irrelevant).
    Move,
    /// Primary button released.
    Up,
    /// Pointer left the canvas.
    Leave,
}

impl PointerEvent {
    pub fn down(x: f64, y: f64) -> Self {
        Self {
            kind: PointerEventKind::Down,
            x,
            y,
        }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self {
            kind: PointerEventKind::Move,
            x,
            y,
        }
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self {
            kind: PointerEventKind::Up,
            x,
            y,
        }
    }

    pub fn leave(x: f64, y: f64) -> Self {
        Self {
            kind: PointerEventKind::Leave,
            x,
            y,
        }
    }

    /// Event position as a point.
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Parse a newline-delimited stream of pointer events, skipping blank
/// lines and `#` comments. Used to replay recorded interactions.
pub fn parse_pointer_events(jsonl: &str) -> Result<Vec<PointerEvent>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}
