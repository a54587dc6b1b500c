//! Canvas-space geometry for overlays.
//!
//! Overlay positions are normalized to the canvas; everything in this module
//! works in canvas pixels with y pointing down, so a positive rotation turns
//! clockwise on screen.

use serde::{Deserialize, Serialize};

use crate::clip::Overlay;

/// A 2D point in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Midpoint between two points.
    pub fn midpoint(a: &Point2D, b: &Point2D) -> Point2D {
        Point2D {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        }
    }

    /// Angle of the vector from `origin` to `self`, in radians (atan2, y-down).
    pub fn angle_from(&self, origin: &Point2D) -> f64 {
        (self.y - origin.y).atan2(self.x - origin.x)
    }
}

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// The four rotated corners of an overlay.
///
/// Order is fixed: top-left, top-right, bottom-right, bottom-left in the
/// overlay's unrotated local frame. Corner 2 anchors the resize handle and
/// the midpoint of corners 0 and 1 anchors the rotate handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad(pub [Point2D; 4]);

impl Quad {
    pub fn corners(&self) -> &[Point2D; 4] {
        &self.0
    }

    /// Resize handle position (rotated bottom-right corner).
    pub fn resize_handle(&self) -> Point2D {
        self.0[2]
    }

    /// Rotate handle position (midpoint of the rotated top edge).
    pub fn rotate_handle(&self) -> Point2D {
        Point2D::midpoint(&self.0[0], &self.0[1])
    }

    /// Average of the corners, which is the overlay center.
    pub fn center(&self) -> Point2D {
        let (sx, sy) = self
            .0
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2D::new(sx / 4.0, sy / 4.0)
    }

    pub fn contains(&self, point: &Point2D) -> bool {
        point_in_polygon(point, &self.0)
    }
}

/// Overlay center in canvas pixels.
pub fn overlay_center_px(overlay: &Overlay, canvas: CanvasSize) -> Point2D {
    Point2D::new(overlay.x * canvas.width, overlay.y * canvas.height)
}

/// Drawn size of an overlay in pixels. A missing natural dimension counts
/// as one pixel so the result stays finite.
pub fn overlay_size_px(overlay: &Overlay) -> (f64, f64) {
    let base = |v: f64| if v.is_finite() && v > 0.0 { v } else { 1.0 };
    let scale = overlay.scale.max(0.0);
    (base(overlay.width) * scale, base(overlay.height) * scale)
}

/// Compute the rotated corners of an overlay in canvas space.
pub fn quad_corners(overlay: &Overlay, canvas: CanvasSize) -> Quad {
    let center = overlay_center_px(overlay, canvas);
    let (w, h) = overlay_size_px(overlay);
    let (sin, cos) = overlay.rotation.to_radians().sin_cos();

    let local = [
        (-w / 2.0, -h / 2.0),
        (w / 2.0, -h / 2.0),
        (w / 2.0, h / 2.0),
        (-w / 2.0, h / 2.0),
    ];

    Quad(local.map(|(lx, ly)| {
        Point2D::new(
            center.x + lx * cos - ly * sin,
            center.y + lx * sin + ly * cos,
        )
    }))
}

/// Ray-casting point-in-polygon test.
///
/// Points exactly on an edge follow the usual half-open crossing rule, so a
/// shared edge belongs to exactly one of two adjacent polygons.
pub fn point_in_polygon(point: &Point2D, polygon: &[Point2D]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let cross_x = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Destination rectangle for an image drawn with contain-fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fit an image into the canvas preserving aspect ratio, centered.
///
/// When the canvas is relatively wider than the image the image fills the
/// height (pillarbox); otherwise it fills the width (letterbox).
pub fn contain_fit(canvas: CanvasSize, image_width: f64, image_height: f64) -> Option<FitRect> {
    if image_width <= 0.0 || image_height <= 0.0 || canvas.width <= 0.0 || canvas.height <= 0.0 {
        return None;
    }
    let canvas_aspect = canvas.width / canvas.height;
    let image_aspect = image_width / image_height;

    Some(if canvas_aspect > image_aspect {
        let height = canvas.height;
        let width = height * image_aspect;
        FitRect {
            x: (canvas.width - width) / 2.0,
            y: 0.0,
            width,
            height,
        }
    } else {
        let width = canvas.width;
        let height = width / image_aspect;
        FitRect {
            x: 0.0,
            y: (canvas.height - height) / 2.0,
            width,
            height,
        }
    })
}
