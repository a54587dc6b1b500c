//! Frame compositor: draws one clip at one instant onto a canvas.
//!
//! A frame is a pure function of `(clip, assets, selection, interactive)`
//! plus whatever the image cache has decoded so far. Rendering the same
//! inputs twice yields identical pixels.

use std::path::Path;

use slidecut_common::error::{SlidecutError, SlidecutResult};
use slidecut_project_model::geometry::{contain_fit, overlay_center_px, quad_corners, CanvasSize};
use slidecut_project_model::{AssetLookup, Clip, EditorState, Overlay, Selection, Timeline};
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect,
    Stroke, Transform,
};

use crate::image_cache::{DecodedImage, ImageCache, ImageKey, ImageState};

/// Side of the square resize handle and diameter of the rotate handle.
pub const HANDLE_SIZE: f32 = 10.0;

/// Stroke width of the selection outline.
pub const SELECTION_STROKE_WIDTH: f32 = 2.0;

/// Selection affordance color (#00FFFF).
pub const SELECTION_COLOR: [u8; 4] = [0, 255, 255, 255];

/// An RGBA drawing surface.
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> SlidecutResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            SlidecutError::render(format!("Invalid canvas size {width}x{height}"))
        })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.width() as f64, self.height() as f64)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Raw pixel bytes. Every composited frame is opaque, so these are plain
    /// RGBA suitable for an encoder.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// RGBA value at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Write the canvas to a PNG file.
    pub fn save_png(&self, path: &Path) -> SlidecutResult<()> {
        let mut rgba = Vec::with_capacity(self.pixmap.data().len());
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        let image = image::RgbaImage::from_raw(self.width(), self.height(), rgba)
            .ok_or_else(|| SlidecutError::render("Canvas buffer size mismatch"))?;
        image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| SlidecutError::render(format!("Failed to write {}: {e}", path.display())))
    }
}

/// Whether a frame is final or still waiting on image decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Complete,
    /// Some image was still decoding and was left out. Redraw after
    /// [`Compositor::wait_for_images`].
    Pending,
}

/// Draws frames, owning the image cache.
#[derive(Default)]
pub struct Compositor {
    cache: ImageCache,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Wait until every image requested so far has decoded.
    pub async fn wait_for_images(&mut self) {
        self.cache.wait_pending().await;
    }

    /// Decode every image the timeline references, on the calling thread.
    /// Returns how many failed to decode.
    pub fn preload(&mut self, timeline: &Timeline, assets: &dyn AssetLookup) -> usize {
        let mut failed = 0;
        for clip in &timeline.clips {
            if let Some(asset) = assets.asset(&clip.asset_id) {
                let key = ImageKey::Asset(asset.id.clone());
                if matches!(self.cache.load_now(key, &asset.data), ImageState::Failed) {
                    failed += 1;
                }
            }
            for overlay in &clip.overlays {
                let key = ImageKey::Overlay(overlay.id.clone());
                if matches!(self.cache.load_now(key, &overlay.data), ImageState::Failed) {
                    failed += 1;
                }
            }
        }
        failed
    }

    /// Render the clip active at `time`.
    ///
    /// Selection affordances are only drawn when `interactive` is set and
    /// the editor is neither playing nor exporting.
    pub fn render_at(
        &mut self,
        canvas: &mut Canvas,
        state: &EditorState,
        time: f64,
        interactive: bool,
    ) -> FrameStatus {
        let clip = state.timeline.active_clip(time);
        let interactive = interactive && !state.playback.playing && !state.exporting;
        self.render_frame(canvas, clip, &state.assets, &state.selection, interactive)
    }

    /// Render a single frame.
    pub fn render_frame(
        &mut self,
        canvas: &mut Canvas,
        clip: Option<&Clip>,
        assets: &dyn AssetLookup,
        selection: &Selection,
        interactive: bool,
    ) -> FrameStatus {
        self.cache.pump();
        canvas.pixmap.fill(Color::BLACK);

        let Some(clip) = clip else {
            return FrameStatus::Complete;
        };
        let Some(asset) = assets.asset(&clip.asset_id) else {
            tracing::debug!(clip = %clip.id, asset = %clip.asset_id, "Clip references unknown asset");
            return FrameStatus::Complete;
        };

        let base = match self
            .cache
            .request(ImageKey::Asset(asset.id.clone()), &asset.data)
        {
            ImageState::Ready(image) => image,
            ImageState::Pending => {
                // Start overlay decodes alongside the base image.
                for overlay in &clip.overlays {
                    self.cache
                        .request(ImageKey::Overlay(overlay.id.clone()), &overlay.data);
                }
                return FrameStatus::Pending;
            }
            ImageState::Failed => return FrameStatus::Complete,
        };

        let size = canvas.size();
        draw_contained(&mut canvas.pixmap, &base, size);

        let mut status = FrameStatus::Complete;
        for overlay in &clip.overlays {
            match self
                .cache
                .request(ImageKey::Overlay(overlay.id.clone()), &overlay.data)
            {
                ImageState::Ready(image) => draw_overlay(&mut canvas.pixmap, &image, overlay, size),
                ImageState::Pending => status = FrameStatus::Pending,
                ImageState::Failed => {}
            }
        }

        if interactive {
            if let Some(selected) = selection
                .overlay_in(&clip.id)
                .and_then(|id| clip.overlay(id))
            {
                draw_selection(&mut canvas.pixmap, selected, size);
            }
        }

        status
    }
}

fn pixmap_paint() -> PixmapPaint {
    PixmapPaint {
        opacity: 1.0,
        blend_mode: BlendMode::SourceOver,
        quality: FilterQuality::Bilinear,
    }
}

fn draw_contained(target: &mut Pixmap, image: &DecodedImage, canvas: CanvasSize) {
    let Some(fit) = contain_fit(canvas, image.width as f64, image.height as f64) else {
        return;
    };
    let sx = (fit.width / image.width as f64) as f32;
    let sy = (fit.height / image.height as f64) as f32;
    let transform = Transform::from_row(sx, 0.0, 0.0, sy, fit.x as f32, fit.y as f32);
    target.draw_pixmap(0, 0, image.pixmap.as_ref(), &pixmap_paint(), transform, None);
}

/// Transform mapping image pixels to canvas pixels for an overlay: the
/// image is centered on the overlay center, scaled to its drawn size and
/// rotated clockwise.
pub fn overlay_transform(
    overlay: &Overlay,
    natural_width: u32,
    natural_height: u32,
    canvas: CanvasSize,
) -> Transform {
    let nw = natural_width.max(1) as f64;
    let nh = natural_height.max(1) as f64;
    let base_w = if overlay.width > 0.0 { overlay.width } else { nw };
    let base_h = if overlay.height > 0.0 { overlay.height } else { nh };
    let scale = overlay.scale.max(0.0);
    let sx = base_w * scale / nw;
    let sy = base_h * scale / nh;

    let (sin, cos) = overlay.rotation.to_radians().sin_cos();
    let a = cos * sx;
    let b = sin * sx;
    let c = -sin * sy;
    let d = cos * sy;

    let center = overlay_center_px(overlay, canvas);
    let tx = center.x - (a * nw / 2.0 + c * nh / 2.0);
    let ty = center.y - (b * nw / 2.0 + d * nh / 2.0);

    Transform::from_row(
        a as f32, b as f32, c as f32, d as f32, tx as f32, ty as f32,
    )
}

fn draw_overlay(target: &mut Pixmap, image: &DecodedImage, overlay: &Overlay, canvas: CanvasSize) {
    if overlay.scale <= 0.0 {
        return;
    }
    let transform = overlay_transform(overlay, image.width, image.height, canvas);
    target.draw_pixmap(0, 0, image.pixmap.as_ref(), &pixmap_paint(), transform, None);
}

fn draw_selection(target: &mut Pixmap, overlay: &Overlay, canvas: CanvasSize) {
    let quad = quad_corners(overlay, canvas);
    let corners = quad.corners();

    let mut paint = Paint::default();
    let [r, g, b, a] = SELECTION_COLOR;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    let stroke = Stroke {
        width: SELECTION_STROKE_WIDTH,
        ..Stroke::default()
    };

    let mut pb = PathBuilder::new();
    pb.move_to(corners[0].x as f32, corners[0].y as f32);
    for corner in &corners[1..] {
        pb.line_to(corner.x as f32, corner.y as f32);
    }
    pb.close();
    if let Some(path) = pb.finish() {
        target.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    let resize = quad.resize_handle();
    if let Some(rect) = Rect::from_xywh(
        resize.x as f32 - HANDLE_SIZE / 2.0,
        resize.y as f32 - HANDLE_SIZE / 2.0,
        HANDLE_SIZE,
        HANDLE_SIZE,
    ) {
        target.fill_rect(rect, &paint, Transform::identity(), None);
    }

    let center = overlay_center_px(overlay, canvas);
    let rotate = quad.rotate_handle();
    let mut pb = PathBuilder::new();
    pb.move_to(center.x as f32, center.y as f32);
    pb.line_to(rotate.x as f32, rotate.y as f32);
    if let Some(path) = pb.finish() {
        target.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    if let Some(circle) =
        PathBuilder::from_circle(rotate.x as f32, rotate.y as f32, HANDLE_SIZE / 2.0)
    {
        target.fill_path(
            &circle,
            &paint,
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecut_project_model::MediaBytes;
    use tiny_skia::Point;

    const CANVAS: CanvasSize = CanvasSize {
        width: 1280.0,
        height: 720.0,
    };

    fn overlay(width: f64, height: f64, scale: f64, rotation: f64) -> Overlay {
        Overlay {
            scale,
            rotation,
            width,
            height,
            ..Overlay::generated(MediaBytes::new("image/png", vec![0]), 0, 0)
        }
    }

    fn map(t: Transform, x: f32, y: f32) -> (f32, f32) {
        let mut p = [Point::from_xy(x, y)];
        t.map_points(&mut p);
        (p[0].x, p[0].y)
    }

    #[test]
    fn test_overlay_transform_matches_quad_corners() {
        let o = overlay(200.0, 100.0, 0.5, 30.0);
        let t = overlay_transform(&o, 200, 100, CANVAS);
        let quad = quad_corners(&o, CANVAS);
        let image_corners = [(0.0, 0.0), (200.0, 0.0), (200.0, 100.0), (0.0, 100.0)];
        for ((ix, iy), corner) in image_corners.iter().zip(quad.corners()) {
            let (x, y) = map(t, *ix, *iy);
            assert!((x as f64 - corner.x).abs() < 1e-3);
            assert!((y as f64 - corner.y).abs() < 1e-3);
        }
    }

    #[test]
    fn test_overlay_transform_falls_back_to_natural_size() {
        let o = overlay(0.0, 0.0, 1.0, 0.0);
        let t = overlay_transform(&o, 40, 20, CANVAS);
        assert_eq!(map(t, 0.0, 0.0), (620.0, 350.0));
        assert_eq!(map(t, 40.0, 20.0), (660.0, 370.0));
    }

    #[test]
    fn test_canvas_rejects_zero_size() {
        assert!(Canvas::new(0, 10).is_err());
    }
}
