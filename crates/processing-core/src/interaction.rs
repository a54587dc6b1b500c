//! Pointer-driven overlay manipulation.
//!
//! The machine is either idle or in one drag mode. Each drag mode carries
//! the snapshot it needs: the overlay as it was when the drag started and the
//! pointer's start position. Every pointer move recomputes the overlay from
//! that snapshot and applies it immediately as a full replacement, so there
//! is no accumulated error across moves.

use slidecut_project_model::event::{PointerEvent, PointerEventKind};
use slidecut_project_model::geometry::{overlay_center_px, quad_corners, CanvasSize, Point2D};
use slidecut_project_model::{Clip, EditorState, Overlay};

/// Default handle size in pixels (square side, and hit radius).
pub const DEFAULT_HANDLE_SIZE: f64 = 10.0;

/// State captured when a drag begins.
#[derive(Debug, Clone, PartialEq)]
pub struct DragStart {
    /// Clip owning the overlay.
    pub clip_id: String,
    /// Overlay as it was at pointer-down.
    pub overlay: Overlay,
    /// Pointer position at pointer-down.
    pub pointer: Point2D,
}

/// Interaction mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InteractionMode {
    #[default]
    Idle,
    Moving(DragStart),
    Resizing(DragStart),
    Rotating(DragStart),
}

impl InteractionMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionMode::Idle)
    }

    fn drag_start(&self) -> Option<&DragStart> {
        match self {
            InteractionMode::Idle => None,
            InteractionMode::Moving(s)
            | InteractionMode::Resizing(s)
            | InteractionMode::Rotating(s) => Some(s),
        }
    }
}

/// Something the interaction changed in the editor state.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEffect {
    /// Overlay selection changed (`None` clears it).
    Selected(Option<String>),
    /// An overlay was replaced with this record.
    Updated(Overlay),
}

/// Cursor the canvas should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Grab,
    Grabbing,
    Crosshair,
}

/// The overlay interaction state machine.
#[derive(Debug, Clone)]
pub struct OverlayInteraction {
    mode: InteractionMode,
    handle_size: f64,
}

impl Default for OverlayInteraction {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_SIZE)
    }
}

impl OverlayInteraction {
    pub fn new(handle_size: f64) -> Self {
        Self {
            mode: InteractionMode::Idle,
            handle_size,
        }
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn handle_size(&self) -> f64 {
        self.handle_size
    }

    pub fn cursor_hint(&self) -> CursorHint {
        match self.mode {
            InteractionMode::Idle => CursorHint::Grab,
            InteractionMode::Moving(_) => CursorHint::Grabbing,
            InteractionMode::Resizing(_) | InteractionMode::Rotating(_) => CursorHint::Crosshair,
        }
    }

    /// Feed one pointer event. Effects are applied to `state` before being
    /// returned.
    pub fn handle(
        &mut self,
        state: &mut EditorState,
        event: PointerEvent,
        canvas: CanvasSize,
    ) -> Option<InteractionEffect> {
        match event.kind {
            PointerEventKind::Down => self.pointer_down(state, event.position(), canvas),
            PointerEventKind::Move => self.pointer_move(state, event.position(), canvas),
            PointerEventKind::Up | PointerEventKind::Leave => {
                if !self.mode.is_idle() {
                    tracing::trace!(kind = ?event.kind, "Drag ended");
                }
                self.mode = InteractionMode::Idle;
                None
            }
        }
    }

    fn pointer_down(
        &mut self,
        state: &mut EditorState,
        pos: Point2D,
        canvas: CanvasSize,
    ) -> Option<InteractionEffect> {
        if state.playback.playing {
            return None;
        }
        // Only the clip currently on screen can be edited, and only if it is
        // the selected one.
        let clip: Clip = match (state.active_clip(), state.selection.clip_id.as_deref()) {
            (Some(active), Some(selected)) if active.id == selected => active.clone(),
            _ => return None,
        };

        if let Some(selected) = state
            .selection
            .overlay_in(&clip.id)
            .and_then(|id| clip.overlay(id))
        {
            let quad = quad_corners(selected, canvas);
            let start = DragStart {
                clip_id: clip.id.clone(),
                overlay: selected.clone(),
                pointer: pos,
            };
            if pos.distance_to(&quad.resize_handle()) < self.handle_size {
                self.mode = InteractionMode::Resizing(start);
                return None;
            }
            if pos.distance_to(&quad.rotate_handle()) < self.handle_size {
                self.mode = InteractionMode::Rotating(start);
                return None;
            }
        }

        // Topmost overlay first.
        if let Some(hit) = clip
            .overlays
            .iter()
            .rev()
            .find(|o| quad_corners(o, canvas).contains(&pos))
        {
            state.select_overlay(Some(&hit.id));
            self.mode = InteractionMode::Moving(DragStart {
                clip_id: clip.id.clone(),
                overlay: hit.clone(),
                pointer: pos,
            });
            return Some(InteractionEffect::Selected(Some(hit.id.clone())));
        }

        state.select_overlay(None);
        self.mode = InteractionMode::Idle;
        Some(InteractionEffect::Selected(None))
    }

    fn pointer_move(
        &mut self,
        state: &mut EditorState,
        pos: Point2D,
        canvas: CanvasSize,
    ) -> Option<InteractionEffect> {
        let start = self.mode.drag_start()?;
        let updated = match &self.mode {
            InteractionMode::Idle => return None,
            InteractionMode::Moving(s) => moved(s, pos, canvas),
            InteractionMode::Rotating(s) => rotated(s, pos, canvas),
            InteractionMode::Resizing(s) => resized(s, pos, canvas)?,
        };

        if let Err(err) = state.update_overlay(&start.clip_id, updated.clone()) {
            // The overlay vanished mid-drag (deleted elsewhere); stop dragging.
            tracing::warn!(error = %err, "Dropping drag on missing overlay");
            self.mode = InteractionMode::Idle;
            return None;
        }
        Some(InteractionEffect::Updated(updated))
    }
}

/// New center = start center + pointer delta converted to normalized units.
pub fn moved(start: &DragStart, pos: Point2D, canvas: CanvasSize) -> Overlay {
    let dx = pos.x - start.pointer.x;
    let dy = pos.y - start.pointer.y;
    start.overlay.with_center(
        start.overlay.x + dx / canvas.width,
        start.overlay.y + dy / canvas.height,
    )
}

/// New rotation = start rotation + change in pointer angle around the center.
pub fn rotated(start: &DragStart, pos: Point2D, canvas: CanvasSize) -> Overlay {
    let center = overlay_center_px(&start.overlay, canvas);
    let start_angle = start.pointer.angle_from(&center);
    let current_angle = pos.angle_from(&center);
    start
        .overlay
        .with_rotation(start.overlay.rotation + (current_angle - start_angle).to_degrees())
}

/// New scale = start scale × (current distance / start distance) from the
/// center. `None` when the drag started exactly on the center.
pub fn resized(start: &DragStart, pos: Point2D, canvas: CanvasSize) -> Option<Overlay> {
    let center = overlay_center_px(&start.overlay, canvas);
    let start_distance = start.pointer.distance_to(&center);
    if start_distance <= 0.0 {
        return None;
    }
    let factor = pos.distance_to(&center) / start_distance;
    Some(start.overlay.with_scale(start.overlay.scale * factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecut_project_model::{MediaAsset, MediaBytes};

    const CANVAS: CanvasSize = CanvasSize {
        width: 1280.0,
        height: 720.0,
    };

    fn overlay(x: f64, y: f64, scale: f64) -> Overlay {
        Overlay {
            x,
            y,
            scale,
            ..Overlay::generated(MediaBytes::new("image/png", vec![1]), 200, 100)
        }
    }

    fn start(overlay: Overlay, pointer: Point2D) -> DragStart {
        DragStart {
            clip_id: "clip".into(),
            overlay,
            pointer,
        }
    }

    #[test]
    fn test_move_converts_pixels_to_normalized_units() {
        let s = start(overlay(0.5, 0.5, 1.0), Point2D::new(640.0, 360.0));
        let updated = moved(&s, Point2D::new(768.0, 432.0), CANVAS);
        assert!((updated.x - 0.6).abs() < 1e-9);
        assert!((updated.y - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_resize_scales_by_distance_ratio() {
        let s = start(overlay(0.5, 0.5, 1.0), Point2D::new(740.0, 360.0));
        let updated = resized(&s, Point2D::new(790.0, 360.0), CANVAS).unwrap();
        assert!((updated.scale - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_resize_from_center_is_ignored() {
        let s = start(overlay(0.5, 0.5, 1.0), Point2D::new(640.0, 360.0));
        assert!(resized(&s, Point2D::new(700.0, 360.0), CANVAS).is_none());
    }

    #[test]
    fn test_rotate_quarter_turn_clockwise() {
        let s = start(overlay(0.5, 0.5, 1.0), Point2D::new(640.0, 260.0));
        let updated = rotated(&s, Point2D::new(740.0, 360.0), CANVAS);
        assert!((updated.rotation - 90.0).abs() < 1e-9);
    }

    fn editor_with_overlays(overlays: Vec<Overlay>) -> (EditorState, String) {
        let mut state = EditorState::new();
        let asset = state.add_asset(MediaAsset::image(
            "bg.png",
            MediaBytes::new("image/png", vec![0]),
        ));
        let clip_id = state.add_clip_for_asset(&asset).unwrap();
        for o in overlays {
            state.add_overlay(&clip_id, o).unwrap();
        }
        state.select_clip(Some(&clip_id));
        (state, clip_id)
    }

    #[test]
    fn test_topmost_overlay_wins_hit_test() {
        let bottom = overlay(0.5, 0.5, 1.0);
        let top = overlay(0.5, 0.5, 1.0);
        let top_id = top.id.clone();
        let (mut state, _) = editor_with_overlays(vec![bottom, top]);

        let mut machine = OverlayInteraction::default();
        let effect = machine.handle(&mut state, PointerEvent::down(640.0, 360.0), CANVAS);
        assert_eq!(effect, Some(InteractionEffect::Selected(Some(top_id.clone()))));
        assert_eq!(state.selection.overlay_id.as_deref(), Some(top_id.as_str()));
        assert!(matches!(machine.mode(), InteractionMode::Moving(_)));
        assert_eq!(machine.cursor_hint(), CursorHint::Grabbing);
    }

    #[test]
    fn test_background_click_clears_selection() {
        let o = overlay(0.5, 0.5, 1.0);
        let id = o.id.clone();
        let (mut state, _) = editor_with_overlays(vec![o]);
        state.select_overlay(Some(&id));

        let mut machine = OverlayInteraction::default();
        let effect = machine.handle(&mut state, PointerEvent::down(10.0, 10.0), CANVAS);
        assert_eq!(effect, Some(InteractionEffect::Selected(None)));
        assert!(state.selection.overlay_id.is_none());
        assert!(machine.mode().is_idle());
    }

    #[test]
    fn test_ignored_while_playing_or_clip_not_selected() {
        let (mut state, _) = editor_with_overlays(vec![overlay(0.5, 0.5, 1.0)]);
        let mut machine = OverlayInteraction::default();

        state.playback.playing = true;
        assert!(machine
            .handle(&mut state, PointerEvent::down(640.0, 360.0), CANVAS)
            .is_none());

        state.playback.playing = false;
        state.select_clip(None);
        assert!(machine
            .handle(&mut state, PointerEvent::down(640.0, 360.0), CANVAS)
            .is_none());
        assert!(machine.mode().is_idle());
    }

    #[test]
    fn test_leave_returns_to_idle_keeping_updates() {
        let o = overlay(0.5, 0.5, 1.0);
        let id = o.id.clone();
        let (mut state, clip_id) = editor_with_overlays(vec![o]);
        let mut machine = OverlayInteraction::default();

        machine.handle(&mut state, PointerEvent::down(640.0, 360.0), CANVAS);
        machine.handle(&mut state, PointerEvent::moved(768.0, 432.0), CANVAS);
        machine.handle(&mut state, PointerEvent::leave(900.0, 700.0), CANVAS);
        assert!(machine.mode().is_idle());

        // Further moves do nothing once idle.
        assert!(machine
            .handle(&mut state, PointerEvent::moved(0.0, 0.0), CANVAS)
            .is_none());
        let kept = state.timeline.clip(&clip_id).unwrap().overlay(&id).unwrap();
        assert!((kept.x - 0.6).abs() < 1e-9);
    }
}
