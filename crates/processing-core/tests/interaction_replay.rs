use std::path::PathBuf;

use proptest::prelude::*;
use slidecut_processing_core::interaction::{InteractionEffect, OverlayInteraction};
use slidecut_project_model::event::{parse_pointer_events, PointerEvent};
use slidecut_project_model::geometry::{quad_corners, CanvasSize};
use slidecut_project_model::{EditorState, MediaAsset, MediaBytes, Overlay};

const CANVAS: CanvasSize = CanvasSize {
    width: 1280.0,
    height: 720.0,
};

fn load_fixture_events() -> Vec<PointerEvent> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("overlay-drag")
        .join("pointer.jsonl");

    let content = std::fs::read_to_string(path).expect("fixture events should be readable");
    parse_pointer_events(&content).expect("fixture events should parse")
}

fn editor_with_overlay(overlay: Overlay) -> (EditorState, String, String) {
    let mut state = EditorState::new();
    let asset = state.add_asset(MediaAsset::image(
        "slide.png",
        MediaBytes::new("image/png", vec![0]),
    ));
    let clip_id = state.add_clip_for_asset(&asset).unwrap();
    let overlay_id = overlay.id.clone();
    state.add_overlay(&clip_id, overlay).unwrap();
    state.select_clip(Some(&clip_id));
    (state, clip_id, overlay_id)
}

fn sample_overlay() -> Overlay {
    Overlay {
        scale: 1.0,
        ..Overlay::generated(MediaBytes::new("image/png", vec![1]), 200, 100)
    }
}

#[test]
fn recorded_drag_session_replays_to_expected_overlay() {
    let events = load_fixture_events();
    let (mut state, clip_id, overlay_id) = editor_with_overlay(sample_overlay());
    let mut machine = OverlayInteraction::default();

    let mut updates = 0;
    for event in events {
        if let Some(InteractionEffect::Updated(_)) = machine.handle(&mut state, event, CANVAS) {
            updates += 1;
        }
    }

    assert_eq!(updates, 4);
    assert!(machine.mode().is_idle());
    let overlay = state
        .timeline
        .clip(&clip_id)
        .and_then(|c| c.overlay(&overlay_id))
        .unwrap();
    assert!((overlay.x - 0.55).abs() < 1e-9);
    assert!((overlay.y - 0.55).abs() < 1e-9);
    assert!((overlay.scale - 2.0).abs() < 1e-9);
    assert!((overlay.rotation - 90.0).abs() < 1e-9);
    assert_eq!(state.selection.overlay_id.as_deref(), Some(overlay_id.as_str()));
}

proptest! {
    #[test]
    fn move_drag_there_and_back_restores_center(
        dx in -500.0f64..500.0,
        dy in -300.0f64..300.0,
    ) {
        let (mut state, clip_id, overlay_id) = editor_with_overlay(sample_overlay());
        let mut machine = OverlayInteraction::default();

        machine.handle(&mut state, PointerEvent::down(640.0, 360.0), CANVAS);
        machine.handle(&mut state, PointerEvent::moved(640.0 + dx, 360.0 + dy), CANVAS);
        machine.handle(&mut state, PointerEvent::moved(640.0, 360.0), CANVAS);
        machine.handle(&mut state, PointerEvent::up(640.0, 360.0), CANVAS);

        let overlay = state.timeline.clip(&clip_id).and_then(|c| c.overlay(&overlay_id)).unwrap();
        prop_assert!((overlay.x - 0.5).abs() < 1e-9);
        prop_assert!((overlay.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn resize_drag_never_produces_negative_scale(
        tx in 0.0f64..1280.0,
        ty in 0.0f64..720.0,
    ) {
        let (mut state, clip_id, overlay_id) = editor_with_overlay(sample_overlay());
        state.select_overlay(Some(&overlay_id));
        let handle = quad_corners(&sample_overlay(), CANVAS).resize_handle();
        let mut machine = OverlayInteraction::default();

        machine.handle(&mut state, PointerEvent::down(handle.x, handle.y), CANVAS);
        machine.handle(&mut state, PointerEvent::moved(tx, ty), CANVAS);

        let overlay = state.timeline.clip(&clip_id).and_then(|c| c.overlay(&overlay_id)).unwrap();
        prop_assert!(overlay.scale >= 0.0);
        prop_assert!(overlay.scale.is_finite());
    }
}
