//! Render a single frame to PNG.

use std::path::PathBuf;

use slidecut_common::config::AppConfig;
use slidecut_processing_core::{InteractionEffect, OverlayInteraction};
use slidecut_project_model::{parse_pointer_events, CanvasSize};
use slidecut_render_engine::{Canvas, Compositor, FrameStatus};

pub struct FrameOptions {
    pub time: f64,
    pub output: PathBuf,
    pub select_clip: Option<String>,
    pub select_overlay: Option<String>,
    pub events: Option<PathBuf>,
}

pub async fn run(config: &AppConfig, path: PathBuf, options: FrameOptions) -> anyhow::Result<()> {
    let loaded = super::load_manifest(&path)?;
    let (width, height) = super::canvas_size(&loaded, config);
    let mut state = loaded.state;

    state.seek(options.time);
    if let Some(ref clip_id) = options.select_clip {
        if state.timeline.clip(clip_id).is_none() {
            anyhow::bail!("Unknown clip: {clip_id}");
        }
        state.select_clip(Some(clip_id.as_str()));
    }
    state.select_overlay(options.select_overlay.as_deref());

    if let Some(ref events_path) = options.events {
        let content = std::fs::read_to_string(events_path)?;
        let events = parse_pointer_events(&content)?;
        let canvas = CanvasSize::new(width as f64, height as f64);
        let mut interaction = OverlayInteraction::new(config.preview.handle_size);
        let mut updates = 0usize;
        for event in events {
            if let Some(InteractionEffect::Updated(_)) = interaction.handle(&mut state, event, canvas) {
                updates += 1;
            }
        }
        println!(
            "Applied pointer events from {} ({updates} overlay update(s))",
            events_path.display()
        );
    }

    let mut canvas = Canvas::new(width, height)?;
    let mut compositor = Compositor::new();

    // Images decode off-thread; redraw once they land.
    let time = state.playback.time;
    while compositor.render_at(&mut canvas, &state, time, true) == FrameStatus::Pending {
        compositor.wait_for_images().await;
    }

    canvas.save_png(&options.output)?;
    println!(
        "Rendered t={time:.2}s ({width}x{height}) to {}",
        options.output.display()
    );
    Ok(())
}
