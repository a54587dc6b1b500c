//! Show composition information.

use std::path::PathBuf;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let loaded = super::load_manifest(&path)?;
    let manifest = &loaded.manifest;
    let state = &loaded.state;

    println!("Composition: {}", manifest.name);
    println!("  Manifest: {}", loaded.path.display());
    println!("  Version: {}", manifest.version);
    match manifest.canvas {
        Some(c) => println!("  Canvas: {}x{}", c.width, c.height),
        None => println!("  Canvas: (configured default)"),
    }
    println!();

    println!("Assets: {}", state.assets.len());
    for asset in state.assets.iter() {
        println!(
            "  {} {} ({}, {} bytes)",
            asset.id,
            asset.name,
            asset.data.mime(),
            asset.data.len()
        );
    }
    println!();

    println!("Timeline:");
    println!("  Clips: {}", state.timeline.len());
    println!("  Duration: {:.2}s", state.total_duration());
    for (index, clip) in state.timeline.clips.iter().enumerate() {
        let start = state.timeline.clip_start(index).unwrap_or_default();
        println!(
            "  [{index}] {} @ {:.2}s for {:.2}s (asset {})",
            clip.id, start, clip.duration, clip.asset_id
        );
        if let Some(ref audio) = clip.audio {
            println!("      Narration: {} ({})", audio.name, audio.data.mime());
        }
        if let Some(ref text) = clip.tts_text {
            println!("      Script: {text}");
        }
        for overlay in &clip.overlays {
            println!(
                "      Overlay {}: center ({:.2}, {:.2}) scale {:.2} rotation {:.1}° size {}x{}",
                overlay.id,
                overlay.x,
                overlay.y,
                overlay.scale,
                overlay.rotation,
                overlay.width,
                overlay.height
            );
        }
    }

    let narrated = state.timeline.audio_schedule().len();
    println!();
    println!("Narration tracks: {narrated}");

    Ok(())
}
