//! Check system capabilities.

use slidecut_common::config::AppConfig;
use slidecut_media_sources::{
    print_capability_report, Capability, CommandOverlayGenerator, NarrationSource,
    OverlayGenerator, SpeechSynthesisSource,
};
use slidecut_render_engine::{EncodingBackend, FfmpegBackend};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Slidecut System Check");
    println!("{}", "=".repeat(50));

    let config_path = slidecut_common::config::config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[--] Config: defaults ({} not found)", config_path.display());
    }
    println!(
        "     Preview {}x{} @ {}Hz, export {} @ {}fps",
        config.preview.canvas_width,
        config.preview.canvas_height,
        config.preview.refresh_hz,
        config.export.format,
        config.export.fps
    );

    let ffmpeg = FfmpegBackend::new().is_available();
    let capabilities = vec![
        Capability {
            name: "FFmpeg".to_string(),
            description: "Video encoding and narration mixdown".to_string(),
            available: ffmpeg,
            required: true,
            fix_instructions: (!ffmpeg).then(|| "Install ffmpeg and make sure it is on PATH".to_string()),
        },
        SpeechSynthesisSource::default().capability(),
        CommandOverlayGenerator::new("slidecut-imagegen").capability(),
    ];

    println!();
    print_capability_report(&capabilities);

    let all_required_ok = capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required capabilities are available. Slidecut is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
