//! Export a composition to video.

use std::path::PathBuf;

use slidecut_common::config::AppConfig;
use slidecut_render_engine::{
    export_timeline, ExportConfig, ExportJob, ExportProgress, FfmpegBackend, FfmpegMixer,
    ProgressCallback,
};

/// Command-line overrides of the configured export defaults.
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub fps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

pub async fn run(config: &AppConfig, path: PathBuf, overrides: Overrides) -> anyhow::Result<()> {
    println!("Exporting composition at: {}", path.display());

    let loaded = super::load_manifest(&path)?;
    let (canvas_width, canvas_height) = super::canvas_size(&loaded, config);

    let mut defaults = config.export.clone();
    if let Some(format) = overrides.format {
        defaults.format = format;
    }
    if let Some(fps) = overrides.fps {
        defaults.fps = fps;
    }
    let export_config = ExportConfig::from_defaults(
        &defaults,
        overrides.width.unwrap_or(canvas_width),
        overrides.height.unwrap_or(canvas_height),
    )?;

    let output_path = overrides.output.unwrap_or_else(|| {
        loaded
            .root()
            .join("exports")
            .join(&defaults.file_name)
            .with_extension(export_config.format.extension())
    });

    println!("  Output: {}", output_path.display());
    println!("  Format: {}", export_config.format.as_str());
    println!(
        "  Resolution: {}x{} @ {}fps",
        export_config.width, export_config.height, export_config.fps
    );

    let job = ExportJob::new(output_path.clone(), export_config);
    let backend = FfmpegBackend::new();
    let mixer = FfmpegMixer::new(defaults.audio_sample_rate);
    let mut state = loaded.state;

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, {:?})  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.stage,
        );
    });

    match export_timeline(&mut state, &job, &backend, &mixer, Some(progress_cb)).await {
        Ok(path) => {
            println!("\nExport complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Export failed");
            println!("\n{}", e.user_message());
            Err(anyhow::anyhow!("export failed"))
        }
    }
}
