//! Slidecut CLI — inspect, preview and export slide compositions.
//!
//! Usage:
//!   slidecut info <MANIFEST>        Show composition information
//!   slidecut validate <MANIFEST>    Validate a composition manifest
//!   slidecut frame <MANIFEST>       Render a single frame to PNG
//!   slidecut export <MANIFEST>      Export a composition to video
//!   slidecut check                  Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slidecut_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "slidecut",
    about = "Compose image slides, overlays and narration into video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the standard location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show composition information
    Info {
        /// Path to the manifest (or its directory)
        path: PathBuf,
    },

    /// Validate a composition manifest
    Validate {
        /// Path to the manifest (or its directory)
        path: PathBuf,
    },

    /// Render the frame shown at a point in time
    Frame {
        /// Path to the manifest (or its directory)
        path: PathBuf,

        /// Timeline position (seconds)
        #[arg(short, long, default_value = "0")]
        time: f64,

        /// Output PNG path
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,

        /// Clip to select (draws overlay affordances when combined with --select-overlay)
        #[arg(long)]
        select_clip: Option<String>,

        /// Overlay of the selected clip to select
        #[arg(long, requires = "select_clip")]
        select_overlay: Option<String>,

        /// Pointer events (JSON lines) to apply to the canvas before rendering
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Export a composition to video
    Export {
        /// Path to the manifest (or its directory)
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: webm | mp4-h264
        #[arg(long)]
        format: Option<String>,

        /// Frames per second
        #[arg(long)]
        fps: Option<u32>,

        /// Output width (defaults to the composition canvas)
        #[arg(long)]
        width: Option<u32>,

        /// Output height (defaults to the composition canvas)
        #[arg(long)]
        height: Option<u32>,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    slidecut_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Frame {
            path,
            time,
            output,
            select_clip,
            select_overlay,
            events,
        } => {
            commands::frame::run(
                &config,
                path,
                commands::frame::FrameOptions {
                    time,
                    output,
                    select_clip,
                    select_overlay,
                    events,
                },
            )
            .await
        }
        Commands::Export {
            path,
            output,
            format,
            fps,
            width,
            height,
        } => {
            commands::export::run(
                &config,
                path,
                commands::export::Overrides {
                    output,
                    format,
                    fps,
                    width,
                    height,
                },
            )
            .await
        }
        Commands::Check => commands::check::run(&config),
    }
}
