//! Export configuration and job management.
//!
//! Export drives the compositor with a fixed-step clock and streams each
//! frame to an encoder. Narration is mixed first and handed to the encoder
//! as a finished file when it opens.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use slidecut_common::clock::{ClockTick, FixedStepAdvance, FrameRate, PlaybackClock};
use slidecut_common::config::ExportDefaults;
use slidecut_common::error::{SlidecutError, SlidecutResult, EMPTY_TIMELINE_MESSAGE};
use slidecut_project_model::EditorState;

use crate::compositor::{Canvas, Compositor, FrameStatus};
use crate::mixdown::{AudioMixer, MixdownPlan, MixedAudio};

/// Output container and codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// VP9 video with Opus audio.
    #[default]
    Webm,
    /// H.264 video with AAC audio.
    Mp4H264,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Webm => "webm",
            ExportFormat::Mp4H264 => "mp4",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Webm => "webm",
            ExportFormat::Mp4H264 => "mp4-h264",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = SlidecutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webm" => Ok(ExportFormat::Webm),
            "mp4" | "mp4-h264" | "h264" => Ok(ExportFormat::Mp4H264),
            other => Err(SlidecutError::unsupported(format!(
                "Unknown export format: {other}"
            ))),
        }
    }
}

/// Encoder parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub width: u32,
    pub height: u32,
    /// Fixed-step rate; also the encoder input rate.
    pub fps: u32,
    pub format: ExportFormat,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            format: ExportFormat::Webm,
            video_bitrate_kbps: 6000,
            audio_bitrate_kbps: 128,
        }
    }
}

impl ExportConfig {
    /// Build from configured defaults and a canvas size.
    pub fn from_defaults(defaults: &ExportDefaults, width: u32, height: u32) -> SlidecutResult<Self> {
        Ok(Self {
            width,
            height,
            fps: defaults.fps.max(1),
            format: defaults.format.parse()?,
            video_bitrate_kbps: defaults.video_bitrate_kbps,
            audio_bitrate_kbps: defaults.audio_bitrate_kbps,
        })
    }
}

/// An export job ready to be rendered.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Output file path.
    pub output_path: PathBuf,

    /// Export configuration.
    pub config: ExportConfig,
}

impl ExportJob {
    pub fn new(output_path: impl Into<PathBuf>, config: ExportConfig) -> Self {
        Self {
            output_path: output_path.into(),
            config,
        }
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Mixing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Receives rendered frames and produces the output file.
pub trait FrameSink: Send {
    /// Append one tightly packed RGBA frame.
    fn write_frame(&mut self, rgba: &[u8]) -> SlidecutResult<()>;

    /// Flush and finalize the output file.
    fn finish(self: Box<Self>) -> SlidecutResult<()>;
}

/// Trait for encoding backends.
pub trait EncodingBackend {
    /// Backend name.
    fn name(&self) -> &str;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Open a sink for `job`, muxing `audio` when present.
    fn open(&self, job: &ExportJob, audio: Option<&MixedAudio>) -> SlidecutResult<Box<dyn FrameSink>>;
}

/// Render the whole timeline into `job.output_path`.
///
/// The editor is marked as exporting for the duration and the overlay
/// selection is cleared. On success the playback cursor returns to zero; on
/// failure it is restored to where it was. Either way `exporting` is reset
/// and every acquired resource is released before this returns.
pub async fn export_timeline<B, M>(
    state: &mut EditorState,
    job: &ExportJob,
    backend: &B,
    mixer: &M,
    progress: Option<ProgressCallback>,
) -> SlidecutResult<PathBuf>
where
    B: EncodingBackend + ?Sized,
    M: AudioMixer,
{
    if state.timeline.is_empty() {
        return Err(SlidecutError::precondition(EMPTY_TIMELINE_MESSAGE));
    }

    tracing::info!(
        output = %job.output_path.display(),
        format = job.config.format.as_str(),
        fps = job.config.fps,
        clips = state.timeline.len(),
        "Starting export"
    );

    let resume_time = state.playback.time;
    state.pause();
    state.select_overlay(None);
    state.exporting = true;

    let started = Instant::now();
    let result = run_export(state, job, backend, mixer, progress.as_ref()).await;
    state.exporting = false;

    match result {
        Ok(frames) => {
            state.playback.time = 0.0;
            report(progress.as_ref(), 1.0, frames, frames, ExportStage::Complete);
            tracing::info!(
                frames,
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Export finished"
            );
            Ok(job.output_path.clone())
        }
        Err(err) => {
            state.playback.time = resume_time;
            report(progress.as_ref(), 0.0, 0, 0, ExportStage::Failed);
            tracing::error!(error = %err, "Export failed");
            Err(err)
        }
    }
}

async fn run_export<B, M>(
    state: &mut EditorState,
    job: &ExportJob,
    backend: &B,
    mixer: &M,
    progress: Option<&ProgressCallback>,
) -> SlidecutResult<u64>
where
    B: EncodingBackend + ?Sized,
    M: AudioMixer,
{
    let rate = FrameRate::new(job.config.fps);
    let total_secs = state.total_duration();
    let total_frames = rate.frames_for(total_secs);
    report(progress, 0.0, 0, total_frames, ExportStage::Preparing);

    if !backend.is_available() {
        return Err(SlidecutError::export(format!(
            "Encoding backend '{}' is not available",
            backend.name()
        )));
    }
    if let Some(parent) = job.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut canvas = Canvas::new(job.config.width, job.config.height)?;
    let mut compositor = Compositor::new();
    let failed = compositor.preload(&state.timeline, &state.assets);
    if failed > 0 {
        tracing::warn!(failed, "Some images could not be decoded and will be skipped");
    }

    report(progress, 0.0, 0, total_frames, ExportStage::Mixing);
    let plan = MixdownPlan::from_timeline(&state.timeline);
    let audio = mixer.mix(&plan).await?;
    tracing::debug!(
        mixer = mixer.name(),
        tracks = plan.tracks.len(),
        audio = audio.is_some(),
        "Mixdown ready"
    );

    let mut sink = backend.open(job, audio.as_ref())?;
    tracing::info!(backend = backend.name(), total_frames, "Encoder opened");

    let mut clock = PlaybackClock::new(FixedStepAdvance::new(rate), total_secs);
    let mut frames = 0u64;
    while let ClockTick::Running(time) = clock.tick(Instant::now()) {
        state.playback.time = time;
        if compositor.render_at(&mut canvas, state, time, false) == FrameStatus::Pending {
            compositor.wait_for_images().await;
            compositor.render_at(&mut canvas, state, time, false);
        }
        sink.write_frame(canvas.data())?;
        frames += 1;

        let fraction = if total_frames == 0 {
            1.0
        } else {
            frames as f64 / total_frames as f64
        };
        report(progress, fraction.min(1.0), frames, total_frames, ExportStage::Rendering);
    }

    report(progress, 1.0, frames, total_frames, ExportStage::Finalizing);
    sink.finish()?;
    // The mixed audio must outlive the encoder.
    drop(audio);
    Ok(frames)
}

fn report(
    progress: Option<&ProgressCallback>,
    fraction: f64,
    frames_rendered: u64,
    total_frames: u64,
    stage: ExportStage,
) {
    if let Some(cb) = progress {
        cb(ExportProgress {
            progress: fraction,
            frames_rendered,
            total_frames,
            stage,
        });
    }
}

/// Encoder that pipes raw RGBA frames into `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: PathBuf,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl EncodingBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary.to_string_lossy())
    }

    fn open(&self, job: &ExportJob, audio: Option<&MixedAudio>) -> SlidecutResult<Box<dyn FrameSink>> {
        let args = encoder_args(job, audio);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SlidecutError::export(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(pid = child.id(), args_len = args.len(), "ffmpeg process started");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SlidecutError::export("Failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SlidecutError::export("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = std::io::BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        Ok(Box::new(FfmpegSink {
            child,
            stdin: Some(stdin),
            stderr_task: Some(stderr_task),
            frame_len: job.config.width as usize * job.config.height as usize * 4,
        }))
    }
}

struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<std::thread::JoinHandle<String>>,
    frame_len: usize,
}

impl FfmpegSink {
    fn stderr_output(&mut self) -> String {
        self.stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default()
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, rgba: &[u8]) -> SlidecutResult<()> {
        if rgba.len() != self.frame_len {
            return Err(SlidecutError::export(format!(
                "Frame has {} bytes, expected {}",
                rgba.len(),
                self.frame_len
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SlidecutError::export("ffmpeg input already closed"))?;
        if let Err(err) = stdin.write_all(rgba) {
            // ffmpeg exited early; its stderr says why.
            self.stdin = None;
            let _ = self.child.wait();
            let stderr = self.stderr_output();
            return Err(SlidecutError::export(format!(
                "Failed writing frame to ffmpeg: {err}: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> SlidecutResult<()> {
        // Closing stdin signals end of input.
        self.stdin = None;
        let status = self
            .child
            .wait()
            .map_err(|e| SlidecutError::export(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr = self.stderr_output();
        if !status.success() {
            return Err(SlidecutError::export(format!(
                "ffmpeg export failed (status {}): {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            // Dropped without `finish`: abandon the output.
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn encoder_args(job: &ExportJob, audio: Option<&MixedAudio>) -> Vec<String> {
    let config = &job.config;
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-s".to_string(),
        format!("{}x{}", config.width, config.height),
        "-r".to_string(),
        config.fps.to_string(),
        "-i".to_string(),
        "-".to_string(),
    ];
    if let Some(audio) = audio {
        args.push("-i".to_string());
        args.push(audio.path().to_string_lossy().to_string());
        args.extend([
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
        ]);
    }
    args.extend(codec_args_for_config(config, audio.is_some()));
    args.push(job.output_path.to_string_lossy().to_string());
    args
}

fn codec_args_for_config(config: &ExportConfig, with_audio: bool) -> Vec<String> {
    let video_bitrate = format!("{}k", config.video_bitrate_kbps.max(500));
    let audio_bitrate = format!("{}k", config.audio_bitrate_kbps.max(64));

    let mut args = match config.format {
        ExportFormat::Mp4H264 => vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-b:v".to_string(),
            video_bitrate,
            "-movflags".to_string(),
            "+faststart".to_string(),
        ],
        ExportFormat::Webm => vec![
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-b:v".to_string(),
            video_bitrate,
        ],
    };
    if with_audio {
        let codec = match config.format {
            ExportFormat::Mp4H264 => "aac",
            ExportFormat::Webm => "libopus",
        };
        args.extend([
            "-c:a".to_string(),
            codec.to_string(),
            "-b:a".to_string(),
            audio_bitrate,
        ]);
    } else {
        args.push("-an".to_string());
    }
    args
}

/// Whether `binary` can be found on `PATH` (or exists, for a path).
pub fn command_exists(binary: &str) -> bool {
    if binary.contains('/') {
        return std::path::Path::new(binary).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
