//! Narration mixdown for export.
//!
//! Every clip's narration starts at the clip's cumulative start offset on
//! a shared output. The mixed track is produced before the video encoder
//! opens, so the encoder only ever sees one finished audio file.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use slidecut_common::error::{SlidecutError, SlidecutResult};
use slidecut_project_model::{MediaBytes, Timeline};
use tempfile::TempDir;

/// Default mix sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// One narration track placed on the export timeline.
#[derive(Debug, Clone)]
pub struct MixdownTrack {
    pub name: String,
    pub start_secs: f64,
    pub data: MediaBytes,
}

/// Everything needed to mix the export's audio.
#[derive(Debug, Clone)]
pub struct MixdownPlan {
    pub tracks: Vec<MixdownTrack>,
    /// Length of the mixed output; narration past the end is cut.
    pub duration_secs: f64,
}

impl MixdownPlan {
    /// Place every clip's narration at the clip start.
    pub fn from_timeline(timeline: &Timeline) -> Self {
        let tracks = timeline
            .audio_schedule()
            .into_iter()
            .map(|(start_secs, track)| MixdownTrack {
                name: track.name.clone(),
                start_secs,
                data: track.data.clone(),
            })
            .collect();
        Self {
            tracks,
            duration_secs: timeline.total_duration(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// A finished mixed audio file.
///
/// When the file lives in a scratch directory the directory is removed when
/// this value is dropped.
#[derive(Debug)]
pub struct MixedAudio {
    path: PathBuf,
    _scratch: Option<TempDir>,
}

impl MixedAudio {
    /// Audio at a caller-managed path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _scratch: None,
        }
    }

    /// Audio inside a scratch directory owned by this value.
    pub fn in_scratch(path: impl Into<PathBuf>, scratch: TempDir) -> Self {
        Self {
            path: path.into(),
            _scratch: Some(scratch),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Produces the mixed narration track for an export.
pub trait AudioMixer {
    fn name(&self) -> &str;

    /// Mix the plan. An empty plan yields `None` (video-only export).
    fn mix(
        &self,
        plan: &MixdownPlan,
    ) -> impl Future<Output = SlidecutResult<Option<MixedAudio>>> + Send;
}

/// Mixer that shells out to `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegMixer {
    binary: PathBuf,
    sample_rate: u32,
}

impl Default for FfmpegMixer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl FfmpegMixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            sample_rate: sample_rate.max(8_000),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn write_inputs(&self, plan: &MixdownPlan, dir: &Path) -> SlidecutResult<Vec<PathBuf>> {
        plan.tracks
            .iter()
            .enumerate()
            .map(|(i, track)| {
                let path = dir.join(format!(
                    "track-{i}.{}",
                    extension_for_mime(track.data.mime())
                ));
                std::fs::write(&path, track.data.as_bytes())?;
                Ok(path)
            })
            .collect()
    }
}

impl AudioMixer for FfmpegMixer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn mix(&self, plan: &MixdownPlan) -> SlidecutResult<Option<MixedAudio>> {
        if plan.is_empty() {
            tracing::debug!("No narration on the timeline, skipping mixdown");
            return Ok(None);
        }

        let scratch = tempfile::Builder::new().prefix("slidecut-mix").tempdir()?;
        let inputs = self.write_inputs(plan, scratch.path())?;
        let output = scratch.path().join("mix.wav");
        let args = mix_args(plan, &inputs, &output, self.sample_rate);

        tracing::info!(tracks = plan.tracks.len(), duration = plan.duration_secs, "Mixing narration");
        tracing::debug!(args = ?args, "Running ffmpeg mixdown");

        let result = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SlidecutError::audio(format!("Failed to start ffmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SlidecutError::audio(format!(
                "ffmpeg mixdown failed (status {}): {}",
                result.status,
                stderr.trim()
            )));
        }

        Ok(Some(MixedAudio::in_scratch(output, scratch)))
    }
}

/// Filter graph delaying each input to its start offset and summing them.
pub fn build_mix_filter(plan: &MixdownPlan) -> String {
    let mut graph = String::new();
    for (i, track) in plan.tracks.iter().enumerate() {
        let delay_ms = (track.start_secs.max(0.0) * 1000.0).round() as u64;
        graph.push_str(&format!("[{i}:a]adelay=delays={delay_ms}:all=1[a{i}];"));
    }
    for i in 0..plan.tracks.len() {
        graph.push_str(&format!("[a{i}]"));
    }
    graph.push_str(&format!(
        "amix=inputs={}:duration=longest:normalize=0[mix]",
        plan.tracks.len()
    ));
    graph
}

fn mix_args(plan: &MixdownPlan, inputs: &[PathBuf], output: &Path, sample_rate: u32) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];
    for input in inputs {
        args.push("-i".to_string());
        args.push(input.to_string_lossy().to_string());
    }
    args.extend([
        "-filter_complex".to_string(),
        build_mix_filter(plan),
        "-map".to_string(),
        "[mix]".to_string(),
        "-t".to_string(),
        format!("{:.3}", plan.duration_secs),
        "-ar".to_string(),
        sample_rate.to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        output.to_string_lossy().to_string(),
    ]);
    args
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/ogg" => "ogg",
        "audio/webm" => "webm",
        "audio/mp4" | "audio/aac" | "audio/x-m4a" => "m4a",
        "audio/flac" => "flac",
        _ => "bin",
    }
}
