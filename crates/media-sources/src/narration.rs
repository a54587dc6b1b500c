//! Narration tracks attached to clips.
//!
//! Capture itself happens outside the editor (a recorder writing a file, or
//! a speech synthesizer reading the clip's script). The editor only consumes
//! the finished [`AudioTrack`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use slidecut_common::error::{SlidecutError, SlidecutResult};
use slidecut_project_model::asset::mime_from_extension;
use slidecut_project_model::{AudioTrack, EditorState, MediaBytes};

use crate::capability::{program_exists, Capability};

/// How a narration track was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationKind {
    Recorded,
    Synthesized,
}

/// Display name for a narration track on `clip_id`.
pub fn narration_name(kind: NarrationKind, clip_id: &str) -> String {
    match kind {
        NarrationKind::Recorded => format!("Narration {clip_id}"),
        NarrationKind::Synthesized => format!("Narration TTS {clip_id}"),
    }
}

/// What to capture narration for.
#[derive(Debug, Clone)]
pub struct NarrationRequest {
    pub clip_id: String,
    /// Script for speech synthesis.
    pub script: Option<String>,
}

/// A narration producer.
pub trait NarrationSource {
    fn kind(&self) -> NarrationKind;

    /// Checked before every capture; an unavailable source is never used.
    fn capability(&self) -> Capability;

    fn capture(
        &self,
        request: &NarrationRequest,
    ) -> impl Future<Output = SlidecutResult<AudioTrack>> + Send;
}

/// Attach `track` to a clip, replacing any existing narration.
pub fn attach_narration(state: &mut EditorState, clip_id: &str, track: AudioTrack) -> SlidecutResult<()> {
    tracing::info!(clip = clip_id, name = %track.name, bytes = track.data.len(), "Attached narration");
    state.timeline.set_audio(clip_id, Some(track))
}

/// Remove a clip's narration.
pub fn remove_narration(state: &mut EditorState, clip_id: &str) -> SlidecutResult<()> {
    state.timeline.set_audio(clip_id, None)
}

/// Store the narration script on a clip.
pub fn set_script(state: &mut EditorState, clip_id: &str, script: &str) -> SlidecutResult<()> {
    let script = (!script.is_empty()).then(|| script.to_string());
    state.timeline.set_tts_text(clip_id, script)
}

/// Capture narration for a clip with `source` and attach it.
pub async fn record_narration<S: NarrationSource>(
    source: &S,
    state: &mut EditorState,
    clip_id: &str,
) -> SlidecutResult<AudioTrack> {
    let clip = state
        .timeline
        .clip(clip_id)
        .ok_or_else(|| SlidecutError::precondition(format!("Unknown clip: {clip_id}")))?;
    let request = NarrationRequest {
        clip_id: clip.id.clone(),
        script: clip.tts_text.clone(),
    };

    source.capability().ensure_available()?;
    let track = source.capture(&request).await?;
    attach_narration(state, clip_id, track.clone())?;
    Ok(track)
}

/// Imports a narration recorded elsewhere.
#[derive(Debug, Clone)]
pub struct FileNarrationSource {
    path: PathBuf,
}

impl FileNarrationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NarrationSource for FileNarrationSource {
    fn kind(&self) -> NarrationKind {
        NarrationKind::Recorded
    }

    fn capability(&self) -> Capability {
        let available = self.path.is_file();
        Capability {
            name: "Recorded Narration".to_string(),
            description: format!("Audio file {}", self.path.display()),
            available,
            required: false,
            fix_instructions: (!available).then(|| "Record the narration to this path first".to_string()),
        }
    }

    async fn capture(&self, request: &NarrationRequest) -> SlidecutResult<AudioTrack> {
        let mime = mime_from_extension(&self.path);
        if !mime.starts_with("audio/") {
            return Err(SlidecutError::unsupported(format!(
                "{} is not an audio file",
                self.path.display()
            )));
        }
        let bytes = read_audio(&self.path).await?;
        Ok(AudioTrack {
            name: narration_name(self.kind(), &request.clip_id),
            url: self.path.display().to_string(),
            data: MediaBytes::new(mime, bytes),
        })
    }
}

/// Synthesizes narration from the clip script with an `espeak`-compatible
/// program (`-w <file>` writes a WAV).
#[derive(Debug, Clone)]
pub struct SpeechSynthesisSource {
    program: String,
    voice: Option<String>,
}

impl Default for SpeechSynthesisSource {
    fn default() -> Self {
        Self::new("espeak-ng")
    }
}

impl SpeechSynthesisSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

impl NarrationSource for SpeechSynthesisSource {
    fn kind(&self) -> NarrationKind {
        NarrationKind::Synthesized
    }

    fn capability(&self) -> Capability {
        let available = program_exists(&self.program);
        Capability {
            name: "Speech Synthesis".to_string(),
            description: format!("Text-to-speech narration via {}", self.program),
            available,
            required: false,
            fix_instructions: (!available).then(|| format!("Install {}", self.program)),
        }
    }

    async fn capture(&self, request: &NarrationRequest) -> SlidecutResult<AudioTrack> {
        let script = request
            .script
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SlidecutError::precondition("Write a narration script first."))?;

        let scratch = tempfile::Builder::new().prefix("slidecut-tts").tempdir()?;
        let wav = scratch.path().join("narration.wav");

        let mut cmd = tokio::process::Command::new(&self.program);
        if let Some(voice) = &self.voice {
            cmd.arg("-v").arg(voice);
        }
        let output = cmd
            .arg("-w")
            .arg(&wav)
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SlidecutError::unavailable(format!("Failed to start {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SlidecutError::audio(format!(
                "Speech synthesis failed (status {}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let bytes = read_audio(&wav).await?;
        if bytes.is_empty() {
            return Err(SlidecutError::audio("Speech synthesis produced no audio"));
        }
        Ok(AudioTrack {
            name: narration_name(self.kind(), &request.clip_id),
            url: format!("tts:{}", self.program),
            data: MediaBytes::new("audio/wav", bytes),
        })
    }
}

async fn read_audio(path: &Path) -> SlidecutResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => {
            SlidecutError::permission_denied(format!("cannot read {}", path.display()))
        }
        std::io::ErrorKind::NotFound => SlidecutError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => SlidecutError::Io(e),
    })
}
