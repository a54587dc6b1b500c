use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{ImageFormat, Rgba, RgbaImage};
use slidecut_common::error::{
    SlidecutError, SlidecutResult, EMPTY_TIMELINE_MESSAGE, GENERIC_EXPORT_FAILURE_MESSAGE,
};
use slidecut_project_model::{AudioTrack, EditorState, MediaAsset, MediaBytes, Overlay};
use slidecut_render_engine::{
    export_timeline, AudioMixer, EncodingBackend, ExportConfig, ExportJob, ExportProgress,
    ExportStage, FrameSink, MixdownPlan, MixedAudio, ProgressCallback,
};

#[derive(Default)]
struct Recorded {
    opened: AtomicUsize,
    frames: Mutex<Vec<Vec<u8>>>,
    audio_paths: Mutex<Vec<Option<PathBuf>>>,
    finished: AtomicUsize,
}

/// Backend that keeps every frame in memory.
struct MemoryBackend {
    recorded: Arc<Recorded>,
    fail_after: Option<usize>,
    available: bool,
}

impl MemoryBackend {
    fn new() -> Self {
        Self {
            recorded: Arc::default(),
            fail_after: None,
            available: true,
        }
    }
}

struct MemorySink {
    recorded: Arc<Recorded>,
    fail_after: Option<usize>,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, rgba: &[u8]) -> SlidecutResult<()> {
        let mut frames = self.recorded.frames.lock().unwrap();
        if Some(frames.len()) == self.fail_after {
            return Err(SlidecutError::export("encoder crashed"));
        }
        frames.push(rgba.to_vec());
        Ok(())
    }

    fn finish(self: Box<Self>) -> SlidecutResult<()> {
        self.recorded.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl EncodingBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn open(
        &self,
        _job: &ExportJob,
        audio: Option<&MixedAudio>,
    ) -> SlidecutResult<Box<dyn FrameSink>> {
        self.recorded.opened.fetch_add(1, Ordering::SeqCst);
        self.recorded
            .audio_paths
            .lock()
            .unwrap()
            .push(audio.map(|a| a.path().to_path_buf()));
        Ok(Box::new(MemorySink {
            recorded: Arc::clone(&self.recorded),
            fail_after: self.fail_after,
        }))
    }
}

/// Mixer that records the plans it was given.
#[derive(Default)]
struct RecordingMixer {
    plans: Mutex<Vec<Vec<f64>>>,
    fail: bool,
}

impl AudioMixer for RecordingMixer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn mix(&self, plan: &MixdownPlan) -> SlidecutResult<Option<MixedAudio>> {
        self.plans
            .lock()
            .unwrap()
            .push(plan.tracks.iter().map(|t| t.start_secs).collect());
        if self.fail {
            return Err(SlidecutError::audio("cannot decode narration"));
        }
        Ok((!plan.is_empty()).then(|| MixedAudio::at("/virtual/mix.wav")))
    }
}

fn png(color: [u8; 4]) -> MediaBytes {
    let img = RgbaImage::from_pixel(16, 9, Rgba(color));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    MediaBytes::new("image/png", out.into_inner())
}

fn narration(name: &str) -> AudioTrack {
    AudioTrack {
        name: name.into(),
        url: format!("file://{name}.wav"),
        data: MediaBytes::new("audio/wav", vec![0; 8]),
    }
}

/// Two clips, one second each, red then blue.
fn two_clip_state() -> (EditorState, Vec<String>) {
    let mut state = EditorState::new();
    let red = state.add_asset(MediaAsset::image("red.png", png([255, 0, 0, 255])));
    let blue = state.add_asset(MediaAsset::image("blue.png", png([0, 0, 255, 255])));
    let mut ids = Vec::new();
    for asset in [red, blue] {
        let id = state.add_clip_for_asset(&asset).unwrap();
        state.timeline.set_duration(&id, 1.0).unwrap();
        ids.push(id);
    }
    (state, ids)
}

fn job(fps: u32) -> ExportJob {
    ExportJob::new(
        std::env::temp_dir().join("slidecut-test-export.webm"),
        ExportConfig {
            width: 32,
            height: 18,
            fps,
            ..ExportConfig::default()
        },
    )
}

#[tokio::test]
async fn empty_timeline_is_rejected_before_any_resource() {
    let mut state = EditorState::new();
    let backend = MemoryBackend::new();
    let mixer = RecordingMixer::default();

    let err = export_timeline(&mut state, &job(30), &backend, &mixer, None)
        .await
        .unwrap_err();

    assert!(err.is_precondition());
    assert_eq!(err.user_message(), EMPTY_TIMELINE_MESSAGE);
    assert_eq!(backend.recorded.opened.load(Ordering::SeqCst), 0);
    assert!(mixer.plans.lock().unwrap().is_empty());
    assert!(!state.exporting);
}

#[tokio::test]
async fn missing_encoder_reports_generic_failure() {
    let (mut state, _) = two_clip_state();
    state.seek(0.5);
    let backend = MemoryBackend {
        available: false,
        ..MemoryBackend::new()
    };
    let mixer = RecordingMixer::default();

    let err = export_timeline(&mut state, &job(30), &backend, &mixer, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SlidecutError::Export { .. }));
    assert_eq!(err.user_message(), GENERIC_EXPORT_FAILURE_MESSAGE);
    assert_eq!(backend.recorded.opened.load(Ordering::SeqCst), 0);
    assert!(mixer.plans.lock().unwrap().is_empty());
    assert!(!state.exporting);
    assert_eq!(state.playback.time, 0.5);
}

#[tokio::test]
async fn fixed_step_emits_one_frame_per_tick() {
    let (mut state, ids) = two_clip_state();
    let overlay = Overlay::generated(png([0, 255, 0, 255]), 16, 9);
    let overlay_id = overlay.id.clone();
    state.add_overlay(&ids[0], overlay).unwrap();
    state.select_clip(Some(&ids[0]));
    state.select_overlay(Some(&overlay_id));
    state.seek(1.5);

    let backend = MemoryBackend::new();
    let mixer = RecordingMixer::default();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let progress: ProgressCallback =
        Box::new(move |p: ExportProgress| sink.lock().unwrap().push(p.stage));

    let path = export_timeline(&mut state, &job(10), &backend, &mixer, Some(progress))
        .await
        .unwrap();

    assert_eq!(path, job(10).output_path);
    let frames = backend.recorded.frames.lock().unwrap();
    // Frames at 0.0, 0.1, ... 1.9; the tick reaching 2.0 finishes.
    assert_eq!(frames.len(), 20);
    assert!(frames.iter().all(|f| f.len() == 32 * 18 * 4));
    // First frame shows the red slide, last the blue one.
    assert_eq!(&frames[0][..4], &[255, 0, 0, 255]);
    assert_eq!(&frames[19][..4], &[0, 0, 255, 255]);
    assert_eq!(backend.recorded.finished.load(Ordering::SeqCst), 1);

    // Editor returns to a stable state.
    assert!(!state.exporting);
    assert_eq!(state.playback.time, 0.0);
    assert!(state.selection.overlay_id.is_none());

    let stages = stages.lock().unwrap();
    assert_eq!(stages.first(), Some(&ExportStage::Preparing));
    assert_eq!(stages.last(), Some(&ExportStage::Complete));
    assert!(stages.contains(&ExportStage::Mixing));
}

#[tokio::test]
async fn export_frames_never_show_selection() {
    let (mut state, ids) = two_clip_state();
    let overlay = Overlay {
        scale: 1.0,
        ..Overlay::generated(png([0, 255, 0, 255]), 16, 9)
    };
    let overlay_id = overlay.id.clone();
    state.add_overlay(&ids[0], overlay).unwrap();
    state.select_clip(Some(&ids[0]));
    state.select_overlay(Some(&overlay_id));

    let backend = MemoryBackend::new();
    export_timeline(&mut state, &job(5), &backend, &RecordingMixer::default(), None)
        .await
        .unwrap();

    let frames = backend.recorded.frames.lock().unwrap();
    let cyan = [0u8, 255, 255, 255];
    assert!(frames
        .iter()
        .all(|f| f.chunks_exact(4).all(|px| px != cyan)));
}

#[tokio::test]
async fn narration_is_mixed_at_clip_offsets_before_encoding() {
    let (mut state, ids) = two_clip_state();
    state.timeline.set_audio(&ids[1], Some(narration("second"))).unwrap();

    let backend = MemoryBackend::new();
    let mixer = RecordingMixer::default();
    export_timeline(&mut state, &job(10), &backend, &mixer, None)
        .await
        .unwrap();

    assert_eq!(*mixer.plans.lock().unwrap(), vec![vec![1.0]]);
    assert_eq!(
        *backend.recorded.audio_paths.lock().unwrap(),
        vec![Some(PathBuf::from("/virtual/mix.wav"))]
    );
}

#[tokio::test]
async fn no_narration_exports_video_only() {
    let (mut state, _) = two_clip_state();
    let backend = MemoryBackend::new();
    export_timeline(&mut state, &job(10), &backend, &RecordingMixer::default(), None)
        .await
        .unwrap();
    assert_eq!(*backend.recorded.audio_paths.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn mixdown_failure_resets_state_without_opening_encoder() {
    let (mut state, ids) = two_clip_state();
    state.timeline.set_audio(&ids[0], Some(narration("first"))).unwrap();
    state.seek(0.5);

    let backend = MemoryBackend::new();
    let mixer = RecordingMixer {
        fail: true,
        ..RecordingMixer::default()
    };
    let err = export_timeline(&mut state, &job(10), &backend, &mixer, None)
        .await
        .unwrap_err();

    assert!(!err.is_precondition());
    assert_eq!(
        err.user_message(),
        slidecut_common::error::GENERIC_EXPORT_FAILURE_MESSAGE
    );
    assert_eq!(backend.recorded.opened.load(Ordering::SeqCst), 0);
    assert!(!state.exporting);
    assert_eq!(state.playback.time, 0.5);
}

#[tokio::test]
async fn encoder_failure_mid_export_resets_state() {
    let (mut state, _) = two_clip_state();
    let backend = MemoryBackend {
        fail_after: Some(3),
        ..MemoryBackend::new()
    };
    let err = export_timeline(&mut state, &job(10), &backend, &RecordingMixer::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SlidecutError::Export { .. }));
    assert_eq!(backend.recorded.frames.lock().unwrap().len(), 3);
    assert_eq!(backend.recorded.finished.load(Ordering::SeqCst), 0);
    assert!(!state.exporting);
}
