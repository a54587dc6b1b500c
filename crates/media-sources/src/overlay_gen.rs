//! AI overlay generation.
//!
//! The image model is an external black box: it receives one prompt and
//! answers with either an image or a definite "no result". Whatever comes
//! back is wrapped into a new overlay at the default placement with its
//! natural pixel size.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use slidecut_common::error::{SlidecutError, SlidecutResult};
use slidecut_project_model::{EditorState, MediaBytes, Overlay};

use crate::capability::{program_exists, Capability};
use crate::ingest::image_dimensions;

/// An image returned by a generator.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: MediaBytes,
}

/// Turns a prompt into an image.
pub trait OverlayGenerator {
    fn name(&self) -> &str;

    fn capability(&self) -> Capability;

    /// Run one generation request. `Ok(None)` means the service answered
    /// but produced no image.
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = SlidecutResult<Option<GeneratedImage>>> + Send;
}

/// Full instruction sent to the image model for a user prompt.
pub fn overlay_prompt(prompt: &str) -> String {
    format!(
        "Generate an image of: \"{prompt}\". The object must have a transparent background. \
         Only output the object itself."
    )
}

/// Append `image` to a clip as a new overlay: centered, quarter scale,
/// upright, sized to the image's natural dimensions.
pub fn add_generated_overlay(
    state: &mut EditorState,
    clip_id: &str,
    image: GeneratedImage,
) -> SlidecutResult<Overlay> {
    let (width, height) = image_dimensions(image.data.as_bytes())?;
    let overlay = Overlay::generated(image.data, width, height);
    state.add_overlay(clip_id, overlay.clone())?;
    tracing::info!(clip = clip_id, overlay = %overlay.id, width, height, "Added generated overlay");
    Ok(overlay)
}

/// Generate an overlay from `prompt` and add it to `clip_id`.
pub async fn generate_overlay<G: OverlayGenerator>(
    generator: &G,
    state: &mut EditorState,
    clip_id: &str,
    prompt: &str,
) -> SlidecutResult<Overlay> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(SlidecutError::precondition("Describe the overlay to generate."));
    }
    if state.timeline.clip(clip_id).is_none() {
        return Err(SlidecutError::precondition(format!("Unknown clip: {clip_id}")));
    }
    generator.capability().ensure_available()?;

    tracing::debug!(generator = generator.name(), prompt, "Requesting overlay");
    let image = generator
        .generate(&overlay_prompt(prompt))
        .await?
        .ok_or_else(|| SlidecutError::unavailable("The generator returned no image for this prompt"))?;

    if image.data.mime() != "image/png" {
        tracing::warn!(
            mime = image.data.mime(),
            "Generated image is not a PNG, transparency may be lost"
        );
    }
    add_generated_overlay(state, clip_id, image)
}

/// Generator backed by an external program.
///
/// The program receives the full prompt as its last argument and writes the
/// encoded image to stdout. Empty output means "no result".
#[derive(Debug, Clone)]
pub struct CommandOverlayGenerator {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandOverlayGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl OverlayGenerator for CommandOverlayGenerator {
    fn name(&self) -> &str {
        "command"
    }

    fn capability(&self) -> Capability {
        let available = program_exists(&self.program.to_string_lossy());
        Capability {
            name: "Overlay Generator".to_string(),
            description: format!("Image generation via {}", self.program.display()),
            available,
            required: false,
            fix_instructions: (!available).then(|| {
                "Point overlay generation at an executable that prints an image for a prompt"
                    .to_string()
            }),
        }
    }

    async fn generate(&self, prompt: &str) -> SlidecutResult<Option<GeneratedImage>> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                SlidecutError::unavailable(format!(
                    "Failed to start {}: {e}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SlidecutError::Other(anyhow::anyhow!(
                "Overlay generator failed (status {}): {}",
                output.status,
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Ok(None);
        }

        let format = image::guess_format(&output.stdout)
            .map_err(|_| SlidecutError::decode("Overlay generator did not return an image"))?;
        Ok(Some(GeneratedImage {
            data: MediaBytes::new(format.to_mime_type(), output.stdout),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use slidecut_project_model::{MediaAsset, DEFAULT_OVERLAY_SCALE};

    struct FixedGenerator {
        image: Option<GeneratedImage>,
    }

    impl OverlayGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        fn capability(&self) -> Capability {
            Capability {
                name: "Fixed".into(),
                description: "Test generator".into(),
                available: true,
                required: false,
                fix_instructions: None,
            }
        }

        async fn generate(&self, prompt: &str) -> SlidecutResult<Option<GeneratedImage>> {
            assert!(prompt.contains("transparent background"));
            Ok(self.image.clone())
        }
    }

    fn png(width: u32, height: u32) -> MediaBytes {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        MediaBytes::new("image/png", out.into_inner())
    }

    fn state_with_clip() -> (EditorState, String) {
        let mut state = EditorState::new();
        let asset = state.add_asset(MediaAsset::image("bg.png", png(4, 4)));
        let clip = state.add_clip_for_asset(&asset).unwrap();
        (state, clip)
    }

    #[test]
    fn test_overlay_prompt_wraps_user_text() {
        assert_eq!(
            overlay_prompt("a red hat"),
            "Generate an image of: \"a red hat\". The object must have a transparent \
             background. Only output the object itself."
        );
    }

    #[tokio::test]
    async fn test_generated_overlay_uses_default_placement() {
        let (mut state, clip) = state_with_clip();
        let generator = FixedGenerator {
            image: Some(GeneratedImage { data: png(120, 80) }),
        };

        let overlay = generate_overlay(&generator, &mut state, &clip, "a red hat")
            .await
            .unwrap();

        assert_eq!((overlay.x, overlay.y), (0.5, 0.5));
        assert_eq!(overlay.scale, DEFAULT_OVERLAY_SCALE);
        assert_eq!(overlay.rotation, 0.0);
        assert_eq!((overlay.width, overlay.height), (120.0, 80.0));
        assert_eq!(state.timeline.clips[0].overlays, vec![overlay]);
    }

    #[tokio::test]
    async fn test_no_result_is_unavailable() {
        let (mut state, clip) = state_with_clip();
        let generator = FixedGenerator { image: None };
        let err = generate_overlay(&generator, &mut state, &clip, "nothing")
            .await
            .unwrap_err();
        assert!(matches!(err, SlidecutError::Unavailable { .. }));
        assert!(state.timeline.clips[0].overlays.is_empty());
    }

    #[tokio::test]
    async fn test_blank_prompt_is_rejected() {
        let (mut state, clip) = state_with_clip();
        let generator = FixedGenerator { image: None };
        let err = generate_overlay(&generator, &mut state, &clip, "   ")
            .await
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_command_generator_empty_output_is_no_result() {
        let generator = CommandOverlayGenerator::new("true");
        assert!(generator.generate("anything").await.unwrap().is_none());
    }
}
