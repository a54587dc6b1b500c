//! Identity-keyed image decode cache.
//!
//! Entries are only ever added, never evicted or replaced, so a frame can
//! hold an `Arc<DecodedImage>` across redraws without coordination. Decodes
//! run on background threads and report back over a channel; the
//! compositor drains finished work with [`ImageCache::pump`] and callers
//! that want to redraw once everything has loaded await
//! [`ImageCache::wait_pending`].

use std::collections::HashMap;
use std::sync::Arc;

use slidecut_common::error::{SlidecutError, SlidecutResult};
use slidecut_project_model::MediaBytes;
use tiny_skia::{IntSize, Pixmap};
use tokio::sync::mpsc;

/// Cache key: the identity of the record the bytes belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageKey {
    Asset(String),
    Overlay(String),
}

/// A decoded image ready to draw.
#[derive(Debug)]
pub struct DecodedImage {
    /// Premultiplied RGBA pixels.
    pub pixmap: Pixmap,
    pub width: u32,
    pub height: u32,
}

/// Load state of a cache entry.
#[derive(Debug, Clone)]
pub enum ImageState {
    Ready(Arc<DecodedImage>),
    Pending,
    Failed,
}

impl ImageState {
    pub fn ready(&self) -> Option<&Arc<DecodedImage>> {
        match self {
            ImageState::Ready(image) => Some(image),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ImageState::Pending)
    }
}

type DecodeResult = (ImageKey, SlidecutResult<DecodedImage>);

/// Memoizing image loader.
pub struct ImageCache {
    entries: HashMap<ImageKey, ImageState>,
    tx: mpsc::UnboundedSender<DecodeResult>,
    rx: mpsc::UnboundedReceiver<DecodeResult>,
    in_flight: usize,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCache {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            entries: HashMap::new(),
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Current state of `key` without starting a load.
    pub fn get(&self, key: &ImageKey) -> Option<&ImageState> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of decodes started but not yet collected.
    pub fn pending(&self) -> usize {
        self.in_flight
    }

    /// Return the cached state for `key`, starting a background decode the
    /// first time the key is seen.
    pub fn request(&mut self, key: ImageKey, bytes: &MediaBytes) -> ImageState {
        if let Some(state) = self.entries.get(&key) {
            return state.clone();
        }

        self.entries.insert(key.clone(), ImageState::Pending);
        self.in_flight += 1;
        let tx = self.tx.clone();
        let bytes = bytes.clone();
        tracing::trace!(key = ?key, len = bytes.len(), "Starting image decode");
        std::thread::spawn(move || {
            let result = decode_image(bytes.as_bytes());
            // The receiver lives as long as the cache; a send error only
            // means the cache was dropped.
            let _ = tx.send((key, result));
        });
        ImageState::Pending
    }

    /// Decode `key` on the calling thread unless it is already ready.
    pub fn load_now(&mut self, key: ImageKey, bytes: &MediaBytes) -> ImageState {
        match self.entries.get(&key) {
            Some(ImageState::Ready(image)) => return ImageState::Ready(Arc::clone(image)),
            Some(ImageState::Failed) => return ImageState::Failed,
            _ => {}
        }
        let state = match decode_image(bytes.as_bytes()) {
            Ok(image) => ImageState::Ready(Arc::new(image)),
            Err(err) => {
                tracing::warn!(key = ?key, error = %err, "Image decode failed");
                ImageState::Failed
            }
        };
        self.entries.insert(key, state.clone());
        state
    }

    /// Collect finished background decodes. Returns how many completed.
    pub fn pump(&mut self) -> usize {
        let mut completed = 0;
        while let Ok((key, result)) = self.rx.try_recv() {
            self.complete(key, result);
            completed += 1;
        }
        completed
    }

    /// Wait for every in-flight decode to finish.
    pub async fn wait_pending(&mut self) {
        while self.in_flight > 0 {
            match self.rx.recv().await {
                Some((key, result)) => self.complete(key, result),
                None => break,
            }
        }
    }

    fn complete(&mut self, key: ImageKey, result: SlidecutResult<DecodedImage>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        // A synchronous load may already have settled this key.
        if !matches!(self.entries.get(&key), Some(ImageState::Pending) | None) {
            return;
        }
        let state = match result {
            Ok(image) => {
                tracing::trace!(key = ?key, width = image.width, height = image.height, "Image decoded");
                ImageState::Ready(Arc::new(image))
            }
            Err(err) => {
                tracing::warn!(key = ?key, error = %err, "Image decode failed");
                ImageState::Failed
            }
        };
        self.entries.insert(key, state);
    }
}

/// Decode encoded image bytes into a premultiplied pixmap.
pub fn decode_image(bytes: &[u8]) -> SlidecutResult<DecodedImage> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| SlidecutError::decode(format!("Failed to decode image: {e}")))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| SlidecutError::decode("Image has zero width or height"))?;

    let mut data = rgba.into_raw();
    premultiply_rgba_in_place(&mut data);
    let pixmap = Pixmap::from_vec(data, size)
        .ok_or_else(|| SlidecutError::decode("Decoded image does not fit a pixmap"))?;

    Ok(DecodedImage {
        pixmap,
        width,
        height,
    })
}

fn premultiply_rgba_in_place(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
}
