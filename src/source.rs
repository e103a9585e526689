//! Seams between the scanner and its host.
//!
//! - [`ImageSource`]: a decoded image that can hand out pixel regions
//! - [`ImageLoader`]: resolves an image URL to an [`ImageSource`]
//! - [`DomChangeSource`]: yields batches of mutation records
//!
//! With `async` feature:
//! - `AsyncImageLoader`: loads images without blocking the scan loop
//!
//! With `decode` feature:
//! - `DecodedImage`: an [`ImageSource`] over PNG/JPEG bytes

use std::collections::VecDeque;
use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::dom::{Document, MutationBatch};
use crate::error::{HideError, HideResult};
use crate::pixel::{PixelBuffer, Rect};

// =============================================================================
// Images
// =============================================================================

/// A decoded image.
pub trait ImageSource {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// RGBA pixels of `region`, which lies within [`ImageSource::dimensions`].
    fn decode_to_pixels(&self, region: Rect) -> HideResult<PixelBuffer>;
}

impl ImageSource for PixelBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn decode_to_pixels(&self, region: Rect) -> HideResult<PixelBuffer> {
        Ok(self.crop(region))
    }
}

impl<T: ImageSource + ?Sized> ImageSource for Arc<T> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn decode_to_pixels(&self, region: Rect) -> HideResult<PixelBuffer> {
        (**self).decode_to_pixels(region)
    }
}

/// Resolves image URLs.
///
/// Implementations fetch with CORS enabled so pixel read-back is allowed.
pub trait ImageLoader {
    type Image: ImageSource;

    fn load(&mut self, url: &str) -> HideResult<Self::Image>;
}

/// Non-blocking counterpart of [`ImageLoader`].
#[cfg(feature = "async")]
pub trait AsyncImageLoader {
    type Image: ImageSource;

    fn load(&self, url: &str) -> impl std::future::Future<Output = HideResult<Self::Image>>;
}

// =============================================================================
// MemoryLoader
// =============================================================================

/// Loader backed by an in-memory URL table.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    images: FxHashMap<CompactString, Arc<PixelBuffer>>,
    loads: usize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register decoded pixels under `url`.
    pub fn insert(&mut self, url: &str, pixels: PixelBuffer) {
        self.images.insert(url.into(), Arc::new(pixels));
    }

    /// Builder form of [`MemoryLoader::insert`].
    pub fn with(mut self, url: &str, pixels: PixelBuffer) -> Self {
        self.insert(url, pixels);
        self
    }

    /// Decode `bytes` and register the result under `url`.
    #[cfg(feature = "decode")]
    pub fn insert_encoded(&mut self, url: &str, bytes: &[u8]) -> HideResult<()> {
        let image = DecodedImage::from_bytes(bytes).map_err(|err| match err {
            HideError::ImageLoad { message, .. } => HideError::image_load(url, message),
            other => other,
        })?;
        self.insert(url, image.to_pixels());
        Ok(())
    }

    /// How many loads were attempted.
    pub fn load_count(&self) -> usize {
        self.loads
    }

    fn lookup(&self, url: &str) -> HideResult<Arc<PixelBuffer>> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| HideError::image_load(url, "not found"))
    }
}

impl ImageLoader for MemoryLoader {
    type Image = Arc<PixelBuffer>;

    fn load(&mut self, url: &str) -> HideResult<Self::Image> {
        self.loads += 1;
        self.lookup(url)
    }
}

#[cfg(feature = "async")]
impl AsyncImageLoader for MemoryLoader {
    type Image = Arc<PixelBuffer>;

    async fn load(&self, url: &str) -> HideResult<Self::Image> {
        self.lookup(url)
    }
}

// =============================================================================
// DecodedImage (image crate)
// =============================================================================

/// An [`ImageSource`] over an image decoded by the `image` crate.
#[cfg(feature = "decode")]
#[derive(Debug, Clone)]
pub struct DecodedImage {
    rgba: image::RgbaImage,
}

#[cfg(feature = "decode")]
impl DecodedImage {
    /// Decode PNG or JPEG bytes.
    pub fn from_bytes(bytes: &[u8]) -> HideResult<Self> {
        Ok(Self {
            rgba: image::load_from_memory(bytes)?.to_rgba8(),
        })
    }

    pub fn from_rgba(rgba: image::RgbaImage) -> Self {
        Self { rgba }
    }

    /// Full-image pixel buffer.
    pub fn to_pixels(&self) -> PixelBuffer {
        PixelBuffer::from_fn(self.rgba.width(), self.rgba.height(), |x, y| {
            self.rgba.get_pixel(x, y).0
        })
    }
}

#[cfg(feature = "decode")]
impl ImageSource for DecodedImage {
    fn dimensions(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }

    fn decode_to_pixels(&self, region: Rect) -> HideResult<PixelBuffer> {
        let view = image::imageops::crop_imm(&self.rgba, region.x, region.y, region.width, region.height);
        let sub = view.to_image();
        PixelBuffer::new(sub.width(), sub.height(), sub.into_raw())
    }
}

// =============================================================================
// DOM change sources
// =============================================================================

/// Produces batches of DOM mutations, like a `MutationObserver` callback.
///
/// `None` means nothing more is pending right now; a source may yield
/// again on a later call.
pub trait DomChangeSource {
    fn next_batch(&mut self, doc: &mut Document) -> Option<MutationBatch>;
}

/// Delivers whatever records the document accumulated since the last call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingRecords;

impl DomChangeSource for PendingRecords {
    fn next_batch(&mut self, doc: &mut Document) -> Option<MutationBatch> {
        let records = doc.take_records();
        (!records.is_empty()).then_some(records)
    }
}

type Step = Box<dyn FnOnce(&mut Document)>;

/// A scripted page: every step mutates the document and yields its records.
#[derive(Default)]
pub struct ScriptedChanges {
    steps: VecDeque<Step>,
}

impl ScriptedChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn then(mut self, step: impl FnOnce(&mut Document) + 'static) -> Self {
        self.steps.push_back(Box::new(step));
        self
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl DomChangeSource for ScriptedChanges {
    fn next_batch(&mut self, doc: &mut Document) -> Option<MutationBatch> {
        let step = self.steps.pop_front()?;
        step(doc);
        Some(doc.take_records())
    }
}
