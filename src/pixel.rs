//! RGBA pixel snapshots.

use crate::error::{HideError, HideResult};

/// Luminance value used for fully transparent pixels (as if opaque white).
pub const TRANSPARENT_LUMINANCE: u32 = 765;

// =============================================================================
// Rect
// =============================================================================

/// A rectangular region in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Full-image rectangle.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether the rectangle covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

// =============================================================================
// PixelBuffer
// =============================================================================

/// Immutable RGBA snapshot of an image region.
///
/// Row-major, 4 bytes per pixel, alpha at offset 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes.
    ///
    /// Fails if `data.len() != width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> HideResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(HideError::BufferSize {
                expected,
                found: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Buffer filled with a single RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let len = width as usize * height as usize;
        let mut data = Vec::with_capacity(len * 4);
        for _ in 0..len {
            data.extend_from_slice(&rgba);
        }
        Self { width, height, data }
    }

    /// Buffer whose pixels are produced by `f(x, y)`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self { width, height, data }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGBA value at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// `R + G + B` of a pixel, or [`TRANSPARENT_LUMINANCE`] when alpha is zero.
    #[inline]
    pub fn luminance(&self, x: u32, y: u32) -> u32 {
        let [r, g, b, a] = self.pixel(x, y);
        if a == 0 {
            TRANSPARENT_LUMINANCE
        } else {
            r as u32 + g as u32 + b as u32
        }
    }

    /// Copy a sub-region into a new buffer.
    ///
    /// The region is clamped to the buffer bounds.
    pub fn crop(&self, region: Rect) -> Self {
        let x0 = region.x.min(self.width);
        let y0 = region.y.min(self.height);
        let width = region.width.min(self.width - x0);
        let height = region.height.min(self.height - y0);
        let row_bytes = width as usize * 4;

        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for y in y0..y0 + height {
            let start = (y as usize * self.width as usize + x0 as usize) * 4;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Self { width, height, data }
    }
}
