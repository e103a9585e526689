//! Perceptual block hashes.
//!
//! - [`compute_hash`] turns a [`PixelBuffer`] into a [`BlockHash`]
//! - [`hamming_distance`] compares two hex hashes
//! - [`TargetHashSet`] holds the hashes a snippet is looking for
//!
//! # Example
//!
//! ```
//! use blockhide::hash::{compute_hash, hamming_distance};
//! use blockhide::pixel::PixelBuffer;
//!
//! let white = PixelBuffer::solid(16, 16, [255, 255, 255, 255]);
//! let hash = compute_hash(&white, 8).unwrap();
//! assert_eq!(hash.as_str().len(), 16);
//! assert_eq!(hamming_distance(hash.as_str(), hash.as_str()).unwrap(), 0);
//! ```

mod blockhash;
mod distance;

use std::fmt;

use compact_str::CompactString;

pub use blockhash::compute_hash;
pub use distance::{hamming_distance, TargetHashSet};

/// Smallest accepted block count per axis.
pub const MIN_BITS: u32 = 1;
/// Largest accepted block count per axis.
pub const MAX_BITS: u32 = 64;
/// Block count used when a snippet does not specify one.
pub const DEFAULT_BITS: u32 = 8;

// =============================================================================
// BlockHash
// =============================================================================

/// A hex-encoded block-mean-value hash.
///
/// Only hashes produced with the same `bits` value are comparable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockHash {
    bits: u32,
    hex: CompactString,
}

impl BlockHash {
    pub(crate) fn from_parts(bits: u32, hex: CompactString) -> Self {
        Self { bits, hex }
    }

    /// Block count per axis used to produce this hash.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Lowercase hex representation.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Unpack into one bool per block, row-major.
    ///
    /// A trailing partial nibble is expanded to its own width only.
    pub fn to_bits(&self) -> Vec<bool> {
        let total = (self.bits * self.bits) as usize;
        let mut out = Vec::with_capacity(total);
        for (i, c) in self.hex.chars().enumerate() {
            let nibble = c.to_digit(16).unwrap_or(0);
            let width = (total - i * 4).min(4);
            for shift in (0..width).rev() {
                out.push(nibble >> shift & 1 == 1);
            }
        }
        out
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

impl AsRef<str> for BlockHash {
    fn as_ref(&self) -> &str {
        &self.hex
    }
}
