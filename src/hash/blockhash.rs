//! Block-mean-value hash ("blockhash").
//!
//! The image is split into a `bits x bits` grid. Each block sums the
//! luminance of its pixels, then every block becomes one bit by comparing
//! it against the median of its horizontal band (a quarter of the grid).
//!
//! Two block accumulators exist:
//! - `even_blocks`: dimensions divide evenly, disjoint integer rectangles
//! - `weighted_blocks`: pixels straddling a block boundary are split
//!   between up to four blocks by their fractional overlap
//!
//! Both must produce identical hashes whenever the fast path applies.
//! Hash values are shared with existing filter lists, so the arithmetic
//! mirrors the reference blockhash implementation bit for bit.

use compact_str::CompactString;

use crate::error::{HideError, HideResult};
use crate::pixel::PixelBuffer;

use super::{BlockHash, MAX_BITS, MIN_BITS};

/// Compute the block hash of `pixels` using a `bits x bits` grid.
///
/// Rejects `bits` outside `1..=64` and empty buffers.
pub fn compute_hash(pixels: &PixelBuffer, bits: u32) -> HideResult<BlockHash> {
    if !(MIN_BITS..=MAX_BITS).contains(&bits) {
        return Err(HideError::InvalidBits(bits as i64));
    }
    let (width, height) = (pixels.width(), pixels.height());
    if width == 0 || height == 0 {
        return Err(HideError::EmptySelection { width, height });
    }

    let (blocks, pixels_per_block) = if width % bits == 0 && height % bits == 0 {
        even_blocks(pixels, bits)
    } else {
        weighted_blocks(pixels, bits)
    };

    let flags = blocks_to_bits(&blocks, pixels_per_block);
    Ok(BlockHash::from_parts(bits, bits_to_hex(&flags)))
}

// =============================================================================
// Block accumulation
// =============================================================================

/// Fast path: every block is exactly `(width / bits) x (height / bits)`.
fn even_blocks(pixels: &PixelBuffer, bits: u32) -> (Vec<f64>, f64) {
    let block_w = pixels.width() / bits;
    let block_h = pixels.height() / bits;
    let mut blocks = Vec::with_capacity((bits * bits) as usize);

    for by in 0..bits {
        for bx in 0..bits {
            let mut total: u64 = 0;
            for iy in 0..block_h {
                for ix in 0..block_w {
                    total += pixels.luminance(bx * block_w + ix, by * block_h + iy) as u64;
                }
            }
            blocks.push(total as f64);
        }
    }

    (blocks, (block_w * block_h) as f64)
}

/// Contribution of one pixel row or column to the grid along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisWeight {
    first: usize,
    second: usize,
    first_weight: f64,
    second_weight: f64,
}

impl AxisWeight {
    fn compute(pos: u32, len: u32, block_size: f64, even: bool, last: usize) -> Self {
        let p = pos as f64;
        if even {
            let block = ((p / block_size).floor() as usize).min(last);
            return Self {
                first: block,
                second: block,
                first_weight: 1.0,
                second_weight: 0.0,
            };
        }

        let modulo = (p + 1.0) % block_size;
        let frac = modulo - modulo.floor();
        let whole = modulo - frac;
        let first = ((p / block_size).floor() as usize).min(last);
        let second = if whole > 0.0 || pos + 1 == len {
            first
        } else {
            ((p / block_size).ceil() as usize).min(last)
        };

        Self {
            first,
            second,
            first_weight: 1.0 - frac,
            second_weight: frac,
        }
    }
}

/// Weighted path for dimensions that are not multiples of `bits`.
fn weighted_blocks(pixels: &PixelBuffer, bits: u32) -> (Vec<f64>, f64) {
    let even_x = pixels.width() % bits == 0;
    let even_y = pixels.height() % bits == 0;
    weighted_blocks_with(pixels, bits, even_x, even_y)
}

/// `even_x`/`even_y` select integer indexing per axis.
fn weighted_blocks_with(pixels: &PixelBuffer, bits: u32, even_x: bool, even_y: bool) -> (Vec<f64>, f64) {
    let (width, height) = (pixels.width(), pixels.height());
    let grid = bits as usize;
    let last = grid - 1;
    let block_w = width as f64 / bits as f64;
    let block_h = height as f64 / bits as f64;

    let columns: Vec<AxisWeight> = (0..width)
        .map(|x| AxisWeight::compute(x, width, block_w, even_x, last))
        .collect();

    let mut blocks = vec![0.0_f64; grid * grid];
    for y in 0..height {
        let row = AxisWeight::compute(y, height, block_h, even_y, last);
        for (x, col) in columns.iter().enumerate() {
            let value = pixels.luminance(x as u32, y) as f64;
            blocks[row.first * grid + col.first] += value * row.first_weight * col.first_weight;
            blocks[row.first * grid + col.second] += value * row.first_weight * col.second_weight;
            blocks[row.second * grid + col.first] += value * row.second_weight * col.first_weight;
            blocks[row.second * grid + col.second] += value * row.second_weight * col.second_weight;
        }
    }

    (blocks, block_w * block_h)
}

// =============================================================================
// Thresholding & encoding
// =============================================================================

/// Threshold each block against the median of its horizontal band.
///
/// A block equal to its band median (within one unit) is set only when the
/// median is brighter than half the block maximum.
fn blocks_to_bits(blocks: &[f64], pixels_per_block: f64) -> Vec<bool> {
    let half_block_value = pixels_per_block * 256.0 * 3.0 / 2.0;
    let n = blocks.len();
    let mut out = Vec::with_capacity(n);

    for band in 0..4 {
        let start = band * n / 4;
        let end = (band + 1) * n / 4;
        let slice = &blocks[start..end];
        if slice.is_empty() {
            continue;
        }
        let m = median(slice);
        out.extend(
            slice
                .iter()
                .map(|&v| v > m || ((v - m).abs() < 1.0 && m > half_block_value)),
        );
    }
    out
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let len = sorted.len();
    if len % 2 == 0 {
        (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
    } else {
        sorted[len / 2]
    }
}

/// Pack bits into lowercase hex, most significant bit first per nibble.
fn bits_to_hex(bits: &[bool]) -> CompactString {
    bits.chunks(4)
        .map(|nibble| {
            let value = nibble.iter().fold(0u32, |acc, &b| acc << 1 | b as u32);
            char::from_digit(value, 16).unwrap_or('0')
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            let v = ((x * 37 + y * 91 + x * y * 13) % 251) as u8;
            let a = if (x + y) % 11 == 0 { 0 } else { 255 };
            [v, v.wrapping_mul(3), 255 - v, a]
        })
    }

    fn hash_with(pixels: &PixelBuffer, bits: u32, even: bool) -> CompactString {
        let (blocks, ppb) = if even {
            even_blocks(pixels, bits)
        } else {
            weighted_blocks(pixels, bits)
        };
        bits_to_hex(&blocks_to_bits(&blocks, ppb))
    }

    #[test]
    fn test_even_and_weighted_paths_agree() {
        for &(w, h, bits) in &[(64, 64, 8), (32, 16, 4), (48, 48, 16), (20, 40, 2), (64, 64, 64), (9, 9, 1)] {
            let img = pattern(w, h);
            assert_eq!(
                hash_with(&img, bits, true),
                hash_with(&img, bits, false),
                "{w}x{h} bits={bits}"
            );
        }
    }

    #[test]
    fn test_fractional_weights_on_divisible_sizes() {
        // Integer block sizes give weights of exactly 1 and 0
        for bits in 1..=16 {
            let img = pattern(bits * 3, bits * 2);
            let (even, ppb) = even_blocks(&img, bits);
            for (fx, fy) in [(false, false), (false, true), (true, false)] {
                let (weighted, weighted_ppb) = weighted_blocks_with(&img, bits, fx, fy);
                assert_eq!(weighted_ppb, ppb);
                assert_eq!(
                    bits_to_hex(&blocks_to_bits(&weighted, weighted_ppb)),
                    bits_to_hex(&blocks_to_bits(&even, ppb)),
                    "bits={bits} fractional x={} y={}",
                    !fx,
                    !fy
                );
            }
        }
    }

    #[test]
    fn test_hash_length() {
        let img = pattern(100, 37);
        assert_eq!(compute_hash(&img, 8).unwrap().as_str().len(), 16);
        assert_eq!(compute_hash(&img, 16).unwrap().as_str().len(), 64);
        assert_eq!(compute_hash(&img, 64).unwrap().as_str().len(), 1024);
    }

    #[test]
    fn test_even_quadrants() {
        // Top-left quadrant black, the rest white
        let img = PixelBuffer::from_fn(4, 4, |x, y| {
            if x < 2 && y < 2 { [0, 0, 0, 255] } else { [255, 255, 255, 255] }
        });
        assert_eq!(compute_hash(&img, 2).unwrap().as_str(), "7");
    }

    #[test]
    fn test_weighted_fractional_blocks() {
        // 3x3 into a 2x2 grid: the middle row and column are split in half
        let img = PixelBuffer::from_fn(3, 3, |x, _| {
            if x == 0 { [0, 0, 0, 255] } else { [255, 255, 255, 255] }
        });
        assert_eq!(compute_hash(&img, 2).unwrap().as_str(), "5");
    }

    #[test]
    fn test_axis_weight_straddling_pixel() {
        let w = AxisWeight::compute(1, 3, 1.5, false, 1);
        assert_eq!((w.first, w.second), (0, 1));
        assert_eq!((w.first_weight, w.second_weight), (0.5, 0.5));

        let last = AxisWeight::compute(2, 3, 1.5, false, 1);
        assert_eq!((last.first, last.second), (1, 1));
    }

    #[test]
    fn test_transparent_hashes_like_white() {
        let clear = PixelBuffer::solid(24, 24, [0, 0, 0, 0]);
        let white = PixelBuffer::solid(24, 24, [255, 255, 255, 255]);
        assert_eq!(compute_hash(&clear, 8).unwrap(), compute_hash(&white, 8).unwrap());

        let clear = PixelBuffer::solid(25, 13, [9, 9, 9, 0]);
        let white = PixelBuffer::solid(25, 13, [255, 255, 255, 255]);
        assert_eq!(compute_hash(&clear, 8).unwrap(), compute_hash(&white, 8).unwrap());
    }

    #[test]
    fn test_median_tie_break() {
        // Bright uniform blocks sit on the median and above half value
        let white = PixelBuffer::solid(64, 64, [255, 255, 255, 255]);
        assert_eq!(compute_hash(&white, 8).unwrap().as_str(), "ffffffffffffffff");

        let black = PixelBuffer::solid(64, 64, [0, 0, 0, 255]);
        assert_eq!(compute_hash(&black, 8).unwrap().as_str(), "0000000000000000");
    }

    #[test]
    fn test_near_uniform_gray_is_not_degenerate() {
        let img = PixelBuffer::from_fn(64, 64, |x, _| {
            if x < 32 { [128, 128, 128, 255] } else { [129, 128, 128, 255] }
        });
        let hash = compute_hash(&img, 8).unwrap();
        assert_eq!(hash.as_str().len(), 16);
        let bits = hash.to_bits();
        assert!(bits.iter().any(|&b| b));
        assert!(bits.iter().any(|&b| !b));
        assert_eq!(hash.as_str(), "0f0f0f0f0f0f0f0f");
    }

    #[test]
    fn test_rejects_invalid_input() {
        let img = pattern(8, 8);
        assert!(matches!(compute_hash(&img, 0), Err(HideError::InvalidBits(0))));
        assert!(matches!(compute_hash(&img, 65), Err(HideError::InvalidBits(65))));

        let empty = PixelBuffer::solid(0, 10, [0, 0, 0, 255]);
        assert!(matches!(
            compute_hash(&empty, 8),
            Err(HideError::EmptySelection { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }
}
