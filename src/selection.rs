//! Sub-image selections (`XxYxWIDTHxHEIGHT`).
//!
//! Negative `X`/`Y` are offsets from the right/bottom edge. A selection
//! reaching past the image is clamped to the image bounds.

use std::fmt;
use std::str::FromStr;

use crate::config::parse_int;
use crate::error::{HideError, HideResult};
use crate::pixel::Rect;

/// A requested image region, before it is resolved against real dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Selection {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }

    /// Parse `XxYxWIDTHxHEIGHT`.
    pub fn parse(s: &str) -> HideResult<Self> {
        let invalid = || HideError::InvalidSelection(s.to_string());
        let mut parts = s.split('x');
        let mut next = || -> HideResult<i64> {
            parts.next().and_then(parse_int).ok_or_else(invalid)
        };
        let selection = Self::new(next()?, next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(selection)
    }

    /// Resolve against an image of `width x height`.
    ///
    /// Returns `None` when nothing is left after clamping.
    pub fn resolve(&self, width: u32, height: u32) -> Option<Rect> {
        let (x, w) = clamp_axis(self.x, self.width, width as i64);
        let (y, h) = clamp_axis(self.y, self.height, height as i64);
        let rect = Rect::new(x as u32, y as u32, w as u32, h as u32);
        (!rect.is_empty()).then_some(rect)
    }
}

fn clamp_axis(offset: i64, size: i64, bound: i64) -> (i64, i64) {
    let start = if offset < 0 { bound + offset } else { offset }.clamp(0, bound);
    let size = size.clamp(0, bound - start);
    (start, size)
}

impl FromStr for Selection {
    type Err = HideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}x{}", self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Selection::parse("1x2x3x4").unwrap(), Selection::new(1, 2, 3, 4));
        assert_eq!(Selection::parse("-10x-10x20x20").unwrap(), Selection::new(-10, -10, 20, 20));
        assert!(Selection::parse("1x2x3").is_err());
        assert!(Selection::parse("1x2x3x4x5").is_err());
        assert!(Selection::parse("ax2x3x4").is_err());
        assert_eq!("0x0x8x8".parse::<Selection>().unwrap().to_string(), "0x0x8x8");
    }

    #[test]
    fn test_negative_offsets_clamp_to_bottom_right() {
        let rect = Selection::parse("-10x-10x20x20").unwrap().resolve(100, 100);
        assert_eq!(rect, Some(Rect::new(90, 90, 10, 10)));
    }

    #[test]
    fn test_oversized_selection_is_clamped() {
        let rect = Selection::new(5, 0, 1000, 1000).resolve(40, 30);
        assert_eq!(rect, Some(Rect::new(5, 0, 35, 30)));

        let rect = Selection::new(-500, -500, 10, 10).resolve(40, 30);
        assert_eq!(rect, Some(Rect::new(0, 0, 10, 10)));
    }

    #[test]
    fn test_empty_after_clamping() {
        assert_eq!(Selection::new(100, 0, 10, 10).resolve(100, 100), None);
        assert_eq!(Selection::new(0, 0, 0, 10).resolve(100, 100), None);
        assert_eq!(Selection::new(0, 0, -5, 10).resolve(100, 100), None);
    }
}
