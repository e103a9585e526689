//! Hamming distance over hex hashes and target hash sets.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::error::{HideError, HideResult};

use super::BlockHash;

/// Popcount of every nibble value.
const ONE_BITS: [u32; 16] = [0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4];

/// Number of differing bits between two hex hashes.
///
/// Fails with [`HideError::LengthMismatch`] if the lengths differ.
/// Characters that are not hex digits count as `0`.
pub fn hamming_distance(a: &str, b: &str) -> HideResult<u32> {
    let (left, right) = (a.chars().count(), b.chars().count());
    if left != right {
        return Err(HideError::LengthMismatch { left, right });
    }
    Ok(a.chars()
        .zip(b.chars())
        .map(|(x, y)| {
            let x = x.to_digit(16).unwrap_or(0);
            let y = y.to_digit(16).unwrap_or(0);
            ONE_BITS[(x ^ y) as usize]
        })
        .sum())
}

// =============================================================================
// TargetHashSet
// =============================================================================

/// Hashes a snippet invocation looks for, plus the accepted distance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHashSet {
    hashes: SmallVec<[CompactString; 4]>,
    max_distance: i64,
}

impl TargetHashSet {
    /// Create from explicit hashes.
    pub fn new<I, S>(hashes: I, max_distance: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        Self {
            hashes: hashes.into_iter().map(Into::into).collect(),
            max_distance,
        }
    }

    /// Parse a comma-separated hash list. Empty entries are dropped.
    pub fn parse(list: &str, max_distance: i64) -> Self {
        Self::new(
            list.split(',').map(str::trim).filter(|s| !s.is_empty()),
            max_distance,
        )
    }

    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.hashes.iter().map(CompactString::as_str)
    }

    pub fn max_distance(&self) -> i64 {
        self.max_distance
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// First target within `max_distance` of `candidate`, with its distance.
    ///
    /// Targets of a different length are skipped.
    pub fn find_match(&self, candidate: &str) -> Option<(&str, u32)> {
        self.hashes.iter().find_map(|target| {
            match hamming_distance(candidate, target) {
                Ok(d) if i64::from(d) <= self.max_distance => Some((target.as_str(), d)),
                Ok(_) => None,
                Err(err) => {
                    log::trace!("skipping target {target}: {err}");
                    None
                }
            }
        })
    }

    /// Whether any target matches `candidate`.
    pub fn matches(&self, candidate: &BlockHash) -> bool {
        self.find_match(candidate.as_str()).is_some()
    }
}
