//! Snippet invocation configuration.
//!
//! Filter lists pass every argument as a string; numbers are parsed with
//! `parseInt(s, 10)` semantics (leading digits win, trailing garbage is
//! ignored, no digits at all is an error).

use compact_str::CompactString;

use crate::dom::SelectorList;
use crate::error::{HideError, HideResult};
use crate::hash::{TargetHashSet, DEFAULT_BITS, MAX_BITS, MIN_BITS};
use crate::selection::Selection;

/// Snippet name, also the default race key.
pub const SNIPPET_NAME: &str = "hide-if-contains-image-hash";

/// Parse an integer the way `parseInt(s, 10)` does.
///
/// Returns `None` where JavaScript would produce `NaN`.
pub(crate) fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = digits[..end]
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as i64));
    Some(if negative { -value } else { value })
}

// =============================================================================
// HideConfig
// =============================================================================

/// Everything one `hide-if-contains-image-hash` invocation needs.
#[derive(Debug, Clone)]
pub struct HideConfig {
    /// Hashes to look for and the accepted distance.
    pub targets: TargetHashSet,
    /// Ancestor to hide; `None` hides the image itself.
    pub selector: Option<SelectorList>,
    /// Block count per axis.
    pub bits: u32,
    /// Optional sub-image to hash.
    pub selection: Option<Selection>,
    /// Key shared by duplicate injections of the same filter.
    pub race_key: CompactString,
}

impl HideConfig {
    /// Create a config with default distance (0) and block bits (8).
    pub fn new(targets: TargetHashSet) -> Self {
        Self {
            targets,
            selector: None,
            bits: DEFAULT_BITS,
            selection: None,
            race_key: CompactString::new(SNIPPET_NAME),
        }
    }

    /// Build from raw snippet arguments.
    ///
    /// `None` and empty strings select the defaults.
    pub fn from_args(
        hashes: &str,
        selector: Option<&str>,
        max_distance: Option<&str>,
        block_bits: Option<&str>,
        selection: Option<&str>,
    ) -> HideResult<Self> {
        let max_distance = match non_empty(max_distance) {
            Some(raw) => parse_int(raw).ok_or_else(|| HideError::invalid_number("maxDistance", raw))?,
            None => 0,
        };
        let bits = match non_empty(block_bits) {
            Some(raw) => {
                let bits = parse_int(raw).ok_or_else(|| HideError::invalid_number("blockBits", raw))?;
                if !(MIN_BITS as i64..=MAX_BITS as i64).contains(&bits) {
                    return Err(HideError::InvalidBits(bits));
                }
                bits as u32
            }
            None => DEFAULT_BITS,
        };

        let mut config = Self::new(TargetHashSet::parse(hashes, max_distance)).with_bits(bits);
        if let Some(raw) = non_empty(selector) {
            config = config.with_selector(SelectorList::parse(raw)?);
        }
        if let Some(raw) = non_empty(selection) {
            config = config.with_selection(Selection::parse(raw)?);
        }
        Ok(config)
    }

    pub fn with_selector(mut self, selector: SelectorList) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_bits(mut self, bits: u32) -> Self {
        self.bits = bits;
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Override the race key (defaults to [`SNIPPET_NAME`]).
    pub fn with_race_key(mut self, key: impl Into<CompactString>) -> Self {
        self.race_key = key.into();
        self
    }
}

fn non_empty(arg: Option<&str>) -> Option<&str> {
    arg.filter(|s| !s.is_empty())
}
