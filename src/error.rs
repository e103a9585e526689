//! Error types for blockhide.
//!
//! Nothing here ever reaches the host page: the snippet entry point turns
//! every error into a silent abort.

use thiserror::Error;

/// Errors that can occur while hashing images or scanning a document.
#[derive(Debug, Error)]
pub enum HideError {
    /// Block count outside of `1..=64`
    #[error("invalid block bits: {0} (expected 1..=64)")]
    InvalidBits(i64),

    /// Pixel region has no area
    #[error("empty selection: {width}x{height}")]
    EmptySelection {
        /// Region width
        width: u32,
        /// Region height
        height: u32,
    },

    /// Pixel data does not match the declared dimensions
    #[error("pixel buffer size mismatch: expected {expected} bytes, found {found}")]
    BufferSize {
        /// `width * height * 4`
        expected: usize,
        /// Actual data length
        found: usize,
    },

    /// Two hashes of different length were compared
    #[error("can't compare hashes with different length: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first hash
        left: usize,
        /// Length of the second hash
        right: usize,
    },

    /// A numeric snippet argument did not parse
    #[error("invalid number for {name}: {value:?}")]
    InvalidNumber {
        /// Argument name
        name: &'static str,
        /// Raw argument value
        value: String,
    },

    /// Selection argument is not `XxYxWIDTHxHEIGHT`
    #[error("invalid selection: {0:?}")]
    InvalidSelection(String),

    /// CSS selector did not parse
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        /// Selector source text
        selector: String,
        /// What went wrong
        reason: &'static str,
    },

    /// Image could not be loaded or decoded
    #[error("failed to load image {url}: {message}")]
    ImageLoad {
        /// Image source URL
        url: String,
        /// Loader message
        message: String,
    },

    /// Node id does not belong to the document
    #[error("unknown node #{0}")]
    UnknownNode(u32),

    /// Insertion would make a node its own ancestor
    #[error("can't insert #{child} into #{parent}: would create a cycle")]
    HierarchyRequest {
        /// Target parent
        parent: u32,
        /// Node being inserted
        child: u32,
    },
}

/// Result type alias for blockhide operations.
pub type HideResult<T> = Result<T, HideError>;

impl HideError {
    /// Create an image load error.
    pub fn image_load(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ImageLoad {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an invalid selector error.
    pub fn invalid_selector(selector: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            reason,
        }
    }

    /// Create an invalid number error.
    pub fn invalid_number(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            name,
            value: value.into(),
        }
    }
}

#[cfg(feature = "decode")]
impl From<image::ImageError> for HideError {
    fn from(err: image::ImageError) -> Self {
        Self::image_load("<memory>", err.to_string())
    }
}
