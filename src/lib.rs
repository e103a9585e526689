//! blockhide - Perceptual image hashing and element hiding for content-blocking snippets
//!
//! ## Core Concepts
//!
//! **Block hash**: images are reduced to a `bits x bits` grid of luminance
//! sums, then to one bit per block by comparing against band medians.
//! Similar images yield hashes within a small Hamming distance.
//!
//! **Scan loop**: an [`ImageHashScanner`] hashes every image in a document
//! and every image added later, and hides the closest matching ancestor of
//! the first image that matches a target hash.
//!
//! **Race**: duplicate injections of the same filter share a [`WinHandle`];
//! the first match wins and disconnects every instance.
//!
//! ## Modules
//! - `hash`: block hash computation and comparison
//! - `pixel`: RGBA buffers and regions
//! - `selection`: `XxYxWxH` sub-image selections
//! - `config`: snippet argument parsing
//! - `dom`: document model, selectors, inline styles
//! - `hider`: element hiding
//! - `race`: single-winner coordination
//! - `source`: image loading and DOM change seams
//! - `scan`: the mutation-driven scanner
//! - `snippet`: `hide-if-contains-image-hash` entry point
//!
//! ## Usage
//!
//! ```ignore
//! use blockhide::prelude::*;
//!
//! let ctx = SnippetContext::new();
//! let mut scanner = ctx
//!     .hide_if_contains_image_hash(&mut doc, loader, &["a0f3...", ".ad-card", "4"])
//!     .expect("valid arguments");
//!
//! // Feed mutation batches until the race is won
//! scanner.run(&mut doc, &mut PendingRecords);
//! ```

// =============================================================================
// Modules
// =============================================================================

/// Block hash computation and comparison
pub mod hash;

/// RGBA pixel buffers
pub mod pixel;

/// Sub-image selections
pub mod selection;

/// Snippet configuration
pub mod config;

/// Document model
pub mod dom;

/// Element hiding
pub mod hider;

/// Single-winner race coordination
pub mod race;

/// Image and mutation sources
pub mod source;

/// Mutation-driven scanner
pub mod scan;

/// Snippet entry point
pub mod snippet;

/// Error types
pub mod error;

/// Prelude for common imports
pub mod prelude;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{HideConfig, SNIPPET_NAME};
pub use dom::{Document, MutationRecord, NodeId, SelectorList};
pub use error::{HideError, HideResult};
pub use hash::{compute_hash, hamming_distance, BlockHash, TargetHashSet};
pub use hider::ElementHider;
pub use pixel::{PixelBuffer, Rect};
pub use race::{RaceRegistry, WinHandle};
pub use scan::{ImageHashScanner, ScanReport};
pub use selection::Selection;
pub use snippet::SnippetContext;
pub use source::{DomChangeSource, ImageLoader, ImageSource};

#[cfg(feature = "async")]
pub use source::AsyncImageLoader;

#[cfg(feature = "decode")]
pub use source::DecodedImage;
