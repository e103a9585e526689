//! Prelude module for common imports.
//!
//! ```ignore
//! use blockhide::prelude::*;
//! ```

// Hashing
pub use crate::hash::{compute_hash, hamming_distance, BlockHash, TargetHashSet};
pub use crate::pixel::{PixelBuffer, Rect};
pub use crate::selection::Selection;

// Configuration
pub use crate::config::{HideConfig, SNIPPET_NAME};

// Document
pub use crate::dom::{Document, InlineStyle, MutationBatch, MutationRecord, NodeId, SelectorList};

// Hiding & coordination
pub use crate::hider::{closest, is_hidden, ElementHider};
pub use crate::race::{RaceRegistry, WinHandle};

// Scanning
pub use crate::scan::{Candidate, ImageHashScanner, ScanReport, SeenSet};
pub use crate::snippet::SnippetContext;
pub use crate::source::{
    DomChangeSource, ImageLoader, ImageSource, MemoryLoader, PendingRecords, ScriptedChanges,
};

#[cfg(feature = "async")]
pub use crate::source::AsyncImageLoader;

#[cfg(feature = "decode")]
pub use crate::source::DecodedImage;

// Error
pub use crate::error::{HideError, HideResult};
