//! Minimal DOM model consumed by the scanner.
//!
//! - `document`: arena tree with shadow roots and mutation recording
//! - `mutation`: `MutationObserver`-style records
//! - `selector`: CSS selector parsing and matching
//! - `style`: inline `style` attribute handling

mod document;
mod mutation;
mod selector;
mod style;

pub use document::{Attrs, Descendants, Document, ElementData, NodeId, NodeKind};
pub use mutation::{MutationBatch, MutationRecord};
pub use selector::SelectorList;
pub use style::{Declaration, InlineStyle};

pub(crate) use selector::parent_element;
