//! Element hiding.
//!
//! Hiding writes `display: none !important` into the element's inline style.
//! Elements that are already hidden that way are left untouched, and the
//! hider re-applies the rule when page script rewrites the `style`
//! attribute of an element it hid.

use rustc_hash::FxHashSet;

use crate::dom::{parent_element, Document, InlineStyle, MutationRecord, NodeId, SelectorList};
use crate::error::{HideError, HideResult};

/// Nearest inclusive ancestor of `node` matching `selector`.
///
/// The walk stops at the shadow root (or document) containing `node`.
pub fn closest(doc: &Document, node: NodeId, selector: &SelectorList) -> Option<NodeId> {
    let mut current = doc.is_element(node).then_some(node);
    while let Some(candidate) = current {
        if selector.matches(doc, candidate) {
            return Some(candidate);
        }
        current = parent_element(doc, candidate);
    }
    None
}

/// Whether `node` carries `display: none !important` inline.
pub fn is_hidden(doc: &Document, node: NodeId) -> bool {
    doc.attr(node, "style")
        .is_some_and(|style| InlineStyle::parse(style).is_hidden())
}

// =============================================================================
// ElementHider
// =============================================================================

/// Hides elements and keeps them hidden.
#[derive(Debug, Default)]
pub struct ElementHider {
    hidden: FxHashSet<NodeId>,
}

impl ElementHider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide `node`. Returns `false` if it was already hidden.
    pub fn hide(&mut self, doc: &mut Document, node: NodeId) -> HideResult<bool> {
        if !doc.is_element(node) {
            return Err(HideError::UnknownNode(node.as_raw()));
        }
        self.hidden.insert(node);
        if is_hidden(doc, node) {
            return Ok(false);
        }
        let mut style = InlineStyle::parse(doc.attr(node, "style").unwrap_or(""));
        style.set("display", "none", true);
        doc.set_attr(node, "style", &style.to_string())?;
        log::debug!("hid element {node}");
        Ok(true)
    }

    /// Re-hide elements whose `style` attribute was changed by `records`.
    ///
    /// Returns how many elements had to be hidden again.
    pub fn enforce(&mut self, doc: &mut Document, records: &[MutationRecord]) -> HideResult<usize> {
        let mut restored = 0;
        for record in records {
            let target = record.target();
            if record.attribute_name() != Some("style") || !self.hidden.contains(&target) {
                continue;
            }
            if self.hide(doc, target)? {
                log::debug!("style of {target} was reset, hiding again");
                restored += 1;
            }
        }
        Ok(restored)
    }

    /// Elements hidden so far.
    pub fn hidden(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.hidden.iter().copied()
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let article = doc.create_element("article");
        let div = doc.create_element("div");
        let img = doc.create_element("img");
        doc.append_child(doc.root(), article).unwrap();
        doc.append_child(article, div).unwrap();
        doc.append_child(div, img).unwrap();
        doc.set_attr(article, "class", "post").unwrap();
        doc.take_records();
        (doc, article, div, img)
    }

    #[test]
    fn test_closest() {
        let (doc, article, _, img) = build();
        let post = SelectorList::parse(".post").unwrap();
        assert_eq!(closest(&doc, img, &post), Some(article));
        let own = SelectorList::parse("img").unwrap();
        assert_eq!(closest(&doc, img, &own), Some(img));
        let none = SelectorList::parse("section").unwrap();
        assert_eq!(closest(&doc, img, &none), None);
    }

    #[test]
    fn test_closest_stops_at_shadow_root() {
        let (mut doc, article, _, _) = build();
        let shadow = doc.attach_shadow(article).unwrap();
        let inner = doc.create_element("img");
        doc.append_child(shadow, inner).unwrap();
        let post = SelectorList::parse("article").unwrap();
        assert_eq!(closest(&doc, inner, &post), None);
    }

    #[test]
    fn test_hide_is_idempotent() {
        let (mut doc, _, div, _) = build();
        doc.set_attr(div, "style", "color: red").unwrap();
        doc.take_records();

        let mut hider = ElementHider::new();
        assert!(hider.hide(&mut doc, div).unwrap());
        assert_eq!(doc.attr(div, "style"), Some("color: red; display: none !important;"));
        assert_eq!(doc.take_records().len(), 1);

        assert!(!hider.hide(&mut doc, div).unwrap());
        assert!(doc.take_records().is_empty());
        assert!(is_hidden(&doc, div));
        assert_eq!(hider.hidden_count(), 1);
    }

    #[test]
    fn test_hide_keeps_other_declarations() {
        let (mut doc, _, div, _) = build();
        doc.set_attr(div, "style", "background: url(data:image/png;base64,AAAA)").unwrap();

        ElementHider::new().hide(&mut doc, div).unwrap();
        assert_eq!(
            doc.attr(div, "style"),
            Some("background: url(data:image/png;base64,AAAA); display: none !important;")
        );
    }

    #[test]
    fn test_enforce_restores_hidden_state() {
        let (mut doc, _, div, img) = build();
        let mut hider = ElementHider::new();
        hider.hide(&mut doc, div).unwrap();
        doc.take_records();

        // Page script tries to reveal the element again
        doc.set_attr(div, "style", "display: block").unwrap();
        doc.set_attr(img, "style", "display: block").unwrap();
        let records = doc.take_records();
        assert_eq!(hider.enforce(&mut doc, &records).unwrap(), 1);
        assert!(is_hidden(&doc, div));
        assert!(!is_hidden(&doc, img));

        // The re-hide itself does not trigger another round
        let records = doc.take_records();
        assert_eq!(hider.enforce(&mut doc, &records).unwrap(), 0);
    }

    #[test]
    fn test_hide_rejects_non_elements() {
        let mut doc = Document::new();
        let root = doc.root();
        assert!(ElementHider::new().hide(&mut doc, root).is_err());
    }
}
