//! `hide-if-contains-image-hash` entry point.
//!
//! A [`SnippetContext`] is created once per page load and owns the race
//! table shared by every snippet instance on that page.
//!
//! ```
//! use blockhide::dom::Document;
//! use blockhide::pixel::PixelBuffer;
//! use blockhide::snippet::SnippetContext;
//! use blockhide::source::MemoryLoader;
//!
//! let ctx = SnippetContext::new();
//! let mut doc = Document::new();
//! let loader = MemoryLoader::new().with("a.png", PixelBuffer::solid(8, 8, [0, 0, 0, 255]));
//!
//! let scanner = ctx.hide_if_contains_image_hash(&mut doc, loader, &["0000000000000000"]);
//! assert!(scanner.is_some());
//! assert!(ctx.hide_if_contains_image_hash(&mut doc, MemoryLoader::new(), &["abc", "", "NaN"]).is_none());
//! ```

use crate::config::HideConfig;
use crate::dom::Document;
use crate::race::RaceRegistry;
use crate::scan::ImageHashScanner;
use crate::source::ImageLoader;

/// Page-scoped state for snippet instances.
#[derive(Debug, Clone, Default)]
pub struct SnippetContext {
    races: RaceRegistry,
}

impl SnippetContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared race table; hosts register `on_first_win` callbacks here.
    pub fn races(&self) -> &RaceRegistry {
        &self.races
    }

    /// `hideIfContainsImageHash(hashes, selector?, maxDistance?, blockBits?, selection?)`.
    ///
    /// Arguments arrive as strings, as written in the filter. Invalid
    /// arguments abort without touching the page. Returns the running
    /// scanner, already past its initial scan, or `None` if the invocation
    /// aborted or its race was already won.
    pub fn hide_if_contains_image_hash<L: ImageLoader>(
        &self,
        doc: &mut Document,
        loader: L,
        args: &[&str],
    ) -> Option<ImageHashScanner<L>> {
        let config = match parse_args(args) {
            Ok(config) => config,
            Err(err) => {
                log::debug!("hide-if-contains-image-hash aborted: {err}");
                return None;
            }
        };
        self.start(doc, config, loader)
    }

    /// Start a scanner for an already-built config.
    pub fn start<L: ImageLoader>(
        &self,
        doc: &mut Document,
        config: HideConfig,
        loader: L,
    ) -> Option<ImageHashScanner<L>> {
        let win = self.races.claim(&config.race_key);
        if win.is_won() {
            log::debug!("race {:?} already won, not starting", config.race_key);
            return None;
        }
        let mut scanner = ImageHashScanner::new(config, loader, win);
        let report = scanner.start(doc);
        log::trace!("initial scan: {report:?}");
        Some(scanner)
    }
}

fn parse_args(args: &[&str]) -> crate::error::HideResult<HideConfig> {
    let arg = |i: usize| args.get(i).copied();
    let hashes = arg(0).unwrap_or("");
    HideConfig::from_args(hashes, arg(1), arg(2), arg(3), arg(4))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::config::SNIPPET_NAME;
    use crate::dom::NodeId;
    use crate::hash::compute_hash;
    use crate::hider::is_hidden;
    use crate::pixel::PixelBuffer;
    use crate::source::{MemoryLoader, ScriptedChanges};

    fn logo() -> PixelBuffer {
        PixelBuffer::from_fn(40, 30, |x, y| {
            let v = ((x * 7 + y * 3) % 256) as u8;
            [v, 255 - v, v / 2, 255]
        })
    }

    fn logo_hash() -> String {
        compute_hash(&logo(), 8).unwrap().to_string()
    }

    fn flip_bits(hash: &str, count: usize) -> String {
        // Flip the lowest bit of the first `count` hex digits
        hash.chars()
            .enumerate()
            .map(|(i, c)| {
                let v = c.to_digit(16).unwrap();
                let v = if i < count { v ^ 1 } else { v };
                char::from_digit(v, 16).unwrap()
            })
            .collect()
    }

    fn page() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let card = doc.create_element("div");
        doc.set_attr(card, "class", "card sponsored").unwrap();
        doc.append_child(doc.root(), card).unwrap();
        let img = doc.create_element("img");
        doc.set_attr(img, "src", "https://ads.example/logo.png").unwrap();
        doc.append_child(card, img).unwrap();
        doc.take_records();
        (doc, card, img)
    }

    fn loader() -> MemoryLoader {
        MemoryLoader::new().with("https://ads.example/logo.png", logo())
    }

    #[test]
    fn test_hides_closest_ancestor() {
        let ctx = SnippetContext::new();
        let (mut doc, card, img) = page();
        let hash = logo_hash();
        let scanner = ctx
            .hide_if_contains_image_hash(&mut doc, loader(), &[hash.as_str(), ".sponsored"])
            .unwrap();
        assert!(is_hidden(&doc, card));
        assert!(!is_hidden(&doc, img));
        assert!(!scanner.is_connected());
        assert!(ctx.races().is_won(SNIPPET_NAME));
    }

    #[test]
    fn test_max_distance() {
        let near = flip_bits(&logo_hash(), 3);

        let ctx = SnippetContext::new();
        let (mut doc, _, img) = page();
        ctx.hide_if_contains_image_hash(&mut doc, loader(), &[near.as_str(), "", "2"]);
        assert!(!is_hidden(&doc, img));

        let ctx = SnippetContext::new();
        let (mut doc, _, img) = page();
        ctx.hide_if_contains_image_hash(&mut doc, loader(), &[near.as_str(), "", "3"]);
        assert!(is_hidden(&doc, img));
    }

    #[test]
    fn test_invalid_arguments_abort_silently() {
        let ctx = SnippetContext::new();
        let (mut doc, _, img) = page();
        let hash = logo_hash();
        for args in [
            vec![hash.as_str(), "", "NaN"],
            vec![hash.as_str(), "", "0", "zero"],
            vec![hash.as_str(), "", "0", "100"],
            vec![hash.as_str(), "div[", "0"],
            vec![hash.as_str(), "", "0", "8", "1x1"],
        ] {
            assert!(ctx.hide_if_contains_image_hash(&mut doc, loader(), &args).is_none());
        }
        assert!(!is_hidden(&doc, img));
        assert!(doc.take_records().is_empty());
        assert!(ctx.races().is_empty());
    }

    #[test]
    fn test_block_bits_and_selection() {
        let full = compute_hash(&logo(), 16).unwrap().to_string();
        let ctx = SnippetContext::new();
        let (mut doc, _, img) = page();
        ctx.hide_if_contains_image_hash(&mut doc, loader(), &[full.as_str(), "", "0", "16", "0x0x40x30"]);
        assert!(is_hidden(&doc, img));
    }

    #[test]
    fn test_duplicate_injection_after_win() {
        let ctx = SnippetContext::new();
        let disconnects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&disconnects);
        ctx.races().on_first_win(SNIPPET_NAME, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let (mut doc, _, _) = page();
        let hash = logo_hash();
        assert!(ctx.hide_if_contains_image_hash(&mut doc, loader(), &[hash.as_str()]).is_some());
        assert!(ctx.hide_if_contains_image_hash(&mut doc, loader(), &[hash.as_str()]).is_none());
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_image_end_to_end() {
        let ctx = SnippetContext::new();
        let mut doc = Document::new();
        let hash = logo_hash();

        let mut first = ctx
            .hide_if_contains_image_hash(&mut doc, loader(), &[hash.as_str(), "article"])
            .unwrap();
        let mut second = ctx
            .hide_if_contains_image_hash(&mut doc, loader(), &[hash.as_str(), "article"])
            .unwrap();

        let mut changes = ScriptedChanges::new().then(|doc| {
            let article = doc.create_element("article");
            let img = doc.create_element("img");
            doc.set_attr(img, "src", "https://ads.example/logo.png").unwrap();
            doc.append_child(article, img).unwrap();
            doc.append_child(doc.root(), article).unwrap();
        });
        let batch = crate::source::DomChangeSource::next_batch(&mut changes, &mut doc).unwrap();
        let total = first.scan(&mut doc, &batch).hidden + second.scan(&mut doc, &batch).hidden;

        assert_eq!(total, 1);
        let article = doc.elements_by_tag(doc.root(), "article").next().unwrap();
        assert!(is_hidden(&doc, article));
        assert!(!first.is_connected() && !second.is_connected());
    }
}
