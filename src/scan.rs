//! Mutation-driven image scanning.
//!
//! An [`ImageHashScanner`] is one running instance of the snippet. It scans
//! every `<img>` present when it starts, then every image added (or whose
//! `src` changed) in later mutation batches. Each `(element, src)` pair is
//! hashed at most once. On the first match it hides the configured ancestor
//! and claims the race, which disconnects every instance sharing the key.
//!
//! Failures are local: a candidate that fails to load or decode is counted
//! and forgotten.

use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashSet;

use crate::config::HideConfig;
use crate::dom::{Document, MutationRecord, NodeId};
use crate::error::HideResult;
use crate::hash::{compute_hash, BlockHash};
use crate::hider::{closest, ElementHider};
use crate::pixel::Rect;
use crate::race::WinHandle;
use crate::source::{DomChangeSource, ImageLoader, ImageSource};

// =============================================================================
// SeenSet
// =============================================================================

/// `(element, src)` pairs already handed to the hasher.
///
/// Entries are never evicted; the set lives as long as its scanner.
#[derive(Debug, Default)]
pub struct SeenSet {
    entries: FxHashSet<(NodeId, CompactString)>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the pair was not seen before.
    pub fn insert(&mut self, node: NodeId, src: &str) -> bool {
        self.entries.insert((node, src.into()))
    }

    pub fn contains(&self, node: NodeId, src: &str) -> bool {
        self.entries.contains(&(node, CompactString::from(src)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// ScanReport
// =============================================================================

/// Counters for one or more scan passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// New candidates taken from the document
    pub candidates: usize,
    /// Candidates whose hash was computed
    pub hashed: usize,
    /// Hashes within distance of a target
    pub matched: usize,
    /// Elements hidden
    pub hidden: usize,
    /// Load or decode failures
    pub failed: usize,
    /// Candidates skipped (no `src`, detached, empty selection)
    pub skipped: usize,
    /// Loads that finished after the scanner was disconnected
    pub discarded: usize,
    /// Hidden elements re-hidden after page script revealed them
    pub restored: usize,
}

impl AddAssign for ScanReport {
    fn add_assign(&mut self, rhs: Self) {
        self.candidates += rhs.candidates;
        self.hashed += rhs.hashed;
        self.matched += rhs.matched;
        self.hidden += rhs.hidden;
        self.failed += rhs.failed;
        self.skipped += rhs.skipped;
        self.discarded += rhs.discarded;
        self.restored += rhs.restored;
    }
}

/// An image element queued for hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub node: NodeId,
    pub src: CompactString,
}

// =============================================================================
// ImageHashScanner
// =============================================================================

/// One snippet instance scanning a document.
pub struct ImageHashScanner<L> {
    config: HideConfig,
    loader: L,
    seen: SeenSet,
    hider: ElementHider,
    win: WinHandle,
    connected: Arc<AtomicBool>,
    report: ScanReport,
}

impl<L> ImageHashScanner<L> {
    /// Create a scanner; it disconnects as soon as `win`'s race is won.
    pub fn new(config: HideConfig, loader: L, win: WinHandle) -> Self {
        let connected = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&connected);
        win.on_first_win(move || flag.store(false, Ordering::SeqCst));
        Self {
            config,
            loader,
            seen: SeenSet::new(),
            hider: ElementHider::new(),
            win,
            connected,
            report: ScanReport::default(),
        }
    }

    pub fn config(&self) -> &HideConfig {
        &self.config
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn hider(&self) -> &ElementHider {
        &self.hider
    }

    /// Totals over the scanner's lifetime.
    pub fn report(&self) -> ScanReport {
        self.report
    }

    /// `false` once any instance sharing the race key has won.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stop scanning without winning.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Still has work: scanning, or guarding elements it hid.
    pub fn is_active(&self) -> bool {
        self.is_connected() || self.hider.hidden_count() > 0
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Candidate discovery
    // ─────────────────────────────────────────────────────────────────────────

    fn take_candidate(&mut self, doc: &Document, node: NodeId, report: &mut ScanReport) -> Option<Candidate> {
        let src = match doc.attr(node, "src") {
            Some(src) if !src.is_empty() => src,
            _ => {
                report.skipped += 1;
                return None;
            }
        };
        if !doc.is_connected(node) {
            report.skipped += 1;
            return None;
        }
        if !self.seen.insert(node, src) {
            return None;
        }
        report.candidates += 1;
        Some(Candidate {
            node,
            src: src.into(),
        })
    }

    /// Every image currently in the document.
    fn initial_candidates(&mut self, doc: &Document, report: &mut ScanReport) -> Vec<Candidate> {
        let images: Vec<NodeId> = doc.elements_by_tag(doc.root(), "img").collect();
        images
            .into_iter()
            .filter_map(|node| self.take_candidate(doc, node, report))
            .collect()
    }

    /// Images added by `records`, or whose `src` changed.
    fn batch_candidates(
        &mut self,
        doc: &Document,
        records: &[MutationRecord],
        report: &mut ScanReport,
    ) -> Vec<Candidate> {
        let mut images = Vec::new();
        for record in records {
            match record {
                MutationRecord::ChildList { added, .. } => {
                    for &node in added {
                        images.extend(doc.elements_by_tag(node, "img"));
                    }
                }
                MutationRecord::Attribute { target, name, .. } => {
                    if name == "src" && doc.tag(*target) == Some("img") {
                        images.push(*target);
                    }
                }
            }
        }
        images
            .into_iter()
            .filter_map(|node| self.take_candidate(doc, node, report))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Evaluation
    // ─────────────────────────────────────────────────────────────────────────

    /// Hash the configured region of `image`; `None` if the region is empty.
    fn hash_image<I: ImageSource>(&self, image: &I) -> HideResult<Option<BlockHash>> {
        let (width, height) = image.dimensions();
        let region = match &self.config.selection {
            Some(selection) => selection.resolve(width, height),
            None => Some(Rect::full(width, height)).filter(|r| !r.is_empty()),
        };
        let Some(region) = region else {
            return Ok(None);
        };
        let pixels = image.decode_to_pixels(region)?;
        compute_hash(&pixels, self.config.bits).map(Some)
    }

    /// Handle a finished load. Returns `true` if this call won the race.
    fn apply<I: ImageSource>(
        &mut self,
        doc: &mut Document,
        candidate: &Candidate,
        loaded: HideResult<I>,
        report: &mut ScanReport,
    ) -> bool {
        if !self.is_connected() {
            report.discarded += 1;
            return false;
        }
        let hash = match loaded.and_then(|image| self.hash_image(&image)) {
            Ok(Some(hash)) => hash,
            Ok(None) => {
                log::debug!("empty selection for {}, skipping", candidate.src);
                report.skipped += 1;
                return false;
            }
            Err(err) => {
                log::debug!("ignoring {}: {err}", candidate.src);
                report.failed += 1;
                return false;
            }
        };
        report.hashed += 1;
        log::trace!("{} {} hashed to {hash}", candidate.node, candidate.src);

        let Some((target, distance)) = self.config.targets.find_match(hash.as_str()) else {
            return false;
        };
        report.matched += 1;
        log::debug!("{} matches {target} at distance {distance}", candidate.src);

        let element = match &self.config.selector {
            Some(selector) => closest(doc, candidate.node, selector),
            None => Some(candidate.node),
        };
        let Some(element) = element else {
            return false;
        };
        match self.hider.hide(doc, element) {
            Ok(true) => report.hidden += 1,
            Ok(false) => {}
            Err(err) => {
                log::debug!("failed to hide {element}: {err}");
                return false;
            }
        }
        self.win.win()
    }

    fn enforce(&mut self, doc: &mut Document, records: &[MutationRecord], report: &mut ScanReport) {
        match self.hider.enforce(doc, records) {
            Ok(restored) => report.restored += restored,
            Err(err) => log::debug!("failed to keep elements hidden: {err}"),
        }
    }

    fn finish(&mut self, report: ScanReport) -> ScanReport {
        self.report += report;
        report
    }
}

// =============================================================================
// Synchronous loading
// =============================================================================

impl<L: ImageLoader> ImageHashScanner<L> {
    fn process(&mut self, doc: &mut Document, candidates: Vec<Candidate>, report: &mut ScanReport) {
        for candidate in candidates {
            if !self.is_connected() {
                break;
            }
            let loaded = self.loader.load(&candidate.src);
            self.apply(doc, &candidate, loaded, report);
        }
    }

    /// Scan every image already in the document.
    pub fn start(&mut self, doc: &mut Document) -> ScanReport {
        let mut report = ScanReport::default();
        if self.is_connected() {
            let candidates = self.initial_candidates(doc, &mut report);
            self.process(doc, candidates, &mut report);
        }
        self.finish(report)
    }

    /// Handle one batch of mutation records.
    pub fn scan(&mut self, doc: &mut Document, records: &[MutationRecord]) -> ScanReport {
        let mut report = ScanReport::default();
        self.enforce(doc, records, &mut report);
        if self.is_connected() {
            let candidates = self.batch_candidates(doc, records, &mut report);
            self.process(doc, candidates, &mut report);
        }
        self.finish(report)
    }

    /// Drain `source` while the scanner is active.
    pub fn run<S: DomChangeSource>(&mut self, doc: &mut Document, source: &mut S) -> ScanReport {
        let mut total = ScanReport::default();
        while self.is_active() {
            let Some(batch) = source.next_batch(doc) else {
                break;
            };
            total += self.scan(doc, &batch);
        }
        total
    }
}

// =============================================================================
// Asynchronous loading
// =============================================================================

#[cfg(feature = "async")]
impl<L: crate::source::AsyncImageLoader> ImageHashScanner<L> {
    async fn process_async(&mut self, doc: &mut Document, candidates: Vec<Candidate>, report: &mut ScanReport) {
        let loads = futures_util::future::join_all(
            candidates.iter().map(|c| self.loader.load(&c.src)),
        )
        .await;
        for (candidate, loaded) in candidates.iter().zip(loads) {
            self.apply(doc, candidate, loaded, report);
        }
    }

    /// Async [`ImageHashScanner::start`]: loads run concurrently.
    pub async fn start_async(&mut self, doc: &mut Document) -> ScanReport {
        let mut report = ScanReport::default();
        if self.is_connected() {
            let candidates = self.initial_candidates(doc, &mut report);
            self.process_async(doc, candidates, &mut report).await;
        }
        self.finish(report)
    }

    /// Async [`ImageHashScanner::scan`]: loads run concurrently, results
    /// arriving after a win are discarded.
    pub async fn scan_async(&mut self, doc: &mut Document, records: &[MutationRecord]) -> ScanReport {
        let mut report = ScanReport::default();
        self.enforce(doc, records, &mut report);
        if self.is_connected() {
            let candidates = self.batch_candidates(doc, records, &mut report);
            self.process_async(doc, candidates, &mut report).await;
        }
        self.finish(report)
    }
}
