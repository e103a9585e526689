//! Single-winner coordination across duplicate snippet injections.
//!
//! The same filter can be injected several times into one page. Every copy
//! claims a [`WinHandle`] for the same key; the first `win()` moves the key
//! from `Armed` to `Won` and runs every registered disconnect callback
//! exactly once. Later calls are no-ops. There is no way back to `Armed`.
//!
//! A [`RaceRegistry`] lives as long as the page (one per navigation).

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

type Callback = Box<dyn FnOnce() + Send>;

enum RaceState {
    Armed { on_win: Vec<Callback> },
    Won,
}

impl fmt::Debug for RaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Armed { on_win } => write!(f, "Armed({} callbacks)", on_win.len()),
            Self::Won => f.write_str("Won"),
        }
    }
}

#[derive(Debug)]
struct RaceEntry {
    state: Mutex<RaceState>,
}

impl RaceEntry {
    fn new() -> Self {
        Self {
            state: Mutex::new(RaceState::Armed { on_win: Vec::new() }),
        }
    }
}

// =============================================================================
// RaceRegistry
// =============================================================================

/// Per-page table of races, keyed by snippet key.
///
/// Cloning is cheap and yields a handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct RaceRegistry {
    inner: Arc<Mutex<FxHashMap<CompactString, Arc<RaceEntry>>>>,
}

impl RaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the race under `key`, creating it on first use.
    pub fn claim(&self, key: &str) -> WinHandle {
        let entry = {
            let mut races = self.inner.lock();
            Arc::clone(
                races
                    .entry(CompactString::from(key))
                    .or_insert_with(|| Arc::new(RaceEntry::new())),
            )
        };
        WinHandle {
            key: key.into(),
            entry,
        }
    }

    /// Whether the race under `key` has been won.
    pub fn is_won(&self, key: &str) -> bool {
        self.inner
            .lock()
            .get(key)
            .is_some_and(|entry| matches!(*entry.state.lock(), RaceState::Won))
    }

    /// Register a callback for the first win under `key`.
    pub fn on_first_win(&self, key: &str, callback: impl FnOnce() + Send + 'static) {
        self.claim(key).on_first_win(callback);
    }

    /// Number of keys seen so far.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// WinHandle
// =============================================================================

/// One participant's handle on a race.
#[derive(Debug, Clone)]
pub struct WinHandle {
    key: CompactString,
    entry: Arc<RaceEntry>,
}

impl WinHandle {
    /// A handle on a private race nobody else can join.
    pub fn detached(key: &str) -> Self {
        Self {
            key: key.into(),
            entry: Arc::new(RaceEntry::new()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Claim the win. Returns `true` only for the first call across all
    /// handles of this race.
    pub fn win(&self) -> bool {
        let callbacks = {
            let mut state = self.entry.state.lock();
            match std::mem::replace(&mut *state, RaceState::Won) {
                RaceState::Armed { on_win } => on_win,
                RaceState::Won => return false,
            }
        };
        log::info!("race {:?} won, disconnecting {} observer(s)", self.key, callbacks.len());
        for callback in callbacks {
            callback();
        }
        true
    }

    /// Run `callback` when the race is won (immediately if it already was).
    pub fn on_first_win(&self, callback: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.entry.state.lock();
            if let RaceState::Armed { on_win } = &mut *state {
                on_win.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    pub fn is_won(&self) -> bool {
        matches!(*self.entry.state.lock(), RaceState::Won)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static_assertions::assert_impl_all!(RaceRegistry: Send, Sync, Clone);
    static_assertions::assert_impl_all!(WinHandle: Send, Sync);

    #[test]
    fn test_first_win_only() {
        let registry = RaceRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        registry.on_first_win("snippet", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let a = registry.claim("snippet");
        let b = registry.claim("snippet");
        assert!(!a.is_won());
        assert!(a.win());
        assert!(!b.win());
        assert!(!a.win());
        assert!(b.is_won());
        assert!(registry.is_won("snippet"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let registry = RaceRegistry::new();
        assert!(registry.claim("a").win());
        assert!(registry.claim("b").win());
        assert!(!registry.is_won("c"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_late_registration_runs_immediately() {
        let handle = WinHandle::detached("x");
        handle.win();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        handle.on_first_win(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_query_state() {
        let registry = RaceRegistry::new();
        let handle = registry.claim("k");
        let probe = registry.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let out = Arc::clone(&seen);
        handle.on_first_win(move || {
            if probe.is_won("k") {
                out.fetch_add(1, Ordering::SeqCst);
            }
        });
        handle.win();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
