//! Word Cache
//!
//! Bounds the memory spent on shaped text runs by recency. Runs are
//! keyed by (text, font, params, flags) in the cache's own index; the
//! [`ExpirationTracker`] only manages membership, handing back the
//! handle of every run that went a full window without use so the cache
//! can dispose of it.
//!
//! The cache holds the sole retained `Arc<TextRun>` per word. Callers
//! get clones, so a run that expires while a caller still draws with it
//! simply lives on until that caller drops its clone.

use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::errors::{CacheError, Result};
use crate::shaping::{FontId, ShapeFlags, ShapeParams, TextRun, TextShaper, WordKey};
use crate::tracker::ExpirationTracker;

/// Expiration window of [`WordCache::new`]: three 10-second generations,
/// matching the reference text-run cache.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

slotmap::new_key_type! {
    /// Tracker-facing handle of a cached run.
    struct RunKey;
}

struct CachedRun {
    key: WordKey,
    run: Arc<TextRun>,
}

/// Counters for cache behavior, in the style of the engine's other
/// resource caches.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to invoke the shaper.
    pub misses: u64,
    /// Misses where the shaper produced nothing.
    pub shaping_failures: u64,
    /// Runs disposed by the expiration tracker.
    pub expirations: u64,
    /// Runs returned to the caller without being retained.
    pub bypasses: u64,
}

impl WordCacheStats {
    /// Fraction of lookups answered from the cache, 0.0 to 1.0.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Recency-bounded cache of shaped words.
///
/// Owned by the shaping subsystem of one render thread; all access goes
/// through `&mut self`, and the owner pumps [`maintain`](Self::maintain)
/// from its frame loop to run expiration.
pub struct WordCache<S: TextShaper, const GENERATIONS: usize = 3> {
    shaper: S,
    runs: SlotMap<RunKey, CachedRun>,
    index: FxHashMap<WordKey, RunKey>,
    tracker: ExpirationTracker<RunKey, GENERATIONS>,
    stats: WordCacheStats,
}

impl<S: TextShaper> WordCache<S> {
    /// Creates a cache with the reference 30-second window and three
    /// generations.
    #[must_use]
    pub fn new(shaper: S) -> Self {
        Self::with_timeout(shaper, DEFAULT_TIMEOUT)
    }
}

impl<S: TextShaper, const GENERATIONS: usize> WordCache<S, GENERATIONS> {
    /// Creates a cache whose runs expire after going `timeout` without
    /// use (to within one generation of slack).
    #[must_use]
    pub fn with_timeout(shaper: S, timeout: Duration) -> Self {
        Self {
            shaper,
            runs: SlotMap::with_key(),
            index: FxHashMap::default(),
            tracker: ExpirationTracker::new(timeout),
            stats: WordCacheStats::default(),
        }
    }

    /// Returns the cached run for this word, shaping it on a miss.
    ///
    /// A hit refreshes the run's expiration countdown. On a miss the
    /// shaper runs; if it produces nothing the error propagates and the
    /// cache retains nothing, so the next lookup shapes again. If the
    /// fresh run cannot be tracked it is handed to the caller untracked
    /// instead of being cached (a bypass).
    pub fn get_or_create(
        &mut self,
        text: &str,
        font: FontId,
        params: ShapeParams,
        flags: ShapeFlags,
    ) -> Result<Arc<TextRun>> {
        self.get_or_create_at(text, font, params, flags, Instant::now())
    }

    /// [`get_or_create`](Self::get_or_create) with an explicit clock
    /// reading.
    pub fn get_or_create_at(
        &mut self,
        text: &str,
        font: FontId,
        params: ShapeParams,
        flags: ShapeFlags,
        now: Instant,
    ) -> Result<Arc<TextRun>> {
        let key = WordKey::new(text, font, params, flags);
        if let Some(&run_key) = self.index.get(&key) {
            self.stats.hits += 1;
            self.tracker.mark_used(run_key);
            return Ok(Arc::clone(&self.runs[run_key].run));
        }

        self.stats.misses += 1;
        let Some(run) = self.shaper.shape(text, font, params, flags) else {
            self.stats.shaping_failures += 1;
            return Err(CacheError::ShapingFailed {
                word: text.to_owned(),
            });
        };

        let run = Arc::new(run);
        let run_key = self.runs.insert(CachedRun {
            key: key.clone(),
            run: Arc::clone(&run),
        });
        if let Err(err) = self.tracker.insert_at(run_key, now) {
            // Fresh slotmap keys are never still tracked, but the
            // reference client's contract stands: an untrackable run is
            // returned to the caller unretained rather than risking a
            // duplicate membership.
            log::warn!("word cache bypass for {text:?}: {err}");
            self.stats.bypasses += 1;
            self.runs.remove(run_key);
            return Ok(run);
        }
        self.index.insert(key, run_key);
        Ok(run)
    }

    /// Runs expiration up to `Instant::now()`. Call once per frame.
    pub fn maintain(&mut self) {
        self.maintain_at(Instant::now());
    }

    /// Processes every aging tick due at or before `now`, disposing the
    /// runs whose window elapsed. The key index entry is removed before
    /// the run itself so a stale handle can never be looked up.
    pub fn maintain_at(&mut self, now: Instant) {
        let Self {
            runs,
            index,
            tracker,
            stats,
            ..
        } = self;
        tracker.advance_to(now, |run_key| {
            if let Some(entry) = runs.remove(run_key) {
                index.remove(&entry.key);
                stats.expirations += 1;
                log::trace!("expired shaped word {:?}", entry.key.text);
            }
        });
    }

    /// Client-initiated removal, e.g. when the font instance is being
    /// torn down. Returns whether the word was cached.
    pub fn discard(
        &mut self,
        text: &str,
        font: FontId,
        params: ShapeParams,
        flags: ShapeFlags,
    ) -> bool {
        let key = WordKey::new(text, font, params, flags);
        let Some(run_key) = self.index.remove(&key) else {
            return false;
        };
        if self.tracker.is_tracked(run_key) {
            self.tracker.remove(run_key);
        }
        self.runs.remove(run_key);
        true
    }

    /// Membership query without refreshing the run's countdown.
    #[must_use]
    pub fn contains(
        &self,
        text: &str,
        font: FontId,
        params: ShapeParams,
        flags: ShapeFlags,
    ) -> bool {
        self.index
            .contains_key(&WordKey::new(text, font, params, flags))
    }

    /// Expires every cached run immediately, as if all windows elapsed.
    pub fn clear(&mut self) {
        let Self {
            runs,
            index,
            tracker,
            stats,
            ..
        } = self;
        tracker.age_all_generations(|run_key| {
            if let Some(entry) = runs.remove(run_key) {
                index.remove(&entry.key);
                stats.expirations += 1;
            }
        });
        debug_assert!(runs.is_empty());
        debug_assert!(index.is_empty());
    }

    /// Number of cached runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> WordCacheStats {
        self.stats
    }

    /// The configured expiration window.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.tracker.timeout()
    }
}

impl<S: TextShaper, const GENERATIONS: usize> Drop for WordCache<S, GENERATIONS> {
    /// Ages every generation out before the tracker goes away, so each
    /// remaining run is disposed through the ordinary expiration path.
    fn drop(&mut self) {
        self.clear();
    }
}
