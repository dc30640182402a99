//! Generational Expiration Tracker
//!
//! A reusable timeout engine that ages tracked handles through a ring of
//! `GENERATIONS` time buckets. Every tick (fired each
//! `timeout / GENERATIONS`) the oldest bucket is evicted, all remaining
//! buckets grow one step older and a fresh empty bucket becomes the
//! newest. Touching a handle moves it back into the newest bucket, so an
//! object keeps living as long as it keeps being used.
//!
//! # Why generations
//!
//! The ring approximates a sliding timeout window with O(1) insert,
//! touch and remove, instead of a per-object timer or a structure sorted
//! by last use. The trade is bucket granularity: an untouched object is
//! evicted somewhere between `timeout - timeout / GENERATIONS` and
//! `timeout` after its last touch, depending on where the touch fell
//! inside the running tick period. An object whose insert armed the
//! timer gets exactly `timeout`.
//!
//! # Ownership
//!
//! The tracker never owns the client's objects. It tracks cheap `Copy`
//! handles (slotmap keys, ids); the client keeps the only strong
//! reference and disposes the object when the handle comes back through
//! the expiration sink.
//!
//! # Timer model
//!
//! There is no background thread. The owner pumps the tracker from its
//! frame loop via [`ExpirationTracker::advance`]; due ticks are processed
//! in order, catching up after long gaps. The timer disarms itself when
//! the last bucket empties and re-arms on the next insert with a full
//! period, so an idle tracker costs nothing.

use std::hash::Hash;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::errors::TrackerError;

/// Where a tracked handle currently lives: physical ring bucket plus the
/// position inside it, so removal is a swap-remove.
#[derive(Debug, Clone, Copy)]
struct Slot {
    bucket: u8,
    index: u32,
}

/// Generational timeout engine over `Copy` handles.
///
/// `GENERATIONS` is the number of ring buckets (3 matches the reference
/// text-run cache); `timeout` is the full expiration window, subdivided
/// into `GENERATIONS` tick periods.
pub struct ExpirationTracker<K, const GENERATIONS: usize = 3>
where
    K: Copy + Eq + Hash,
{
    /// Ring of buckets; `newest` points at logical generation 0.
    generations: [Vec<K>; GENERATIONS],
    /// Handle -> slot. Absence is the "not tracked" state.
    slots: FxHashMap<K, Slot>,
    newest: usize,
    timeout: Duration,
    period: Duration,
    /// Deadline of the next aging tick; `None` while disarmed.
    next_tick: Option<Instant>,
}

impl<K, const GENERATIONS: usize> ExpirationTracker<K, GENERATIONS>
where
    K: Copy + Eq + Hash,
{
    /// Creates a disarmed tracker with the given expiration window.
    ///
    /// # Panics
    ///
    /// Panics if `timeout` is zero or `GENERATIONS` is 0 or above 255.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        assert!(
            GENERATIONS >= 1 && GENERATIONS <= u8::MAX as usize,
            "generation count must be in 1..=255"
        );
        assert!(!timeout.is_zero(), "expiration timeout must be non-zero");
        let period = timeout / GENERATIONS as u32;
        assert!(
            !period.is_zero(),
            "expiration timeout too small for the generation count"
        );
        Self {
            generations: std::array::from_fn(|_| Vec::new()),
            slots: FxHashMap::default(),
            newest: 0,
            timeout,
            period,
            next_tick: None,
        }
    }

    /// Full expiration window.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Aging tick period (`timeout / GENERATIONS`).
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of tracked handles across all generations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the aging timer is currently armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// O(1) membership query.
    #[must_use]
    pub fn is_tracked(&self, key: K) -> bool {
        self.slots.contains_key(&key)
    }

    /// Starts tracking `key` in the newest generation.
    ///
    /// Arms the timer if this is the first tracked handle. Fails with
    /// [`TrackerError::AlreadyTracked`] on a duplicate insert, leaving
    /// the existing membership untouched.
    pub fn insert(&mut self, key: K) -> Result<(), TrackerError> {
        self.insert_at(key, Instant::now())
    }

    /// [`insert`](Self::insert) with an explicit clock reading, for
    /// callers that batch per-frame timestamps and for simulated time in
    /// tests.
    pub fn insert_at(&mut self, key: K, now: Instant) -> Result<(), TrackerError> {
        if self.slots.contains_key(&key) {
            return Err(TrackerError::AlreadyTracked);
        }
        self.attach(key);
        if self.next_tick.is_none() {
            self.next_tick = Some(now + self.period);
        }
        Ok(())
    }

    /// Stops tracking `key` without any notification.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not tracked. Callers that may race with
    /// expiration must guard with [`is_tracked`](Self::is_tracked).
    pub fn remove(&mut self, key: K) {
        let slot = self
            .slots
            .remove(&key)
            .expect("removed an object that is not tracked");
        self.detach(slot);
    }

    /// Moves `key` back into the newest generation, restarting its
    /// countdown. No-op when it already sits there.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not tracked; the caller owns the add-first
    /// contract.
    pub fn mark_used(&mut self, key: K) {
        let slot = *self
            .slots
            .get(&key)
            .expect("marked an object that is not tracked as used");
        if slot.bucket as usize == self.newest {
            return;
        }
        self.detach(slot);
        self.attach(key);
    }

    /// Pumps the timer up to `Instant::now()`, feeding every expired
    /// handle to `on_expired`. See [`advance_to`](Self::advance_to).
    pub fn advance(&mut self, on_expired: impl FnMut(K)) {
        self.advance_to(Instant::now(), on_expired);
    }

    /// Processes every aging tick due at or before `now`, in order.
    ///
    /// Each tick evicts the oldest generation: every member is dropped
    /// from the bookkeeping first and then handed to `on_expired`, so
    /// the tracker never holds a handle it has already reported. When a
    /// tick leaves all generations empty the timer disarms and the loop
    /// stops; the next insert re-arms it with a fresh full period.
    pub fn advance_to(&mut self, now: Instant, mut on_expired: impl FnMut(K)) {
        while let Some(due) = self.next_tick {
            if now < due {
                break;
            }
            self.age_one_generation(&mut on_expired);
            self.next_tick = if self.slots.is_empty() {
                None
            } else {
                Some(due + self.period)
            };
        }
    }

    /// Forces full eviction: ages until every generation is empty, then
    /// disarms the timer. Call this before tearing down the client so no
    /// tracked object outlives its disposer.
    pub fn age_all_generations(&mut self, mut on_expired: impl FnMut(K)) {
        for _ in 0..GENERATIONS {
            if self.slots.is_empty() {
                break;
            }
            self.age_one_generation(&mut on_expired);
        }
        self.next_tick = None;
    }

    // ── Internal ─────────────────────────────────────────────────────────

    /// Evicts the oldest bucket and rotates the ring so the emptied
    /// bucket becomes the newest generation.
    fn age_one_generation(&mut self, on_expired: &mut impl FnMut(K)) {
        let oldest = (self.newest + 1) % GENERATIONS;
        let evicted = std::mem::take(&mut self.generations[oldest]);
        self.newest = oldest;
        for key in evicted {
            self.slots.remove(&key);
            on_expired(key);
        }
    }

    /// Appends `key` to the newest bucket and records its slot.
    fn attach(&mut self, key: K) {
        let bucket = self.newest;
        let index = self.generations[bucket].len() as u32;
        self.generations[bucket].push(key);
        self.slots.insert(
            key,
            Slot {
                bucket: bucket as u8,
                index,
            },
        );
    }

    /// Swap-removes a slot from its bucket and patches the displaced
    /// handle's recorded index.
    fn detach(&mut self, slot: Slot) {
        let bucket = &mut self.generations[slot.bucket as usize];
        bucket.swap_remove(slot.index as usize);
        if let Some(&moved) = bucket.get(slot.index as usize) {
            self.slots
                .get_mut(&moved)
                .expect("displaced handle must be tracked")
                .index = slot.index;
        }
    }
}

impl<K, const GENERATIONS: usize> std::fmt::Debug for ExpirationTracker<K, GENERATIONS>
where
    K: Copy + Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationTracker")
            .field("generations", &GENERATIONS)
            .field("tracked", &self.slots.len())
            .field("timeout", &self.timeout)
            .field("armed", &self.next_tick.is_some())
            .finish()
    }
}
