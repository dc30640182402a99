//! Expiration Tracker Tests
//!
//! Tests for:
//! - Bounded lifetime: untouched handles expire once the window elapses
//! - Touch semantics: `mark_used` restarts the countdown
//! - Membership contracts: duplicate inserts, guarded removal, panics
//! - Recency ordering across aging ticks
//! - Teardown via `age_all_generations`
//! - Timer arming: idle suspension and full-window re-arm
//!
//! All timing is simulated through `insert_at` / `advance_to`; nothing
//! sleeps. The default configuration mirrors the reference client:
//! three generations, a 30 ms window, so a tick every 10 ms.

use std::time::{Duration, Instant};

use textrun_cache::{ExpirationTracker, TrackerError};

const WINDOW: Duration = Duration::from_millis(30);

fn tracker() -> (ExpirationTracker<u32, 3>, Instant) {
    (ExpirationTracker::new(WINDOW), Instant::now())
}

fn at(base: Instant, ms: u64) -> Instant {
    base + Duration::from_millis(ms)
}

/// Pumps the tracker to `base + ms` and returns what expired.
fn expire_until(t: &mut ExpirationTracker<u32, 3>, base: Instant, ms: u64) -> Vec<u32> {
    let mut expired = Vec::new();
    t.advance_to(at(base, ms), |k| expired.push(k));
    expired
}

// ============================================================================
// Bounded lifetime
// ============================================================================

#[test]
fn untouched_handle_expires_after_full_window() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();

    assert!(expire_until(&mut t, base, 29).is_empty());
    assert!(t.is_tracked(1));

    assert_eq!(expire_until(&mut t, base, 30), vec![1]);
    assert!(!t.is_tracked(1));
    assert!(t.is_empty());
}

#[test]
fn handle_added_mid_period_expires_with_its_bucket() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    // Same bucket as handle 1: the timer is already running.
    t.insert_at(2, at(base, 5)).unwrap();

    assert!(expire_until(&mut t, base, 29).is_empty());

    // Both fall out on the third tick; the earlier insert is observed
    // no later than the later one.
    let expired = expire_until(&mut t, base, 40);
    assert_eq!(expired, vec![1, 2]);
}

#[test]
fn catch_up_after_long_gap_expires_once_and_disarms() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();

    let expired = expire_until(&mut t, base, 1000);
    assert_eq!(expired, vec![1]);
    assert!(!t.is_armed());

    // Nothing left to do, however far the clock moves.
    assert!(expire_until(&mut t, base, 2000).is_empty());
}

// ============================================================================
// Touch semantics
// ============================================================================

#[test]
fn mark_used_restarts_the_countdown() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();

    // Two ticks age the handle almost out of the window.
    assert!(expire_until(&mut t, base, 25).is_empty());
    t.mark_used(1);

    // It now survives past the original 30 ms window.
    assert!(expire_until(&mut t, base, 49).is_empty());
    assert!(t.is_tracked(1));

    assert_eq!(expire_until(&mut t, base, 50), vec![1]);
}

#[test]
fn repeated_touches_keep_a_handle_alive_indefinitely() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();

    for ms in (10..=200).step_by(10) {
        assert!(expire_until(&mut t, base, ms).is_empty(), "at {ms} ms");
        t.mark_used(1);
    }
    assert!(t.is_tracked(1));
}

#[test]
fn touch_does_not_duplicate_membership() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    assert!(expire_until(&mut t, base, 15).is_empty());
    t.mark_used(1);
    t.mark_used(1);
    assert_eq!(t.len(), 1);

    let expired = expire_until(&mut t, base, 100);
    assert_eq!(expired, vec![1], "must expire exactly once");
}

// ============================================================================
// Membership contracts
// ============================================================================

#[test]
fn duplicate_insert_fails_without_membership_change() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();

    assert_eq!(
        t.insert_at(1, at(base, 5)),
        Err(TrackerError::AlreadyTracked)
    );
    assert!(t.is_tracked(1));
    assert_eq!(t.len(), 1);

    let expired = expire_until(&mut t, base, 100);
    assert_eq!(expired, vec![1]);
}

#[test]
fn removed_handle_never_expires() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    t.remove(1);

    assert!(!t.is_tracked(1));
    assert!(expire_until(&mut t, base, 100).is_empty());
}

#[test]
#[should_panic(expected = "not tracked")]
fn removing_an_untracked_handle_panics() {
    let (mut t, _base) = tracker();
    t.remove(42);
}

#[test]
#[should_panic(expected = "not tracked")]
fn touching_an_untracked_handle_panics() {
    let (mut t, _base) = tracker();
    t.mark_used(42);
}

#[test]
#[should_panic(expected = "not tracked")]
fn double_remove_panics() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    t.remove(1);
    t.remove(1);
}

// ============================================================================
// Recency ordering
// ============================================================================

#[test]
fn older_handles_expire_in_earlier_ticks() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    // Pump past one tick boundary so the second insert lands in a
    // younger bucket.
    assert!(expire_until(&mut t, base, 15).is_empty());
    t.insert_at(2, at(base, 15)).unwrap();

    assert_eq!(expire_until(&mut t, base, 30), vec![1]);
    assert!(t.is_tracked(2));
    assert_eq!(expire_until(&mut t, base, 40), vec![2]);
}

#[test]
fn touched_handle_outlives_untouched_peer() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    t.insert_at(2, base).unwrap();

    assert!(expire_until(&mut t, base, 25).is_empty());
    t.mark_used(2);

    assert_eq!(expire_until(&mut t, base, 30), vec![1]);
    assert!(t.is_tracked(2));
    assert_eq!(expire_until(&mut t, base, 50), vec![2]);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn age_all_generations_evicts_everything_exactly_once() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    assert!(expire_until(&mut t, base, 10).is_empty());
    t.insert_at(2, at(base, 10)).unwrap();
    assert!(expire_until(&mut t, base, 20).is_empty());
    t.insert_at(3, at(base, 20)).unwrap();
    assert_eq!(t.len(), 3);

    let mut evicted = Vec::new();
    t.age_all_generations(|k| evicted.push(k));

    evicted.sort_unstable();
    assert_eq!(evicted, vec![1, 2, 3]);
    assert!(t.is_empty());
    assert!(!t.is_armed());

    // The tracker is inert afterwards.
    assert!(expire_until(&mut t, base, 500).is_empty());
}

#[test]
fn age_all_generations_on_empty_tracker_is_a_noop() {
    let (mut t, _base) = tracker();
    let mut evicted = Vec::new();
    t.age_all_generations(|k: u32| evicted.push(k));
    assert!(evicted.is_empty());
    assert!(!t.is_armed());
}

// ============================================================================
// Timer arming
// ============================================================================

#[test]
fn timer_disarms_when_last_handle_expires() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    assert!(t.is_armed());

    assert_eq!(expire_until(&mut t, base, 30), vec![1]);
    assert!(!t.is_armed());
}

#[test]
fn rearm_after_idle_grants_a_full_window() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    assert_eq!(expire_until(&mut t, base, 30), vec![1]);
    assert!(!t.is_armed());

    // Re-add long after going idle: the window restarts from scratch,
    // no carried-over partial ticks.
    t.insert_at(2, at(base, 100)).unwrap();
    assert!(t.is_armed());
    assert!(expire_until(&mut t, base, 129).is_empty());
    assert_eq!(expire_until(&mut t, base, 130), vec![2]);
}

#[test]
fn remove_to_empty_then_tick_disarms() {
    let (mut t, base) = tracker();
    t.insert_at(1, base).unwrap();
    t.remove(1);
    // The timer stays armed until the next tick finds nothing to age.
    assert!(expire_until(&mut t, base, 10).is_empty());
    assert!(!t.is_armed());
}

// ============================================================================
// Alternate configurations
// ============================================================================

#[test]
fn five_generation_tracker_uses_finer_ticks() {
    let base = Instant::now();
    let mut t: ExpirationTracker<u32, 5> = ExpirationTracker::new(Duration::from_millis(50));
    assert_eq!(t.period(), Duration::from_millis(10));

    t.insert_at(1, base).unwrap();
    let mut expired = Vec::new();
    t.advance_to(base + Duration::from_millis(49), |k| expired.push(k));
    assert!(expired.is_empty());
    t.advance_to(base + Duration::from_millis(50), |k| expired.push(k));
    assert_eq!(expired, vec![1]);
}

#[test]
fn single_generation_tracker_expires_every_tick() {
    let base = Instant::now();
    let mut t: ExpirationTracker<u32, 1> = ExpirationTracker::new(Duration::from_millis(10));

    t.insert_at(1, base).unwrap();
    let mut expired = Vec::new();
    t.advance_to(base + Duration::from_millis(10), |k| expired.push(k));
    assert_eq!(expired, vec![1]);
    assert!(!t.is_armed());
}
