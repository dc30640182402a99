//! Recency-bounded caching of shaped text runs.
//!
//! Shaping a word (resolving glyphs, positions and advances for a piece
//! of text in a font) is expensive; renderers shape the same words every
//! frame. This crate keeps shaped runs alive while they are being used
//! and deterministically disposes them once they go a full timeout
//! window without a touch:
//!
//! - [`ExpirationTracker`] — a generic generational timeout engine.
//!   Tracked handles age through a ring of time buckets; a periodic tick
//!   evicts the oldest bucket, and touching a handle moves it back to
//!   the newest. O(1) insert, touch and remove.
//! - [`WordCache`] — the shaping client. Get-or-create keyed by
//!   (text, font, params, flags); on a miss it invokes a [`TextShaper`],
//!   on expiration it drops the run from its index and releases it.
//!
//! Both are single-owner-thread types driven from a frame loop; there is
//! no background timer thread. Pump [`WordCache::maintain`] (or
//! [`ExpirationTracker::advance`]) once per frame.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod shaping;
pub mod tracker;
pub mod word_cache;

pub use errors::{CacheError, Result, TrackerError};
pub use shaping::{FIXED_ONE, FontId, Glyph, ShapeFlags, ShapeParams, TextRun, TextShaper, WordKey};
pub use tracker::ExpirationTracker;
pub use word_cache::{DEFAULT_TIMEOUT, WordCache, WordCacheStats};
