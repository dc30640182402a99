//! Error Types
//!
//! Recoverable failures reported by the tracker and the word cache.
//!
//! Contract violations (touching or removing an untracked handle,
//! constructing a tracker with a zero timeout) are *not* represented
//! here: they panic immediately, because tolerating them would leave a
//! stale handle inside a generation bucket.

use thiserror::Error;

/// Recoverable failures of [`ExpirationTracker`](crate::ExpirationTracker).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerError {
    /// The handle is already a member of a generation. Membership is
    /// left untouched; the caller decides whether to bypass tracking.
    #[error("object is already tracked")]
    AlreadyTracked,
}

/// Failures reported to callers of [`WordCache`](crate::WordCache).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The shaper produced no run for this word. Nothing was cached.
    #[error("failed to shape text {word:?}")]
    ShapingFailed {
        /// The word that could not be shaped.
        word: String,
    },
}

/// Convenience alias used by the cache's public API.
pub type Result<T> = std::result::Result<T, CacheError>;
