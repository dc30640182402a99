//! Shaping Surface
//!
//! The types the word cache shares with its collaborators: the shaper
//! contract, shaped-run output, and the pieces of cache identity.
//!
//! Metrics use 26.6 fixed point (64 units per pixel), the way font
//! stacks carry subpixel advances, so keys stay `Hash + Eq` without
//! floating-point equality headaches.

use std::sync::Arc;

use bitflags::bitflags;
use smallvec::SmallVec;

/// Units per pixel in 26.6 fixed point.
pub const FIXED_ONE: i32 = 64;

/// Opaque identity of a resolved font instance (family + face + style),
/// assigned by the client's font system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u64);

bitflags! {
    /// Shaping toggles that participate in cache identity: the same
    /// word shaped with different flags is a different run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShapeFlags: u32 {
        /// The backing text outlives the run; the shaper may borrow it.
        const PERSISTENT = 1 << 0;
        /// Right-to-left visual order.
        const RIGHT_TO_LEFT = 1 << 1;
        /// Suppress ligature substitution.
        const DISABLE_LIGATURES = 1 << 2;
    }
}

/// Shaping parameters that participate in cache identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShapeParams {
    /// Font size in 26.6 fixed-point pixels.
    pub size_fixed: u32,
    /// Extra advance per cluster in 26.6 fixed-point pixels.
    pub letter_spacing_fixed: i32,
}

impl ShapeParams {
    /// Builds params from a pixel size, rounding to the nearest 1/64 px.
    #[must_use]
    pub fn from_px(size: f32) -> Self {
        Self {
            size_fixed: (size * FIXED_ONE as f32).round() as u32,
            letter_spacing_fixed: 0,
        }
    }

    /// Font size in pixels.
    #[must_use]
    pub fn size_px(&self) -> f32 {
        self.size_fixed as f32 / FIXED_ONE as f32
    }
}

/// One positioned glyph inside a shaped run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Glyph index in the font.
    pub glyph_id: u32,
    /// Byte offset of the source cluster in the shaped text.
    pub cluster: u32,
    /// Horizontal advance, 26.6 fixed point.
    pub advance_fixed: i32,
    /// Horizontal placement offset, 26.6 fixed point.
    pub x_offset_fixed: i32,
    /// Vertical placement offset, 26.6 fixed point.
    pub y_offset_fixed: i32,
}

/// A shaped word: the expensive-to-recompute object the cache tracks.
///
/// Runs are immutable once shaped. Words are short, so glyph storage is
/// inline up to eight glyphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    glyphs: SmallVec<[Glyph; 8]>,
    advance_fixed: i64,
    flags: ShapeFlags,
}

impl TextRun {
    /// Wraps shaper output, precomputing the total advance.
    #[must_use]
    pub fn new(glyphs: impl IntoIterator<Item = Glyph>, flags: ShapeFlags) -> Self {
        let glyphs: SmallVec<[Glyph; 8]> = glyphs.into_iter().collect();
        let advance_fixed = glyphs.iter().map(|g| i64::from(g.advance_fixed)).sum();
        Self {
            glyphs,
            advance_fixed,
            flags,
        }
    }

    #[must_use]
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    #[must_use]
    pub fn flags(&self) -> ShapeFlags {
        self.flags
    }

    /// Number of glyphs in the run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Total advance width in pixels.
    #[must_use]
    pub fn advance_width(&self) -> f32 {
        self.advance_fixed as f32 / FIXED_ONE as f32
    }
}

/// The expensive-object factory the cache calls on a miss.
///
/// Returning `None` means the word could not be shaped; the cache
/// reports that to its caller and retains nothing.
pub trait TextShaper {
    fn shape(
        &self,
        text: &str,
        font: FontId,
        params: ShapeParams,
        flags: ShapeFlags,
    ) -> Option<TextRun>;
}

/// Full cache identity of a shaped word.
///
/// Lookup is the cache's job, not the tracker's; the tracker only ever
/// sees the run handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WordKey {
    pub text: Arc<str>,
    pub font: FontId,
    pub params: ShapeParams,
    pub flags: ShapeFlags,
}

impl WordKey {
    #[must_use]
    pub fn new(text: &str, font: FontId, params: ShapeParams, flags: ShapeFlags) -> Self {
        Self {
            text: Arc::from(text),
            font,
            params,
            flags,
        }
    }
}
