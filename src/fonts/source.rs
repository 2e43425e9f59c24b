//! Font metrics source contract.
//!
//! The subsetter never reads a font file directly. Every byte and every
//! per-glyph metric is pulled through a [`FontMetricsSource`], which may be
//! backed by an in-memory file ([`crate::fonts::TrueTypeFont`]), a system
//! font API, or anything else able to answer the three queries below.

use std::fmt;

use crate::error::Result;

/// A 4-byte sfnt table tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Character to glyph mapping
    pub const CMAP: Tag = Tag(*b"cmap");
    /// Control value table
    pub const CVT: Tag = Tag(*b"cvt ");
    /// Font program
    pub const FPGM: Tag = Tag(*b"fpgm");
    /// Glyph outlines
    pub const GLYF: Tag = Tag(*b"glyf");
    /// Font header
    pub const HEAD: Tag = Tag(*b"head");
    /// Horizontal header
    pub const HHEA: Tag = Tag(*b"hhea");
    /// Horizontal metrics
    pub const HMTX: Tag = Tag(*b"hmtx");
    /// Glyph locations
    pub const LOCA: Tag = Tag(*b"loca");
    /// Maximum profile
    pub const MAXP: Tag = Tag(*b"maxp");
    /// Control value program
    pub const PREP: Tag = Tag(*b"prep");

    /// Build a tag from its big-endian integer form.
    pub fn from_u32(value: u32) -> Self {
        Tag(value.to_be_bytes())
    }

    /// The big-endian integer form of the tag.
    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let ch = if (32..=126).contains(&b) { b as char } else { '?' };
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

/// A glyph bounding box in design units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundingBox {
    /// Left edge
    pub x_min: i16,
    /// Bottom edge
    pub y_min: i16,
    /// Right edge
    pub x_max: i16,
    /// Top edge
    pub y_max: i16,
}

impl BoundingBox {
    /// Create a bounding box from its four edges.
    pub fn new(x_min: i16, y_min: i16, x_max: i16, y_max: i16) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }
}

/// Metrics of one glyph in design units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphMetrics {
    /// Horizontal advance width
    pub advance_width: u16,
    /// Design-space bounding box
    pub bbox: BoundingBox,
}

/// Supplier of per-glyph metrics and raw font table bytes.
///
/// Implementations report system-level failures as errors; the subsetter
/// propagates them as-is and never retries.
pub trait FontMetricsSource {
    /// Glyph index for each character code in `first..=last` (0 is notdef).
    fn glyph_indices_for_char_range(&self, first: u16, last: u16) -> Result<Vec<u16>>;

    /// Advance width and design bounding box of a glyph.
    fn glyph_metrics(&self, glyph_index: u16) -> Result<GlyphMetrics>;

    /// Raw font bytes.
    ///
    /// With `table == None` the offset is relative to the start of the font
    /// file; otherwise it is relative to the start of the named table.
    fn font_data(&self, table: Option<Tag>, offset: u32, length: u32) -> Result<Vec<u8>>;
}

impl<T: FontMetricsSource + ?Sized> FontMetricsSource for &T {
    fn glyph_indices_for_char_range(&self, first: u16, last: u16) -> Result<Vec<u16>> {
        (**self).glyph_indices_for_char_range(first, last)
    }

    fn glyph_metrics(&self, glyph_index: u16) -> Result<GlyphMetrics> {
        (**self).glyph_metrics(glyph_index)
    }

    fn font_data(&self, table: Option<Tag>, offset: u32, length: u32) -> Result<Vec<u8>> {
        (**self).font_data(table, offset, length)
    }
}
