//! In-memory TrueType font source.
//!
//! This module wraps the `ttf-parser` crate so a font file held in memory
//! can feed the subsetter: per-glyph metrics come from `hmtx` and the glyph
//! outlines, character lookups from the Windows `cmap` sub-tables, and raw
//! bytes are sliced straight out of the file.

use ttf_parser::{cmap::Subtable, Face, GlyphId, PlatformId};

use super::cmap::{ENCODING_SYMBOL, ENCODING_UNICODE_BMP, SYMBOL_CODE_BIAS};
use super::source::{BoundingBox, FontMetricsSource, GlyphMetrics, Tag};
use crate::error::{Error, Result};

/// A parsed TrueType font file.
#[derive(Debug)]
pub struct TrueTypeFont<'a> {
    /// The parsed font face
    face: Face<'a>,
    /// Original font data
    data: &'a [u8],
}

impl<'a> TrueTypeFont<'a> {
    /// Parse a TrueType font from raw data.
    ///
    /// # Arguments
    /// * `data` - Raw font file bytes
    ///
    /// # Returns
    /// A font ready to be used as a [`FontMetricsSource`].
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::FontSource("font file is empty".into()));
        }
        let face = Face::parse(data, 0)
            .map_err(|e| Error::FontSource(format!("failed to parse font file: {}", e)))?;
        log::debug!("Parsed font with {} glyphs", face.number_of_glyphs());
        Ok(Self { face, data })
    }

    /// Get the font's PostScript name.
    pub fn postscript_name(&self) -> Option<String> {
        self.face
            .names()
            .into_iter()
            .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|name| name.to_string())
    }

    /// Get units per em for this font.
    pub fn units_per_em(&self) -> u16 {
        self.face.units_per_em()
    }

    /// Get the number of glyphs in the font.
    pub fn num_glyphs(&self) -> u16 {
        self.face.number_of_glyphs()
    }

    /// Get the raw font data.
    pub fn raw_data(&self) -> &[u8] {
        self.data
    }

    /// The font maps its characters through a Windows Symbol sub-table and
    /// has no Windows Unicode one.
    pub fn is_symbolic(&self) -> bool {
        let mut symbol = false;
        let mut unicode = false;
        for subtable in self.windows_subtables() {
            match subtable.encoding_id {
                ENCODING_SYMBOL => symbol = true,
                ENCODING_UNICODE_BMP => unicode = true,
                _ => {},
            }
        }
        symbol && !unicode
    }

    fn windows_subtables(&self) -> impl Iterator<Item = Subtable<'a>> + '_ {
        self.face
            .tables()
            .cmap
            .into_iter()
            .flat_map(|cmap| cmap.subtables.into_iter())
            .filter(|s| s.platform_id == PlatformId::Windows)
    }

    /// Glyph of a character code, probing the symbol area for symbolic fonts.
    fn lookup(&self, code: u16) -> u16 {
        let probes = [SYMBOL_CODE_BIAS | code, code];
        let probes = if self.is_symbolic() {
            &probes[..]
        } else {
            &probes[1..]
        };
        for &candidate in probes {
            for subtable in self.windows_subtables() {
                if let Some(GlyphId(glyph)) = subtable.glyph_index(candidate as u32) {
                    if glyph != 0 {
                        return glyph;
                    }
                }
            }
        }
        0
    }

    fn slice(&self, bytes: &'a [u8], offset: u32, length: u32, what: &str) -> Result<Vec<u8>> {
        let start = offset as usize;
        let end = start
            .checked_add(length as usize)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                Error::FontSource(format!(
                    "{} bytes {}..{} are outside the {} available",
                    what,
                    offset,
                    offset as u64 + length as u64,
                    bytes.len()
                ))
            })?;
        Ok(bytes[start..end].to_vec())
    }
}

impl FontMetricsSource for TrueTypeFont<'_> {
    fn glyph_indices_for_char_range(&self, first: u16, last: u16) -> Result<Vec<u16>> {
        if first > last {
            return Err(Error::FontSource(format!(
                "character range {:#06x}..={:#06x} is empty",
                first, last
            )));
        }
        Ok((first..=last).map(|code| self.lookup(code)).collect())
    }

    fn glyph_metrics(&self, glyph_index: u16) -> Result<GlyphMetrics> {
        if glyph_index >= self.num_glyphs() {
            return Err(Error::FontSource(format!(
                "glyph {} is out of range, the font has {} glyphs",
                glyph_index,
                self.num_glyphs()
            )));
        }
        let glyph = GlyphId(glyph_index);
        let bbox = self
            .face
            .glyph_bounding_box(glyph)
            .map(|r| BoundingBox::new(r.x_min, r.y_min, r.x_max, r.y_max))
            .unwrap_or_default();
        Ok(GlyphMetrics {
            advance_width: self.face.glyph_hor_advance(glyph).unwrap_or(0),
            bbox,
        })
    }

    fn font_data(&self, table: Option<Tag>, offset: u32, length: u32) -> Result<Vec<u8>> {
        match table {
            None => self.slice(self.data, offset, length, "font file"),
            Some(tag) => {
                let bytes = self
                    .face
                    .raw_face()
                    .table(ttf_parser::Tag::from_bytes(&tag.0))
                    .ok_or_else(|| Error::FontSource(format!("font has no '{}' table", tag)))?;
                self.slice(bytes, offset, length, &format!("'{}' table", tag))
            },
        }
    }
}
