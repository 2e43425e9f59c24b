//! TrueType font subsetting for PDF embedding.
//!
//! Builds a new, self-contained TrueType file holding only the glyphs a
//! document uses. Per ISO 32000-1 section 9.6.4, subset fonts use a tag prefix
//! (e.g., "ABCDEF+FontName").
//!
//! # Subsetting Strategy
//!
//! 1. Read the source directory and the fixed-layout tables
//! 2. Resolve the requested characters (or glyph indices) and close the set
//!    over composite glyph components, renumbering glyphs densely from 0
//! 3. Rewrite component references, then rebuild `glyf`, `loca`, `cmap`,
//!    `hmtx`, `head`, `hhea` and `maxp` for the new numbering
//! 4. Copy the hinting programs (`cvt `, `fpgm`, `prep`) as they are and
//!    write the file with fresh checksums
//!
//! Layout tables (GSUB, GPOS, kern, name, post, OS/2, ...) are not carried
//! over; a PDF font program does not need them.

use std::collections::BTreeSet;

use super::cmap::{build_format4, CmapSubtable, ENCODING_SYMBOL, SYMBOL_CODE_BIAS};
use super::font_writer::{build_hmtx, build_loca, glyf_record, write_font_file};
use super::glyph_graph::{GlyphGraph, GlyphGraphBuilder};
use super::source::{FontMetricsSource, Tag};
use super::tables::{is_optional_table, FontTables, TableRecord};
use crate::config::SubsetConfig;
use crate::error::{Error, Result};

/// What the subset must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsetRequest {
    /// A contiguous range of single-byte character codes, of which `used`
    /// are actually needed. Codes are visited in ascending order.
    CharRange {
        /// First code of the range
        first: u8,
        /// Last code of the range
        last: u8,
        /// Codes to embed, all inside `first..=last`
        used: BTreeSet<u8>,
    },
    /// Glyph indices of a glyph-index addressed font (no `cmap` is
    /// emitted), visited in the given order.
    GlyphIndices(Vec<u16>),
}

impl SubsetRequest {
    /// Every code in `first..=last`.
    pub fn char_range(first: u8, last: u8) -> Self {
        SubsetRequest::CharRange {
            first,
            last,
            used: (first..=last).collect(),
        }
    }

    /// The codes of a string, spanning the smallest range that holds them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSubsetRequest`] for an empty string or a
    /// character above U+00FF.
    pub fn from_text(text: &str) -> Result<Self> {
        let used = text
            .chars()
            .map(|ch| {
                u8::try_from(ch).map_err(|_| {
                    Error::InvalidSubsetRequest(format!(
                        "character U+{:04X} is not a single-byte code",
                        ch as u32
                    ))
                })
            })
            .collect::<Result<BTreeSet<u8>>>()?;
        match (used.first(), used.last()) {
            (Some(&first), Some(&last)) => Ok(SubsetRequest::CharRange { first, last, used }),
            _ => Err(Error::InvalidSubsetRequest("text is empty".into())),
        }
    }

    /// The given glyph indices.
    pub fn glyphs(glyphs: impl IntoIterator<Item = u16>) -> Self {
        SubsetRequest::GlyphIndices(glyphs.into_iter().collect())
    }

    /// The request addresses glyphs directly.
    pub fn is_glyph_indexed(&self) -> bool {
        matches!(self, SubsetRequest::GlyphIndices(_))
    }

    fn validate(&self) -> Result<()> {
        match self {
            SubsetRequest::CharRange { first, last, used } => {
                if first > last {
                    return Err(Error::InvalidSubsetRequest(format!(
                        "first character {:#04x} is after last character {:#04x}",
                        first, last
                    )));
                }
                if used.is_empty() {
                    return Err(Error::InvalidSubsetRequest("no character is used".into()));
                }
                if let Some(code) = used.iter().find(|&c| c < first || c > last) {
                    return Err(Error::InvalidSubsetRequest(format!(
                        "character {:#04x} is outside {:#04x}..={:#04x}",
                        code, first, last
                    )));
                }
            },
            SubsetRequest::GlyphIndices(glyphs) => {
                if glyphs.is_empty() {
                    return Err(Error::InvalidSubsetRequest("no glyph is requested".into()));
                }
            },
        }
        Ok(())
    }
}

/// Subsets one font through a [`FontMetricsSource`].
pub struct FontSubsetter<'s, S: FontMetricsSource + ?Sized> {
    source: &'s S,
    config: SubsetConfig,
}

impl<'s, S: FontMetricsSource + ?Sized> FontSubsetter<'s, S> {
    /// Create a new font subsetter.
    pub fn new(source: &'s S, config: SubsetConfig) -> Self {
        Self { source, config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SubsetConfig {
        &self.config
    }

    /// Build the subset font file.
    ///
    /// # Errors
    ///
    /// Every error is fatal and no partial output is returned:
    /// - [`Error::InvalidSubsetRequest`] for an empty or inconsistent request
    /// - [`Error::MissingTable`], [`Error::DuplicateTable`],
    ///   [`Error::NoUsableCmap`] and [`Error::MalformedFont`] for a bad font
    /// - errors raised by the font source, unchanged
    /// - [`Error::Internal`] if a consistency check fails
    pub fn subset(&self, request: &SubsetRequest) -> Result<SubsetFont> {
        request.validate()?;
        let tables = FontTables::read(self.source)?;
        let mut builder = GlyphGraphBuilder::new(self.source, &tables.loca, tables.num_glyphs())?;

        let mut char_map = None;
        match request {
            SubsetRequest::CharRange { first, last, used } => {
                let cmap = tables.cmap()?;
                let subtable = cmap.select(self.config.cmap_encoding_id())?;
                let source_glyphs = self
                    .source
                    .glyph_indices_for_char_range(*first as u16, *last as u16)?;
                let range_len = (*last - *first) as usize + 1;
                if source_glyphs.len() != range_len {
                    return Err(Error::FontSource(format!(
                        "expected {} glyph indices for the character range, got {}",
                        range_len,
                        source_glyphs.len()
                    )));
                }

                let mut char_to_glyph = vec![0u16; range_len];
                for &code in used {
                    let slot = (code - *first) as usize;
                    let old_index = resolve_char(subtable, code, source_glyphs[slot]);
                    char_to_glyph[slot] = builder.add_char(code as u16, old_index)?;
                }
                char_map = Some(CharMap {
                    first: *first,
                    char_to_glyph,
                    encoding_id: subtable.encoding_id,
                    language: subtable.language,
                    used: used.len(),
                });
            },
            SubsetRequest::GlyphIndices(glyphs) => {
                for &glyph in glyphs {
                    builder.add_glyph(glyph)?;
                }
            },
        }

        let graph = builder.finish()?;
        log::debug!(
            "Subset closes over {} of {} glyphs",
            graph.len(),
            tables.num_glyphs()
        );
        let data = rebuild(&tables, &graph, char_map.as_ref())?;

        let mut glyph_map: Vec<(u16, u16)> = graph
            .records()
            .iter()
            .map(|r| (r.old_index, r.new_index))
            .collect();
        glyph_map.sort_unstable();
        Ok(SubsetFont {
            data,
            glyph_map,
            composite_glyphs: graph
                .records()
                .iter()
                .filter(|r| r.composite)
                .map(|r| r.old_index)
                .collect(),
            char_map,
            source_glyphs: tables.num_glyphs(),
        })
    }
}

/// Character code to source glyph.
///
/// The selected `cmap` sub-table decides; symbolic sub-tables are probed at
/// U+F000 + code first. The source's own lookup only fills codes the
/// sub-table leaves unmapped.
fn resolve_char(subtable: &CmapSubtable, code: u8, source_glyph: u16) -> u16 {
    let code = code as u16;
    let from_cmap = if subtable.encoding_id == ENCODING_SYMBOL {
        match subtable.glyph_index(SYMBOL_CODE_BIAS | code) {
            0 => subtable.glyph_index(code),
            glyph => glyph,
        }
    } else {
        subtable.glyph_index(code)
    };
    if from_cmap == 0 {
        return source_glyph;
    }
    if source_glyph != 0 && source_glyph != from_cmap {
        log::warn!(
            "Character {:#04x}: cmap gives glyph {}, font source gives {}",
            code,
            from_cmap,
            source_glyph
        );
    }
    from_cmap
}

/// Character side of a char-range subset.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CharMap {
    first: u8,
    /// New glyph per code in the range, 0 for unused codes
    char_to_glyph: Vec<u16>,
    encoding_id: u16,
    language: u16,
    used: usize,
}

/// Write every table of the subset font.
fn rebuild(tables: &FontTables, graph: &GlyphGraph, char_map: Option<&CharMap>) -> Result<Vec<u8>> {
    let ordered = graph.in_new_order();
    let glyphs = ordered
        .iter()
        .map(|record| graph.remapped_glyph_data(record))
        .collect::<Result<Vec<_>>>()?;

    let glyf = glyf_record(&glyphs)?;
    let (loca, long_loca) = build_loca(&glyphs)?;
    if glyf.length as usize != glyphs.iter().map(Vec::len).sum::<usize>() {
        return Err(Error::Internal("glyph table length does not match loca".into()));
    }
    let (hmtx, number_of_h_metrics) = build_hmtx(&ordered)?;
    let num_glyphs = u16::try_from(ordered.len())
        .map_err(|_| Error::Internal("subset exceeds 65535 glyphs".into()))?;
    let aggregates = graph.aggregates();

    let mut head = tables.head.clone();
    head.x_min = aggregates.x_min;
    head.y_min = aggregates.y_min;
    head.x_max = aggregates.x_max;
    head.y_max = aggregates.y_max;
    head.index_to_loc_format = long_loca as i16;

    let mut hhea = tables.hhea.clone();
    hhea.advance_width_max = aggregates.advance_width_max;
    hhea.min_left_side_bearing = aggregates.min_left_side_bearing;
    hhea.min_right_side_bearing = aggregates.min_right_side_bearing;
    hhea.x_max_extent = aggregates.x_max_extent;
    hhea.number_of_h_metrics = number_of_h_metrics;

    let mut maxp = tables.maxp.clone();
    maxp.num_glyphs = num_glyphs;

    let mut records = vec![
        glyf,
        TableRecord::from_data(Tag::LOCA, loca),
        TableRecord::from_data(Tag::HMTX, hmtx),
        TableRecord::from_data(Tag::HEAD, head.to_bytes()?),
        TableRecord::from_data(Tag::HHEA, hhea.to_bytes()?),
        TableRecord::from_data(Tag::MAXP, maxp.to_bytes()?),
    ];
    if let Some(map) = char_map {
        let cmap = build_format4(map.encoding_id, map.language, map.first as u16, &map.char_to_glyph)?;
        records.push(TableRecord::from_data(Tag::CMAP, cmap));
    }
    // Source checksums of the hinting programs are not reliable
    for record in tables.records.iter().filter(|r| is_optional_table(r.tag)) {
        records.push(TableRecord::from_data(record.tag, record.data.clone()));
    }

    write_font_file(tables.header.version, records, &glyphs)
}

/// A subset font file and its glyph bookkeeping.
#[derive(Debug, Clone)]
pub struct SubsetFont {
    data: Vec<u8>,
    /// (old, new) sorted by old index
    glyph_map: Vec<(u16, u16)>,
    composite_glyphs: Vec<u16>,
    char_map: Option<CharMap>,
    source_glyphs: u16,
}

impl SubsetFont {
    /// The font file bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the font file bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Uncompressed length of the font file.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// The font file is empty (never the case for a successful subset).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of glyphs in the subset.
    pub fn num_glyphs(&self) -> u16 {
        self.glyph_map.len() as u16
    }

    /// The subset was built from glyph indices and has no `cmap`.
    pub fn is_glyph_indexed(&self) -> bool {
        self.char_map.is_none()
    }

    /// New index of a source glyph.
    pub fn new_glyph_index(&self, old_index: u16) -> Option<u16> {
        self.glyph_map
            .binary_search_by_key(&old_index, |&(old, _)| old)
            .ok()
            .map(|i| self.glyph_map[i].1)
    }

    /// (old, new) pairs in source glyph order.
    pub fn glyph_map(&self) -> &[(u16, u16)] {
        &self.glyph_map
    }

    /// New glyph of a used character code of a char-range subset.
    pub fn glyph_for_char(&self, code: u8) -> Option<u16> {
        let map = self.char_map.as_ref()?;
        let slot = code.checked_sub(map.first)? as usize;
        map.char_to_glyph.get(slot).copied().filter(|&g| g != 0)
    }

    /// Source indices of the composite glyphs in the subset.
    pub fn composite_glyphs(&self) -> &[u16] {
        &self.composite_glyphs
    }

    /// Six-letter subset tag, derived from the glyph set so the same subset
    /// always gets the same tag.
    pub fn subset_tag(&self) -> String {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for pair in &self.glyph_map {
            pair.hash(&mut hasher);
        }
        hash_to_tag(hasher.finish())
    }

    /// Create the subset font name.
    ///
    /// # Arguments
    /// * `base_name` - Original font name (e.g., "Arial")
    ///
    /// # Returns
    /// Subset name (e.g., "ABCDEF+Arial")
    pub fn subset_font_name(&self, base_name: &str) -> String {
        format!("{}+{}", self.subset_tag(), base_name)
    }

    /// Get statistics about the subset.
    pub fn stats(&self) -> SubsetStats {
        SubsetStats {
            unique_chars: self.char_map.as_ref().map_or(0, |m| m.used),
            unique_glyphs: self.glyph_map.len(),
            composite_glyphs: self.composite_glyphs.len(),
            min_glyph_id: self.glyph_map.first().map(|&(old, _)| old),
            max_glyph_id: self.glyph_map.last().map(|&(old, _)| old),
            source_glyphs: self.source_glyphs,
        }
    }
}

/// Convert a hash to a 6-letter uppercase tag.
fn hash_to_tag(hash: u64) -> String {
    let mut tag = String::with_capacity(6);
    let mut h = hash;
    for _ in 0..6 {
        let ch = (h % 26) as u8 + b'A';
        tag.push(ch as char);
        h /= 26;
    }
    tag
}

/// Statistics about a font subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetStats {
    /// Number of character codes embedded
    pub unique_chars: usize,
    /// Number of glyphs in the subset
    pub unique_glyphs: usize,
    /// Number of composite glyphs in the subset
    pub composite_glyphs: usize,
    /// Minimum source glyph ID used
    pub min_glyph_id: Option<u16>,
    /// Maximum source glyph ID used
    pub max_glyph_id: Option<u16>,
    /// Number of glyphs in the source font
    pub source_glyphs: u16,
}

impl SubsetStats {
    /// Calculate potential file size reduction percentage.
    ///
    /// This is an estimate based on glyph count ratio.
    /// Actual reduction depends on glyph complexity.
    pub fn estimated_reduction(&self) -> f32 {
        if self.source_glyphs == 0 || self.unique_glyphs == 0 {
            return 0.0;
        }
        let used = self.unique_glyphs as f32;
        let total = self.source_glyphs as f32;
        (1.0 - used / total) * 100.0
    }
}
