//! TrueType `cmap` table.
//!
//! Character codes are mapped to glyph indices through one of the table's
//! sub-tables. Only format 0 (byte encoding table) and format 4 (segment
//! mapping to delta values) are decoded; other formats are recorded so the
//! directory stays complete but are never selected.
//!
//! The subsetter also writes a fresh `cmap` holding a single format 4
//! sub-table with one segment for the subset's character range plus the
//! mandatory `0xFFFF` end segment.

use std::io::{self, Cursor};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::source::Tag;
use crate::error::{Error, Result};

/// Windows platform ID.
pub const PLATFORM_WINDOWS: u16 = 3;

/// Windows Symbol encoding ID.
pub const ENCODING_SYMBOL: u16 = 0;

/// Windows Unicode BMP encoding ID.
pub const ENCODING_UNICODE_BMP: u16 = 1;

/// Symbolic fonts map single-byte codes into the private use area at U+F000.
pub const SYMBOL_CODE_BIAS: u16 = 0xF000;

/// One format 4 segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmapSegment {
    /// First character code of the segment
    pub start_code: u16,
    /// Last character code of the segment
    pub end_code: u16,
    /// Delta added to the character code (mod 65536)
    pub id_delta: i16,
    /// Byte offset from this segment's idRangeOffset word into the glyph array, or 0
    pub id_range_offset: u16,
}

/// Decoded mapping data of a sub-table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmapMapping {
    /// Format 0: one glyph index per byte code.
    ByteEncoding(Vec<u8>),
    /// Format 4: segments plus the shared glyph index array.
    SegmentDelta {
        /// Segments in ascending end-code order
        segments: Vec<CmapSegment>,
        /// glyphIdArray
        glyph_ids: Vec<u16>,
    },
    /// Any other format; kept for completeness only.
    Unsupported,
}

/// One `cmap` encoding record with its sub-table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmapSubtable {
    /// Platform ID
    pub platform_id: u16,
    /// Platform-specific encoding ID
    pub encoding_id: u16,
    /// Sub-table format number
    pub format: u16,
    /// Language field (formats 0 and 4)
    pub language: u16,
    /// Decoded mapping
    pub mapping: CmapMapping,
}

impl CmapSubtable {
    /// Sort and search key.
    fn key(&self) -> (u16, u16, u16) {
        (self.platform_id, self.encoding_id, self.format)
    }

    /// Glyph index for a character code, 0 when unmapped.
    pub fn glyph_index(&self, code: u16) -> u16 {
        match &self.mapping {
            CmapMapping::ByteEncoding(glyphs) => glyphs.get(code as usize).map_or(0, |&g| g as u16),
            CmapMapping::SegmentDelta {
                segments,
                glyph_ids,
            } => {
                let seg_count = segments.len();
                let Some((i, seg)) = segments
                    .iter()
                    .enumerate()
                    .find(|(_, seg)| code <= seg.end_code)
                else {
                    return 0;
                };
                if code < seg.start_code {
                    return 0;
                }
                if seg.id_range_offset == 0 {
                    return code.wrapping_add(seg.id_delta as u16);
                }
                // The offset is relative to segment i's own idRangeOffset
                // word; rebase it onto glyphIdArray.
                let index = (seg.id_range_offset / 2) as usize + (code - seg.start_code) as usize;
                match index
                    .checked_sub(seg_count - i)
                    .and_then(|index| glyph_ids.get(index))
                {
                    Some(&0) | None => 0,
                    Some(&glyph) => glyph.wrapping_add(seg.id_delta as u16),
                }
            },
            CmapMapping::Unsupported => 0,
        }
    }
}

/// The decoded `cmap` table, sub-tables sorted by (platform, encoding, format).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmapTable {
    /// Encoding records with decoded sub-tables
    pub subtables: Vec<CmapSubtable>,
}

impl CmapTable {
    /// Decode a `cmap` table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFont`] if the table version is not 0 or
    /// any record or sub-table is truncated.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let truncated = |_| Error::truncated(Tag::CMAP);

        let version = cur.read_u16::<BigEndian>().map_err(truncated)?;
        if version != 0 {
            return Err(Error::MalformedFont(format!(
                "cmap table version {} is not zero",
                version
            )));
        }
        let num_tables = cur.read_u16::<BigEndian>().map_err(truncated)?;

        let mut subtables = Vec::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            let platform_id = cur.read_u16::<BigEndian>().map_err(truncated)?;
            let encoding_id = cur.read_u16::<BigEndian>().map_err(truncated)?;
            let offset = cur.read_u32::<BigEndian>().map_err(truncated)?;

            let mut sub = Cursor::new(data);
            sub.set_position(offset as u64);
            let (format, language, mapping) = read_subtable(&mut sub).map_err(truncated)?;
            if !matches!(mapping, CmapMapping::Unsupported) {
                log::trace!(
                    "cmap sub-table ({}, {}) format {}",
                    platform_id,
                    encoding_id,
                    format
                );
            }
            subtables.push(CmapSubtable {
                platform_id,
                encoding_id,
                format,
                language,
                mapping,
            });
        }

        subtables.sort_by_key(|s| s.key());
        Ok(Self { subtables })
    }

    /// Pick the Windows sub-table for `encoding_id`, format 4 first, then format 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoUsableCmap`] if neither exists.
    pub fn select(&self, encoding_id: u16) -> Result<&CmapSubtable> {
        for format in [4, 0] {
            let key = (PLATFORM_WINDOWS, encoding_id, format);
            if let Ok(index) = self.subtables.binary_search_by_key(&key, |s| s.key()) {
                let selected = &self.subtables[index];
                log::debug!(
                    "Selected cmap sub-table ({}, {}) format {}",
                    selected.platform_id,
                    selected.encoding_id,
                    selected.format
                );
                return Ok(selected);
            }
        }
        if self
            .subtables
            .iter()
            .any(|s| s.platform_id == PLATFORM_WINDOWS && s.encoding_id == encoding_id)
        {
            log::warn!(
                "cmap has platform 3 encoding {} only in unsupported formats",
                encoding_id
            );
        }
        Err(Error::NoUsableCmap { encoding_id })
    }
}

fn read_subtable(cur: &mut Cursor<&[u8]>) -> io::Result<(u16, u16, CmapMapping)> {
    let format = cur.read_u16::<BigEndian>()?;
    match format {
        0 => {
            let _length = cur.read_u16::<BigEndian>()?;
            let language = cur.read_u16::<BigEndian>()?;
            let glyphs = (0..256).map(|_| cur.read_u8()).collect::<io::Result<Vec<_>>>()?;
            Ok((format, language, CmapMapping::ByteEncoding(glyphs)))
        },
        4 => {
            let length = cur.read_u16::<BigEndian>()? as usize;
            let language = cur.read_u16::<BigEndian>()?;
            let seg_count = (cur.read_u16::<BigEndian>()? / 2) as usize;
            // searchRange, entrySelector, rangeShift
            cur.set_position(cur.position() + 6);

            let read_words = |cur: &mut Cursor<&[u8]>| -> io::Result<Vec<u16>> {
                (0..seg_count).map(|_| cur.read_u16::<BigEndian>()).collect()
            };
            let end_codes = read_words(cur)?;
            let _reserved_pad = cur.read_u16::<BigEndian>()?;
            let start_codes = read_words(cur)?;
            let deltas = read_words(cur)?;
            let range_offsets = read_words(cur)?;

            let segments = (0..seg_count)
                .map(|i| CmapSegment {
                    start_code: start_codes[i],
                    end_code: end_codes[i],
                    id_delta: deltas[i] as i16,
                    id_range_offset: range_offsets[i],
                })
                .collect();

            let glyph_count = length.saturating_sub(16 + 8 * seg_count) / 2;
            let glyph_ids = (0..glyph_count)
                .map(|_| cur.read_u16::<BigEndian>())
                .collect::<io::Result<Vec<_>>>()?;

            Ok((
                format,
                language,
                CmapMapping::SegmentDelta {
                    segments,
                    glyph_ids,
                },
            ))
        },
        other => Ok((other, 0, CmapMapping::Unsupported)),
    }
}

/// Build a complete `cmap` table with one format 4 sub-table.
///
/// # Arguments
///
/// * `encoding_id` - Encoding ID of the sub-table selected in the source font
/// * `language` - Language field copied from that sub-table
/// * `first_char` - First character code of the range
/// * `glyph_ids` - New glyph index for each code from `first_char` on
///
/// Symbolic fonts (`encoding_id == 0`) get their codes shifted by
/// [`SYMBOL_CODE_BIAS`].
pub fn build_format4(
    encoding_id: u16,
    language: u16,
    first_char: u16,
    glyph_ids: &[u16],
) -> Result<Vec<u8>> {
    if glyph_ids.is_empty() {
        return Err(Error::Internal("cmap range is empty".into()));
    }
    let bias = if encoding_id == ENCODING_SYMBOL {
        SYMBOL_CODE_BIAS
    } else {
        0
    };
    let start_code = first_char.wrapping_add(bias);
    let end_code = start_code.wrapping_add((glyph_ids.len() - 1) as u16);
    let segments = [
        CmapSegment {
            start_code,
            end_code,
            id_delta: 0,
            id_range_offset: 4,
        },
        CmapSegment {
            start_code: 0xFFFF,
            end_code: 0xFFFF,
            id_delta: 1,
            id_range_offset: 0,
        },
    ];

    let seg_count = segments.len();
    let subtable_length = 16 + 8 * seg_count + 2 * glyph_ids.len();
    let mut out = Vec::with_capacity(12 + subtable_length);

    // table header and the single encoding record
    out.write_u16::<BigEndian>(0)?;
    out.write_u16::<BigEndian>(1)?;
    out.write_u16::<BigEndian>(PLATFORM_WINDOWS)?;
    out.write_u16::<BigEndian>(encoding_id)?;
    out.write_u32::<BigEndian>(12)?;

    let search_range = (seg_count as u16 + 1).next_power_of_two();
    let entry_selector = search_range.trailing_zeros() as u16 - 1;

    out.write_u16::<BigEndian>(4)?;
    out.write_u16::<BigEndian>(subtable_length as u16)?;
    out.write_u16::<BigEndian>(language)?;
    out.write_u16::<BigEndian>(2 * seg_count as u16)?;
    out.write_u16::<BigEndian>(search_range)?;
    out.write_u16::<BigEndian>(entry_selector)?;
    out.write_u16::<BigEndian>(2 * seg_count as u16 - search_range)?;
    for seg in &segments {
        out.write_u16::<BigEndian>(seg.end_code)?;
    }
    out.write_u16::<BigEndian>(0)?;
    for seg in &segments {
        out.write_u16::<BigEndian>(seg.start_code)?;
    }
    for seg in &segments {
        out.write_i16::<BigEndian>(seg.id_delta)?;
    }
    for seg in &segments {
        out.write_u16::<BigEndian>(seg.id_range_offset)?;
    }
    for &glyph in glyph_ids {
        out.write_u16::<BigEndian>(glyph)?;
    }
    Ok(out)
}
