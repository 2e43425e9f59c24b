//! Serialization of the rebuilt font file.
//!
//! Tables are laid out in tag order after the file header and directory,
//! each padded to a 4-byte boundary. `glyf` is never held as one buffer:
//! its bytes are streamed from the per-glyph outlines while the file is
//! written, and its checksum is accumulated the same way.

use byteorder::{BigEndian, WriteBytesExt};

use super::glyph_graph::GlyphRecord;
use super::source::Tag;
use super::tables::{
    table_checksum, FontFileHeader, LocaTable, TableRecord, CHECKSUM_MAGIC,
    FILE_HEADER_SIZE, HEAD_CHECKSUM_ADJUSTMENT_OFFSET, TABLE_RECORD_SIZE,
};
use crate::error::{Error, Result};

/// Largest `glyf` length the short `loca` form can address.
const SHORT_LOCA_MASK: u32 = 0xFFFE_0000;

/// Table checksum accumulated over data that arrives in pieces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningChecksum {
    sum: u32,
    len: usize,
}

impl RunningChecksum {
    /// Add the next piece of the table.
    pub fn update(&mut self, data: &[u8]) {
        for &b in data {
            self.sum = self
                .sum
                .wrapping_add((b as u32) << (24 - 8 * (self.len & 3)));
            self.len += 1;
        }
    }

    /// Checksum so far.
    pub fn sum(&self) -> u32 {
        self.sum
    }

    /// Bytes seen so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Nothing was added yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Directory record for glyph outlines written in the given order.
pub fn glyf_record(glyphs: &[Vec<u8>]) -> Result<TableRecord> {
    let mut checksum = RunningChecksum::default();
    for glyph in glyphs {
        checksum.update(glyph);
    }
    let length = u32::try_from(checksum.len())
        .map_err(|_| Error::Internal("glyph table exceeds 4 GiB".into()))?;
    Ok(TableRecord::new(Tag::GLYF, checksum.sum(), 0, length))
}

/// Build `loca` for glyph outlines written in the given order.
///
/// Returns the table bytes and whether the long form was needed.
pub fn build_loca(glyphs: &[Vec<u8>]) -> Result<(Vec<u8>, bool)> {
    let mut offsets = Vec::with_capacity(glyphs.len() + 1);
    let mut position = 0u32;
    for glyph in glyphs {
        offsets.push(position);
        position = position
            .checked_add(glyph.len() as u32)
            .ok_or_else(|| Error::Internal("glyph table exceeds 4 GiB".into()))?;
    }
    offsets.push(position);

    let odd = offsets.iter().any(|offset| offset & 1 != 0);
    if odd {
        log::warn!("Glyph data has odd offsets, using long loca format");
    }
    let long_format = odd || position & SHORT_LOCA_MASK != 0;
    log::debug!(
        "loca: {} glyphs, {} bytes of glyph data, {} format",
        glyphs.len(),
        position,
        if long_format { "long" } else { "short" }
    );
    Ok((LocaTable::encode(&offsets, long_format)?, long_format))
}

/// Build `hmtx` for glyphs in subset order.
///
/// Trailing glyphs sharing the last advance width are stored as bare left
/// side bearings. Returns the table bytes and `numberOfHMetrics`.
pub fn build_hmtx(glyphs: &[&GlyphRecord]) -> Result<(Vec<u8>, u16)> {
    let Some(last) = glyphs.last() else {
        return Err(Error::Internal("hmtx needs at least one glyph".into()));
    };
    let trailing_width = last.metrics.advance_width;
    let run_start = glyphs
        .iter()
        .rposition(|g| g.metrics.advance_width != trailing_width)
        .map_or(0, |i| i + 1);
    let long_metrics = run_start + 1;

    let mut out = Vec::with_capacity(4 * long_metrics + 2 * (glyphs.len() - long_metrics));
    for (i, glyph) in glyphs.iter().enumerate() {
        if i < long_metrics {
            out.write_u16::<BigEndian>(glyph.metrics.advance_width)?;
        }
        out.write_i16::<BigEndian>(glyph.metrics.bbox.x_min)?;
    }
    Ok((out, long_metrics as u16))
}

/// Lay out the font file.
///
/// # Arguments
///
/// * `version` - sfnt version of the source font
/// * `tables` - Every table to emit; `glyf` carries no data, only its
///   checksum and length
/// * `glyphs` - Glyph outlines in subset order, streamed as `glyf`
///
/// # Errors
///
/// Returns [`Error::Internal`] if the written layout drifts from the
/// directory computed up front.
pub fn write_font_file(
    version: u32,
    mut tables: Vec<TableRecord>,
    glyphs: &[Vec<u8>],
) -> Result<Vec<u8>> {
    tables.sort_by_key(|t| t.tag);
    let header = FontFileHeader {
        version,
        num_tables: tables.len() as u16,
    };
    let directory_size = FILE_HEADER_SIZE + TABLE_RECORD_SIZE * tables.len();

    let mut out = Vec::with_capacity(directory_size);
    header.write(&mut out)?;

    let mut file_length = directory_size as u32;
    let mut checksum_sum = 0u32;
    for table in tables.iter_mut() {
        table.offset = file_length;
        out.write_u32::<BigEndian>(table.tag.to_u32())?;
        out.write_u32::<BigEndian>(table.checksum)?;
        out.write_u32::<BigEndian>(table.offset)?;
        out.write_u32::<BigEndian>(table.length)?;
        checksum_sum = checksum_sum.wrapping_add(table.checksum);
        file_length += (table.length + 3) & !3;
    }
    let adjustment =
        CHECKSUM_MAGIC.wrapping_sub(checksum_sum.wrapping_add(table_checksum(&out)));

    out.reserve(file_length as usize - out.len());
    for table in &tables {
        if out.len() != table.offset as usize {
            return Err(Error::Internal(format!(
                "'{}' starts at {} but the directory says {}",
                table.tag,
                out.len(),
                table.offset
            )));
        }
        if table.tag == Tag::GLYF {
            for glyph in glyphs {
                out.extend_from_slice(glyph);
            }
        } else {
            out.extend_from_slice(&table.data);
        }
        let written = out.len() - table.offset as usize;
        if written != table.length as usize {
            return Err(Error::Internal(format!(
                "'{}' wrote {} bytes but the directory says {}",
                table.tag, written, table.length
            )));
        }
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }
    if out.len() != file_length as usize {
        return Err(Error::Internal(format!(
            "font file is {} bytes, expected {}",
            out.len(),
            file_length
        )));
    }

    let head = tables
        .iter()
        .find(|t| t.tag == Tag::HEAD)
        .ok_or(Error::MissingTable(Tag::HEAD))?;
    let at = head.offset as usize + HEAD_CHECKSUM_ADJUSTMENT_OFFSET;
    out[at..at + 4].copy_from_slice(&adjustment.to_be_bytes());

    log::debug!(
        "Wrote font file: {} tables, {} bytes",
        tables.len(),
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::source::{BoundingBox, GlyphMetrics};
    use crate::fonts::tables::verify_font_checksums;

    fn record(old_index: u16, advance_width: u16, lsb: i16) -> GlyphRecord {
        GlyphRecord {
            old_index,
            new_index: old_index,
            char_code: None,
            data: Vec::new(),
            composite: false,
            metrics: GlyphMetrics {
                advance_width,
                bbox: BoundingBox::new(lsb, 0, 100, 100),
            },
        }
    }

    #[test]
    fn test_running_checksum_matches_whole() {
        let data: Vec<u8> = (0..=40u8).collect();
        let mut running = RunningChecksum::default();
        running.update(&data[..3]);
        running.update(&data[3..17]);
        running.update(&data[17..]);
        assert_eq!(running.sum(), table_checksum(&data));
        assert_eq!(running.len(), data.len());
    }

    #[test]
    fn test_hmtx_trailing_run() {
        let glyphs = [
            record(0, 500, 1),
            record(1, 600, 2),
            record(2, 700, 3),
            record(3, 700, 4),
            record(4, 700, 5),
        ];
        let refs: Vec<&GlyphRecord> = glyphs.iter().collect();
        let (data, long_metrics) = build_hmtx(&refs).unwrap();
        assert_eq!(long_metrics, 3);
        assert_eq!(
            data,
            vec![1, 0xF4, 0, 1, 2, 0x58, 0, 2, 2, 0xBC, 0, 3, 0, 4, 0, 5]
        );
    }

    #[test]
    fn test_hmtx_all_equal_and_all_distinct() {
        let same = [record(0, 500, 0), record(1, 500, 0), record(2, 500, 0)];
        let refs: Vec<&GlyphRecord> = same.iter().collect();
        assert_eq!(build_hmtx(&refs).unwrap().1, 1);

        let distinct = [record(0, 500, 0), record(1, 600, 0), record(2, 700, 0)];
        let refs: Vec<&GlyphRecord> = distinct.iter().collect();
        let (data, long_metrics) = build_hmtx(&refs).unwrap();
        assert_eq!(long_metrics, 3);
        assert_eq!(data.len(), 12);
    }

    #[test]
    fn test_loca_format_choice() {
        let glyphs = vec![vec![0; 12], Vec::new(), vec![0; 20]];
        let (data, long) = build_loca(&glyphs).unwrap();
        assert!(!long);
        assert_eq!(data, vec![0, 0, 0, 6, 0, 6, 0, 16]);

        let odd = vec![vec![0; 11], vec![0; 2]];
        let (data, long) = build_loca(&odd).unwrap();
        assert!(long);
        assert_eq!(data.len(), 12);

        let big = vec![vec![0; 0x20000]];
        assert!(build_loca(&big).unwrap().1);
    }

    #[test]
    fn test_write_font_file_checksums() {
        let head = vec![0u8; 54];
        let glyphs = vec![vec![1, 2, 3, 4, 5, 6], vec![7, 8, 9]];
        let tables = vec![
            TableRecord::from_data(Tag::PREP, vec![0xB0, 0x01]),
            glyf_record(&glyphs).unwrap(),
            TableRecord::from_data(Tag::HEAD, head),
        ];
        let file = write_font_file(0x0001_0000, tables, &glyphs).unwrap();

        // header + 3 records + glyf (12) + head (56) + prep (4)
        assert_eq!(file.len(), 12 + 48 + 12 + 56 + 4);
        assert_eq!(&file[4..6], &[0, 3]);
        // directory in tag order
        assert_eq!(&file[12..16], b"glyf");
        assert_eq!(&file[28..32], b"head");
        assert_eq!(&file[44..48], b"prep");
        assert_eq!(&file[60..69], &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        verify_font_checksums(&file).unwrap();
    }
}
