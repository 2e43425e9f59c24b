//! TrueType container reader.
//!
//! Decodes the sfnt file header, the table directory and the fixed-layout
//! tables (`head`, `hhea`, `maxp`, `hmtx`, `loca`) the subsetter needs.
//! Only the ten tables in [`KNOWN_TABLES`] are kept; everything else in the
//! directory is skipped.
//!
//! All decoding goes through an explicit [`Cursor`] and `byteorder`'s
//! big-endian readers, one cursor per table.

use std::io::{self, Cursor};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::cmap::CmapTable;
use super::source::{FontMetricsSource, Tag};
use crate::error::{Error, Result};

/// Target of the whole-file checksum: `sum(file) + adjustment == CHECKSUM_MAGIC`.
pub const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

/// Tables read from the source font, in directory (tag) order.
pub const KNOWN_TABLES: [Tag; 10] = [
    Tag::CMAP,
    Tag::CVT,
    Tag::FPGM,
    Tag::GLYF,
    Tag::HEAD,
    Tag::HHEA,
    Tag::HMTX,
    Tag::LOCA,
    Tag::MAXP,
    Tag::PREP,
];

/// Size of the sfnt file header.
pub const FILE_HEADER_SIZE: usize = 12;

/// Size of one table directory record.
pub const TABLE_RECORD_SIZE: usize = 16;

/// Byte offset of `checksumAdjustment` inside the `head` table.
pub const HEAD_CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;

/// Hinting program tables; a font without them is still usable.
pub fn is_optional_table(tag: Tag) -> bool {
    tag == Tag::CVT || tag == Tag::FPGM || tag == Tag::PREP
}

/// Compute the sfnt checksum of a table: the sum of its big-endian `u32`
/// words, the last word zero padded.
pub fn table_checksum(data: &[u8]) -> u32 {
    data.iter()
        .enumerate()
        .fold(0u32, |sum, (i, &b)| sum.wrapping_add((b as u32) << (24 - 8 * (i & 3))))
}

/// Largest power of two not greater than `n` (0 for 0).
fn max_power_of_two(n: u16) -> u16 {
    if n == 0 {
        0
    } else {
        1 << (15 - n.leading_zeros())
    }
}

/// The sfnt file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontFileHeader {
    /// 0x00010000 for TrueType outlines
    pub version: u32,
    /// Number of tables in the directory
    pub num_tables: u16,
}

impl FontFileHeader {
    /// Parse the first 12 bytes of a font file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let read = |cur: &mut Cursor<&[u8]>| -> io::Result<Self> {
            Ok(Self {
                version: cur.read_u32::<BigEndian>()?,
                num_tables: cur.read_u16::<BigEndian>()?,
            })
        };
        read(&mut cur).map_err(|_| Error::MalformedFont("font file header is truncated".into()))
    }

    /// 16 * (maximum power of 2 <= numTables).
    pub fn search_range(&self) -> u16 {
        max_power_of_two(self.num_tables).wrapping_mul(16)
    }

    /// log2(maximum power of 2 <= numTables).
    pub fn entry_selector(&self) -> u16 {
        if self.num_tables == 0 {
            0
        } else {
            15 - self.num_tables.leading_zeros() as u16
        }
    }

    /// numTables * 16 - searchRange.
    pub fn range_shift(&self) -> u16 {
        self.num_tables
            .wrapping_mul(16)
            .wrapping_sub(self.search_range())
    }

    /// Serialize the header with recomputed binary-search fields.
    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u32::<BigEndian>(self.version)?;
        out.write_u16::<BigEndian>(self.num_tables)?;
        out.write_u16::<BigEndian>(self.search_range())?;
        out.write_u16::<BigEndian>(self.entry_selector())?;
        out.write_u16::<BigEndian>(self.range_shift())?;
        Ok(())
    }
}

/// One table directory entry together with its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    /// Table tag
    pub tag: Tag,
    /// Checksum as stored in (or computed for) the directory
    pub checksum: u32,
    /// Offset from the beginning of the font file
    pub offset: u32,
    /// Length of the table without padding
    pub length: u32,
    /// Table bytes; left empty for `glyf`, which is streamed glyph by glyph
    pub data: Vec<u8>,
}

impl TableRecord {
    /// A record with no data attached yet.
    pub fn new(tag: Tag, checksum: u32, offset: u32, length: u32) -> Self {
        Self {
            tag,
            checksum,
            offset,
            length,
            data: Vec::new(),
        }
    }

    /// A record owning rebuilt table bytes, checksum and length computed from them.
    pub fn from_data(tag: Tag, data: Vec<u8>) -> Self {
        Self {
            tag,
            checksum: table_checksum(&data),
            offset: 0,
            length: data.len() as u32,
            data,
        }
    }
}

/// Decode `count` directory records.
///
/// Unknown tags are skipped, known tags may appear only once.
fn parse_directory(data: &[u8], count: u16) -> Result<Vec<TableRecord>> {
    let mut cur = Cursor::new(data);
    let truncated = |_| Error::MalformedFont("table directory is truncated".into());
    let mut records: Vec<TableRecord> = Vec::with_capacity(KNOWN_TABLES.len());

    for _ in 0..count {
        let tag = Tag::from_u32(cur.read_u32::<BigEndian>().map_err(truncated)?);
        if !KNOWN_TABLES.contains(&tag) {
            log::trace!("Skipping table '{}'", tag);
            cur.set_position(cur.position() + 12);
            continue;
        }
        if records.iter().any(|r| r.tag == tag) {
            return Err(Error::DuplicateTable(tag));
        }
        let checksum = cur.read_u32::<BigEndian>().map_err(truncated)?;
        let offset = cur.read_u32::<BigEndian>().map_err(truncated)?;
        let length = cur.read_u32::<BigEndian>().map_err(truncated)?;
        records.push(TableRecord::new(tag, checksum, offset, length));
    }

    records.sort_by_key(|r| r.tag);
    Ok(records)
}

fn table_data(records: &[TableRecord], tag: Tag) -> &[u8] {
    records
        .iter()
        .find(|r| r.tag == tag)
        .map(|r| r.data.as_slice())
        .unwrap_or(&[])
}

/// The `head` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadTable {
    /// 0x00010000 for version 1.0
    pub version: u32,
    /// Set by font manufacturer
    pub font_revision: u32,
    /// Whole-file checksum adjustment
    pub checksum_adjustment: u32,
    /// 0x5F0F3CF5
    pub magic_number: u32,
    /// Header flags
    pub flags: u16,
    /// Design units per em
    pub units_per_em: u16,
    /// Seconds since 1904-01-01
    pub created: i64,
    /// Seconds since 1904-01-01
    pub modified: i64,
    /// Minimum x over all glyph bounding boxes
    pub x_min: i16,
    /// Minimum y over all glyph bounding boxes
    pub y_min: i16,
    /// Maximum x over all glyph bounding boxes
    pub x_max: i16,
    /// Maximum y over all glyph bounding boxes
    pub y_max: i16,
    /// Bold, italic, ... bits
    pub mac_style: u16,
    /// Smallest readable size in pixels
    pub lowest_rec_ppem: u16,
    /// Deprecated, 2
    pub font_direction_hint: i16,
    /// 0 for short `loca` offsets, 1 for long
    pub index_to_loc_format: i16,
    /// 0 for the current format
    pub glyph_data_format: i16,
}

impl HeadTable {
    /// Serialized size.
    pub const SIZE: usize = 54;

    /// Decode a `head` table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        Self::read(&mut cur).map_err(|_| Error::truncated(Tag::HEAD))
    }

    fn read(cur: &mut Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            version: cur.read_u32::<BigEndian>()?,
            font_revision: cur.read_u32::<BigEndian>()?,
            checksum_adjustment: cur.read_u32::<BigEndian>()?,
            magic_number: cur.read_u32::<BigEndian>()?,
            flags: cur.read_u16::<BigEndian>()?,
            units_per_em: cur.read_u16::<BigEndian>()?,
            created: cur.read_i64::<BigEndian>()?,
            modified: cur.read_i64::<BigEndian>()?,
            x_min: cur.read_i16::<BigEndian>()?,
            y_min: cur.read_i16::<BigEndian>()?,
            x_max: cur.read_i16::<BigEndian>()?,
            y_max: cur.read_i16::<BigEndian>()?,
            mac_style: cur.read_u16::<BigEndian>()?,
            lowest_rec_ppem: cur.read_u16::<BigEndian>()?,
            font_direction_hint: cur.read_i16::<BigEndian>()?,
            index_to_loc_format: cur.read_i16::<BigEndian>()?,
            glyph_data_format: cur.read_i16::<BigEndian>()?,
        })
    }

    /// Serialize the table with a zero checksum adjustment; the real value
    /// is patched in once the whole file is laid out.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.write_u32::<BigEndian>(self.version)?;
        out.write_u32::<BigEndian>(self.font_revision)?;
        out.write_u32::<BigEndian>(0)?;
        out.write_u32::<BigEndian>(self.magic_number)?;
        out.write_u16::<BigEndian>(self.flags)?;
        out.write_u16::<BigEndian>(self.units_per_em)?;
        out.write_i64::<BigEndian>(self.created)?;
        out.write_i64::<BigEndian>(self.modified)?;
        out.write_i16::<BigEndian>(self.x_min)?;
        out.write_i16::<BigEndian>(self.y_min)?;
        out.write_i16::<BigEndian>(self.x_max)?;
        out.write_i16::<BigEndian>(self.y_max)?;
        out.write_u16::<BigEndian>(self.mac_style)?;
        out.write_u16::<BigEndian>(self.lowest_rec_ppem)?;
        out.write_i16::<BigEndian>(self.font_direction_hint)?;
        out.write_i16::<BigEndian>(self.index_to_loc_format)?;
        out.write_i16::<BigEndian>(self.glyph_data_format)?;
        Ok(out)
    }
}

/// The `hhea` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HheaTable {
    /// 0x00010000 for version 1.0
    pub version: u32,
    /// Typographic ascent
    pub ascender: i16,
    /// Typographic descent
    pub descender: i16,
    /// Typographic line gap
    pub line_gap: i16,
    /// Maximum advance width in `hmtx`
    pub advance_width_max: u16,
    /// Minimum left side bearing in `hmtx`
    pub min_left_side_bearing: i16,
    /// Minimum of advance width minus right edge
    pub min_right_side_bearing: i16,
    /// Maximum right edge
    pub x_max_extent: i16,
    /// Caret slope rise
    pub caret_slope_rise: i16,
    /// Caret slope run
    pub caret_slope_run: i16,
    /// Caret offset
    pub caret_offset: i16,
    /// Reserved, zero
    pub reserved: [i16; 4],
    /// 0 for the current format
    pub metric_data_format: i16,
    /// Number of (advance width, left side bearing) pairs in `hmtx`
    pub number_of_h_metrics: u16,
}

impl HheaTable {
    /// Serialized size.
    pub const SIZE: usize = 36;

    /// Decode a `hhea` table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        Self::read(&mut cur).map_err(|_| Error::truncated(Tag::HHEA))
    }

    fn read(cur: &mut Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            version: cur.read_u32::<BigEndian>()?,
            ascender: cur.read_i16::<BigEndian>()?,
            descender: cur.read_i16::<BigEndian>()?,
            line_gap: cur.read_i16::<BigEndian>()?,
            advance_width_max: cur.read_u16::<BigEndian>()?,
            min_left_side_bearing: cur.read_i16::<BigEndian>()?,
            min_right_side_bearing: cur.read_i16::<BigEndian>()?,
            x_max_extent: cur.read_i16::<BigEndian>()?,
            caret_slope_rise: cur.read_i16::<BigEndian>()?,
            caret_slope_run: cur.read_i16::<BigEndian>()?,
            caret_offset: cur.read_i16::<BigEndian>()?,
            reserved: [
                cur.read_i16::<BigEndian>()?,
                cur.read_i16::<BigEndian>()?,
                cur.read_i16::<BigEndian>()?,
                cur.read_i16::<BigEndian>()?,
            ],
            metric_data_format: cur.read_i16::<BigEndian>()?,
            number_of_h_metrics: cur.read_u16::<BigEndian>()?,
        })
    }

    /// Serialize the table.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.write_u32::<BigEndian>(self.version)?;
        out.write_i16::<BigEndian>(self.ascender)?;
        out.write_i16::<BigEndian>(self.descender)?;
        out.write_i16::<BigEndian>(self.line_gap)?;
        out.write_u16::<BigEndian>(self.advance_width_max)?;
        out.write_i16::<BigEndian>(self.min_left_side_bearing)?;
        out.write_i16::<BigEndian>(self.min_right_side_bearing)?;
        out.write_i16::<BigEndian>(self.x_max_extent)?;
        out.write_i16::<BigEndian>(self.caret_slope_rise)?;
        out.write_i16::<BigEndian>(self.caret_slope_run)?;
        out.write_i16::<BigEndian>(self.caret_offset)?;
        for value in self.reserved {
            out.write_i16::<BigEndian>(value)?;
        }
        out.write_i16::<BigEndian>(self.metric_data_format)?;
        out.write_u16::<BigEndian>(self.number_of_h_metrics)?;
        Ok(out)
    }
}

/// The version 1.0 part of `maxp`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaxpLimits {
    /// Maximum points in a simple glyph
    pub max_points: u16,
    /// Maximum contours in a simple glyph
    pub max_contours: u16,
    /// Maximum points in a composite glyph
    pub max_composite_points: u16,
    /// Maximum contours in a composite glyph
    pub max_composite_contours: u16,
    /// 1 or 2
    pub max_zones: u16,
    /// Maximum points used in the twilight zone
    pub max_twilight_points: u16,
    /// Number of storage area locations
    pub max_storage: u16,
    /// Number of FDEFs
    pub max_function_defs: u16,
    /// Number of IDEFs
    pub max_instruction_defs: u16,
    /// Maximum stack depth
    pub max_stack_elements: u16,
    /// Maximum byte count for glyph instructions
    pub max_size_of_instructions: u16,
    /// Maximum number of top level components
    pub max_component_elements: u16,
    /// Maximum component nesting
    pub max_component_depth: u16,
}

/// The `maxp` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxpTable {
    /// 0x00010000 (TrueType) or 0x00005000 (glyph count only)
    pub version: u32,
    /// Number of glyphs in the font
    pub num_glyphs: u16,
    /// Present for version 1.0 tables
    pub limits: Option<MaxpLimits>,
}

impl MaxpTable {
    /// Version with the full set of limits.
    pub const VERSION_1_0: u32 = 0x0001_0000;

    /// Decode a `maxp` table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        Self::read(&mut cur).map_err(|_| Error::truncated(Tag::MAXP))
    }

    fn read(cur: &mut Cursor<&[u8]>) -> io::Result<Self> {
        let version = cur.read_u32::<BigEndian>()?;
        let num_glyphs = cur.read_u16::<BigEndian>()?;
        let limits = if version >= Self::VERSION_1_0 {
            Some(MaxpLimits {
                max_points: cur.read_u16::<BigEndian>()?,
                max_contours: cur.read_u16::<BigEndian>()?,
                max_composite_points: cur.read_u16::<BigEndian>()?,
                max_composite_contours: cur.read_u16::<BigEndian>()?,
                max_zones: cur.read_u16::<BigEndian>()?,
                max_twilight_points: cur.read_u16::<BigEndian>()?,
                max_storage: cur.read_u16::<BigEndian>()?,
                max_function_defs: cur.read_u16::<BigEndian>()?,
                max_instruction_defs: cur.read_u16::<BigEndian>()?,
                max_stack_elements: cur.read_u16::<BigEndian>()?,
                max_size_of_instructions: cur.read_u16::<BigEndian>()?,
                max_component_elements: cur.read_u16::<BigEndian>()?,
                max_component_depth: cur.read_u16::<BigEndian>()?,
            })
        } else {
            None
        };
        Ok(Self {
            version,
            num_glyphs,
            limits,
        })
    }

    /// Serialize the table (32 bytes for version 1.0, 6 otherwise).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(32);
        out.write_u32::<BigEndian>(self.version)?;
        out.write_u16::<BigEndian>(self.num_glyphs)?;
        if let Some(l) = &self.limits {
            for value in [
                l.max_points,
                l.max_contours,
                l.max_composite_points,
                l.max_composite_contours,
                l.max_zones,
                l.max_twilight_points,
                l.max_storage,
                l.max_function_defs,
                l.max_instruction_defs,
                l.max_stack_elements,
                l.max_size_of_instructions,
                l.max_component_elements,
                l.max_component_depth,
            ] {
                out.write_u16::<BigEndian>(value)?;
            }
        }
        Ok(out)
    }
}

/// The `hmtx` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HorizontalMetrics {
    /// One entry per long metric (`hhea.numberOfHMetrics`)
    pub advance_widths: Vec<u16>,
    /// One entry per glyph when the table is complete
    pub left_side_bearings: Vec<i16>,
}

impl HorizontalMetrics {
    /// Decode `hmtx`, reading exactly `number_of_h_metrics` long entries
    /// followed by as many trailing bearings as the table holds, up to
    /// `num_glyphs` in total.
    pub fn parse(data: &[u8], number_of_h_metrics: u16, num_glyphs: u16) -> Result<Self> {
        if number_of_h_metrics == 0 {
            return Err(Error::MalformedFont("hhea.numberOfHMetrics is zero".into()));
        }
        let mut cur = Cursor::new(data);
        let mut metrics = Self::default();
        for _ in 0..number_of_h_metrics {
            let advance = cur
                .read_u16::<BigEndian>()
                .map_err(|_| Error::truncated(Tag::HMTX))?;
            let lsb = cur
                .read_i16::<BigEndian>()
                .map_err(|_| Error::truncated(Tag::HMTX))?;
            metrics.advance_widths.push(advance);
            metrics.left_side_bearings.push(lsb);
        }
        for _ in number_of_h_metrics..num_glyphs {
            match cur.read_i16::<BigEndian>() {
                Ok(lsb) => metrics.left_side_bearings.push(lsb),
                Err(_) => break,
            }
        }
        Ok(metrics)
    }

    /// Advance width of a glyph; glyphs past the long metrics repeat the last one.
    pub fn advance_width(&self, glyph_index: u16) -> u16 {
        self.advance_widths
            .get(glyph_index as usize)
            .or_else(|| self.advance_widths.last())
            .copied()
            .unwrap_or(0)
    }

    /// Left side bearing of a glyph, if recorded.
    pub fn left_side_bearing(&self, glyph_index: u16) -> Option<i16> {
        self.left_side_bearings.get(glyph_index as usize).copied()
    }
}

/// The `loca` table, expanded to absolute byte offsets into `glyf`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaTable {
    /// `num_glyphs + 1` offsets
    pub offsets: Vec<u32>,
}

impl LocaTable {
    /// Decode `loca` in short (`index_to_loc_format == 0`, stored halved)
    /// or long form.
    pub fn parse(data: &[u8], index_to_loc_format: i16) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let offsets = match index_to_loc_format {
            0 => (0..data.len() / 2)
                .map(|_| cur.read_u16::<BigEndian>().map(|v| 2 * v as u32))
                .collect::<io::Result<Vec<_>>>(),
            1 => (0..data.len() / 4)
                .map(|_| cur.read_u32::<BigEndian>())
                .collect::<io::Result<Vec<_>>>(),
            other => {
                return Err(Error::MalformedFont(format!(
                    "head.indexToLocFormat {} is neither 0 nor 1",
                    other
                )))
            },
        }
        .map_err(|_| Error::truncated(Tag::LOCA))?;
        Ok(Self { offsets })
    }

    /// Number of glyphs the table can locate.
    pub fn num_glyphs(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Offset and length of a glyph inside `glyf`.
    pub fn glyph_range(&self, glyph_index: u16) -> Result<(u32, u32)> {
        let index = glyph_index as usize;
        match (self.offsets.get(index), self.offsets.get(index + 1)) {
            (Some(&start), Some(&end)) if end >= start => Ok((start, end - start)),
            (Some(_), Some(_)) => Err(Error::MalformedFont(format!(
                "loca entries for glyph {} are not ascending",
                glyph_index
            ))),
            _ => Err(Error::MalformedFont(format!(
                "glyph {} is outside the loca table ({} glyphs)",
                glyph_index,
                self.num_glyphs()
            ))),
        }
    }

    /// Encode offsets; the short form stores `offset / 2` in 16 bits.
    pub fn encode(offsets: &[u32], long_format: bool) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(offsets.len() * if long_format { 4 } else { 2 });
        for &offset in offsets {
            if long_format {
                out.write_u32::<BigEndian>(offset)?;
            } else {
                out.write_u16::<BigEndian>((offset >> 1) as u16)?;
            }
        }
        Ok(out)
    }
}

/// Every table of the source font the subsetter works from.
#[derive(Debug, Clone)]
pub struct FontTables {
    /// Source file header
    pub header: FontFileHeader,
    /// Known tables present in the source, in directory order
    pub records: Vec<TableRecord>,
    /// Decoded `head`
    pub head: HeadTable,
    /// Decoded `hhea`
    pub hhea: HheaTable,
    /// Decoded `maxp`
    pub maxp: MaxpTable,
    /// Decoded `hmtx`
    pub hmtx: HorizontalMetrics,
    /// Decoded `loca`
    pub loca: LocaTable,
}

impl FontTables {
    /// Read the header, the directory and every known table but `glyf`
    /// through the font source.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateTable`] when a known table is listed twice
    /// - [`Error::MissingTable`] when a required table is absent
    /// - [`Error::MalformedFont`] when a table is truncated or inconsistent
    pub fn read<S: FontMetricsSource + ?Sized>(source: &S) -> Result<Self> {
        let header = FontFileHeader::parse(&source.font_data(None, 0, FILE_HEADER_SIZE as u32)?)?;
        let directory = source.font_data(
            None,
            FILE_HEADER_SIZE as u32,
            TABLE_RECORD_SIZE as u32 * header.num_tables as u32,
        )?;
        let mut records = parse_directory(&directory, header.num_tables)?;

        for tag in KNOWN_TABLES {
            if !is_optional_table(tag) && !records.iter().any(|r| r.tag == tag) {
                return Err(Error::MissingTable(tag));
            }
        }

        // glyf is read one glyph at a time later on
        for record in records.iter_mut().filter(|r| r.tag != Tag::GLYF) {
            record.data = source.font_data(None, record.offset, record.length)?;
            if record.data.len() != record.length as usize {
                return Err(Error::truncated(record.tag));
            }
        }
        log::debug!(
            "Read {} of {} tables from font directory",
            records.len(),
            header.num_tables
        );

        let head = HeadTable::parse(table_data(&records, Tag::HEAD))?;
        let hhea = HheaTable::parse(table_data(&records, Tag::HHEA))?;
        let maxp = MaxpTable::parse(table_data(&records, Tag::MAXP))?;
        let hmtx = HorizontalMetrics::parse(
            table_data(&records, Tag::HMTX),
            hhea.number_of_h_metrics,
            maxp.num_glyphs,
        )?;
        let loca = LocaTable::parse(table_data(&records, Tag::LOCA), head.index_to_loc_format)?;

        if loca.num_glyphs() < maxp.num_glyphs as usize {
            return Err(Error::MalformedFont(format!(
                "loca locates {} glyphs but maxp declares {}",
                loca.num_glyphs(),
                maxp.num_glyphs
            )));
        }

        Ok(Self {
            header,
            records,
            head,
            hhea,
            maxp,
            hmtx,
            loca,
        })
    }

    /// The directory record of a table, if the source has it.
    pub fn record(&self, tag: Tag) -> Option<&TableRecord> {
        self.records.iter().find(|r| r.tag == tag)
    }

    /// Decode the `cmap` table.
    ///
    /// Decoded on demand: glyph-index addressed subsets never look at it.
    pub fn cmap(&self) -> Result<CmapTable> {
        let record = self.record(Tag::CMAP).ok_or(Error::MissingTable(Tag::CMAP))?;
        CmapTable::parse(&record.data)
    }

    /// Number of glyphs in the source font.
    pub fn num_glyphs(&self) -> u16 {
        self.maxp.num_glyphs
    }
}

/// Check an assembled font file: every directory checksum must match its
/// table (with `head.checksumAdjustment` read as zero) and the whole file
/// must sum to [`CHECKSUM_MAGIC`].
pub fn verify_font_checksums(data: &[u8]) -> Result<()> {
    let header = FontFileHeader::parse(data)?;
    let dir_end = FILE_HEADER_SIZE + TABLE_RECORD_SIZE * header.num_tables as usize;
    let directory = data
        .get(FILE_HEADER_SIZE..dir_end)
        .ok_or_else(|| Error::MalformedFont("table directory is truncated".into()))?;

    let mut cur = Cursor::new(directory);
    let truncated = |_| Error::MalformedFont("table directory is truncated".into());
    for _ in 0..header.num_tables {
        let tag = Tag::from_u32(cur.read_u32::<BigEndian>().map_err(truncated)?);
        let checksum = cur.read_u32::<BigEndian>().map_err(truncated)?;
        let offset = cur.read_u32::<BigEndian>().map_err(truncated)? as usize;
        let length = cur.read_u32::<BigEndian>().map_err(truncated)? as usize;

        let table = data
            .get(offset..offset + length)
            .ok_or_else(|| Error::truncated(tag))?;
        let actual = if tag == Tag::HEAD && table.len() >= HEAD_CHECKSUM_ADJUSTMENT_OFFSET + 4 {
            let mut zeroed = table.to_vec();
            zeroed[HEAD_CHECKSUM_ADJUSTMENT_OFFSET..HEAD_CHECKSUM_ADJUSTMENT_OFFSET + 4]
                .fill(0);
            table_checksum(&zeroed)
        } else {
            table_checksum(table)
        };
        if actual != checksum {
            return Err(Error::MalformedFont(format!(
                "'{}' checksum {:#010x} does not match directory value {:#010x}",
                tag, actual, checksum
            )));
        }
    }

    let whole = table_checksum(data);
    if whole != CHECKSUM_MAGIC {
        return Err(Error::MalformedFont(format!(
            "whole-file checksum {:#010x} is not {:#010x}",
            whole, CHECKSUM_MAGIC
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_head() -> HeadTable {
        HeadTable {
            version: 0x0001_0000,
            font_revision: 0x0001_0000,
            checksum_adjustment: 0x1234_5678,
            magic_number: 0x5F0F_3CF5,
            flags: 0x000B,
            units_per_em: 2048,
            created: 3_600_000_000,
            modified: 3_600_000_001,
            x_min: -100,
            y_min: -200,
            x_max: 1000,
            y_max: 1800,
            mac_style: 0,
            lowest_rec_ppem: 9,
            font_direction_hint: 2,
            index_to_loc_format: 0,
            glyph_data_format: 0,
        }
    }

    #[test]
    fn test_table_checksum_words() {
        // Known checksum for "ABCD" (0x41424344)
        assert_eq!(table_checksum(b"ABCD"), 0x4142_4344);
        // Trailing bytes are zero padded
        assert_eq!(table_checksum(&[0, 0, 0, 1, 0x80]), 0x8000_0001);
        assert_eq!(table_checksum(&[0xFF; 8]), 0xFFFF_FFFE);
    }

    #[test]
    fn test_header_search_fields() {
        let header = FontFileHeader {
            version: 0x0001_0000,
            num_tables: 9,
        };
        assert_eq!(header.search_range(), 128);
        assert_eq!(header.entry_selector(), 3);
        assert_eq!(header.range_shift(), 16);

        let header = FontFileHeader {
            version: 0x0001_0000,
            num_tables: 8,
        };
        assert_eq!(header.search_range(), 128);
        assert_eq!(header.entry_selector(), 3);
        assert_eq!(header.range_shift(), 0);
    }

    #[test]
    fn test_head_zeroes_checksum_adjustment() {
        let head = sample_head();
        let bytes = head.to_bytes().unwrap();
        assert_eq!(bytes.len(), HeadTable::SIZE);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0]);

        let parsed = HeadTable::parse(&bytes).unwrap();
        assert_eq!(parsed.checksum_adjustment, 0);
        assert_eq!(parsed.units_per_em, 2048);
        assert_eq!(parsed.x_min, -100);
        assert_eq!(parsed.created, 3_600_000_000);
    }

    #[test]
    fn test_truncated_head() {
        let bytes = sample_head().to_bytes().unwrap();
        let err = HeadTable::parse(&bytes[..40]).unwrap_err();
        assert!(err.to_string().contains("'head' table is truncated"));
    }

    #[test]
    fn test_maxp_short_version() {
        let data = [0x00, 0x00, 0x50, 0x00, 0x01, 0x2C];
        let maxp = MaxpTable::parse(&data).unwrap();
        assert_eq!(maxp.num_glyphs, 300);
        assert!(maxp.limits.is_none());
        assert_eq!(maxp.to_bytes().unwrap(), data.to_vec());
    }

    #[test]
    fn test_maxp_full_version() {
        let maxp = MaxpTable {
            version: MaxpTable::VERSION_1_0,
            num_glyphs: 12,
            limits: Some(MaxpLimits {
                max_points: 40,
                max_zones: 2,
                max_component_depth: 1,
                ..Default::default()
            }),
        };
        let bytes = maxp.to_bytes().unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(MaxpTable::parse(&bytes).unwrap(), maxp);
    }

    #[test]
    fn test_hmtx_uses_number_of_h_metrics() {
        // two long metrics, one trailing bearing
        let data = [0x01, 0xF4, 0x00, 0x0A, 0x02, 0x58, 0xFF, 0xF6, 0x00, 0x14];
        let hmtx = HorizontalMetrics::parse(&data, 2, 3).unwrap();
        assert_eq!(hmtx.advance_widths, vec![500, 600]);
        assert_eq!(hmtx.left_side_bearings, vec![10, -10, 20]);
        // glyph 2 repeats the last advance width
        assert_eq!(hmtx.advance_width(2), 600);
        assert_eq!(hmtx.left_side_bearing(2), Some(20));
    }

    #[test]
    fn test_hmtx_zero_metrics_rejected() {
        assert!(matches!(
            HorizontalMetrics::parse(&[], 0, 1),
            Err(Error::MalformedFont(_))
        ));
    }

    #[test]
    fn test_loca_short_and_long() {
        let short = LocaTable::parse(&[0, 0, 0, 5, 0, 5, 0, 9], 0).unwrap();
        assert_eq!(short.offsets, vec![0, 10, 10, 18]);
        assert_eq!(short.num_glyphs(), 3);
        assert_eq!(short.glyph_range(1).unwrap(), (10, 0));
        assert_eq!(short.glyph_range(2).unwrap(), (10, 8));
        assert!(short.glyph_range(3).is_err());

        let long = LocaTable::parse(&[0, 0, 0, 0, 0, 2, 0, 0], 1).unwrap();
        assert_eq!(long.offsets, vec![0, 0x20000]);
        assert!(LocaTable::parse(&[0, 0], 2).is_err());
    }

    #[test]
    fn test_loca_encode() {
        assert_eq!(LocaTable::encode(&[0, 10, 18], false).unwrap(), vec![0, 0, 0, 5, 0, 9]);
        assert_eq!(
            LocaTable::encode(&[0, 0x20000], true).unwrap(),
            vec![0, 0, 0, 0, 0, 2, 0, 0]
        );
    }

    #[test]
    fn test_directory_skips_unknown_and_rejects_duplicates() {
        let mut dir = Vec::new();
        for (tag, offset) in [(*b"OS/2", 100u32), (*b"head", 200), (*b"cmap", 300)] {
            dir.extend_from_slice(&tag);
            dir.extend_from_slice(&0u32.to_be_bytes());
            dir.extend_from_slice(&offset.to_be_bytes());
            dir.extend_from_slice(&54u32.to_be_bytes());
        }
        let records = parse_directory(&dir, 3).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tag, Tag::CMAP);
        assert_eq!(records[1].tag, Tag::HEAD);
        assert_eq!(records[1].offset, 200);

        let duplicate = dir[16..32].to_vec();
        dir.extend_from_slice(&duplicate);
        assert!(matches!(
            parse_directory(&dir, 4),
            Err(Error::DuplicateTable(tag)) if tag == Tag::HEAD
        ));
    }

    #[test]
    fn test_verify_rejects_bad_checksum() {
        // header + one directory record for a 4-byte table
        let mut file = Vec::new();
        FontFileHeader {
            version: 0x0001_0000,
            num_tables: 1,
        }
        .write(&mut file)
        .unwrap();
        file.extend_from_slice(b"cvt ");
        file.extend_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
        file.extend_from_slice(&28u32.to_be_bytes());
        file.extend_from_slice(&4u32.to_be_bytes());
        file.extend_from_slice(&[1, 2, 3, 4]);

        let err = verify_font_checksums(&file).unwrap_err();
        assert!(err.to_string().contains("'cvt '"));
    }
}
