//! Glyph closure and renumbering.
//!
//! Starting from the requested characters (or glyph indices) the builder
//! collects every glyph the subset needs, including the components of
//! composite glyphs, and gives each one a new, dense glyph index in
//! discovery order. Glyphs 0 to 2 are always taken first so `.notdef`
//! keeps index 0.
//!
//! Composite components are discovered breadth-first: the primary pass
//! queues any component not yet in the set, and [`GlyphGraphBuilder::close`]
//! drains that queue, queuing nested components as it goes.

use std::collections::{HashSet, VecDeque};
use std::io::Cursor;

use bitflags::bitflags;
use byteorder::{BigEndian, ReadBytesExt};

use super::source::{FontMetricsSource, GlyphMetrics, Tag};
use super::tables::LocaTable;
use crate::error::{Error, Result};

/// Glyphs kept at their original position ahead of the requested ones.
pub const RESERVED_GLYPHS: u16 = 3;

/// Size of the glyph header (numberOfContours plus bounding box).
const GLYPH_HEADER_SIZE: usize = 10;

bitflags! {
    /// Flags of one composite glyph component record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ComponentFlags: u16 {
        /// Arguments are 16-bit words, otherwise bytes
        const ARG_1_AND_2_ARE_WORDS = 0x0001;
        /// Arguments are x/y offsets, otherwise point numbers
        const ARGS_ARE_XY_VALUES = 0x0002;
        /// Round offsets to the grid
        const ROUND_XY_TO_GRID = 0x0004;
        /// One F2Dot14 scale follows
        const WE_HAVE_A_SCALE = 0x0008;
        /// Another component follows this one
        const MORE_COMPONENTS = 0x0020;
        /// Separate x and y scales follow
        const WE_HAVE_AN_X_AND_Y_SCALE = 0x0040;
        /// A 2x2 transformation follows
        const WE_HAVE_A_TWO_BY_TWO = 0x0080;
        /// Instructions follow the last component
        const WE_HAVE_INSTRUCTIONS = 0x0100;
        /// Use this component's metrics for the composite
        const USE_MY_METRICS = 0x0200;
        /// Components overlap
        const OVERLAP_COMPOUND = 0x0400;
    }
}

impl ComponentFlags {
    /// Bytes between the end of the glyph index field and the next record.
    fn trailing_size(self) -> u64 {
        let args = if self.contains(Self::ARG_1_AND_2_ARE_WORDS) {
            4
        } else {
            2
        };
        let transform = if self.contains(Self::WE_HAVE_A_SCALE) {
            2
        } else if self.contains(Self::WE_HAVE_AN_X_AND_Y_SCALE) {
            4
        } else if self.contains(Self::WE_HAVE_A_TWO_BY_TWO) {
            8
        } else {
            0
        };
        args + transform
    }
}

/// Whether raw glyph data describes a composite glyph.
pub fn is_composite(data: &[u8]) -> bool {
    data.len() >= 2 && i16::from_be_bytes([data[0], data[1]]) < 0
}

/// Walk the component records of a composite glyph.
///
/// Returns, per component, the byte offset of its glyph index field within
/// `data` and the glyph index stored there.
///
/// # Errors
///
/// Returns [`Error::MalformedFont`] if a record runs past the end of the glyph.
pub fn component_references(data: &[u8]) -> Result<Vec<(usize, u16)>> {
    let mut cur = Cursor::new(data);
    cur.set_position(GLYPH_HEADER_SIZE as u64);
    let truncated = |_| Error::MalformedFont("composite glyph record is truncated".into());

    let mut components = Vec::new();
    loop {
        let flags = ComponentFlags::from_bits_retain(cur.read_u16::<BigEndian>().map_err(truncated)?);
        let position = cur.position() as usize;
        let glyph_index = cur.read_u16::<BigEndian>().map_err(truncated)?;
        components.push((position, glyph_index));

        cur.set_position(cur.position() + flags.trailing_size());
        if cur.position() > data.len() as u64 {
            return Err(Error::MalformedFont(
                "composite glyph record is truncated".into(),
            ));
        }
        if !flags.contains(ComponentFlags::MORE_COMPONENTS) {
            break;
        }
    }
    Ok(components)
}

/// One glyph of the subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRecord {
    /// Glyph index in the source font
    pub old_index: u16,
    /// Glyph index in the subset font
    pub new_index: u16,
    /// Character code that first referenced the glyph, if any
    pub char_code: Option<u16>,
    /// Raw outline bytes as read from `glyf` (empty for blank glyphs)
    pub data: Vec<u8>,
    /// Outline has a negative contour count
    pub composite: bool,
    /// Advance width and design bounding box
    pub metrics: GlyphMetrics,
}

impl GlyphRecord {
    /// The glyph has no outline (e.g. space).
    pub fn is_blank(&self) -> bool {
        self.data.is_empty()
    }
}

/// Running extremes over all non-blank glyphs of the subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricAggregates {
    /// `head.xMin`
    pub x_min: i16,
    /// `head.yMin`
    pub y_min: i16,
    /// `head.xMax`
    pub x_max: i16,
    /// `head.yMax`
    pub y_max: i16,
    /// `hhea.advanceWidthMax`
    pub advance_width_max: u16,
    /// `hhea.minLeftSideBearing`
    pub min_left_side_bearing: i16,
    /// `hhea.minRightSideBearing`
    pub min_right_side_bearing: i16,
    /// `hhea.xMaxExtent`
    pub x_max_extent: i16,
    glyphs: usize,
}

impl Default for MetricAggregates {
    fn default() -> Self {
        Self {
            x_min: i16::MAX,
            y_min: i16::MAX,
            x_max: i16::MIN,
            y_max: i16::MIN,
            advance_width_max: 0,
            min_left_side_bearing: i16::MAX,
            min_right_side_bearing: i16::MAX,
            x_max_extent: i16::MIN,
            glyphs: 0,
        }
    }
}

impl MetricAggregates {
    /// Fold one glyph's metrics into the extremes.
    pub fn add(&mut self, metrics: &GlyphMetrics) {
        let bbox = &metrics.bbox;
        self.x_min = self.x_min.min(bbox.x_min);
        self.y_min = self.y_min.min(bbox.y_min);
        self.x_max = self.x_max.max(bbox.x_max);
        self.y_max = self.y_max.max(bbox.y_max);

        self.advance_width_max = self.advance_width_max.max(metrics.advance_width);
        self.min_left_side_bearing = self.min_left_side_bearing.min(bbox.x_min);
        let rsb = (metrics.advance_width as i32 - bbox.x_max as i32)
            .clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        self.min_right_side_bearing = self.min_right_side_bearing.min(rsb);
        self.x_max_extent = self.x_max_extent.max(bbox.x_max);
        self.glyphs += 1;
    }

    /// Number of glyphs folded in.
    pub fn glyph_count(&self) -> usize {
        self.glyphs
    }

    /// Final values; all zero when no glyph contributed.
    pub fn finish(self) -> Self {
        if self.glyphs == 0 {
            Self {
                x_min: 0,
                y_min: 0,
                x_max: 0,
                y_max: 0,
                advance_width_max: 0,
                min_left_side_bearing: 0,
                min_right_side_bearing: 0,
                x_max_extent: 0,
                glyphs: 0,
            }
        } else {
            self
        }
    }
}

/// The closed, renumbered glyph set.
#[derive(Debug, Clone)]
pub struct GlyphGraph {
    /// Records sorted by old glyph index
    records: Vec<GlyphRecord>,
    aggregates: MetricAggregates,
}

impl GlyphGraph {
    /// Number of glyphs in the subset.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// The subset holds no glyph.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// New index of a source glyph, if it is part of the subset.
    pub fn new_index(&self, old_index: u16) -> Option<u16> {
        self.records
            .binary_search_by_key(&old_index, |r| r.old_index)
            .ok()
            .map(|i| self.records[i].new_index)
    }

    /// Records in source glyph order.
    pub fn records(&self) -> &[GlyphRecord] {
        &self.records
    }

    /// Records in subset glyph order.
    pub fn in_new_order(&self) -> Vec<&GlyphRecord> {
        let mut ordered: Vec<&GlyphRecord> = self.records.iter().collect();
        ordered.sort_by_key(|r| r.new_index);
        ordered
    }

    /// Bounding box and metric extremes of the subset.
    pub fn aggregates(&self) -> &MetricAggregates {
        &self.aggregates
    }

    /// Outline bytes of a glyph with component references rewritten to
    /// subset glyph indices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if a component is not part of the subset.
    pub fn remapped_glyph_data(&self, record: &GlyphRecord) -> Result<Vec<u8>> {
        let mut data = record.data.clone();
        if !record.composite {
            return Ok(data);
        }
        for (position, old_index) in component_references(&record.data)? {
            let new_index = self.new_index(old_index).ok_or_else(|| {
                Error::Internal(format!(
                    "component glyph {} of glyph {} has no new index",
                    old_index, record.old_index
                ))
            })?;
            data[position..position + 2].copy_from_slice(&new_index.to_be_bytes());
        }
        Ok(data)
    }
}

/// Builds a [`GlyphGraph`] from requested glyphs.
pub struct GlyphGraphBuilder<'a, S: FontMetricsSource + ?Sized> {
    source: &'a S,
    loca: &'a LocaTable,
    num_glyphs: u16,
    records: Vec<GlyphRecord>,
    pending: VecDeque<u16>,
    queued: HashSet<u16>,
    aggregates: MetricAggregates,
}

impl<'a, S: FontMetricsSource + ?Sized> GlyphGraphBuilder<'a, S> {
    /// Create a builder and take the reserved glyphs.
    ///
    /// # Arguments
    ///
    /// * `source` - Supplier of glyph outlines and metrics
    /// * `loca` - Decoded `loca` of the source font
    /// * `num_glyphs` - `maxp.numGlyphs` of the source font
    pub fn new(source: &'a S, loca: &'a LocaTable, num_glyphs: u16) -> Result<Self> {
        let mut builder = Self {
            source,
            loca,
            num_glyphs,
            records: Vec::new(),
            pending: VecDeque::new(),
            queued: HashSet::new(),
            aggregates: MetricAggregates::default(),
        };
        for glyph in 0..RESERVED_GLYPHS.min(num_glyphs) {
            builder.insert(glyph, None)?;
        }
        Ok(builder)
    }

    /// Add the glyph a character resolved to. Returns its new index.
    pub fn add_char(&mut self, char_code: u16, old_index: u16) -> Result<u16> {
        if old_index >= self.num_glyphs {
            return Err(Error::MalformedFont(format!(
                "character {:#06x} maps to glyph {} but the font has {} glyphs",
                char_code, old_index, self.num_glyphs
            )));
        }
        self.insert(old_index, Some(char_code))
    }

    /// Add a glyph by index. Returns its new index.
    pub fn add_glyph(&mut self, old_index: u16) -> Result<u16> {
        if old_index >= self.num_glyphs {
            return Err(Error::InvalidSubsetRequest(format!(
                "glyph {} is out of range, the font has {} glyphs",
                old_index, self.num_glyphs
            )));
        }
        self.insert(old_index, None)
    }

    /// Add every queued composite component, following nested composites
    /// until no new glyph turns up.
    pub fn close(&mut self) -> Result<()> {
        let mut added = 0usize;
        while let Some(glyph) = self.pending.pop_front() {
            if self.position(glyph).is_ok() {
                continue;
            }
            self.insert(glyph, None)?;
            added += 1;
        }
        if added > 0 {
            log::debug!("Added {} composite component glyphs", added);
        }
        Ok(())
    }

    /// Close the set and check it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if numbering has a gap or a component
    /// is still unresolved.
    pub fn finish(mut self) -> Result<GlyphGraph> {
        self.close()?;

        let mut seen = vec![false; self.records.len()];
        for record in &self.records {
            match seen.get_mut(record.new_index as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(Error::Internal(format!(
                        "new glyph index {} is out of sequence",
                        record.new_index
                    )))
                },
            }
        }

        let graph = GlyphGraph {
            records: self.records,
            aggregates: self.aggregates.finish(),
        };
        for record in graph.records.iter().filter(|r| r.composite) {
            for (_, component) in component_references(&record.data)? {
                if graph.new_index(component).is_none() {
                    return Err(Error::Internal(format!(
                        "component glyph {} of glyph {} was never added",
                        component, record.old_index
                    )));
                }
            }
        }
        Ok(graph)
    }

    fn position(&self, old_index: u16) -> std::result::Result<usize, usize> {
        self.records.binary_search_by_key(&old_index, |r| r.old_index)
    }

    fn insert(&mut self, old_index: u16, char_code: Option<u16>) -> Result<u16> {
        let slot = match self.position(old_index) {
            Ok(found) => return Ok(self.records[found].new_index),
            Err(slot) => slot,
        };
        let new_index = u16::try_from(self.records.len())
            .map_err(|_| Error::Internal("subset exceeds 65535 glyphs".into()))?;

        let (offset, length) = self.loca.glyph_range(old_index)?;
        let data = if length == 0 {
            Vec::new()
        } else {
            let data = self.source.font_data(Some(Tag::GLYF), offset, length)?;
            if data.len() != length as usize || data.len() < GLYPH_HEADER_SIZE {
                return Err(Error::truncated(Tag::GLYF));
            }
            data
        };
        let metrics = self.source.glyph_metrics(old_index)?;
        let composite = is_composite(&data);

        if !data.is_empty() {
            self.aggregates.add(&metrics);
        }
        if composite {
            for (_, component) in component_references(&data)? {
                if component >= self.num_glyphs {
                    return Err(Error::MalformedFont(format!(
                        "composite glyph {} references glyph {} beyond the glyph count {}",
                        old_index, component, self.num_glyphs
                    )));
                }
                if self.position(component).is_err() && self.queued.insert(component) {
                    log::trace!("Queued component glyph {} of glyph {}", component, old_index);
                    self.pending.push_back(component);
                }
            }
        }

        log::trace!(
            "Glyph {} -> {} ({} bytes{})",
            old_index,
            new_index,
            data.len(),
            if composite { ", composite" } else { "" }
        );
        self.records.insert(
            slot,
            GlyphRecord {
                old_index,
                new_index,
                char_code,
                data,
                composite,
                metrics,
            },
        );
        Ok(new_index)
    }
}
