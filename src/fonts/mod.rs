//! TrueType font subsetting.
//!
//! This module reads a TrueType font through a [`FontMetricsSource`],
//! collects the glyphs a document needs and writes a new, minimal font file
//! for embedding.

pub mod cmap;
pub mod font_subsetter;
pub mod font_writer;
pub mod glyph_graph;
pub mod source;
pub mod tables;
pub mod truetype_parser;

pub use font_subsetter::{FontSubsetter, SubsetFont, SubsetRequest, SubsetStats};
pub use glyph_graph::{ComponentFlags, GlyphGraph, GlyphRecord, MetricAggregates};
pub use source::{BoundingBox, FontMetricsSource, GlyphMetrics, Tag};
pub use tables::{table_checksum, verify_font_checksums, FontTables};
pub use truetype_parser::TrueTypeFont;
