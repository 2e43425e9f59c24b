// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::needless_range_loop)]
#![allow(clippy::doc_overindented_list_items)]

//! # PDF Embed
//!
//! Binary codecs a PDF writer needs when it embeds content it did not draw
//! itself.
//!
//! ## Core Features
//!
//! ### Font Subsetting
//! - **Glyph Table Reader**: sfnt directory, `head`, `hhea`, `maxp`, `hmtx`,
//!   `loca` and Windows `cmap` sub-tables of a TrueType font
//! - **Glyph Graph**: composite glyph closure with dense renumbering
//! - **Font Rebuilder**: a minimal, checksummed TrueType file holding only
//!   the glyphs a document uses, with a rebuilt format 4 `cmap` for
//!   single-byte fonts
//!
//! ### QR Codes
//! - **Segmented input**: numeric, alphanumeric and byte modes per segment
//! - **Error correction**: Reed-Solomon codewords at levels L, M, Q and H
//! - **Mask selection**: all 8 masks scored with the four penalty rules
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_embed::fonts::{FontSubsetter, SubsetRequest, TrueTypeFont};
//! use pdf_embed::writer::barcode::BarcodeGenerator;
//! use pdf_embed::SubsetConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("DejaVuSans.ttf")?;
//! let font = TrueTypeFont::parse(&bytes)?;
//! let subset = FontSubsetter::new(&font, SubsetConfig::default())
//!     .subset(&SubsetRequest::from_text("Hello, World!")?)?;
//! println!("{} bytes, {} glyphs", subset.len(), subset.num_glyphs());
//!
//! let code = BarcodeGenerator::generate_qr_simple("https://example.com")?;
//! println!("version {}, {} modules wide", code.version(), code.full_dimension());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Configuration
pub mod config;

// TrueType subsetting
pub mod fonts;

// QR encoding
pub mod writer;

// Re-exports
pub use config::SubsetConfig;
pub use error::{Error, Result};
pub use fonts::{FontMetricsSource, FontSubsetter, SubsetFont, SubsetRequest, TrueTypeFont};
pub use writer::{BarcodeGenerator, QrCode, QrCodeOptions, QrErrorCorrection};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
