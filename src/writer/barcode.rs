//! QR code generation for PDF documents.
//!
//! This module is the entry point of the QR encoder: it turns text into a
//! [`QrCode`] module grid that an image layer can rasterize as a 1-bit
//! bitmap.
//!
//! ## Segments
//!
//! Text is split into segments at [`SEGMENT_MARKER`] (U+0100). Each segment
//! is encoded in its own, most compact mode, so a long run of digits next to
//! free text does not fall back to byte mode as a whole.
//!
//! ## Example
//!
//! ```ignore
//! use pdf_embed::writer::barcode::{BarcodeGenerator, QrCodeOptions, QrErrorCorrection};
//!
//! let code = BarcodeGenerator::generate_qr(
//!     "https://example.com",
//!     &QrCodeOptions::default().error_correction(QrErrorCorrection::Quartile),
//! )?;
//! for row in code.to_matrix() {
//!     // rasterize
//! }
//! ```

use std::fmt;

use crate::error::Result;
use crate::writer::qr::{QrCode, QrSegment};

/// Character separating segments in [`BarcodeGenerator::generate_qr`] input.
pub const SEGMENT_MARKER: char = '\u{0100}';

/// QR code error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QrErrorCorrection {
    /// Low (~7% correction capability)
    Low,
    /// Medium (~15% correction capability)
    #[default]
    Medium,
    /// Quartile (~25% correction capability)
    Quartile,
    /// High (~30% correction capability)
    High,
}

impl QrErrorCorrection {
    /// Position in L, M, Q, H order.
    pub const fn ordinal(self) -> usize {
        match self {
            QrErrorCorrection::Low => 0,
            QrErrorCorrection::Medium => 1,
            QrErrorCorrection::Quartile => 2,
            QrErrorCorrection::High => 3,
        }
    }

    /// The two level bits of the format word.
    pub const fn format_bits(self) -> u8 {
        match self {
            QrErrorCorrection::Low => 0b01,
            QrErrorCorrection::Medium => 0b00,
            QrErrorCorrection::Quartile => 0b11,
            QrErrorCorrection::High => 0b10,
        }
    }

    /// Single letter name: L, M, Q or H.
    pub const fn as_char(self) -> char {
        match self {
            QrErrorCorrection::Low => 'L',
            QrErrorCorrection::Medium => 'M',
            QrErrorCorrection::Quartile => 'Q',
            QrErrorCorrection::High => 'H',
        }
    }
}

impl fmt::Display for QrErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Options for QR code generation.
#[derive(Debug, Clone)]
pub struct QrCodeOptions {
    /// Error correction level
    pub error_correction: QrErrorCorrection,
    /// Quiet zone (border) in modules
    pub quiet_zone: usize,
}

impl Default for QrCodeOptions {
    fn default() -> Self {
        Self {
            error_correction: QrErrorCorrection::Medium,
            quiet_zone: 4,
        }
    }
}

impl QrCodeOptions {
    /// Create new QR code options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the error correction level.
    pub fn error_correction(mut self, level: QrErrorCorrection) -> Self {
        self.error_correction = level;
        self
    }

    /// Set the quiet zone (border) in modules.
    pub fn quiet_zone(mut self, modules: usize) -> Self {
        self.quiet_zone = modules;
        self
    }
}

/// QR code generator.
pub struct BarcodeGenerator;

impl BarcodeGenerator {
    /// Generate a QR code from text.
    ///
    /// # Arguments
    /// * `data` - Text to encode; [`SEGMENT_MARKER`] splits it into segments
    ///   and empty segments are dropped
    /// * `options` - QR code generation options
    ///
    /// # Errors
    /// * [`Error::EmptyQrInput`](crate::Error::EmptyQrInput) for empty text
    /// * [`Error::InvalidQrCharacter`](crate::Error::InvalidQrCharacter) for a
    ///   character above U+00FF other than the marker
    /// * [`Error::QrInputTooLong`](crate::Error::QrInputTooLong) when the text
    ///   exceeds a version 40 symbol
    pub fn generate_qr(data: &str, options: &QrCodeOptions) -> Result<QrCode> {
        let parts: Vec<&str> = data.split(SEGMENT_MARKER).collect();
        Self::generate_qr_segments(&parts, options)
    }

    /// Generate a QR code from text already split into segments.
    pub fn generate_qr_segments(segments: &[&str], options: &QrCodeOptions) -> Result<QrCode> {
        let segments = segments
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| QrSegment::new(s))
            .collect::<Result<Vec<_>>>()?;
        QrCode::encode_segments(&segments, options.error_correction, options.quiet_zone)
    }

    /// Generate a QR code with default options.
    pub fn generate_qr_simple(data: &str) -> Result<QrCode> {
        Self::generate_qr(data, &QrCodeOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::writer::qr::QrMode;

    #[test]
    fn test_generate_qr_code() {
        let code = BarcodeGenerator::generate_qr_simple("https://example.com").unwrap();
        assert_eq!(code.error_correction(), QrErrorCorrection::Medium);
        assert_eq!(code.quiet_zone(), 4);
        assert_eq!(code.version(), 2);
        assert_eq!(code.segment_modes(), &[QrMode::Byte]);
    }

    #[test]
    fn test_qr_options() {
        let options = QrCodeOptions::new()
            .error_correction(QrErrorCorrection::High)
            .quiet_zone(6);
        let code = BarcodeGenerator::generate_qr("Test data", &options).unwrap();
        assert_eq!(code.error_correction(), QrErrorCorrection::High);
        assert_eq!(code.full_dimension(), code.dimension() + 12);
    }

    #[test]
    fn test_segment_marker_splits_modes() {
        let text = format!("INVOICE 42{}0123456789012345{}total: 3", SEGMENT_MARKER, SEGMENT_MARKER);
        let code = BarcodeGenerator::generate_qr_simple(&text).unwrap();
        assert_eq!(
            code.segment_modes(),
            &[QrMode::AlphaNumeric, QrMode::Numeric, QrMode::Byte]
        );
    }

    #[test]
    fn test_empty_segments_dropped() {
        let text = format!("{}123{}", SEGMENT_MARKER, SEGMENT_MARKER);
        let code = BarcodeGenerator::generate_qr_simple(&text).unwrap();
        assert_eq!(code.segment_modes(), &[QrMode::Numeric]);
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            BarcodeGenerator::generate_qr_simple(""),
            Err(Error::EmptyQrInput)
        ));
        let marker_only = SEGMENT_MARKER.to_string();
        assert!(matches!(
            BarcodeGenerator::generate_qr_simple(&marker_only),
            Err(Error::EmptyQrInput)
        ));
        assert!(matches!(
            BarcodeGenerator::generate_qr_simple("price: 5\u{20AC}"),
            Err(Error::InvalidQrCharacter(0x20AC))
        ));
    }

    #[test]
    fn test_level_codes() {
        assert_eq!(QrErrorCorrection::default(), QrErrorCorrection::Medium);
        assert_eq!(QrErrorCorrection::Quartile.to_string(), "Q");
        assert_eq!(QrErrorCorrection::Low.format_bits(), 1);
        assert_eq!(QrErrorCorrection::High.ordinal(), 3);
    }
}
